//! Listing request handlers.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum_extra::extract::WithRejection;
use estate_core::models::listing::Listing;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{CreateListingRequest, ListingResponse, UpdateListingRequest};
use crate::services::listings::{self, parse_listing_id};

/// `GET /listings`
pub async fn list_listings_handler(State(state): State<AppState>) -> AppResult<Json<Vec<Listing>>> {
    Ok(Json(listings::list_listings(&state).await?))
}

/// `GET /listings/{id}`
pub async fn get_listing_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Listing>> {
    Ok(Json(
        listings::get_listing(&state, parse_listing_id(&id)?).await?,
    ))
}

/// `POST /listings`: requires authentication.
pub async fn create_listing_handler(
    State(state): State<AppState>,
    WithRejection(Json(body), _): WithRejection<Json<CreateListingRequest>, AppError>,
) -> AppResult<(StatusCode, Json<ListingResponse>)> {
    let listing = listings::create_listing(&state, body).await?;
    Ok((
        StatusCode::CREATED,
        Json(ListingResponse {
            message: "Listing created successfully".into(),
            listing,
        }),
    ))
}

/// `PUT /listings/{id}`: requires authentication.
pub async fn update_listing_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    WithRejection(Json(body), _): WithRejection<Json<UpdateListingRequest>, AppError>,
) -> AppResult<Json<ListingResponse>> {
    let listing = listings::update_listing(&state, parse_listing_id(&id)?, body).await?;
    Ok(Json(ListingResponse {
        message: "Listing updated successfully".into(),
        listing,
    }))
}

/// `DELETE /listings/{id}`: requires authentication.
pub async fn delete_listing_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ListingResponse>> {
    let listing = listings::delete_listing(&state, parse_listing_id(&id)?).await?;
    Ok(Json(ListingResponse {
        message: "Listing deleted successfully".into(),
        listing,
    }))
}
