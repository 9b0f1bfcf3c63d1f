//! Listing service.

use estate_core::models::listing::{Listing, ListingUpdate, NewListing};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{CreateListingRequest, UpdateListingRequest};

const LISTING_NOT_FOUND: &str = "Listing not found";

/// Parse a listing ID path segment.
pub fn parse_listing_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::Validation("Invalid listing ID".into()))
}

pub async fn create_listing(state: &AppState, mut req: CreateListingRequest) -> AppResult<Listing> {
    req.title = req.title.trim().to_string();
    req.validate()?;
    let listing = state
        .listings
        .create_listing(NewListing {
            title: req.title,
            price: req.price,
            image: req.image,
        })
        .await?;
    info!(listing_id = %listing.id, "listing created");
    Ok(listing)
}

pub async fn list_listings(state: &AppState) -> AppResult<Vec<Listing>> {
    Ok(state.listings.list_listings().await?)
}

pub async fn get_listing(state: &AppState, id: Uuid) -> AppResult<Listing> {
    state
        .listings
        .get_listing(id)
        .await?
        .ok_or_else(|| AppError::NotFound(LISTING_NOT_FOUND.into()))
}

pub async fn update_listing(
    state: &AppState,
    id: Uuid,
    mut req: UpdateListingRequest,
) -> AppResult<Listing> {
    req.title = req.title.map(|t| t.trim().to_string());
    req.validate()?;
    state
        .listings
        .update_listing(
            id,
            ListingUpdate {
                title: req.title,
                price: req.price,
                image: req.image,
            },
        )
        .await?
        .ok_or_else(|| AppError::NotFound(LISTING_NOT_FOUND.into()))
}

pub async fn delete_listing(state: &AppState, id: Uuid) -> AppResult<Listing> {
    let listing = state
        .listings
        .delete_listing(id)
        .await?
        .ok_or_else(|| AppError::NotFound(LISTING_NOT_FOUND.into()))?;
    info!(listing_id = %listing.id, "listing deleted");
    Ok(listing)
}
