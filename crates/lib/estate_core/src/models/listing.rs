//! Listing domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A property listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: Uuid,
    pub title: String,
    pub price: f64,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewListing {
    pub title: String,
    pub price: f64,
    pub image: Option<String>,
}

/// Partial listing update. `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct ListingUpdate {
    pub title: Option<String>,
    pub price: Option<f64>,
    pub image: Option<String>,
}
