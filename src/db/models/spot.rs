//! Picnic spot models and DTOs.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

use super::car::default_available;
use super::common::{decode_optional_column, decode_text_column, ListInput};
use super::user::AdminCredentials;
use crate::patch::{EntitySchema, FieldKind, FieldSpec};

pub static SPOT_SCHEMA: EntitySchema = EntitySchema {
    label: "Spot",
    table: "picnic_spots",
    fields: &[
        FieldSpec::new("name", FieldKind::Text),
        FieldSpec::new("price", FieldKind::Real),
        FieldSpec::new("location", FieldKind::Text),
        FieldSpec::new("images", FieldKind::TextList),
        FieldSpec::new("short_description", FieldKind::Text),
        FieldSpec::new("detailed_description", FieldKind::Text),
        FieldSpec::new("trip_images", FieldKind::TextList),
        FieldSpec::new("hotel_images", FieldKind::TextList),
        FieldSpec::new("available", FieldKind::Flag),
    ],
};

#[derive(Debug, Clone, FromRow)]
pub struct PicnicSpot {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub location: String,
    pub images: String,
    pub short_description: Option<String>,
    pub detailed_description: Option<String>,
    pub trip_images: Option<String>,
    pub hotel_images: Option<String>,
    pub available: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpotResponse {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub location: String,
    pub images: Value,
    pub short_description: Option<String>,
    pub detailed_description: Option<String>,
    pub trip_images: Value,
    pub hotel_images: Value,
    pub available: bool,
}

impl From<PicnicSpot> for SpotResponse {
    fn from(spot: PicnicSpot) -> Self {
        Self {
            id: spot.id,
            images: decode_text_column(&spot.images),
            trip_images: decode_optional_column(spot.trip_images.as_deref()),
            hotel_images: decode_optional_column(spot.hotel_images.as_deref()),
            name: spot.name,
            price: spot.price,
            location: spot.location,
            short_description: spot.short_description,
            detailed_description: spot.detailed_description,
            available: spot.available != 0,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NewSpot {
    pub name: String,
    pub price: f64,
    pub location: String,
    pub images: ListInput,
    pub short_description: String,
    pub detailed_description: String,
    #[serde(default)]
    pub trip_images: Option<ListInput>,
    #[serde(default)]
    pub hotel_images: Option<ListInput>,
    #[serde(default = "default_available")]
    pub available: bool,
}

#[derive(Debug, Serialize)]
pub struct SpotListResponse {
    pub spots: Vec<SpotResponse>,
}

#[derive(Debug, Deserialize)]
pub struct SpotRequest {
    pub admin: Option<AdminCredentials>,
    #[serde(default)]
    pub spot: Option<Value>,
}
