//! Rental car models and DTOs.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

use super::common::{decode_text_column, ListInput};
use super::user::AdminCredentials;
use crate::patch::{EntitySchema, FieldKind, FieldSpec};

pub static CAR_SCHEMA: EntitySchema = EntitySchema {
    label: "Car",
    table: "cars",
    fields: &[
        FieldSpec::new("name", FieldKind::Text),
        FieldSpec::new("model", FieldKind::Text),
        FieldSpec::new("price_per_day", FieldKind::Real),
        FieldSpec::new("seats", FieldKind::Integer),
        FieldSpec::new("transmission", FieldKind::Text),
        FieldSpec::new("fuel_type", FieldKind::Text),
        FieldSpec::new("images", FieldKind::TextList),
        FieldSpec::new("description", FieldKind::Text),
        FieldSpec::new("available", FieldKind::Flag),
    ],
};

#[derive(Debug, Clone, FromRow)]
pub struct Car {
    pub id: i64,
    pub name: String,
    pub model: String,
    pub price_per_day: f64,
    pub seats: i64,
    pub transmission: String,
    pub fuel_type: String,
    /// JSON array stored as TEXT
    pub images: String,
    pub description: Option<String>,
    pub available: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CarResponse {
    pub id: i64,
    pub name: String,
    pub model: String,
    pub price_per_day: f64,
    pub seats: i64,
    pub transmission: String,
    pub fuel_type: String,
    pub images: Value,
    pub description: Option<String>,
    pub available: bool,
}

impl From<Car> for CarResponse {
    fn from(car: Car) -> Self {
        Self {
            id: car.id,
            images: decode_text_column(&car.images),
            name: car.name,
            model: car.model,
            price_per_day: car.price_per_day,
            seats: car.seats,
            transmission: car.transmission,
            fuel_type: car.fuel_type,
            description: car.description,
            available: car.available != 0,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NewCar {
    pub name: String,
    pub model: String,
    pub price_per_day: f64,
    pub seats: i64,
    pub transmission: String,
    pub fuel_type: String,
    pub images: ListInput,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_available")]
    pub available: bool,
}

pub(crate) fn default_available() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct CarListResponse {
    pub cars: Vec<CarResponse>,
}

/// Admin request carrying a car payload. The payload stays untyped until the
/// admin pair has been verified.
#[derive(Debug, Deserialize)]
pub struct CarRequest {
    pub admin: Option<AdminCredentials>,
    #[serde(default)]
    pub car: Option<Value>,
}
