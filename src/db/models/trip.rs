//! Past trip and trip comment models.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

use super::common::{decode_text_column, ListInput};
use super::user::AdminCredentials;
use crate::patch::{EntitySchema, FieldKind, FieldSpec};

pub static LAST_TRIP_SCHEMA: EntitySchema = EntitySchema {
    label: "Trip",
    table: "last_trips",
    fields: &[
        FieldSpec::new("destination", FieldKind::Text),
        FieldSpec::new("spots", FieldKind::TextList),
        FieldSpec::new("days", FieldKind::Integer),
        FieldSpec::new("persons", FieldKind::Integer),
        FieldSpec::new("images", FieldKind::TextList),
        FieldSpec::new("start_date", FieldKind::Text),
        FieldSpec::new("end_date", FieldKind::Text),
        FieldSpec::new("feedback", FieldKind::Text),
        FieldSpec::new("available", FieldKind::Flag),
    ],
};

pub static TRIP_COMMENT_SCHEMA: EntitySchema = EntitySchema {
    label: "Comment",
    table: "last_trip_comments",
    fields: &[
        FieldSpec::new("name", FieldKind::Text),
        FieldSpec::new("comment", FieldKind::Text),
    ],
};

#[derive(Debug, Clone, FromRow)]
pub struct LastTrip {
    pub id: i64,
    pub destination: String,
    pub spots: String,
    pub days: i64,
    pub persons: i64,
    pub images: String,
    pub start_date: String,
    pub end_date: String,
    pub feedback: Option<String>,
    pub created_at: String,
    pub available: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TripComment {
    pub id: i64,
    pub name: Option<String>,
    pub comment: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TripResponse {
    pub id: i64,
    pub destination: String,
    pub spots: Value,
    pub days: i64,
    pub persons: i64,
    pub images: Value,
    pub start_date: String,
    pub end_date: String,
    pub feedback: Option<String>,
    pub created_at: String,
    pub available: bool,
    /// Present on the detail view only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<TripComment>>,
}

impl From<LastTrip> for TripResponse {
    fn from(trip: LastTrip) -> Self {
        Self {
            id: trip.id,
            spots: decode_text_column(&trip.spots),
            images: decode_text_column(&trip.images),
            destination: trip.destination,
            days: trip.days,
            persons: trip.persons,
            start_date: trip.start_date,
            end_date: trip.end_date,
            feedback: trip.feedback,
            created_at: trip.created_at,
            available: trip.available != 0,
            comments: None,
        }
    }
}

/// Trip creation payload. Counts accept numbers or numeric strings.
#[derive(Debug, Deserialize)]
pub struct NewTrip {
    pub destination: String,
    #[serde(default)]
    pub spots: Option<ListInput>,
    #[serde(default)]
    pub days: Option<Value>,
    #[serde(default)]
    pub persons: Option<Value>,
    #[serde(default)]
    pub images: Option<ListInput>,
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub feedback: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NewComment {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TripListResponse {
    pub trips: Vec<TripResponse>,
}

#[derive(Debug, Serialize)]
pub struct CommentListResponse {
    pub comments: Vec<TripComment>,
}

#[derive(Debug, Deserialize)]
pub struct TripRequest {
    pub admin: Option<AdminCredentials>,
    #[serde(default)]
    pub trip: Option<Value>,
}

/// Admin edit of a single comment; the changes live under `update`
#[derive(Debug, Deserialize)]
pub struct CommentUpdateRequest {
    pub admin: Option<AdminCredentials>,
    #[serde(default)]
    pub update: Option<Value>,
}
