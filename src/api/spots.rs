//! Picnic spot catalog endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::db::{
    flag_to_int, AdminOnlyRequest, CreatedResponse, MessageResponse, NewSpot, PicnicSpot,
    SpotListResponse, SpotRequest, SpotResponse, SPOT_SCHEMA,
};
use crate::patch::SparsePatch;
use crate::AppState;

use super::error::ApiError;
use super::validation::parse_payload;

pub async fn list_spots(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SpotListResponse>, ApiError> {
    let spots = sqlx::query_as::<_, PicnicSpot>(
        "SELECT * FROM picnic_spots WHERE available = 1 ORDER BY id",
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(SpotListResponse {
        spots: spots.into_iter().map(SpotResponse::from).collect(),
    }))
}

pub async fn get_spot(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<SpotResponse>, ApiError> {
    let spot = sqlx::query_as::<_, PicnicSpot>("SELECT * FROM picnic_spots WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Spot not found"))?;

    Ok(Json(spot.into()))
}

pub async fn create_spot(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SpotRequest>,
) -> Result<Json<CreatedResponse>, ApiError> {
    state.admins().require(req.admin.as_ref()).await?;
    let spot: NewSpot = parse_payload(req.spot, "spot")?;

    let result = sqlx::query(
        r#"
        INSERT INTO picnic_spots (name, price, location, images, short_description,
            detailed_description, trip_images, hotel_images, available)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&spot.name)
    .bind(spot.price)
    .bind(&spot.location)
    .bind(spot.images.encode())
    .bind(&spot.short_description)
    .bind(&spot.detailed_description)
    .bind(spot.trip_images.map(|l| l.encode()))
    .bind(spot.hotel_images.map(|l| l.encode()))
    .bind(flag_to_int(spot.available))
    .execute(&state.db)
    .await?;

    let id = result.last_insert_rowid();
    tracing::info!(spot_id = id, name = %spot.name, "Spot added");

    Ok(Json(CreatedResponse {
        message: "Spot added successfully".to_string(),
        id,
    }))
}

pub async fn update_spot(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<SpotRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.admins().require(req.admin.as_ref()).await?;

    let patch = SparsePatch::from_value(&SPOT_SCHEMA, req.spot.as_ref())?;
    patch.apply(&state.db, id).await?;

    Ok(Json(MessageResponse::new("Spot updated successfully")))
}

pub async fn delete_spot(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<AdminOnlyRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.admins().require(req.admin.as_ref()).await?;

    let result = sqlx::query("DELETE FROM picnic_spots WHERE id = ?")
        .bind(id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Spot not found"));
    }

    tracing::info!(spot_id = id, "Spot deleted");
    Ok(Json(MessageResponse::new("Spot deleted successfully")))
}
