//! Rental car catalog endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::db::{
    flag_to_int, AdminOnlyRequest, Car, CarListResponse, CarRequest, CarResponse,
    CreatedResponse, MessageResponse, NewCar, CAR_SCHEMA,
};
use crate::patch::SparsePatch;
use crate::AppState;

use super::error::ApiError;
use super::validation::parse_payload;

/// List cars that are currently available
pub async fn list_cars(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CarListResponse>, ApiError> {
    let cars = sqlx::query_as::<_, Car>("SELECT * FROM cars WHERE available = 1 ORDER BY id")
        .fetch_all(&state.db)
        .await?;

    Ok(Json(CarListResponse {
        cars: cars.into_iter().map(CarResponse::from).collect(),
    }))
}

pub async fn get_car(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<CarResponse>, ApiError> {
    let car = sqlx::query_as::<_, Car>("SELECT * FROM cars WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Car not found"))?;

    Ok(Json(car.into()))
}

pub async fn create_car(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CarRequest>,
) -> Result<Json<CreatedResponse>, ApiError> {
    state.admins().require(req.admin.as_ref()).await?;
    let car: NewCar = parse_payload(req.car, "car")?;

    let result = sqlx::query(
        r#"
        INSERT INTO cars (name, model, price_per_day, seats, transmission, fuel_type, images, description, available)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&car.name)
    .bind(&car.model)
    .bind(car.price_per_day)
    .bind(car.seats)
    .bind(&car.transmission)
    .bind(&car.fuel_type)
    .bind(car.images.encode())
    .bind(&car.description)
    .bind(flag_to_int(car.available))
    .execute(&state.db)
    .await?;

    let id = result.last_insert_rowid();
    tracing::info!(car_id = id, name = %car.name, "Car added");

    Ok(Json(CreatedResponse {
        message: "Car added successfully".to_string(),
        id,
    }))
}

/// Sparse update: only the fields present in `car` are written
pub async fn update_car(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<CarRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.admins().require(req.admin.as_ref()).await?;

    let patch = SparsePatch::from_value(&CAR_SCHEMA, req.car.as_ref())?;
    patch.apply(&state.db, id).await?;

    Ok(Json(MessageResponse::new("Car updated successfully")))
}

pub async fn delete_car(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<AdminOnlyRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.admins().require(req.admin.as_ref()).await?;

    let result = sqlx::query("DELETE FROM cars WHERE id = ?")
        .bind(id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Car not found"));
    }

    tracing::info!(car_id = id, "Car deleted");
    Ok(Json(MessageResponse::new("Car deleted successfully")))
}
