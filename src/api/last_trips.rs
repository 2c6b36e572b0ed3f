//! Past trips gallery and visitor comments.

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::db::{
    self, encode_list, AdminOnlyRequest, CommentListResponse, CommentUpdateRequest,
    CreatedResponse, DbPool, LastTrip, ListInput, MessageResponse, NewComment, NewTrip, TripComment,
    TripListResponse, TripRequest, TripResponse, LAST_TRIP_SCHEMA, TRIP_COMMENT_SCHEMA,
};
use crate::patch::{as_integer, SparsePatch};
use crate::AppState;

use super::error::ApiError;
use super::validation::parse_payload;

const DEFAULT_COMMENT_NAME: &str = "Guest";

async fn trip_exists(pool: &DbPool, trip_id: i64) -> Result<bool, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM last_trips WHERE id = ?")
        .bind(trip_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}

async fn trip_comments(pool: &DbPool, trip_id: i64) -> Result<Vec<TripComment>, sqlx::Error> {
    sqlx::query_as::<_, TripComment>(
        "SELECT id, name, comment, created_at FROM last_trip_comments WHERE trip_id = ? ORDER BY id DESC",
    )
    .bind(trip_id)
    .fetch_all(pool)
    .await
}

/// 404 unless the trip exists and the comment belongs to it
async fn ensure_comment_of_trip(
    pool: &DbPool,
    trip_id: i64,
    comment_id: i64,
) -> Result<(), ApiError> {
    if !trip_exists(pool, trip_id).await? {
        return Err(ApiError::not_found("Trip not found"));
    }
    let linked: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM last_trip_comments WHERE id = ? AND trip_id = ?")
            .bind(comment_id)
            .bind(trip_id)
            .fetch_optional(pool)
            .await?;
    if linked.is_none() {
        return Err(ApiError::not_found("Comment not found"));
    }
    Ok(())
}

async fn list_trips(pool: &DbPool, only_available: bool) -> Result<TripListResponse, ApiError> {
    let sql = if only_available {
        "SELECT * FROM last_trips WHERE available = 1 ORDER BY created_at DESC, id DESC"
    } else {
        "SELECT * FROM last_trips ORDER BY created_at DESC, id DESC"
    };
    let trips = sqlx::query_as::<_, LastTrip>(sql).fetch_all(pool).await?;

    Ok(TripListResponse {
        trips: trips.into_iter().map(TripResponse::from).collect(),
    })
}

// -------------------------------------------------------------------------
// Public endpoints
// -------------------------------------------------------------------------

/// Published trips, newest first
pub async fn list_last_trips(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TripListResponse>, ApiError> {
    Ok(Json(list_trips(&state.db, true).await?))
}

/// Trip detail including its comments, newest first
pub async fn get_last_trip(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<TripResponse>, ApiError> {
    let trip = sqlx::query_as::<_, LastTrip>("SELECT * FROM last_trips WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Trip not found"))?;

    let mut response = TripResponse::from(trip);
    response.comments = Some(trip_comments(&state.db, id).await?);
    Ok(Json(response))
}

pub async fn list_comments(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<CommentListResponse>, ApiError> {
    Ok(Json(CommentListResponse {
        comments: trip_comments(&state.db, id).await?,
    }))
}

pub async fn add_comment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<NewComment>,
) -> Result<Json<MessageResponse>, ApiError> {
    let comment = req
        .comment
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::bad_request("Comment required"))?;
    let name = req
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(DEFAULT_COMMENT_NAME);

    if !trip_exists(&state.db, id).await? {
        return Err(ApiError::not_found("Trip not found"));
    }

    sqlx::query(
        "INSERT INTO last_trip_comments (trip_id, name, comment, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(id)
    .bind(name)
    .bind(comment)
    .bind(db::now())
    .execute(&state.db)
    .await?;

    Ok(Json(MessageResponse::new("Comment added")))
}

// -------------------------------------------------------------------------
// Admin endpoints
// -------------------------------------------------------------------------

pub async fn create_trip(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TripRequest>,
) -> Result<Json<CreatedResponse>, ApiError> {
    state.admins().require(req.admin.as_ref()).await?;
    let trip: NewTrip = parse_payload(req.trip, "trip")?;

    let days = count_field("days", trip.days.as_ref())?;
    let persons = count_field("persons", trip.persons.as_ref())?;
    let spots = trip.spots.map(ListInput::encode).unwrap_or_else(|| encode_list(&[]));
    let images = trip.images.map(ListInput::encode).unwrap_or_else(|| encode_list(&[]));

    let result = sqlx::query(
        r#"
        INSERT INTO last_trips (destination, spots, days, persons, images, start_date, end_date,
            feedback, created_at, available)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 1)
        "#,
    )
    .bind(&trip.destination)
    .bind(&spots)
    .bind(days)
    .bind(persons)
    .bind(&images)
    .bind(&trip.start_date)
    .bind(&trip.end_date)
    .bind(&trip.feedback)
    .bind(db::now())
    .execute(&state.db)
    .await?;

    let id = result.last_insert_rowid();
    tracing::info!(trip_id = id, destination = %trip.destination, "Trip added");

    Ok(Json(CreatedResponse {
        message: "Trip added".to_string(),
        id,
    }))
}

/// Day and person counts default to zero and accept numeric strings
fn count_field(field: &str, raw: Option<&serde_json::Value>) -> Result<i64, ApiError> {
    match raw {
        None | Some(serde_json::Value::Null) => Ok(0),
        Some(value) => as_integer(value)
            .ok_or_else(|| ApiError::validation_field(field, "Expected an integer")),
    }
}

pub async fn update_trip(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<TripRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.admins().require(req.admin.as_ref()).await?;

    let patch = SparsePatch::from_value(&LAST_TRIP_SCHEMA, req.trip.as_ref())?;
    patch.apply(&state.db, id).await?;

    Ok(Json(MessageResponse::new("Trip updated")))
}

/// Delete a trip together with its comments
pub async fn delete_trip(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<AdminOnlyRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.admins().require(req.admin.as_ref()).await?;

    let mut tx = state.db.begin().await?;
    sqlx::query("DELETE FROM last_trip_comments WHERE trip_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    let result = sqlx::query("DELETE FROM last_trips WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    if result.rows_affected() == 0 {
        tx.rollback().await?;
        return Err(ApiError::not_found("Trip not found"));
    }
    tx.commit().await?;

    tracing::info!(trip_id = id, "Trip deleted");
    Ok(Json(MessageResponse::new("Trip deleted")))
}

/// Every trip, including unpublished ones
pub async fn admin_list_trips(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AdminOnlyRequest>,
) -> Result<Json<TripListResponse>, ApiError> {
    state.admins().require(req.admin.as_ref()).await?;
    Ok(Json(list_trips(&state.db, false).await?))
}

pub async fn update_comment(
    State(state): State<Arc<AppState>>,
    Path((trip_id, comment_id)): Path<(i64, i64)>,
    Json(req): Json<CommentUpdateRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.admins().require(req.admin.as_ref()).await?;
    ensure_comment_of_trip(&state.db, trip_id, comment_id).await?;

    let patch = SparsePatch::from_value(&TRIP_COMMENT_SCHEMA, req.update.as_ref())?;
    patch.apply(&state.db, comment_id).await?;

    Ok(Json(MessageResponse::new("Comment updated")))
}

pub async fn delete_comment(
    State(state): State<Arc<AppState>>,
    Path((trip_id, comment_id)): Path<(i64, i64)>,
    Json(req): Json<AdminOnlyRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.admins().require(req.admin.as_ref()).await?;
    ensure_comment_of_trip(&state.db, trip_id, comment_id).await?;

    sqlx::query("DELETE FROM last_trip_comments WHERE id = ?")
        .bind(comment_id)
        .execute(&state.db)
        .await?;

    Ok(Json(MessageResponse::new("Comment deleted")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_count_field_coercion() {
        assert_eq!(count_field("days", None).unwrap(), 0);
        assert_eq!(count_field("days", Some(&json!(null))).unwrap(), 0);
        assert_eq!(count_field("days", Some(&json!(3))).unwrap(), 3);
        assert_eq!(count_field("days", Some(&json!("4"))).unwrap(), 4);
        assert!(count_field("days", Some(&json!("four"))).is_err());
    }
}
