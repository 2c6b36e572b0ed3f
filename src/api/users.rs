//! User account and session endpoints.

use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;

use crate::db::{
    LoginRequest, LoginResponse, LogoutRequest, MeResponse, MessageResponse, RegisterRequest,
    TokenQuery,
};
use crate::AppState;

use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{validate_email, validate_password};

fn validate_register_request(req: &RegisterRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    errors.check("email", validate_email(&req.email));
    errors.check("password", validate_password(&req.password));
    if req.password != req.confirm_password {
        errors.add("confirm_password", "Passwords do not match");
    }

    errors.finish()
}

/// Register a new user account
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    validate_register_request(&req)?;

    let full_name = req
        .full_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty());
    let email = req.email.trim();

    state
        .sessions()
        .register(full_name, email, &req.password)
        .await?;

    Ok(Json(MessageResponse::new("User registered successfully")))
}

/// Exchange credentials for a session token
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let outcome = state
        .sessions()
        .login(req.email.trim(), &req.password)
        .await?;

    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        token: outcome.token,
        email: outcome.email,
        full_name: outcome.full_name,
    }))
}

/// End a session. Unknown tokens are not an error.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LogoutRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.sessions().logout(&req.token).await?;
    Ok(Json(MessageResponse::new("Logged out")))
}

/// Profile of the user owning the token
pub async fn me(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<MeResponse>, ApiError> {
    let Some(token) = query.token.filter(|t| !t.is_empty()) else {
        return Err(ApiError::unauthorized("Token required"));
    };

    let user = state.sessions().whoami(&token).await?;
    Ok(Json(MeResponse { user }))
}
