//! Admin console login and admin account management.

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::db::{
    AdminCredentials, AdminLoginResponse, ChangeAdminPasswordRequest, CreateAdminRequest,
    MessageResponse,
};
use crate::AppState;

use super::error::ApiError;

/// Verify an admin pair and open an admin session
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(creds): Json<AdminCredentials>,
) -> Result<Json<AdminLoginResponse>, ApiError> {
    let sessions = state.sessions();
    let token = state.admins().login(&sessions, &creds).await?;

    Ok(Json(AdminLoginResponse {
        message: "Admin login successful".to_string(),
        token,
    }))
}

/// Create another admin account. Requires a valid admin pair in the body.
pub async fn create_admin(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateAdminRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let new_admin = AdminCredentials {
        username: req.new_admin.username.trim().to_string(),
        password: req.new_admin.password,
    };

    state
        .admins()
        .create_admin(req.admin.as_ref(), &new_admin)
        .await?;

    Ok(Json(MessageResponse::new("Admin created successfully")))
}

/// Change another admin's password under dual control
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
    Json(req): Json<ChangeAdminPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .admins()
        .change_password(req.admin.as_ref(), &username, &req.new_password)
        .await?;

    Ok(Json(MessageResponse::new("Password updated successfully")))
}
