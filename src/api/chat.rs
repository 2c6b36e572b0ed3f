//! Chat assistant and trip planner endpoints.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use std::sync::Arc;

use crate::chat::{self, ChatRole};
use crate::db::{
    ChatRequest, ChatResponse, HistoryQuery, HistoryResponse, TripPlanRequest, TripPlanResponse,
};
use crate::AppState;

use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{validate_phone, validate_positive, validate_required};

const MAX_HISTORY_LIMIT: i64 = 500;

/// Answer a chat message. A token, when given, only attributes the log
/// entries to a user; it never gates the call.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if req.session_id.trim().is_empty() {
        return Err(ApiError::validation_field("session_id", "Session id is required"));
    }
    if req.message.trim().is_empty() {
        return Err(ApiError::validation_field("message", "Message is required"));
    }

    let user_email = state
        .sessions()
        .resolve_user_email(req.token.as_deref())
        .await;

    let context =
        chat::recent_turns(&state.db, &req.session_id, state.config.chat.history_window).await?;

    chat::log_message(
        &state.db,
        &req.session_id,
        user_email.as_deref(),
        ChatRole::User,
        &req.message,
    )
    .await?;

    let reply = chat::generate_reply(state.replies.as_ref(), &context, &req.message).await;

    chat::log_message(
        &state.db,
        &req.session_id,
        user_email.as_deref(),
        ChatRole::Assistant,
        &reply,
    )
    .await?;

    Ok(Json(ChatResponse { reply, user_email }))
}

/// Messages of a chat session, oldest first
pub async fn history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let limit = query.limit.clamp(0, MAX_HISTORY_LIMIT);
    let messages = chat::history(&state.db, &query.session_id, limit).await?;
    Ok(Json(HistoryResponse { messages }))
}

fn validate_plan(plan: &TripPlanRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    errors
        .check("name", validate_required("Name", &plan.name))
        .check("address", validate_required("Address", &plan.address))
        .check("city", validate_required("City", &plan.city))
        .check("destination", validate_required("Destination", &plan.destination))
        .check("phone", validate_phone(&plan.phone))
        .check("budget", validate_positive("Budget", plan.budget))
        .check("days", validate_positive("Days", plan.days as f64));

    errors.finish()
}

fn plan_summary(plan: &TripPlanRequest) -> String {
    format!(
        "Trip plan received:\n\
         • Name: {}\n\
         • Address: {}\n\
         • City: {}\n\
         • Phone: {}\n\
         • Destination: {}\n\
         • Query: {}\n\
         • Budget: ₹{}\n\
         • Days: {}",
        plan.name,
        plan.address,
        plan.city,
        plan.phone,
        plan.destination,
        plan.query,
        plan.budget,
        plan.days
    )
}

fn whatsapp_url(phone: &str, plan: &TripPlanRequest) -> Result<String, ApiError> {
    let text = format!(
        "New Trip Plan Request!\n\n\
         Name: {}\n\
         Phone: {}\n\
         City: {}\n\
         Destination: {}\n\
         Budget: ₹{}\n\
         Days: {}\n\
         Query: {}",
        plan.name, plan.phone, plan.city, plan.destination, plan.budget, plan.days, plan.query
    );

    let mut url = reqwest::Url::parse("https://wa.me/")
        .map_err(|e| ApiError::internal(format!("Invalid WhatsApp base URL: {}", e)))?;
    url.set_path(&phone.replace('+', ""));
    url.query_pairs_mut().append_pair("text", &text);
    Ok(url.into())
}

/// Record a trip-plan request and hand back a WhatsApp deep link
pub async fn submit_plan(
    State(state): State<Arc<AppState>>,
    Json(plan): Json<TripPlanRequest>,
) -> Result<Json<TripPlanResponse>, ApiError> {
    validate_plan(&plan)?;

    let user_email = state
        .sessions()
        .resolve_user_email(plan.token.as_deref())
        .await;
    let session_id = plan
        .session_id
        .clone()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| format!("sess_{}", Utc::now().timestamp_millis()));

    let summary = plan_summary(&plan);
    chat::log_message(
        &state.db,
        &session_id,
        user_email.as_deref(),
        ChatRole::Planner,
        &summary,
    )
    .await?;

    let whatsapp_url = whatsapp_url(&state.config.chat.whatsapp_phone, &plan)?;
    tracing::info!(session_id = %session_id, destination = %plan.destination, "Trip plan received");

    Ok(Json(TripPlanResponse {
        session_id,
        summary,
        whatsapp_url,
        message: "Trip plan received! Click the WhatsApp link to contact us.".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> TripPlanRequest {
        TripPlanRequest {
            name: "Asha".to_string(),
            address: "12 MG Road".to_string(),
            city: "Pune".to_string(),
            phone: "+91 98765 43210".to_string(),
            destination: "Lonavala".to_string(),
            query: "Family of four".to_string(),
            budget: 15000.0,
            days: 2,
            session_id: None,
            token: None,
        }
    }

    #[test]
    fn test_plan_validation() {
        assert!(validate_plan(&plan()).is_ok());

        let mut bad = plan();
        bad.city = " ".to_string();
        bad.budget = 0.0;
        bad.days = 0;
        let err = validate_plan(&bad).unwrap_err();
        assert!(err.to_string().contains("3 fields"));
    }

    #[test]
    fn test_whatsapp_url_strips_plus_and_encodes_text() {
        let url = whatsapp_url("+919876543210", &plan()).unwrap();
        assert!(url.starts_with("https://wa.me/919876543210?text="));
        assert!(url.contains("Lonavala"));
        assert!(!url.contains('\n'));
    }

    #[test]
    fn test_summary_lists_every_field() {
        let summary = plan_summary(&plan());
        assert!(summary.starts_with("Trip plan received:"));
        for needle in ["Asha", "12 MG Road", "Pune", "Lonavala", "Family of four", "Days: 2"] {
            assert!(summary.contains(needle), "missing {}", needle);
        }
    }
}
