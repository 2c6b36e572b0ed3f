//! Chat log models and assistant DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChatLog {
    pub session_id: String,
    pub user_email: Option<String>,
    pub role: String,
    pub message: String,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub message: String,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    pub user_email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub session_id: String,
    #[serde(default = "default_history_limit")]
    pub limit: i64,
}

fn default_history_limit() -> i64 {
    50
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub messages: Vec<ChatLog>,
}

#[derive(Debug, Deserialize)]
pub struct TripPlanRequest {
    pub name: String,
    pub address: String,
    pub city: String,
    pub phone: String,
    pub destination: String,
    #[serde(default)]
    pub query: String,
    pub budget: f64,
    pub days: i64,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TripPlanResponse {
    pub session_id: String,
    pub summary: String,
    pub whatsapp_url: String,
    pub message: String,
}
