//! Chat assistant: message logging and pluggable reply generation.

mod openai;

pub use openai::OpenAiReplies;

use anyhow::Result;
use async_trait::async_trait;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::ChatConfig;
use crate::db::{self, ChatLog, DbPool};

/// Longest reply returned to the client, in characters
pub const MAX_REPLY_CHARS: usize = 1200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
    Planner,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
            ChatRole::Planner => "planner",
        }
    }
}

impl FromStr for ChatRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "user" => Ok(ChatRole::User),
            "assistant" => Ok(ChatRole::Assistant),
            "planner" => Ok(ChatRole::Planner),
            other => anyhow::bail!("Unknown chat role: {}", other),
        }
    }
}

/// One prior message given to a generator as context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

/// Produces the assistant's reply to a message
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    async fn reply(&self, history: &[ChatTurn], message: &str) -> Result<String>;
}

/// Keyword-matched canned replies, used when no completion backend is
/// configured or the backend fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleReplies;

impl RuleReplies {
    pub fn answer(message: &str) -> String {
        let text = message.trim().to_lowercase();
        let reply = if ["hello", "hi", "hey"].iter().any(|k| text.contains(k)) {
            "Hi! How can I help you with cars or picnic destinations today?"
        } else if text.contains("car") && text.contains("price") {
            "Our car prices vary by model; you can view details on the car page."
        } else if text.contains("spot") || text.contains("destination") {
            "Browse our destinations for photos, descriptions, and starting prices."
        } else {
            "Thanks for your message! We'll get back with more details."
        };
        reply.to_string()
    }
}

#[async_trait]
impl ReplyGenerator for RuleReplies {
    async fn reply(&self, _history: &[ChatTurn], message: &str) -> Result<String> {
        Ok(Self::answer(message))
    }
}

/// Pick the reply generator for a configuration
pub fn generator_from_config(config: &ChatConfig) -> Arc<dyn ReplyGenerator> {
    match config.api_key() {
        Some(key) => {
            tracing::info!(model = %config.openai_model, "Chat replies use completion backend");
            Arc::new(OpenAiReplies::new(
                key,
                config.openai_model.clone(),
                config.openai_base_url.clone(),
            ))
        }
        None => {
            tracing::info!("No completion API key configured, chat uses canned replies");
            Arc::new(RuleReplies)
        }
    }
}

/// Ask the generator, falling back to canned replies on failure
pub async fn generate_reply(
    generator: &dyn ReplyGenerator,
    history: &[ChatTurn],
    message: &str,
) -> String {
    match generator.reply(history, message).await {
        Ok(reply) if !reply.trim().is_empty() => truncate_chars(&reply, MAX_REPLY_CHARS),
        Ok(_) => RuleReplies::answer(message),
        Err(e) => {
            tracing::warn!(error = %e, "Reply generation failed, using canned reply");
            RuleReplies::answer(message)
        }
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

pub async fn log_message(
    pool: &DbPool,
    session_id: &str,
    user_email: Option<&str>,
    role: ChatRole,
    message: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO chat_logs (session_id, user_email, role, message, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(session_id)
    .bind(user_email)
    .bind(role.as_str())
    .bind(message)
    .bind(db::now())
    .execute(pool)
    .await?;
    Ok(())
}

/// The last `limit` messages of a session, oldest first
pub async fn history(pool: &DbPool, session_id: &str, limit: i64) -> Result<Vec<ChatLog>, sqlx::Error> {
    let mut rows: Vec<ChatLog> = sqlx::query_as(
        "SELECT session_id, user_email, role, message, created_at FROM chat_logs
         WHERE session_id = ? ORDER BY id DESC LIMIT ?",
    )
    .bind(session_id)
    .bind(limit.max(0))
    .fetch_all(pool)
    .await?;
    rows.reverse();
    Ok(rows)
}

/// Recent user/assistant turns of a session for generator context
pub async fn recent_turns(
    pool: &DbPool,
    session_id: &str,
    window: i64,
) -> Result<Vec<ChatTurn>, sqlx::Error> {
    let turns = history(pool, session_id, window)
        .await?
        .into_iter()
        .filter_map(|log| {
            let role: ChatRole = log.role.parse().ok()?;
            (role != ChatRole::Planner).then_some(ChatTurn {
                role,
                content: log.message,
            })
        })
        .collect();
    Ok(turns)
}
