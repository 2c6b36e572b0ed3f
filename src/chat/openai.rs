//! OpenAI-compatible chat completions backend.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{ChatRole, ChatTurn, ReplyGenerator};

const SYSTEM_PROMPT: &str = "You are a helpful travel and car rental assistant for a website. \
Help users choose cars and picnic destinations around India. \
Be concise and friendly. Prices are in INR unless stated.";

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<CompletionMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct CompletionMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiReplies {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiReplies {
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            client,
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

fn build_messages<'a>(history: &'a [ChatTurn], message: &'a str) -> Vec<CompletionMessage<'a>> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(CompletionMessage {
        role: "system",
        content: SYSTEM_PROMPT,
    });
    for turn in history {
        let role = match turn.role {
            ChatRole::Assistant => "assistant",
            ChatRole::User => "user",
            ChatRole::Planner => continue,
        };
        messages.push(CompletionMessage {
            role,
            content: &turn.content,
        });
    }
    messages.push(CompletionMessage {
        role: "user",
        content: message,
    });
    messages
}

#[async_trait]
impl ReplyGenerator for OpenAiReplies {
    async fn reply(&self, history: &[ChatTurn], message: &str) -> Result<String> {
        let request = CompletionRequest {
            model: &self.model,
            messages: build_messages(history, message),
            temperature: 0.4,
            max_tokens: 300,
        };

        let response: CompletionResponse = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Completion request failed")?
            .error_for_status()
            .context("Completion backend returned an error")?
            .json()
            .await
            .context("Invalid completion response")?;

        Ok(response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}
