//! Common types and helpers shared across models.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A list-shaped field as submitted by clients: either a native JSON array
/// or the legacy comma-separated string form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ListInput {
    Items(Vec<String>),
    Csv(String),
}

impl ListInput {
    pub fn into_items(self) -> Vec<String> {
        match self {
            ListInput::Items(items) => items,
            ListInput::Csv(text) => split_csv(&text),
        }
    }

    /// Storage form of the list
    pub fn encode(self) -> String {
        encode_list(&self.into_items())
    }
}

/// Split a comma-separated string, trimming items and dropping empty ones.
pub fn split_csv(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Serialize a list of strings to the flat text form stored in list columns.
pub fn encode_list(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

/// Decode a text column for read responses. Strings that look like JSON
/// arrays or objects are parsed; anything else is returned unchanged.
pub fn decode_text_column(raw: &str) -> Value {
    let trimmed = raw.trim_start();
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        if let Ok(value) = serde_json::from_str(raw) {
            return value;
        }
    }
    Value::String(raw.to_string())
}

pub fn decode_optional_column(raw: Option<&str>) -> Value {
    raw.map(decode_text_column).unwrap_or(Value::Null)
}

pub fn flag_to_int(flag: bool) -> i64 {
    if flag {
        1
    } else {
        0
    }
}
