//! Input validation for API requests.
//!
//! Validators return `Err(message)` for the offending field; handlers collect
//! them with `ValidationErrorBuilder::check` from the `error` module.

use lazy_static::lazy_static;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::ApiError;

lazy_static! {
    /// Deliberately loose: one `@`, no whitespace, a dot in the domain part
    static ref EMAIL_REGEX: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();

    /// Digits with optional leading `+` and common separators
    static ref PHONE_REGEX: Regex = Regex::new(r"^\+?[0-9][0-9 ()-]*$").unwrap();
}

const MAX_EMAIL_LEN: usize = 254;
const MIN_PHONE_LEN: usize = 6;

pub fn validate_email(email: &str) -> Result<(), String> {
    if email.trim().is_empty() {
        return Err("Email is required".to_string());
    }
    if email.len() > MAX_EMAIL_LEN {
        return Err("Email is too long".to_string());
    }
    if !EMAIL_REGEX.is_match(email) {
        return Err("Invalid email format".to_string());
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }
    Ok(())
}

/// A free-text field that must contain something other than whitespace
pub fn validate_required(label: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} is required", label));
    }
    Ok(())
}

pub fn validate_phone(phone: &str) -> Result<(), String> {
    let phone = phone.trim();
    if phone.len() < MIN_PHONE_LEN {
        return Err(format!(
            "Phone number must be at least {} characters",
            MIN_PHONE_LEN
        ));
    }
    if !PHONE_REGEX.is_match(phone) {
        return Err("Invalid phone number".to_string());
    }
    Ok(())
}

pub fn validate_positive(label: &str, value: f64) -> Result<(), String> {
    if value.is_nan() || value <= 0.0 {
        return Err(format!("{} must be greater than zero", label));
    }
    Ok(())
}

/// Decode the entity payload of an admin request. Called after the admin
/// pair has been verified so that malformed bodies from unauthenticated
/// callers are still answered with 401.
pub fn parse_payload<T: DeserializeOwned>(payload: Option<Value>, key: &str) -> Result<T, ApiError> {
    let Some(value) = payload.filter(|v| !v.is_null()) else {
        return Err(ApiError::validation_field(key, format!("{} payload is required", key)));
    };
    serde_json::from_value(value)
        .map_err(|e| ApiError::validation_field(key, format!("Invalid {} payload: {}", key, e)))
}
