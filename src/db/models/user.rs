//! User, admin and session models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    /// Unset for accounts registered before names were collected
    pub full_name: Option<String>,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: String,
}

/// Public view of a user, without the password hash
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub full_name: Option<String>,
    pub email: String,
    pub created_at: String,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            full_name: user.full_name,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Admin {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
}

/// A stored session. Exactly one of `user_email` / `admin_username` is set.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: i64,
    pub user_email: Option<String>,
    pub admin_username: Option<String>,
    pub token_hash: String,
    pub created_at: String,
    pub expires_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub full_name: Option<String>,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    pub email: String,
    pub full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: UserProfile,
}

/// A username/password pair submitted in a request body
#[derive(Clone, Deserialize)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct AdminOnlyRequest {
    pub admin: Option<AdminCredentials>,
}

#[derive(Debug, Deserialize)]
pub struct CreateAdminRequest {
    pub admin: Option<AdminCredentials>,
    pub new_admin: AdminCredentials,
}

#[derive(Debug, Deserialize)]
pub struct ChangeAdminPasswordRequest {
    pub admin: Option<AdminCredentials>,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct AdminLoginResponse {
    pub message: String,
    pub token: String,
}

/// Generic acknowledgement body
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Acknowledgement for create endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub message: String,
    pub id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_drops_hash() {
        let user = User {
            id: 7,
            full_name: Some("Alice".to_string()),
            email: "alice@example.com".to_string(),
            password_hash: "$argon2id$...".to_string(),
            created_at: "2024-01-01T00:00:00Z".to_string(),
        };
        let json = serde_json::to_value(UserProfile::from(user)).unwrap();
        assert_eq!(json["email"], "alice@example.com");
        assert!(json.get("password_hash").is_none());
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let creds = AdminCredentials {
            username: "root".to_string(),
            password: "hunter2".to_string(),
        };
        let printed = format!("{:?}", creds);
        assert!(printed.contains("root"));
        assert!(!printed.contains("hunter2"));
    }
}
