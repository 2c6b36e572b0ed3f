//! Session issuance, resolution and revocation.
//!
//! Tokens are 256 random bits, base64url encoded. Only their SHA-256 digest
//! is stored, so a leaked sessions table does not yield usable tokens.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Datelike, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use super::password::{hash_password, verify_password_or_dummy};
use super::{is_unique_violation, AuthError, Identity};
use crate::db::{self, DbPool, Session, User, UserProfile};

/// Attempts at inserting a session before giving up on token collisions
const ISSUE_ATTEMPTS: usize = 3;

/// Generate a random token
pub(crate) fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Hash a token for storage
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Result of a successful user login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub token: String,
    pub email: String,
    pub full_name: Option<String>,
}

pub struct SessionAuthority<'a> {
    db: &'a DbPool,
    ttl: Option<chrono::TimeDelta>,
}

impl<'a> SessionAuthority<'a> {
    pub fn new(db: &'a DbPool, ttl: Option<chrono::TimeDelta>) -> Self {
        Self { db, ttl }
    }

    /// Create a user account. The caller has already validated the input.
    pub async fn register(
        &self,
        full_name: Option<&str>,
        email: &str,
        password: &str,
    ) -> Result<i64, AuthError> {
        let existing: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(self.db)
            .await?;
        if existing.is_some() {
            return Err(AuthError::Conflict("User with this email already exists"));
        }

        let password_hash = hash_password(password)?;
        let result = sqlx::query(
            "INSERT INTO users (full_name, email, password_hash, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(full_name)
        .bind(email)
        .bind(&password_hash)
        .bind(db::now())
        .execute(self.db)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AuthError::Conflict("User with this email already exists")
            } else {
                AuthError::Storage(e)
            }
        })?;

        info!(email = %email, "Registered user");
        Ok(result.last_insert_rowid())
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(self.db)
            .await?;

        // Unknown accounts still pay for one verification
        let verified =
            verify_password_or_dummy(password, user.as_ref().map(|u| u.password_hash.as_str()));
        let user = match user {
            Some(u) if verified => u,
            _ => {
                warn!(email = %email, "Failed login attempt");
                return Err(AuthError::InvalidCredentials);
            }
        };

        let token = self.issue(Some(&user.email), None).await?;
        info!(email = %user.email, "User logged in");

        Ok(LoginOutcome {
            token,
            email: user.email,
            full_name: user.full_name,
        })
    }

    /// Persist a new session for a user email or an admin username and
    /// return its token.
    pub(crate) async fn issue(
        &self,
        user_email: Option<&str>,
        admin_username: Option<&str>,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let expires_at = self.expiry_from(now).map(db::timestamp);

        let mut attempt = 0;
        loop {
            attempt += 1;
            let token = generate_token();
            let inserted = sqlx::query(
                "INSERT INTO sessions (user_email, admin_username, token_hash, created_at, expires_at)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(user_email)
            .bind(admin_username)
            .bind(hash_token(&token))
            .bind(db::timestamp(now))
            .bind(&expires_at)
            .execute(self.db)
            .await;

            match inserted {
                Ok(_) => return Ok(token),
                Err(e) if is_unique_violation(&e) && attempt < ISSUE_ATTEMPTS => {
                    warn!("Session token collision, regenerating");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Expiry for a session issued at `now`. A lifetime that runs past the
    /// four-digit-year range cannot be stored as sortable text and is
    /// treated as no expiry.
    fn expiry_from(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let ttl = self.ttl?;
        match now.checked_add_signed(ttl).filter(|at| at.year() <= 9999) {
            Some(at) => Some(at),
            None => {
                warn!("Session lifetime out of range, issuing a session without expiry");
                None
            }
        }
    }

    /// Delete the session for `token`, if any. Returns whether one existed.
    pub async fn logout(&self, token: &str) -> Result<bool, AuthError> {
        let result = sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
            .bind(hash_token(token))
            .execute(self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Look up a live session. Unknown or expired tokens resolve to `None`.
    pub async fn resolve(&self, token: &str) -> Result<Option<Identity>, AuthError> {
        if token.is_empty() {
            return Ok(None);
        }

        let session: Option<Session> = sqlx::query_as(
            "SELECT * FROM sessions WHERE token_hash = ? AND (expires_at IS NULL OR expires_at > ?)",
        )
        .bind(hash_token(token))
        .bind(db::now())
        .fetch_optional(self.db)
        .await?;

        Ok(session.and_then(|s| match (s.user_email, s.admin_username) {
            (Some(email), _) => Some(Identity::User { email }),
            (None, Some(username)) => Some(Identity::Admin { username }),
            (None, None) => None,
        }))
    }

    /// Best-effort attribution: storage problems are logged and treated as
    /// "no identity".
    pub async fn resolve_user_email(&self, token: Option<&str>) -> Option<String> {
        let token = token?;
        match self.resolve(token).await {
            Ok(identity) => identity.and_then(|i| i.user_email().map(str::to_string)),
            Err(e) => {
                warn!(error = %e, "Could not resolve session token");
                None
            }
        }
    }

    pub async fn whoami(&self, token: &str) -> Result<UserProfile, AuthError> {
        let email = match self.resolve(token).await? {
            Some(Identity::User { email }) => email,
            _ => return Err(AuthError::Unauthorized),
        };

        let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = ?")
            .bind(&email)
            .fetch_optional(self.db)
            .await?;

        user.map(UserProfile::from).ok_or(AuthError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_memory;
    use std::collections::HashSet;

    async fn authority_with_user(pool: &DbPool) -> SessionAuthority<'_> {
        let sessions = SessionAuthority::new(pool, None);
        sessions
            .register(Some("Alice"), "alice@example.com", "s3cret-pass")
            .await
            .unwrap();
        sessions
    }

    async fn session_count(pool: &DbPool) -> i64 {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sessions")
            .fetch_one(pool)
            .await
            .unwrap();
        count
    }

    #[test]
    fn test_token_shape() {
        let token = generate_token();
        // 32 bytes -> 43 base64url characters without padding
        assert_eq!(token.len(), 43);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_ne!(token, generate_token());
    }

    #[test]
    fn test_token_hash_is_stable() {
        assert_eq!(hash_token("abc"), hash_token("abc"));
        assert_ne!(hash_token("abc"), hash_token("abd"));
        assert_eq!(hash_token("abc").len(), 64);
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let pool = connect_memory().await.unwrap();
        let sessions = authority_with_user(&pool).await;
        let err = sessions
            .register(None, "alice@example.com", "other")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_login_issues_resolvable_token() {
        let pool = connect_memory().await.unwrap();
        let sessions = authority_with_user(&pool).await;

        let outcome = sessions.login("alice@example.com", "s3cret-pass").await.unwrap();
        assert_eq!(outcome.email, "alice@example.com");
        assert_eq!(outcome.full_name.as_deref(), Some("Alice"));

        let profile = sessions.whoami(&outcome.token).await.unwrap();
        assert_eq!(profile.email, "alice@example.com");
    }

    #[tokio::test]
    async fn test_each_login_gets_fresh_token() {
        let pool = connect_memory().await.unwrap();
        let sessions = authority_with_user(&pool).await;

        let mut tokens = HashSet::new();
        for _ in 0..5 {
            let outcome = sessions.login("alice@example.com", "s3cret-pass").await.unwrap();
            assert!(tokens.insert(outcome.token));
        }
        assert_eq!(session_count(&pool).await, 5);
    }

    #[tokio::test]
    async fn test_bad_login_is_uniform() {
        let pool = connect_memory().await.unwrap();
        let sessions = authority_with_user(&pool).await;

        let wrong_password = sessions
            .login("alice@example.com", "nope")
            .await
            .unwrap_err();
        let unknown_email = sessions
            .login("mallory@example.com", "s3cret-pass")
            .await
            .unwrap_err();
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
        assert!(matches!(unknown_email, AuthError::InvalidCredentials));
        assert_eq!(session_count(&pool).await, 0);
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let pool = connect_memory().await.unwrap();
        let sessions = authority_with_user(&pool).await;
        let outcome = sessions.login("alice@example.com", "s3cret-pass").await.unwrap();

        assert!(sessions.logout(&outcome.token).await.unwrap());
        assert!(!sessions.logout(&outcome.token).await.unwrap());
        assert_eq!(session_count(&pool).await, 0);
        assert!(matches!(
            sessions.whoami(&outcome.token).await,
            Err(AuthError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_unknown_token_resolves_to_none() {
        let pool = connect_memory().await.unwrap();
        let sessions = SessionAuthority::new(&pool, None);
        assert_eq!(sessions.resolve("no-such-token").await.unwrap(), None);
        assert_eq!(sessions.resolve("").await.unwrap(), None);
        assert_eq!(sessions.resolve_user_email(Some("no-such-token")).await, None);
        assert_eq!(sessions.resolve_user_email(None).await, None);
    }

    #[tokio::test]
    async fn test_expired_session_is_ignored() {
        let pool = connect_memory().await.unwrap();
        authority_with_user(&pool).await;
        let expiring = SessionAuthority::new(&pool, Some(chrono::TimeDelta::seconds(-1)));

        let outcome = expiring.login("alice@example.com", "s3cret-pass").await.unwrap();
        assert_eq!(expiring.resolve(&outcome.token).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_session_with_ttl_is_live_before_expiry() {
        let pool = connect_memory().await.unwrap();
        authority_with_user(&pool).await;
        let expiring = SessionAuthority::new(&pool, Some(chrono::TimeDelta::hours(1)));

        let outcome = expiring.login("alice@example.com", "s3cret-pass").await.unwrap();
        assert_eq!(
            expiring.resolve(&outcome.token).await.unwrap(),
            Some(Identity::User {
                email: "alice@example.com".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_huge_ttl_issues_session_without_expiry() {
        let pool = connect_memory().await.unwrap();
        authority_with_user(&pool).await;
        let sessions = SessionAuthority::new(&pool, Some(chrono::TimeDelta::MAX));

        let outcome = sessions.login("alice@example.com", "s3cret-pass").await.unwrap();
        assert!(sessions.resolve(&outcome.token).await.unwrap().is_some());

        let (expires_at,): (Option<String>,) =
            sqlx::query_as("SELECT expires_at FROM sessions")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert!(expires_at.is_none());
    }

    #[tokio::test]
    async fn test_admin_session_is_not_a_user() {
        let pool = connect_memory().await.unwrap();
        let sessions = SessionAuthority::new(&pool, None);
        let token = sessions.issue(None, Some("admin")).await.unwrap();

        assert_eq!(
            sessions.resolve(&token).await.unwrap(),
            Some(Identity::Admin {
                username: "admin".to_string()
            })
        );
        assert!(matches!(
            sessions.whoami(&token).await,
            Err(AuthError::Unauthorized)
        ));
        assert_eq!(sessions.resolve_user_email(Some(&token)).await, None);
    }
}
