//! Credential and session authority.
//!
//! Users prove identity with an email/password login and carry an opaque
//! bearer token afterwards. Admin-scoped operations re-verify an embedded
//! username/password pair on every call; changes to another admin's
//! credentials additionally require that the authorizing admin is not the
//! target (dual control).

pub mod admin;
pub mod password;
pub mod session;

pub use admin::{ensure_bootstrap_admin, AdminGate};
pub use session::{LoginOutcome, SessionAuthority};

use thiserror::Error;

/// Who a live session belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    User { email: String },
    Admin { username: String },
}

impl Identity {
    pub fn user_email(&self) -> Option<&str> {
        match self {
            Identity::User { email } => Some(email),
            Identity::Admin { .. } => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum AuthError {
    /// Bad login. Never says whether the account or the secret was wrong.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(&'static str),

    #[error("{0}")]
    Invalid(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Storage failure: {0}")]
    Storage(#[from] sqlx::Error),
}

impl From<argon2::password_hash::Error> for AuthError {
    fn from(err: argon2::password_hash::Error) -> Self {
        AuthError::Hashing(err.to_string())
    }
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}
