//! Admin authorization gate and dual-control admin account management.

use anyhow::Context;
use tracing::{info, warn};

use super::password::{hash_password, verify_password_or_dummy};
use super::session::{generate_token, SessionAuthority};
use super::{is_unique_violation, AuthError};
use crate::config::AuthConfig;
use crate::db::{Admin, AdminCredentials, DbPool};

const SELF_CHANGE_FORBIDDEN: &str = "Password change must be authorized by a different admin";

pub struct AdminGate<'a> {
    db: &'a DbPool,
}

impl<'a> AdminGate<'a> {
    pub fn new(db: &'a DbPool) -> Self {
        Self { db }
    }

    /// True iff the pair matches exactly one admin record. Unknown usernames
    /// and wrong passwords are indistinguishable to the caller.
    pub async fn verify(&self, username: &str, password: &str) -> Result<bool, AuthError> {
        let admin: Option<Admin> = sqlx::query_as("SELECT * FROM admin WHERE username = ?")
            .bind(username)
            .fetch_optional(self.db)
            .await?;

        Ok(verify_password_or_dummy(
            password,
            admin.as_ref().map(|a| a.password_hash.as_str()),
        ))
    }

    /// Precondition guard for every admin-scoped call
    pub async fn require(&self, credentials: Option<&AdminCredentials>) -> Result<(), AuthError> {
        let Some(creds) = credentials else {
            return Err(AuthError::Unauthorized);
        };
        if self.verify(&creds.username, &creds.password).await? {
            Ok(())
        } else {
            warn!(username = %creds.username, "Admin verification failed");
            Err(AuthError::Unauthorized)
        }
    }

    /// Verify the pair and open an admin session
    pub async fn login(
        &self,
        sessions: &SessionAuthority<'_>,
        credentials: &AdminCredentials,
    ) -> Result<String, AuthError> {
        if !self.verify(&credentials.username, &credentials.password).await? {
            warn!(username = %credentials.username, "Failed admin login attempt");
            return Err(AuthError::InvalidCredentials);
        }

        let token = sessions.issue(None, Some(&credentials.username)).await?;
        info!(username = %credentials.username, "Admin logged in");
        Ok(token)
    }

    pub async fn create_admin(
        &self,
        authorizer: Option<&AdminCredentials>,
        new_admin: &AdminCredentials,
    ) -> Result<(), AuthError> {
        self.require(authorizer).await?;

        if new_admin.username.trim().is_empty() {
            return Err(AuthError::Invalid("Admin username is required".to_string()));
        }
        if new_admin.password.is_empty() {
            return Err(AuthError::Invalid("Admin password is required".to_string()));
        }

        let existing: Option<(i64,)> = sqlx::query_as("SELECT id FROM admin WHERE username = ?")
            .bind(&new_admin.username)
            .fetch_optional(self.db)
            .await?;
        if existing.is_some() {
            return Err(AuthError::Conflict("Admin with this username already exists"));
        }

        let password_hash = hash_password(&new_admin.password)?;
        sqlx::query("INSERT INTO admin (username, password_hash) VALUES (?, ?)")
            .bind(&new_admin.username)
            .bind(&password_hash)
            .execute(self.db)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AuthError::Conflict("Admin with this username already exists")
                } else {
                    AuthError::Storage(e)
                }
            })?;

        info!(
            username = %new_admin.username,
            authorized_by = authorizer.map(|a| a.username.as_str()).unwrap_or_default(),
            "Created admin"
        );
        Ok(())
    }

    /// Overwrite another admin's password. An admin can never authorize a
    /// change to their own account; usernames are compared exactly.
    pub async fn change_password(
        &self,
        authorizer: Option<&AdminCredentials>,
        target_username: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        if let Some(creds) = authorizer {
            if creds.username == target_username {
                warn!(username = %target_username, "Rejected self-authorized admin password change");
                return Err(AuthError::Forbidden(SELF_CHANGE_FORBIDDEN));
            }
        }

        self.require(authorizer).await?;

        let target: Option<(i64,)> = sqlx::query_as("SELECT id FROM admin WHERE username = ?")
            .bind(target_username)
            .fetch_optional(self.db)
            .await?;
        if target.is_none() {
            return Err(AuthError::NotFound("Admin"));
        }

        if new_password.is_empty() {
            return Err(AuthError::Invalid("New password is required".to_string()));
        }

        let password_hash = hash_password(new_password)?;
        let result = sqlx::query("UPDATE admin SET password_hash = ? WHERE username = ?")
            .bind(&password_hash)
            .bind(target_username)
            .execute(self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AuthError::NotFound("Admin"));
        }

        info!(
            username = %target_username,
            authorized_by = authorizer.map(|a| a.username.as_str()).unwrap_or_default(),
            "Admin password changed"
        );
        Ok(())
    }
}

/// Make sure at least one admin exists. When the table is empty the
/// configured bootstrap admin is created; without a configured password a
/// random one is generated and logged once.
pub async fn ensure_bootstrap_admin(db: &DbPool, config: &AuthConfig) -> anyhow::Result<()> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM admin")
        .fetch_one(db)
        .await
        .context("Failed to count admins")?;
    if count > 0 {
        return Ok(());
    }

    let (password, generated) = match &config.bootstrap_admin_password {
        Some(p) if !p.is_empty() => (p.clone(), false),
        _ => (generate_token(), true),
    };

    let password_hash = hash_password(&password)
        .map_err(|e| anyhow::anyhow!("Failed to hash bootstrap admin password: {}", e))?;
    sqlx::query("INSERT INTO admin (username, password_hash) VALUES (?, ?)")
        .bind(&config.bootstrap_admin_username)
        .bind(&password_hash)
        .execute(db)
        .await
        .context("Failed to create bootstrap admin")?;

    if generated {
        warn!(
            username = %config.bootstrap_admin_username,
            "Created bootstrap admin with generated password: {}",
            password
        );
    } else {
        info!(username = %config.bootstrap_admin_username, "Created bootstrap admin");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Identity;
    use crate::db::connect_memory;

    fn creds(username: &str, password: &str) -> AdminCredentials {
        AdminCredentials {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    async fn pool_with_root() -> DbPool {
        let pool = connect_memory().await.unwrap();
        let config = AuthConfig {
            bootstrap_admin_password: Some("root-pass".to_string()),
            bootstrap_admin_username: "root".to_string(),
            ..AuthConfig::default()
        };
        ensure_bootstrap_admin(&pool, &config).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_bootstrap_runs_once() {
        let pool = pool_with_root().await;
        ensure_bootstrap_admin(&pool, &AuthConfig::default())
            .await
            .unwrap();
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM admin")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_verify_exact_pair_only() {
        let pool = pool_with_root().await;
        let gate = AdminGate::new(&pool);
        assert!(gate.verify("root", "root-pass").await.unwrap());
        assert!(!gate.verify("root", "Root-pass").await.unwrap());
        assert!(!gate.verify("Root", "root-pass").await.unwrap());
        assert!(!gate.verify("nobody", "root-pass").await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_authorizer_is_unauthorized() {
        let pool = pool_with_root().await;
        let gate = AdminGate::new(&pool);
        let err = gate
            .create_admin(None, &creds("ops", "ops-pass"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Unauthorized));
    }

    #[tokio::test]
    async fn test_create_admin_and_conflict() {
        let pool = pool_with_root().await;
        let gate = AdminGate::new(&pool);
        let root = creds("root", "root-pass");

        gate.create_admin(Some(&root), &creds("ops", "ops-pass"))
            .await
            .unwrap();
        assert!(gate.verify("ops", "ops-pass").await.unwrap());

        let err = gate
            .create_admin(Some(&root), &creds("ops", "other"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_create_admin_with_bad_authorizer_writes_nothing() {
        let pool = pool_with_root().await;
        let gate = AdminGate::new(&pool);
        let err = gate
            .create_admin(Some(&creds("root", "guess")), &creds("ops", "ops-pass"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Unauthorized));
        assert!(!gate.verify("ops", "ops-pass").await.unwrap());
    }

    #[tokio::test]
    async fn test_self_change_is_forbidden_even_with_bad_credentials() {
        let pool = pool_with_root().await;
        let gate = AdminGate::new(&pool);

        let valid = gate
            .change_password(Some(&creds("root", "root-pass")), "root", "new")
            .await
            .unwrap_err();
        let invalid = gate
            .change_password(Some(&creds("root", "wrong")), "root", "new")
            .await
            .unwrap_err();
        assert!(matches!(valid, AuthError::Forbidden(_)));
        assert!(matches!(invalid, AuthError::Forbidden(_)));
        assert!(gate.verify("root", "root-pass").await.unwrap());
    }

    #[tokio::test]
    async fn test_change_other_admin_password() {
        let pool = pool_with_root().await;
        let gate = AdminGate::new(&pool);
        let root = creds("root", "root-pass");
        gate.create_admin(Some(&root), &creds("ops", "ops-pass"))
            .await
            .unwrap();

        gate.change_password(Some(&root), "ops", "rotated")
            .await
            .unwrap();
        assert!(gate.verify("ops", "rotated").await.unwrap());
        assert!(!gate.verify("ops", "ops-pass").await.unwrap());

        // The changed admin can now act on the original one
        gate.change_password(Some(&creds("ops", "rotated")), "root", "root-2")
            .await
            .unwrap();
        assert!(gate.verify("root", "root-2").await.unwrap());
    }

    #[tokio::test]
    async fn test_change_missing_target_is_not_found() {
        let pool = pool_with_root().await;
        let gate = AdminGate::new(&pool);
        let err = gate
            .change_password(Some(&creds("root", "root-pass")), "ghost", "x")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::NotFound("Admin")));
    }

    #[tokio::test]
    async fn test_change_with_bad_credentials_is_unauthorized() {
        let pool = pool_with_root().await;
        let gate = AdminGate::new(&pool);
        let err = gate
            .change_password(Some(&creds("root", "wrong")), "ghost", "x")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Unauthorized));
    }

    #[tokio::test]
    async fn test_admin_login_opens_admin_session() {
        let pool = pool_with_root().await;
        let gate = AdminGate::new(&pool);
        let sessions = SessionAuthority::new(&pool, None);

        let token = gate
            .login(&sessions, &creds("root", "root-pass"))
            .await
            .unwrap();
        assert_eq!(
            sessions.resolve(&token).await.unwrap(),
            Some(Identity::Admin {
                username: "root".to_string()
            })
        );

        let err = gate
            .login(&sessions, &creds("root", "nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }
}
