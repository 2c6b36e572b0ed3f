pub mod api;
pub mod auth;
pub mod chat;
pub mod config;
pub mod db;
pub mod patch;

pub use db::DbPool;

use config::Config;
use std::sync::Arc;

use crate::auth::{AdminGate, SessionAuthority};
use crate::chat::ReplyGenerator;

/// Shared handler state. The pool is the only connection handle in the
/// process; every request borrows from it.
pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub replies: Arc<dyn ReplyGenerator>,
}

impl AppState {
    pub fn new(config: Config, db: DbPool) -> Self {
        let replies = chat::generator_from_config(&config.chat);
        Self {
            config,
            db,
            replies,
        }
    }

    /// Swap the chat backend
    pub fn with_replies(mut self, replies: Arc<dyn ReplyGenerator>) -> Self {
        self.replies = replies;
        self
    }

    pub fn sessions(&self) -> SessionAuthority<'_> {
        SessionAuthority::new(&self.db, self.config.auth.session_ttl())
    }

    pub fn admins(&self) -> AdminGate<'_> {
        AdminGate::new(&self.db)
    }
}
