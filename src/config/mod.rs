use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Directory with the site's HTML/JS pages
    #[serde(default = "default_public_dir")]
    pub public_dir: PathBuf,
    /// Directory served under /images
    #[serde(default = "default_images_dir")]
    pub images_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            data_dir: default_data_dir(),
            public_dir: default_public_dir(),
            images_dir: default_images_dir(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_public_dir() -> PathBuf {
    PathBuf::from("./public")
}

fn default_images_dir() -> PathBuf {
    PathBuf::from("./images")
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Session lifetime in hours. Unset means sessions live until logout.
    #[serde(default)]
    pub session_ttl_hours: Option<u64>,
    /// Username of the admin created when the admin table is empty
    #[serde(default = "default_bootstrap_admin")]
    pub bootstrap_admin_username: String,
    /// Password for the bootstrap admin (generated and logged once if unset)
    #[serde(default)]
    pub bootstrap_admin_password: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_hours: None,
            bootstrap_admin_username: default_bootstrap_admin(),
            bootstrap_admin_password: None,
        }
    }
}

/// Longest accepted session lifetime, one hundred years
pub const MAX_SESSION_TTL_HOURS: u64 = 24 * 365 * 100;

impl AuthConfig {
    pub fn session_ttl(&self) -> Option<chrono::TimeDelta> {
        self.session_ttl_hours
            .filter(|h| *h <= MAX_SESSION_TTL_HOURS)
            .and_then(|h| i64::try_from(h).ok())
            .and_then(chrono::TimeDelta::try_hours)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(hours) = self.session_ttl_hours {
            if hours > MAX_SESSION_TTL_HOURS {
                bail!(
                    "auth.session_ttl_hours must be at most {} (got {})",
                    MAX_SESSION_TTL_HOURS,
                    hours
                );
            }
        }
        Ok(())
    }
}

fn default_bootstrap_admin() -> String {
    "admin".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// API key for an OpenAI-compatible completion endpoint. Falls back to
    /// the OPENAI_API_KEY environment variable; without a key the assistant
    /// answers from canned replies.
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,
    /// Phone number trip plans are forwarded to over WhatsApp
    #[serde(default)]
    pub whatsapp_phone: String,
    /// Number of prior messages sent to the completion model as context
    #[serde(default = "default_history_window")]
    pub history_window: i64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_model: default_openai_model(),
            openai_base_url: default_openai_base_url(),
            whatsapp_phone: String::new(),
            history_window: default_history_window(),
        }
    }
}

impl ChatConfig {
    pub fn api_key(&self) -> Option<String> {
        self.openai_api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
    }
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_history_window() -> i64 {
    8
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config =
                toml::from_str(&content).with_context(|| "Failed to parse configuration file")?;
            config.auth.validate()?;
            Ok(config)
        } else {
            info!("No config file found, using defaults");
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.auth.bootstrap_admin_username, "admin");
        assert!(config.auth.session_ttl().is_none());
        assert_eq!(config.chat.history_window, 8);
    }

    #[test]
    fn test_session_ttl_from_hours() {
        let config: Config = toml::from_str(
            r#"
            [auth]
            session_ttl_hours = 48
            "#,
        )
        .unwrap();
        assert_eq!(config.auth.session_ttl(), Some(chrono::TimeDelta::hours(48)));
        assert!(config.auth.validate().is_ok());
    }

    #[test]
    fn test_out_of_range_session_ttl_is_rejected() {
        let config: Config = toml::from_str(
            r#"
            [auth]
            session_ttl_hours = 10000000000
            "#,
        )
        .unwrap();
        assert!(config.auth.validate().is_err());
        assert!(config.auth.session_ttl().is_none());

        let path = std::env::temp_dir().join(format!(
            "wayfarer-ttl-{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "[auth]\nsession_ttl_hours = 10000000000\n").unwrap();
        let loaded = Config::load(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(loaded.is_err());
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            port = 8088
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 8088);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.logging.level, "info");
    }
}
