use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

/// Organization identity used in outbound email texts.
#[derive(Debug, Deserialize, Clone)]
pub struct SiteConfig {
    pub name: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub website: String,
    pub system_sender: String,
    pub default_cover_image: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RelayConfig {
    pub endpoint: String,
    pub membership_endpoint: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub web: WebConfig,
    pub site: SiteConfig,
    pub relay: RelayConfig,
    pub autosave_delay_ms: u64,
    // Overridden from the .env file
    pub database_path: String,
    pub allowed_origins: String,
    pub log_level: String,
    pub session_secret_key: String,
    pub admin_url_prefix: String,
    pub admin_email: String,
    pub admin_password_hash: String,
    pub relay_access_key: String,
    pub use_secure_cookies: bool,
}

fn required_var(name: &str) -> Result<String, config::ConfigError> {
    env::var(name).map_err(|_| {
        config::ConfigError::Message(format!(
            "FATAL: Environment variable '{}' is not set in your .env file.",
            name
        ))
    })
}

impl Config {
    pub fn from_env(env_path: &Path) -> Result<Self, config::ConfigError> {
        dotenvy::from_path(env_path).map_err(|e| {
            config::ConfigError::Message(format!(
                "FATAL: Failed to load .env file from '{}'. Error: {}",
                env_path.display(),
                e
            ))
        })?;

        let database_path = required_var("DATABASE_PATH")?;
        let session_secret_key = required_var("SESSION_SECRET_KEY")?;
        let admin_url_prefix = required_var("ADMIN_URL_PREFIX")?;
        let admin_email = required_var("ADMIN_EMAIL")?;
        let admin_password_hash = required_var("ADMIN_PASSWORD_HASH")?;

        // 128 hex characters (64 bytes), the minimum cookie key length.
        if session_secret_key.len() != 128 || !session_secret_key.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(config::ConfigError::Message(
                "FATAL: 'SESSION_SECRET_KEY' must be 128 hexadecimal characters long (64 bytes).".to_string(),
            ));
        }

        if admin_url_prefix.is_empty()
            || !admin_url_prefix.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-')
        {
            return Err(config::ConfigError::Message(
                "FATAL: 'ADMIN_URL_PREFIX' must not be empty and can only contain letters, numbers, underscores, and hyphens.".to_string(),
            ));
        }

        if !admin_password_hash.starts_with("$2") {
            return Err(config::ConfigError::Message(
                "FATAL: 'ADMIN_PASSWORD_HASH' must be a bcrypt hash. Generate one with 'setup_cli admin hash-password'.".to_string(),
            ));
        }

        if Path::new(&database_path).is_relative() {
            return Err(config::ConfigError::Message(format!(
                "FATAL: The 'DATABASE_PATH' in your .env file is a relative path ('{}'). It MUST be an absolute path.",
                database_path
            )));
        }

        let allowed_origins = env::var("ALLOWED_ORIGINS").unwrap_or_default();
        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        // Without a key the relay calls are skipped and only logged.
        let relay_access_key = env::var("RELAY_ACCESS_KEY").unwrap_or_default();
        let use_secure_cookies = env::var("USE_SECURE_COOKIES")
            .unwrap_or_else(|_| "false".to_string())
            .parse::<bool>()
            .unwrap_or(false);

        let builder = config::Config::builder()
            // Web host/port, site identity, relay endpoints, autosave delay.
            .add_source(config::File::new("config/default.toml", config::FileFormat::Toml))
            .set_override("database_path", database_path)?
            .set_override("session_secret_key", session_secret_key)?
            .set_override("allowed_origins", allowed_origins)?
            .set_override("log_level", log_level)?
            .set_override("use_secure_cookies", use_secure_cookies)?
            .set_override("admin_url_prefix", admin_url_prefix)?
            .set_override("admin_email", admin_email)?
            .set_override("admin_password_hash", admin_password_hash)?
            .set_override("relay_access_key", relay_access_key)?
            .build()?;

        builder.try_deserialize()
    }

    /// The content store file, inside its own folder.
    pub fn content_db_path(&self) -> PathBuf {
        PathBuf::from(&self.database_path)
            .join("content")
            .join("content.db")
    }
}
