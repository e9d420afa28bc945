use serde::{Deserialize, Serialize};
use std::env;

use crate::error::MandatoError;

pub const DEFAULT_JWT_SECRET: &str = "mandato-pro-dev-secret";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub documents_dir: String,
    pub pagination: PaginationConfig,
    pub messaging: MessagingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    pub default_per_page: usize,
    pub max_per_page: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagingConfig {
    /// Base URL of the WhatsApp/SMS/e-mail gateway; unset means log-only
    pub gateway_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_per_page: 10,
            max_per_page: 100,
        }
    }
}

impl AppConfig {
    /// Defaults, then `mandato.toml` (or `$MANDATO_CONFIG`), then `MANDATO_*`
    /// environment variables. Nested keys use `__`, e.g.
    /// `MANDATO_PAGINATION__MAX_PER_PAGE`.
    pub fn load() -> Result<Self, MandatoError> {
        let file = env::var("MANDATO_CONFIG").unwrap_or_else(|_| "mandato.toml".to_string());

        let settings = config::Config::builder()
            .set_default("database_url", "sqlite://mandato.db")?
            .set_default("server_host", "0.0.0.0")?
            .set_default("server_port", 3000)?
            .set_default("jwt_secret", DEFAULT_JWT_SECRET)?
            .set_default("token_ttl_hours", 12)?
            .set_default("documents_dir", "./documentos")?
            .set_default("pagination.default_per_page", 10)?
            .set_default("pagination.max_per_page", 100)?
            .set_default("messaging.timeout_secs", 10)?
            .add_source(config::File::with_name(&file).required(false))
            .add_source(
                config::Environment::with_prefix("MANDATO")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MandatoError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(MandatoError::ConfigError("jwt_secret must not be empty".to_string()));
        }

        if self.server_port == 0 {
            return Err(MandatoError::ConfigError("server_port must not be 0".to_string()));
        }

        if self.token_ttl_hours <= 0 {
            return Err(MandatoError::ConfigError(format!(
                "token_ttl_hours ({}) must be positive",
                self.token_ttl_hours
            )));
        }

        if self.pagination.default_per_page == 0
            || self.pagination.default_per_page > self.pagination.max_per_page
        {
            return Err(MandatoError::ConfigError(format!(
                "pagination.default_per_page ({}) must be between 1 and max_per_page ({})",
                self.pagination.default_per_page, self.pagination.max_per_page
            )));
        }

        Ok(())
    }

    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }

    /// Configuration suitable for tests: in-memory database, log-only gateway
    pub fn for_tests(documents_dir: &str) -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            server_host: "127.0.0.1".to_string(),
            server_port: 3000,
            jwt_secret: "test-secret".to_string(),
            token_ttl_hours: 1,
            documents_dir: documents_dir.to_string(),
            pagination: PaginationConfig::default(),
            messaging: MessagingConfig {
                gateway_url: None,
                timeout_secs: 5,
            },
        }
    }
}

impl From<config::ConfigError> for MandatoError {
    fn from(err: config::ConfigError) -> Self {
        MandatoError::ConfigError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::for_tests("/tmp/docs");
        assert!(config.validate().is_ok());

        config.pagination.default_per_page = 500;
        assert!(config.validate().is_err());

        let mut config = AppConfig::for_tests("/tmp/docs");
        config.jwt_secret = "  ".to_string();
        assert!(config.validate().is_err());
    }
}
