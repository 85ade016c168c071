use std::env;
use std::str::FromStr;

use url::Url;

use crate::services::entry_service::PrepaymentSplit;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    /// Base of the messaging deep link, e.g. `https://wa.me/`.
    pub share_base_url: String,
    pub prepayment_split: PrepaymentSplit,
    pub admin_username: String,
    pub admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        let config = Self {
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidPort)?,
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://data/beton.db".to_string()),
            jwt_secret: env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?,
            jwt_expiration_hours: env::var("JWT_EXPIRATION_HOURS")
                .unwrap_or_else(|_| "12".to_string())
                .parse()
                .map_err(|_| ConfigError::Invalid("JWT_EXPIRATION_HOURS"))?,
            share_base_url: env::var("SHARE_BASE_URL")
                .unwrap_or_else(|_| "https://wa.me/".to_string()),
            prepayment_split: env::var("PREPAYMENT_SPLIT")
                .map(|v| PrepaymentSplit::from_str(&v))
                .unwrap_or(Ok(PrepaymentSplit::Even))
                .map_err(|_| ConfigError::Invalid("PREPAYMENT_SPLIT"))?,
            admin_username: env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string()),
            admin_password: env::var("ADMIN_PASSWORD").ok().filter(|p| !p.is_empty()),
        };

        Url::parse(&config.share_base_url).map_err(|_| ConfigError::Invalid("SHARE_BASE_URL"))?;

        Ok(config)
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid port number")]
    InvalidPort,
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{0} has an invalid value")]
    Invalid(&'static str),
}
