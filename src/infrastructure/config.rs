use std::env;
use thiserror::Error;
use tracing::{info, warn};

const DEFAULT_FRONTEND_URL: &str = "http://localhost:7777";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:4444";
const DEFAULT_MAIL_FROM: &str = "no-reply@storefront.local";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required configuration: {0}")]
    Missing(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app_secret: String,
    pub frontend_url: String,
    pub bind_addr: String,
    pub mail_from: String,
}

impl AppConfig {
    /// Reads configuration from the process environment (and `.env`, if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        if dotenv::dotenv().is_err() {
            info!("No .env file found, using process environment only");
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let app_secret = lookup("APP_SECRET")
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing("APP_SECRET"))?;

        let frontend_url = lookup("FRONTEND_URL").unwrap_or_else(|| {
            warn!(default = DEFAULT_FRONTEND_URL, "FRONTEND_URL not set, using default");
            DEFAULT_FRONTEND_URL.to_string()
        });
        if !frontend_url.starts_with("http://") && !frontend_url.starts_with("https://") {
            return Err(ConfigError::Invalid(format!(
                "FRONTEND_URL must be an http(s) URL, got {}",
                frontend_url
            )));
        }
        let frontend_url = frontend_url.trim_end_matches('/').to_string();

        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let mail_from = lookup("MAIL_FROM").unwrap_or_else(|| DEFAULT_MAIL_FROM.to_string());

        Ok(Self {
            app_secret,
            frontend_url,
            bind_addr,
            mail_from,
        })
    }
}
