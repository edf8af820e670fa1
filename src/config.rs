//! Configuration loaded from environment variables.

use std::env;

use anyhow::{Context, Result};
use tracing::warn;

use crate::models::PropertyStatus;

const DEV_JWT_SECRET: &str = "imoveis-dev-secret-change-me";

/// Defaults and limits used when normalizing search requests.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// City filter applied when the request names none.
    pub default_city: String,
    /// Status filter applied when the request names none.
    pub default_status: PropertyStatus,
    /// Page size when `limit` is absent or below 1.
    pub default_limit: i64,
    /// Hard cap on page size.
    pub max_limit: i64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_city: "Maceió".to_string(),
            default_status: PropertyStatus::Available,
            default_limit: 12,
            max_limit: 50,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// PostgreSQL connection URL. When absent the in-memory store is used.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub skip_migrations: bool,
    pub jwt_secret: String,
    pub token_ttl_days: i64,
    /// CORS allowed origins. Empty means permissive.
    pub allowed_origins: Vec<String>,
    /// Per-IP throttling of the login route.
    pub login_rate_limit: bool,
    pub search: SearchConfig,
}

fn flag(name: &str, default: bool) -> bool {
    env::var(name)
        .map(|v| {
            let v = v.trim().to_lowercase();
            v == "true" || v == "1"
        })
        .unwrap_or(default)
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("PORT must be a valid u16")?;

        let database_url = env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a valid u32")?;

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ if database_url.is_some() => {
                anyhow::bail!("JWT_SECRET must be set when DATABASE_URL is configured")
            }
            _ => {
                warn!("⚠️ JWT_SECRET not set, using the development secret");
                DEV_JWT_SECRET.to_string()
            }
        };

        let token_ttl_days = env::var("TOKEN_TTL_DAYS")
            .unwrap_or_else(|_| "365".to_string())
            .parse()
            .context("TOKEN_TTL_DAYS must be a whole number of days")?;

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty() && s != "*")
                    .collect()
            })
            .unwrap_or_default();

        let mut search = SearchConfig::default();
        if let Ok(city) = env::var("DEFAULT_CITY") {
            if !city.trim().is_empty() {
                search.default_city = city.trim().to_string();
            }
        }
        if let Ok(limit) = env::var("DEFAULT_PAGE_SIZE") {
            search.default_limit = limit
                .parse()
                .context("DEFAULT_PAGE_SIZE must be a number")?;
        }
        if let Ok(limit) = env::var("MAX_PAGE_SIZE") {
            search.max_limit = limit.parse().context("MAX_PAGE_SIZE must be a number")?;
        }
        if search.max_limit < 1 || search.default_limit < 1 {
            anyhow::bail!("page sizes must be at least 1");
        }
        search.default_limit = search.default_limit.min(search.max_limit);

        Ok(Self {
            host,
            port,
            database_url,
            database_max_connections,
            skip_migrations: flag("SKIP_MIGRATIONS", false),
            jwt_secret,
            token_ttl_days,
            allowed_origins,
            login_rate_limit: flag("LOGIN_RATE_LIMIT", true),
            search,
        })
    }
}
