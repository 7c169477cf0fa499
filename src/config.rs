use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ResetTokenConfig {
    pub secret: String,
    pub issuer: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub ttl_minutes: i64,
    pub secure_cookies: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub reset_token: ResetTokenConfig,
    pub session: SessionConfig,
    pub monthly_budget: f64,
    pub avatar_dir: String,
    pub public_base_url: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://journal.db?mode=rwc".into());
        let reset_token = ResetTokenConfig {
            secret: std::env::var("RESET_TOKEN_SECRET").context("RESET_TOKEN_SECRET must be set")?,
            issuer: std::env::var("RESET_TOKEN_ISSUER").unwrap_or_else(|_| "budget-journal".into()),
        };
        let session = SessionConfig {
            ttl_minutes: std::env::var("SESSION_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24),
            secure_cookies: std::env::var("SECURE_COOKIES")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        };
        let monthly_budget = std::env::var("MONTHLY_BUDGET")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|b| b.is_finite())
            .unwrap_or(1000.0);
        Ok(Self {
            database_url,
            reset_token,
            session,
            monthly_budget,
            avatar_dir: std::env::var("AVATAR_DIR").unwrap_or_else(|_| "uploads".into()),
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".into()),
        })
    }
}
