//! Runtime configuration read from the environment
//!
//! Values come from process environment variables, optionally seeded from a
//! `.env` file by `dotenvy` in `main`. Every field has a default so the
//! service starts with no configuration at all (OAuth login will simply fail
//! until the Google credentials are set).

use chrono::Duration;
use std::env;

/// Credentials for the Google authorization-code flow
#[derive(Debug, Clone, Default)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Must match the redirect URI registered with Google
    pub callback_url: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Port the HTTP server binds to on all interfaces
    pub port: u16,

    /// Path of the redb database file
    pub database_url: String,

    /// Lifetime of a login session
    pub session_ttl: Duration,

    /// Take the client IP from `X-Forwarded-For` instead of the socket peer
    pub trust_proxy: bool,

    /// Add the `Secure` attribute to cookies (enable behind HTTPS)
    pub cookie_secure: bool,

    pub google: GoogleConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            database_url: "data.db".to_string(),
            session_ttl: Duration::hours(24),
            trust_proxy: false,
            cookie_secure: false,
            google: GoogleConfig {
                callback_url: "http://localhost:8080/auth/google/callback".to_string(),
                ..GoogleConfig::default()
            },
        }
    }
}

impl Config {
    /// Builds the configuration from environment variables, falling back to
    /// [`Config::default`] for anything unset or unparsable.
    ///
    /// - `PORT`, `DATABASE_URL`, `SESSION_TTL_HOURS`
    /// - `TRUST_PROXY`, `COOKIE_SECURE` (`true`/`1` to enable)
    /// - `GOOGLE_CLIENT_ID`, `GOOGLE_CLIENT_SECRET`, `GOOGLE_CALLBACK_URL`
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let session_ttl = env::var("SESSION_TTL_HOURS")
            .ok()
            .and_then(|hours| hours.parse::<i64>().ok())
            .filter(|hours| *hours > 0)
            .map(Duration::hours)
            .unwrap_or(defaults.session_ttl);

        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|port| port.parse().ok())
                .unwrap_or(defaults.port),
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            session_ttl,
            trust_proxy: env_flag("TRUST_PROXY"),
            cookie_secure: env_flag("COOKIE_SECURE"),
            google: GoogleConfig {
                client_id: env::var("GOOGLE_CLIENT_ID").unwrap_or_default(),
                client_secret: env::var("GOOGLE_CLIENT_SECRET").unwrap_or_default(),
                callback_url: env::var("GOOGLE_CALLBACK_URL")
                    .unwrap_or(defaults.google.callback_url),
            },
        }
    }
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|value| matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}
