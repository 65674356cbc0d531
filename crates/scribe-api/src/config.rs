//! Process configuration.
//!
//! [`AppConfig`] is read from the environment once at startup and handed to
//! the components that need it. Nothing else reads environment variables.

use std::path::PathBuf;

use scribe_core::defaults::{SESSION_SECRET_MIN_LEN, SESSION_TTL_HOURS};
use scribe_core::{Error, Result};

pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost/scribe";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_MEDIA_DIR: &str = "./media";
pub const DEFAULT_MEDIA_PUBLIC_URL: &str = "http://localhost:3000/media";
pub const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000";
pub const DEFAULT_LOG_FILTER: &str = "scribe_api=debug,tower_http=debug";

/// Whole-request ceiling: room for several maximum-size attachments.
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 110 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub session: SessionConfig,
    pub media: MediaConfig,
    pub allowed_origins: Vec<String>,
    pub rate_limit: RateLimitConfig,
    pub max_request_bytes: usize,
    pub log: LogConfig,
}

#[derive(Clone)]
pub struct SessionConfig {
    pub secret: String,
    pub ttl_hours: i64,
    pub cookie_secure: bool,
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("secret", &"[REDACTED]")
            .field("ttl_hours", &self.ttl_hours)
            .field("cookie_secure", &self.cookie_secure)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaConfig {
    Filesystem {
        dir: PathBuf,
        public_url: String,
    },
    Http {
        upload_url: String,
        upload_preset: Option<String>,
        destroy_url: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub requests: u32,
    pub period_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// "json" or "text".
    pub format: String,
    pub file: Option<String>,
    pub ansi: Option<bool>,
}

fn parse_bool(v: &str) -> bool {
    v == "true" || v == "1"
}

impl AppConfig {
    /// Build from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        fn parse<T: std::str::FromStr>(key: &str, value: Option<String>, default: T) -> Result<T> {
            match value {
                None => Ok(default),
                Some(v) => v
                    .trim()
                    .parse()
                    .map_err(|_| Error::Config(format!("{} has an invalid value: {:?}", key, v))),
            }
        }

        let secret = get("SESSION_SECRET")
            .ok_or_else(|| Error::Config("SESSION_SECRET must be set".into()))?;
        if secret.len() < SESSION_SECRET_MIN_LEN {
            return Err(Error::Config(format!(
                "SESSION_SECRET must be at least {} bytes",
                SESSION_SECRET_MIN_LEN
            )));
        }
        let ttl_hours = parse("SESSION_TTL_HOURS", get("SESSION_TTL_HOURS"), SESSION_TTL_HOURS)?;
        if ttl_hours <= 0 {
            return Err(Error::Config("SESSION_TTL_HOURS must be positive".into()));
        }

        let media = match get("MEDIA_BACKEND").as_deref().unwrap_or("filesystem") {
            "filesystem" => MediaConfig::Filesystem {
                dir: PathBuf::from(get("MEDIA_DIR").unwrap_or_else(|| DEFAULT_MEDIA_DIR.into())),
                public_url: get("MEDIA_PUBLIC_URL")
                    .unwrap_or_else(|| DEFAULT_MEDIA_PUBLIC_URL.into()),
            },
            "http" => MediaConfig::Http {
                upload_url: get("MEDIA_UPLOAD_URL").ok_or_else(|| {
                    Error::Config("MEDIA_UPLOAD_URL must be set when MEDIA_BACKEND=http".into())
                })?,
                upload_preset: get("MEDIA_UPLOAD_PRESET"),
                destroy_url: get("MEDIA_DESTROY_URL"),
            },
            other => {
                return Err(Error::Config(format!(
                    "MEDIA_BACKEND must be \"filesystem\" or \"http\", got {:?}",
                    other
                )))
            }
        };

        let rate_limit = RateLimitConfig {
            enabled: get("RATE_LIMIT_ENABLED").map(|v| parse_bool(&v)).unwrap_or(true),
            requests: parse("RATE_LIMIT_REQUESTS", get("RATE_LIMIT_REQUESTS"), 100)?,
            period_secs: parse("RATE_LIMIT_PERIOD_SECS", get("RATE_LIMIT_PERIOD_SECS"), 60)?,
        };
        if rate_limit.enabled && (rate_limit.requests == 0 || rate_limit.period_secs == 0) {
            return Err(Error::Config(
                "RATE_LIMIT_REQUESTS and RATE_LIMIT_PERIOD_SECS must be non-zero".into(),
            ));
        }

        let allowed_origins = get("ALLOWED_ORIGINS")
            .unwrap_or_else(|| DEFAULT_ALLOWED_ORIGINS.into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.into()),
            database_max_connections: parse(
                "DATABASE_MAX_CONNECTIONS",
                get("DATABASE_MAX_CONNECTIONS"),
                scribe_db::pool::DEFAULT_MAX_CONNECTIONS,
            )?,
            host: get("HOST").unwrap_or_else(|| DEFAULT_HOST.into()),
            port: parse("PORT", get("PORT"), DEFAULT_PORT)?,
            session: SessionConfig {
                secret,
                ttl_hours,
                cookie_secure: get("COOKIE_SECURE").map(|v| parse_bool(&v)).unwrap_or(false),
            },
            media,
            allowed_origins,
            rate_limit,
            max_request_bytes: parse(
                "MAX_REQUEST_BYTES",
                get("MAX_REQUEST_BYTES"),
                DEFAULT_MAX_REQUEST_BYTES,
            )?,
            log: LogConfig {
                format: get("LOG_FORMAT").unwrap_or_else(|| "text".into()),
                file: get("LOG_FILE"),
                ansi: get("LOG_ANSI").map(|v| parse_bool(&v)),
            },
        })
    }
}
