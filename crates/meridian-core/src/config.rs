//! Settings for the API server and the archival worker, read from the
//! environment (and `.env` when present).

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, ensure, Context};
use chrono_tz::Tz;

use crate::constants::DEFAULT_ARCHIVE_INTERVAL_SECS;

const DEFAULT_PORT: u16 = 4000;
const DEFAULT_DB_POOL_SIZE: u32 = 20;
const DEFAULT_DB_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SIGNED_URL_TTL_SECS: u64 = 900;
const DEFAULT_MAX_UPLOAD_MB: usize = 25;
const MIN_JWT_SECRET_LEN: usize = 32;

#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub jwt_secret: String,
    /// Base64-encoded 32-byte key sealing integration tokens
    pub encryption_key: String,
    pub storage_path: String,
    pub storage_base_url: String,
    pub signed_url_ttl_secs: u64,
    pub max_upload_size_bytes: usize,
    pub archive_enabled: bool,
    /// Seconds between in-process archiver passes; 0 turns the loop off
    pub archive_interval_secs: u64,
    /// Zone for meeting times when the organisation has none recorded
    pub default_timezone: Tz,
}

/// Reads settings through a lookup function so tests need not touch the
/// process environment.
struct Settings<F> {
    lookup: F,
}

impl<F> Settings<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn raw(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.trim().is_empty())
    }

    fn required(&self, name: &str) -> anyhow::Result<String> {
        self.raw(name)
            .with_context(|| format!("{} is not set", name))
    }

    fn parsed_or<T>(&self, name: &str, default: T) -> anyhow::Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.raw(name) {
            None => Ok(default),
            Some(value) => value
                .trim()
                .parse()
                .map_err(|e| anyhow::anyhow!("{}={:?} is invalid: {}", name, value, e)),
        }
    }

    fn flag(&self, name: &str, default: bool) -> anyhow::Result<bool> {
        match self.raw(name).map(|v| v.trim().to_ascii_lowercase()) {
            None => Ok(default),
            Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
            Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
            Some(v) => bail!("{}={:?} is not a boolean", name, v),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds and validates a config from any name-to-value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let settings = Settings { lookup };

        let environment = settings
            .raw("ENVIRONMENT")
            .or_else(|| settings.raw("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let cors_origins = settings
            .raw("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(String::from)
            .collect();

        let zone_name = settings
            .raw("DEFAULT_TIMEZONE")
            .unwrap_or_else(|| "UTC".to_string());
        let default_timezone = zone_name
            .parse::<Tz>()
            .map_err(|_| anyhow::anyhow!("DEFAULT_TIMEZONE {:?} is not an IANA zone", zone_name))?;

        let server_port = settings.parsed_or("PORT", DEFAULT_PORT)?;
        let upload_mb: usize = settings.parsed_or("MAX_UPLOAD_SIZE_MB", DEFAULT_MAX_UPLOAD_MB)?;

        let config = Config {
            server_port,
            environment,
            cors_origins,
            database_url: settings.required("DATABASE_URL")?,
            db_max_connections: settings.parsed_or("DB_MAX_CONNECTIONS", DEFAULT_DB_POOL_SIZE)?,
            db_timeout_seconds: settings.parsed_or("DB_TIMEOUT_SECONDS", DEFAULT_DB_TIMEOUT_SECS)?,
            jwt_secret: settings.required("JWT_SECRET")?,
            encryption_key: settings.required("ENCRYPTION_KEY")?,
            storage_path: settings.required("STORAGE_PATH")?,
            storage_base_url: settings
                .raw("STORAGE_BASE_URL")
                .unwrap_or_else(|| format!("http://localhost:{}/api/v1/files", server_port)),
            signed_url_ttl_secs: settings
                .parsed_or("SIGNED_URL_TTL_SECS", DEFAULT_SIGNED_URL_TTL_SECS)?,
            max_upload_size_bytes: upload_mb.saturating_mul(1024 * 1024),
            archive_enabled: settings.flag("ARCHIVE_ENABLED", true)?,
            archive_interval_secs: settings
                .parsed_or("ARCHIVE_INTERVAL_SECS", DEFAULT_ARCHIVE_INTERVAL_SECS)?,
            default_timezone,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.jwt_secret.len() >= MIN_JWT_SECRET_LEN,
            "JWT_SECRET needs at least {} characters",
            MIN_JWT_SECRET_LEN
        );
        ensure!(
            ["postgres://", "postgresql://"]
                .iter()
                .any(|scheme| self.database_url.starts_with(scheme)),
            "DATABASE_URL must be a postgres:// connection string"
        );
        ensure!(
            !(self.is_production() && self.cors_origins.iter().any(|o| o == "*")),
            "CORS_ORIGINS must list explicit origins in production"
        );
        ensure!(
            self.max_upload_size_bytes > 0,
            "MAX_UPLOAD_SIZE_MB must be positive"
        );
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        matches!(
            self.environment.to_ascii_lowercase().as_str(),
            "production" | "prod"
        )
    }

    pub fn signed_url_ttl(&self) -> Duration {
        Duration::from_secs(self.signed_url_ttl_secs)
    }

    /// Archiver loop interval; `None` when the in-process loop is disabled.
    pub fn archive_interval(&self) -> Option<Duration> {
        if !self.archive_enabled || self.archive_interval_secs == 0 {
            return None;
        }
        Some(Duration::from_secs(self.archive_interval_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            server_port: 4000,
            environment: "development".to_string(),
            cors_origins: vec!["*".to_string()],
            database_url: "postgres://localhost/meridian".to_string(),
            db_max_connections: 5,
            db_timeout_seconds: 5,
            jwt_secret: "a-secret-that-is-at-least-32-characters".to_string(),
            encryption_key: "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=".to_string(),
            storage_path: "/tmp/meridian".to_string(),
            storage_base_url: "http://localhost:4000/api/v1/files".to_string(),
            signed_url_ttl_secs: 900,
            max_upload_size_bytes: 1024,
            archive_enabled: true,
            archive_interval_secs: 300,
            default_timezone: chrono_tz::UTC,
        }
    }

    #[test]
    fn test_validate_accepts_development_config() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_short_jwt_secret() {
        let mut c = config();
        c.jwt_secret = "short".to_string();
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_wildcard_cors_in_production() {
        let mut c = config();
        c.environment = "production".to_string();
        assert!(c.validate().is_err());
        c.cors_origins = vec!["https://app.example.com".to_string()];
        assert!(c.validate().is_ok());
    }

    fn lookup<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |name| {
            pairs
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
        }
    }

    const REQUIRED: [(&str, &str); 4] = [
        ("DATABASE_URL", "postgres://localhost/meridian"),
        ("JWT_SECRET", "a-secret-that-is-at-least-32-characters"),
        ("ENCRYPTION_KEY", "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA="),
        ("STORAGE_PATH", "/tmp/meridian"),
    ];

    #[test]
    fn test_defaults_fill_in_optional_settings() {
        let c = Config::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(c.server_port, 4000);
        assert_eq!(c.environment, "development");
        assert_eq!(c.cors_origins, vec!["*"]);
        assert_eq!(c.storage_base_url, "http://localhost:4000/api/v1/files");
        assert_eq!(c.max_upload_size_bytes, 25 * 1024 * 1024);
        assert_eq!(c.default_timezone, chrono_tz::UTC);
        assert!(c.archive_enabled);
    }

    #[test]
    fn test_overrides_are_parsed() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("PORT", "8080"),
            ("CORS_ORIGINS", "https://a.example, https://b.example,"),
            ("DEFAULT_TIMEZONE", "Asia/Kolkata"),
            ("ARCHIVE_ENABLED", "off"),
            ("MAX_UPLOAD_SIZE_MB", "2"),
        ]);
        let c = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(c.server_port, 8080);
        assert_eq!(c.cors_origins, vec!["https://a.example", "https://b.example"]);
        assert_eq!(c.default_timezone, chrono_tz::Asia::Kolkata);
        assert!(!c.archive_enabled);
        assert_eq!(c.storage_base_url, "http://localhost:8080/api/v1/files");
        assert_eq!(c.max_upload_size_bytes, 2 * 1024 * 1024);
    }

    #[test]
    fn test_missing_or_malformed_settings_fail() {
        let err = Config::from_lookup(lookup(&REQUIRED[1..])).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));

        for bad in [("PORT", "eighty"), ("DEFAULT_TIMEZONE", "Mars/Olympus"), ("ARCHIVE_ENABLED", "maybe")] {
            let mut pairs = REQUIRED.to_vec();
            pairs.push(bad);
            assert!(Config::from_lookup(lookup(&pairs)).is_err(), "{:?}", bad);
        }
    }

    #[test]
    fn test_archive_interval_disabled() {
        let mut c = config();
        assert_eq!(c.archive_interval(), Some(Duration::from_secs(300)));
        c.archive_interval_secs = 0;
        assert_eq!(c.archive_interval(), None);
        c.archive_interval_secs = 60;
        c.archive_enabled = false;
        assert_eq!(c.archive_interval(), None);
    }
}
