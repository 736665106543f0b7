use std::time::Duration;

use chrono_tz::Tz;
use meridian_core::Config;

/// Service-level knobs derived from [`Config`].
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// Used when an organisation has no valid timezone.
    pub default_timezone: Tz,
    pub signed_url_ttl: Duration,
    pub max_upload_bytes: usize,
}

impl ServiceSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            default_timezone: config.default_timezone,
            signed_url_ttl: config.signed_url_ttl(),
            max_upload_bytes: config.max_upload_size_bytes,
        }
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            default_timezone: chrono_tz::UTC,
            signed_url_ttl: Duration::from_secs(900),
            max_upload_bytes: 25 * 1024 * 1024,
        }
    }
}
