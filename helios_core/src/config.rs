//! Environment-driven configuration.
//!
//! Everything has an in-code default; `HELIOS_*` variables override.

use crate::http::HttpClientConfig;
use crate::models::VendorKind;
use crate::scheduler::{RestrictedWindow, SchedulerConfig};
use crate::{Error, Result};
use chrono::{FixedOffset, NaiveTime};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HeliosConfig {
    pub scheduler: SchedulerConfig,
    pub http: HttpClientConfig,
    /// Per-vendor API base URL overrides; adapters fall back to their
    /// vendor-specific default when unset.
    pub solarman_api_base: Option<String>,
    pub growatt_api_base: Option<String>,
}

impl Default for HeliosConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            http: HttpClientConfig::default(),
            solarman_api_base: None,
            growatt_api_base: None,
        }
    }
}

impl HeliosConfig {
    #[tracing::instrument(level = "debug")]
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("HELIOS_SCHEDULER_ENABLED") {
            config.scheduler.enabled = parse_bool("HELIOS_SCHEDULER_ENABLED", &v)?;
        }
        if let Ok(v) = std::env::var("HELIOS_RESTRICTED_WINDOW_START") {
            config.scheduler.window.start = parse_time("HELIOS_RESTRICTED_WINDOW_START", &v)?;
        }
        if let Ok(v) = std::env::var("HELIOS_RESTRICTED_WINDOW_END") {
            config.scheduler.window.end = parse_time("HELIOS_RESTRICTED_WINDOW_END", &v)?;
        }
        if let Ok(v) = std::env::var("HELIOS_TIMEZONE_OFFSET_MINUTES") {
            let minutes: i32 = v.parse().map_err(|_| {
                Error::Configuration(format!(
                    "HELIOS_TIMEZONE_OFFSET_MINUTES must be an integer, got '{v}'"
                ))
            })?;
            config.scheduler.timezone = FixedOffset::east_opt(minutes * 60).ok_or_else(|| {
                Error::Configuration(format!("timezone offset {minutes} minutes is out of range"))
            })?;
        }

        if let Ok(v) = std::env::var("HELIOS_HTTP_TIMEOUT_SECS") {
            config.http.request_timeout = Duration::from_secs(parse_u64("HELIOS_HTTP_TIMEOUT_SECS", &v)?);
        }
        if let Ok(v) = std::env::var("HELIOS_HTTP_MAX_IDLE_PER_HOST") {
            config.http.pool_max_idle_per_host =
                parse_u64("HELIOS_HTTP_MAX_IDLE_PER_HOST", &v)? as usize;
        }

        config.solarman_api_base = std::env::var("HELIOS_SOLARMAN_API_BASE").ok();
        config.growatt_api_base = std::env::var("HELIOS_GROWATT_API_BASE").ok();

        Ok(config)
    }

    /// Configured base-URL override for a vendor kind, if any.
    pub fn api_base_override(&self, kind: VendorKind) -> Option<&str> {
        match kind {
            VendorKind::Solarman => self.solarman_api_base.as_deref(),
            VendorKind::Growatt => self.growatt_api_base.as_deref(),
        }
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::Configuration(format!(
            "{name} must be a boolean, got '{other}'"
        ))),
    }
}

fn parse_time(name: &str, value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|_| Error::Configuration(format!("{name} must be HH:MM, got '{value}'")))
}

fn parse_u64(name: &str, value: &str) -> Result<u64> {
    value
        .parse()
        .map_err(|_| Error::Configuration(format!("{name} must be an integer, got '{value}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_everything() {
        let config = HeliosConfig::default();
        assert!(config.scheduler.enabled);
        assert_eq!(
            config.scheduler.window.start,
            NaiveTime::from_hms_opt(19, 0, 0).unwrap()
        );
        assert_eq!(
            config.scheduler.window.end,
            NaiveTime::from_hms_opt(6, 0, 0).unwrap()
        );
        assert!(config.api_base_override(VendorKind::Solarman).is_none());
    }

    #[test]
    fn window_times_parse_as_hh_mm() {
        assert_eq!(
            parse_time("X", "19:00").unwrap(),
            NaiveTime::from_hms_opt(19, 0, 0).unwrap()
        );
        assert!(parse_time("X", "7pm").is_err());
    }
}
