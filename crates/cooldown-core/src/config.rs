//! Centralized configuration for the cooldown policy engine.
//!
//! Defaults live in [`PolicyDefaults`]; the effective runtime values live in
//! [`PolicyConfig`], which static configuration fills in and the process
//! environment may override at startup (`MIN_AGE_HOURS`,
//! `MIN_WEEKLY_DOWNLOADS`).

use crate::error::{CooldownError, Result};
use std::time::Duration;

/// Environment variable overriding the minimum version age, in hours.
pub const ENV_MIN_AGE_HOURS: &str = "MIN_AGE_HOURS";

/// Environment variable overriding the minimum weekly download count.
pub const ENV_MIN_WEEKLY_DOWNLOADS: &str = "MIN_WEEKLY_DOWNLOADS";

/// Built-in policy defaults.
pub struct PolicyDefaults;

impl PolicyDefaults {
    /// Versions younger than this are hidden from metadata.
    pub const MIN_AGE_HOURS: u32 = 72;
    /// Packages below this weekly download count are rejected outright.
    pub const MIN_WEEKLY_DOWNLOADS: u64 = 5000;
    /// How long a fetched download count stays valid.
    pub const DOWNLOADS_CACHE_TTL: Duration = Duration::from_secs(5 * 60);
    /// Timeout for outbound requests (stats endpoint, upstream metadata).
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
    /// Default upstream registry.
    pub const REGISTRY_URL: &'static str = "https://registry.npmjs.org";
    /// Default download-statistics endpoint.
    pub const STATS_URL: &'static str = "https://api.npmjs.org";
    /// User agent sent on outbound requests.
    pub const USER_AGENT: &'static str = concat!("cooldown/", env!("CARGO_PKG_VERSION"));
}

/// Effective policy configuration.
#[derive(Debug, Clone)]
pub struct PolicyConfig {
    /// Minimum publish age, in hours, before a version becomes visible.
    pub min_age_hours: u32,
    /// Minimum weekly downloads; 0 disables the popularity gate.
    pub min_weekly_downloads: u64,
    /// Package names (or trailing-`*` prefix patterns) exempt from all checks.
    pub allow: Vec<String>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            min_age_hours: PolicyDefaults::MIN_AGE_HOURS,
            min_weekly_downloads: PolicyDefaults::MIN_WEEKLY_DOWNLOADS,
            allow: Vec::new(),
        }
    }
}

impl PolicyConfig {
    /// Apply process-environment overrides. The environment always wins over
    /// whatever static configuration produced `self`.
    pub fn apply_env(self) -> Result<Self> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Same as [`apply_env`](Self::apply_env), but with an injected lookup so
    /// precedence is testable without mutating the process environment.
    pub fn apply_env_from(mut self, get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(raw) = get(ENV_MIN_AGE_HOURS) {
            self.min_age_hours = raw.trim().parse().map_err(|_| CooldownError::Config {
                message: format!("{} must be an integer, got {:?}", ENV_MIN_AGE_HOURS, raw),
            })?;
        }
        if let Some(raw) = get(ENV_MIN_WEEKLY_DOWNLOADS) {
            self.min_weekly_downloads = raw.trim().parse().map_err(|_| CooldownError::Config {
                message: format!(
                    "{} must be an integer, got {:?}",
                    ENV_MIN_WEEKLY_DOWNLOADS, raw
                ),
            })?;
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_overrides_static_values() {
        let config = PolicyConfig {
            min_age_hours: 24,
            min_weekly_downloads: 100,
            allow: Vec::new(),
        };

        let config = config
            .apply_env_from(|key| match key {
                ENV_MIN_AGE_HOURS => Some("48".to_string()),
                ENV_MIN_WEEKLY_DOWNLOADS => Some("9000".to_string()),
                _ => None,
            })
            .unwrap();

        assert_eq!(config.min_age_hours, 48);
        assert_eq!(config.min_weekly_downloads, 9000);
    }

    #[test]
    fn test_absent_env_keeps_static_values() {
        let config = PolicyConfig::default().apply_env_from(|_| None).unwrap();
        assert_eq!(config.min_age_hours, PolicyDefaults::MIN_AGE_HOURS);
        assert_eq!(
            config.min_weekly_downloads,
            PolicyDefaults::MIN_WEEKLY_DOWNLOADS
        );
    }

    #[test]
    fn test_unparsable_env_is_an_error() {
        let result = PolicyConfig::default().apply_env_from(|key| {
            (key == ENV_MIN_AGE_HOURS).then(|| "soon".to_string())
        });
        assert!(result.is_err());
    }
}
