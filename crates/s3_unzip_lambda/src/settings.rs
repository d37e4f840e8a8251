use std::time::Duration;

use thiserror::Error;

use crate::handlers::config::ConfigCachePolicy;
use crate::handlers::processor::{FailurePolicy, ProcessorOptions};
use crate::runtime::contract::DEFAULT_ENDPOINT_CONFIG_KEY;

pub const ENDPOINT_CONFIG_KEY_VAR: &str = "ENDPOINT_CONFIG_KEY";
pub const CONFIG_CACHE_VAR: &str = "CONFIG_CACHE";
pub const FAILURE_POLICY_VAR: &str = "FAILURE_POLICY";
pub const DELIVERY_TIMEOUT_VAR: &str = "DELIVERY_TIMEOUT_SECS";
pub const OBJECT_FETCH_TIMEOUT_VAR: &str = "OBJECT_FETCH_TIMEOUT_SECS";
pub const LOG_LEVEL_VAR: &str = "LOG_LEVEL";

const DEFAULT_DELIVERY_TIMEOUT_SECS: u64 = 30;
const DEFAULT_OBJECT_FETCH_TIMEOUT_SECS: u64 = 60;
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid value `{value}` for {name}: {reason}")]
pub struct SettingsError {
    pub name: &'static str,
    pub value: String,
    pub reason: String,
}

/// Function settings, read once per cold start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeSettings {
    pub config_key: String,
    pub cache_policy: ConfigCachePolicy,
    pub failure_policy: FailurePolicy,
    pub delivery_timeout: Duration,
    pub object_fetch_timeout: Duration,
    pub log_level: String,
}

impl RuntimeSettings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds settings from an arbitrary variable source. Unset or blank
    /// variables fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SettingsError> {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let cache_policy = match read(CONFIG_CACHE_VAR) {
            Some(value) => value.parse::<ConfigCachePolicy>().map_err(|reason| SettingsError {
                name: CONFIG_CACHE_VAR,
                value,
                reason,
            })?,
            None => ConfigCachePolicy::default(),
        };

        let failure_policy = match read(FAILURE_POLICY_VAR) {
            Some(value) => value.parse::<FailurePolicy>().map_err(|reason| SettingsError {
                name: FAILURE_POLICY_VAR,
                value,
                reason,
            })?,
            None => FailurePolicy::default(),
        };

        Ok(Self {
            config_key: read(ENDPOINT_CONFIG_KEY_VAR)
                .map(|value| value.trim().to_string())
                .unwrap_or_else(|| DEFAULT_ENDPOINT_CONFIG_KEY.to_string()),
            cache_policy,
            failure_policy,
            delivery_timeout: parse_timeout(
                DELIVERY_TIMEOUT_VAR,
                read(DELIVERY_TIMEOUT_VAR),
                DEFAULT_DELIVERY_TIMEOUT_SECS,
            )?,
            object_fetch_timeout: parse_timeout(
                OBJECT_FETCH_TIMEOUT_VAR,
                read(OBJECT_FETCH_TIMEOUT_VAR),
                DEFAULT_OBJECT_FETCH_TIMEOUT_SECS,
            )?,
            log_level: read(LOG_LEVEL_VAR).unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        })
    }

    pub fn processor_options(&self) -> ProcessorOptions {
        ProcessorOptions {
            config_key: self.config_key.clone(),
            cache_policy: self.cache_policy,
            failure_policy: self.failure_policy,
        }
    }
}

fn parse_timeout(
    name: &'static str,
    value: Option<String>,
    default_secs: u64,
) -> Result<Duration, SettingsError> {
    let Some(value) = value else {
        return Ok(Duration::from_secs(default_secs));
    };

    match value.trim().parse::<u64>() {
        Ok(0) => Err(SettingsError {
            name,
            value,
            reason: "timeout must be at least one second".to_string(),
        }),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(error) => Err(SettingsError {
            name,
            value,
            reason: error.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn settings_from(vars: &[(&str, &str)]) -> Result<RuntimeSettings, SettingsError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        RuntimeSettings::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let settings = settings_from(&[]).expect("defaults should be valid");

        assert_eq!(settings.config_key, "sumo-endpoint-config.json");
        assert_eq!(settings.cache_policy, ConfigCachePolicy::PerRecord);
        assert_eq!(settings.failure_policy, FailurePolicy::FailFast);
        assert_eq!(settings.delivery_timeout, Duration::from_secs(30));
        assert_eq!(settings.object_fetch_timeout, Duration::from_secs(60));
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn reads_overrides() {
        let settings = settings_from(&[
            (ENDPOINT_CONFIG_KEY_VAR, "config/endpoint.json"),
            (CONFIG_CACHE_VAR, "per-entry"),
            (FAILURE_POLICY_VAR, "isolate"),
            (DELIVERY_TIMEOUT_VAR, "5"),
            (OBJECT_FETCH_TIMEOUT_VAR, " 12 "),
            (LOG_LEVEL_VAR, "debug"),
        ])
        .expect("overrides should be valid");

        let options = settings.processor_options();
        assert_eq!(options.config_key, "config/endpoint.json");
        assert_eq!(options.cache_policy, ConfigCachePolicy::PerEntry);
        assert_eq!(options.failure_policy, FailurePolicy::Isolate);
        assert_eq!(settings.delivery_timeout, Duration::from_secs(5));
        assert_eq!(settings.object_fetch_timeout, Duration::from_secs(12));
        assert_eq!(settings.log_level, "debug");
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let settings = settings_from(&[(CONFIG_CACHE_VAR, "  "), (ENDPOINT_CONFIG_KEY_VAR, "")])
            .expect("blank values should be ignored");

        assert_eq!(settings.cache_policy, ConfigCachePolicy::PerRecord);
        assert_eq!(settings.config_key, DEFAULT_ENDPOINT_CONFIG_KEY);
    }

    #[test]
    fn rejects_unknown_policy() {
        let error = settings_from(&[(FAILURE_POLICY_VAR, "retry")])
            .expect_err("unknown policy should fail");

        assert_eq!(error.name, FAILURE_POLICY_VAR);
        assert_eq!(error.value, "retry");
    }

    #[test]
    fn rejects_zero_and_non_numeric_timeouts() {
        let zero = settings_from(&[(DELIVERY_TIMEOUT_VAR, "0")]).expect_err("zero should fail");
        assert!(zero.reason.contains("at least one second"));

        let text = settings_from(&[(OBJECT_FETCH_TIMEOUT_VAR, "soon")])
            .expect_err("text should fail");
        assert_eq!(text.name, OBJECT_FETCH_TIMEOUT_VAR);
    }
}
