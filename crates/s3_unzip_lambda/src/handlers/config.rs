use std::collections::HashMap;
use std::str::FromStr;

use reqwest::Url;
use tracing::debug;

use crate::adapters::object_store::ObjectStore;
use crate::error::ProcessError;
use crate::runtime::contract::EndpointConfig;
use crate::runtime::UnzipError;

/// How long a resolved endpoint config may be reused before it is read again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigCachePolicy {
    /// Read the config object for every archive entry.
    PerEntry,
    /// Reuse the config for the remaining entries of the same notification record.
    #[default]
    PerRecord,
    /// Reuse the config per bucket until the invocation ends.
    PerInvocation,
}

impl ConfigCachePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PerEntry => "per-entry",
            Self::PerRecord => "per-record",
            Self::PerInvocation => "per-invocation",
        }
    }
}

impl FromStr for ConfigCachePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "per-entry" => Ok(Self::PerEntry),
            "per-record" => Ok(Self::PerRecord),
            "per-invocation" => Ok(Self::PerInvocation),
            other => Err(format!(
                "unknown config cache policy `{other}` (expected per-entry, per-record or per-invocation)"
            )),
        }
    }
}

/// Resolves the endpoint config stored next to each archive.
///
/// A resolver lives for one invocation; nothing it caches outlives it.
pub struct ConfigResolver<'a> {
    store: &'a dyn ObjectStore,
    config_key: &'a str,
    policy: ConfigCachePolicy,
    cache: HashMap<String, EndpointConfig>,
    resolutions: usize,
    fetches: usize,
}

impl<'a> ConfigResolver<'a> {
    pub fn new(store: &'a dyn ObjectStore, config_key: &'a str, policy: ConfigCachePolicy) -> Self {
        Self {
            store,
            config_key,
            policy,
            cache: HashMap::new(),
            resolutions: 0,
            fetches: 0,
        }
    }

    /// Marks the start of a new notification record.
    pub fn begin_record(&mut self) {
        if self.policy == ConfigCachePolicy::PerRecord {
            self.cache.clear();
        }
    }

    pub fn resolve(&mut self, bucket: &str) -> Result<EndpointConfig, ProcessError> {
        self.resolutions += 1;

        if let Some(config) = self.cache.get(bucket) {
            debug!(bucket, policy = self.policy.as_str(), "reusing endpoint config");
            return Ok(config.clone());
        }

        let config = self.fetch(bucket)?;
        if self.policy != ConfigCachePolicy::PerEntry {
            self.cache.insert(bucket.to_string(), config.clone());
        }
        Ok(config)
    }

    pub fn resolutions(&self) -> usize {
        self.resolutions
    }

    pub fn fetches(&self) -> usize {
        self.fetches
    }

    fn fetch(&mut self, bucket: &str) -> Result<EndpointConfig, ProcessError> {
        self.fetches += 1;
        debug!(bucket, key = self.config_key, "fetching endpoint config");

        let body = self
            .store
            .get_object(bucket, self.config_key)
            .map_err(ProcessError::ConfigFetch)?;
        let config = EndpointConfig::decode(&body)?;

        if let Err(error) = Url::parse(&config.endpoint) {
            return Err(UnzipError::ConfigDecode(format!(
                "endpoint `{}` is not a valid URL: {error}",
                config.endpoint
            ))
            .into());
        }

        Ok(config)
    }
}
