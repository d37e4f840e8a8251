use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, UnzipError};

pub const COMPLETION_MARKER: &str = "done processing request";
pub const DEFAULT_ENDPOINT_CONFIG_KEY: &str = "sumo-endpoint-config.json";

/// One object-creation notification. `key` is still URL-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRecord {
    pub bucket: String,
    pub key: String,
}

impl NotificationRecord {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

/// Destination for decoded archive entries, stored per bucket as JSON.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EndpointConfig {
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

impl EndpointConfig {
    pub fn decode(body: &[u8]) -> Result<Self> {
        let config: Self = serde_json::from_slice(body)
            .map_err(|error| UnzipError::ConfigDecode(error.to_string()))?;

        if config.endpoint.trim().is_empty() {
            return Err(UnzipError::ConfigDecode(
                "endpoint cannot be empty".to_string(),
            ));
        }

        Ok(config)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryResult {
    pub status_code: u16,
}

impl DeliveryResult {
    pub fn new(status_code: u16) -> Self {
        Self { status_code }
    }

    pub fn is_success(self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InvocationSummary {
    pub status: String,
    pub records: usize,
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub entries_delivered: usize,
    pub non_success_responses: usize,
    pub config_resolutions: usize,
    pub config_fetches: usize,
}

impl InvocationSummary {
    pub fn new(records: usize) -> Self {
        Self {
            status: COMPLETION_MARKER.to_string(),
            records,
            processed: 0,
            skipped: 0,
            failed: 0,
            entries_delivered: 0,
            non_success_responses: 0,
            config_resolutions: 0,
            config_fetches: 0,
        }
    }
}
