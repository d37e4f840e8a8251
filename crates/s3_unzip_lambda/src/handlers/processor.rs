use std::io::Cursor;
use std::str::FromStr;
use std::time::Instant;

use tracing::{error, info, warn};

use crate::adapters::delivery::Delivery;
use crate::adapters::object_store::ObjectStore;
use crate::error::ProcessError;
use crate::handlers::config::{ConfigCachePolicy, ConfigResolver};
use crate::runtime::archive::ArchiveReader;
use crate::runtime::contract::{
    InvocationSummary, NotificationRecord, DEFAULT_ENDPOINT_CONFIG_KEY,
};
use crate::runtime::object_key::{decode_object_key, is_zip_key};

/// What happens to the rest of the batch when one record fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Abort the invocation on the first failure.
    #[default]
    FailFast,
    /// Log and count the failure, then continue with the next record.
    Isolate,
}

impl FailurePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FailFast => "fail-fast",
            Self::Isolate => "isolate",
        }
    }
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "fail-fast" => Ok(Self::FailFast),
            "isolate" => Ok(Self::Isolate),
            other => Err(format!(
                "unknown failure policy `{other}` (expected fail-fast or isolate)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorOptions {
    pub config_key: String,
    pub cache_policy: ConfigCachePolicy,
    pub failure_policy: FailurePolicy,
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self {
            config_key: DEFAULT_ENDPOINT_CONFIG_KEY.to_string(),
            cache_policy: ConfigCachePolicy::default(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

enum RecordOutcome {
    Skipped,
    Forwarded { entries: usize },
}

/// Forwards every entry of every notified ZIP archive to its bucket's endpoint.
pub struct EventProcessor<S, D> {
    store: S,
    delivery: D,
    options: ProcessorOptions,
}

impl<S: ObjectStore, D: Delivery> EventProcessor<S, D> {
    pub fn new(store: S, delivery: D, options: ProcessorOptions) -> Self {
        Self {
            store,
            delivery,
            options,
        }
    }

    /// Processes `records` strictly in order.
    ///
    /// With [`FailurePolicy::FailFast`] the first error is returned and the
    /// remaining records are left untouched.
    pub fn handle(
        &self,
        records: &[NotificationRecord],
    ) -> Result<InvocationSummary, ProcessError> {
        let started_at = Instant::now();
        let mut summary = InvocationSummary::new(records.len());
        let mut configs = ConfigResolver::new(
            &self.store,
            &self.options.config_key,
            self.options.cache_policy,
        );

        info!(
            component = "event_processor",
            records = records.len(),
            cache_policy = self.options.cache_policy.as_str(),
            failure_policy = self.options.failure_policy.as_str(),
            "invocation_started"
        );

        for record in records {
            configs.begin_record();
            let outcome = self.process_record(record, &mut configs, &mut summary);
            summary.config_resolutions = configs.resolutions();
            summary.config_fetches = configs.fetches();

            match outcome {
                Ok(RecordOutcome::Skipped) => summary.skipped += 1,
                Ok(RecordOutcome::Forwarded { entries }) => {
                    summary.processed += 1;
                    info!(
                        component = "event_processor",
                        bucket = %record.bucket,
                        key = %record.key,
                        entries,
                        "record_completed"
                    );
                }
                Err(failure) => {
                    error!(
                        component = "event_processor",
                        bucket = %record.bucket,
                        key = %record.key,
                        error = %failure,
                        failure_policy = self.options.failure_policy.as_str(),
                        "record_failed"
                    );
                    match self.options.failure_policy {
                        FailurePolicy::FailFast => return Err(failure),
                        FailurePolicy::Isolate => summary.failed += 1,
                    }
                }
            }
        }

        info!(
            component = "event_processor",
            records = summary.records,
            processed = summary.processed,
            skipped = summary.skipped,
            failed = summary.failed,
            entries_delivered = summary.entries_delivered,
            non_success_responses = summary.non_success_responses,
            config_fetches = summary.config_fetches,
            duration_ms = started_at.elapsed().as_millis() as u64,
            "invocation_completed"
        );

        Ok(summary)
    }

    fn process_record(
        &self,
        record: &NotificationRecord,
        configs: &mut ConfigResolver<'_>,
        summary: &mut InvocationSummary,
    ) -> Result<RecordOutcome, ProcessError> {
        let key = decode_object_key(&record.key)?;
        if !is_zip_key(&key) {
            info!(
                component = "event_processor",
                bucket = %record.bucket,
                key = %key,
                "skipping non zip file"
            );
            return Ok(RecordOutcome::Skipped);
        }

        let archive = self
            .store
            .get_object(&record.bucket, &key)
            .map_err(ProcessError::ObjectFetch)?;

        let mut entries = 0usize;
        for entry in ArchiveReader::open(Cursor::new(archive))? {
            let entry = entry?;
            let config = configs.resolve(&record.bucket)?;
            let result = self
                .delivery
                .send(&entry.content, &config)
                .map_err(|source| ProcessError::Delivery {
                    bucket: record.bucket.clone(),
                    key: key.clone(),
                    entry: entry.name.clone(),
                    source,
                })?;

            if result.is_success() {
                info!(
                    component = "delivery",
                    bucket = %record.bucket,
                    key = %key,
                    entry = %entry.name,
                    bytes = entry.content.len(),
                    status = result.status_code,
                    "received HTTP status code from endpoint"
                );
            } else {
                warn!(
                    component = "delivery",
                    bucket = %record.bucket,
                    key = %key,
                    entry = %entry.name,
                    bytes = entry.content.len(),
                    status = result.status_code,
                    "received HTTP status code from endpoint"
                );
                summary.non_success_responses += 1;
            }

            summary.entries_delivered += 1;
            entries += 1;
        }

        Ok(RecordOutcome::Forwarded { entries })
    }
}
