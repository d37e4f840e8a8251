use std::time::Duration;

use aws_sdk_s3::error::DisplayErrorContext;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use s3_unzip_lambda::adapters::delivery::HttpDelivery;
use s3_unzip_lambda::adapters::object_store::{ObjectStore, ObjectStoreError};
use s3_unzip_lambda::handlers::event::decode_notification_records;
use s3_unzip_lambda::handlers::processor::EventProcessor;
use s3_unzip_lambda::settings::RuntimeSettings;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

struct S3ObjectStore {
    s3_client: aws_sdk_s3::Client,
    fetch_timeout: Duration,
}

impl ObjectStore for S3ObjectStore {
    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, ObjectStoreError> {
        let client = self.s3_client.clone();
        let fetch_timeout = self.fetch_timeout;
        let bucket = bucket.to_string();
        let key = key.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let fetch = async {
                    let output = client
                        .get_object()
                        .bucket(&bucket)
                        .key(&key)
                        .send()
                        .await
                        .map_err(|error| {
                            let not_found = error
                                .as_service_error()
                                .map(|service_error| service_error.is_no_such_key())
                                .unwrap_or(false);
                            if not_found {
                                ObjectStoreError::NotFound {
                                    bucket: bucket.clone(),
                                    key: key.clone(),
                                }
                            } else {
                                ObjectStoreError::Unavailable {
                                    bucket: bucket.clone(),
                                    key: key.clone(),
                                    message: DisplayErrorContext(&error).to_string(),
                                }
                            }
                        })?;

                    let body = output.body.collect().await.map_err(|error| {
                        ObjectStoreError::Unavailable {
                            bucket: bucket.clone(),
                            key: key.clone(),
                            message: format!("failed to read object body: {error}"),
                        }
                    })?;
                    Ok::<_, ObjectStoreError>(body.into_bytes().to_vec())
                };

                match tokio::time::timeout(fetch_timeout, fetch).await {
                    Ok(result) => result,
                    Err(_) => Err(ObjectStoreError::TimedOut {
                        bucket: bucket.clone(),
                        key: key.clone(),
                        timeout: fetch_timeout,
                    }),
                }
            })
        })
    }
}

async fn handle_request(
    event: LambdaEvent<Value>,
    processor: &EventProcessor<S3ObjectStore, &HttpDelivery>,
) -> Result<String, Error> {
    let request_id = event.context.request_id;
    let records = decode_notification_records(event.payload)?;
    tracing::info!(
        component = "unzip_forwarder",
        request_id = %request_id,
        records = records.len(),
        "event_received"
    );

    let summary = tokio::task::block_in_place(|| processor.handle(&records))?;
    Ok(summary.status)
}

/// Uses `RUST_LOG` if set, otherwise the `LOG_LEVEL` setting.
fn init_tracing(log_level: &str) -> Result<(), Error> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)?
    };

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    Ok(())
}

fn main() -> Result<(), Error> {
    let settings = RuntimeSettings::from_env()?;
    init_tracing(&settings.log_level)?;

    // The blocking HTTP client owns its own runtime, so it is created and
    // dropped outside the Lambda runtime.
    let delivery = HttpDelivery::new(settings.delivery_timeout)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let store = S3ObjectStore {
            s3_client: aws_sdk_s3::Client::new(&aws_config),
            fetch_timeout: settings.object_fetch_timeout,
        };
        let processor = EventProcessor::new(store, &delivery, settings.processor_options());
        let processor = &processor;

        tracing::info!(
            component = "unzip_forwarder",
            config_key = %settings.config_key,
            cache_policy = settings.cache_policy.as_str(),
            failure_policy = settings.failure_policy.as_str(),
            delivery_timeout_secs = settings.delivery_timeout.as_secs(),
            object_fetch_timeout_secs = settings.object_fetch_timeout.as_secs(),
            "cold_start"
        );

        lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
            handle_request(event, processor).await
        }))
        .await
    })
}
