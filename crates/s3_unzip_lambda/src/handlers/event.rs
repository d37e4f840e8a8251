use aws_lambda_events::event::s3::{S3Event, S3EventRecord};
use aws_lambda_events::event::sqs::{SqsEvent, SqsEventObj};
use serde_json::Value;
use tracing::debug;

use crate::runtime::contract::NotificationRecord;
use crate::runtime::{Result, UnzipError};

/// Extract notification records from either a direct S3 event or an SQS event
/// whose message bodies are S3 events.
///
/// SQS messages that carry no `Records` (the `s3:TestEvent` S3 sends when a
/// notification is configured) contribute no records.
pub fn decode_notification_records(event: Value) -> Result<Vec<NotificationRecord>> {
    if let Ok(sqs) = serde_json::from_value::<SqsEventObj<S3Event>>(event.clone()) {
        return sqs
            .records
            .into_iter()
            .flat_map(|message| message.body.records)
            .map(notification_record)
            .collect();
    }

    if is_sqs_event(&event) {
        return decode_sqs_messages(event);
    }

    let s3: S3Event = serde_json::from_value(event)
        .map_err(|error| UnzipError::InvalidEvent(format!("malformed S3 event: {error}")))?;
    s3.records.into_iter().map(notification_record).collect()
}

/// Per-message fallback for SQS batches where not every body is an S3 event.
fn decode_sqs_messages(event: Value) -> Result<Vec<NotificationRecord>> {
    let sqs: SqsEvent = serde_json::from_value(event)
        .map_err(|error| UnzipError::InvalidEvent(format!("malformed SQS event: {error}")))?;

    let mut notifications = Vec::new();
    for message in sqs.records {
        let body = message.body.ok_or_else(|| {
            UnzipError::InvalidEvent("SQS record body must be a string".to_string())
        })?;
        let inner: Value = serde_json::from_str(&body).map_err(|error| {
            UnzipError::InvalidEvent(format!("SQS record body is not JSON: {error}"))
        })?;
        if inner.get("Records").is_none() {
            debug!(
                message_id = message.message_id.as_deref().unwrap_or_default(),
                "ignoring SQS message without S3 records"
            );
            continue;
        }

        let s3: S3Event = serde_json::from_value(inner)
            .map_err(|error| UnzipError::InvalidEvent(format!("malformed S3 event: {error}")))?;
        for record in s3.records {
            notifications.push(notification_record(record)?);
        }
    }

    Ok(notifications)
}

fn notification_record(record: S3EventRecord) -> Result<NotificationRecord> {
    let bucket = record
        .s3
        .bucket
        .name
        .ok_or_else(|| UnzipError::InvalidEvent("S3 record has no bucket name".to_string()))?;
    let key = record
        .s3
        .object
        .key
        .ok_or_else(|| UnzipError::InvalidEvent("S3 record has no object key".to_string()))?;
    Ok(NotificationRecord::new(bucket, key))
}

fn is_sqs_event(event: &Value) -> bool {
    event
        .get("Records")
        .and_then(Value::as_array)
        .map(|records| {
            !records.is_empty()
                && records.iter().all(|record| {
                    record
                        .get("eventSource")
                        .and_then(Value::as_str)
                        .map(|source| source == "aws:sqs")
                        .unwrap_or(false)
                })
        })
        .unwrap_or(false)
}
