use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("object s3://{bucket}/{key} does not exist")]
    NotFound { bucket: String, key: String },

    #[error("timed out after {timeout:?} reading s3://{bucket}/{key}")]
    TimedOut {
        bucket: String,
        key: String,
        timeout: Duration,
    },

    #[error("failed to read s3://{bucket}/{key}: {message}")]
    Unavailable {
        bucket: String,
        key: String,
        message: String,
    },
}

/// Blocking get-by-key access to the bucket that raised the notification.
pub trait ObjectStore {
    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, ObjectStoreError>;
}

impl<T: ObjectStore + ?Sized> ObjectStore for &T {
    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, ObjectStoreError> {
        (**self).get_object(bucket, key)
    }
}
