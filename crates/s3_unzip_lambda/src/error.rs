use thiserror::Error;

use crate::adapters::delivery::DeliveryError;
use crate::adapters::object_store::ObjectStoreError;
use crate::runtime::UnzipError;

/// Anything that stops a notification record from being fully forwarded.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Key decoding, archive format, and endpoint config decoding failures.
    #[error(transparent)]
    Unzip(#[from] UnzipError),

    #[error("failed to fetch archive: {0}")]
    ObjectFetch(#[source] ObjectStoreError),

    #[error("failed to fetch endpoint config: {0}")]
    ConfigFetch(#[source] ObjectStoreError),

    #[error("failed to deliver entry `{entry}` of s3://{bucket}/{key}: {source}")]
    Delivery {
        bucket: String,
        key: String,
        entry: String,
        #[source]
        source: DeliveryError,
    },
}
