use thiserror::Error;
use zip::result::ZipError;

/// Failures raised while decoding notifications, keys, archives, or endpoint config.
#[derive(Debug, Error)]
pub enum UnzipError {
    #[error("malformed object key `{key}`: {reason}")]
    KeyDecode { key: String, reason: String },

    #[error("stream is not a readable zip archive: {0}")]
    ArchiveFormat(#[source] ZipError),

    #[error("failed to read archive entry `{entry}`: {source}")]
    ArchiveRead {
        entry: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid endpoint config: {0}")]
    ConfigDecode(String),

    #[error("invalid notification event: {0}")]
    InvalidEvent(String),
}

pub type Result<T> = std::result::Result<T, UnzipError>;
