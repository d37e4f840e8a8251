//! Storage-agnostic primitives for the unzip forwarder.
//!
//! This crate owns the notification contract, object-key decoding, the
//! endpoint configuration shape, and streaming archive decoding. It
//! intentionally excludes AWS SDK, HTTP client, and Lambda runtime concerns.

pub mod archive;
pub mod contract;
pub mod error;
pub mod object_key;

pub use error::{Result, UnzipError};
