//! AWS-oriented adapters and handlers for the unzip forwarder.
//!
//! This crate owns runtime integration details (the Lambda binary, the S3-backed
//! object store, and HTTP delivery) and re-exports the storage-agnostic
//! primitives as a single `runtime` module boundary.

pub mod adapters;
pub mod error;
pub mod handlers;
pub mod settings;

pub use s3_unzip_core as runtime;
