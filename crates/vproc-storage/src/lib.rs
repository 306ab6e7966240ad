//! S3-compatible object storage client.
//!
//! This crate provides:
//! - The `BlobStore` trait used by the transcoding pipeline
//! - An `aws-sdk-s3` implementation for S3-compatible endpoints
//! - An in-memory implementation for local runs and tests
//! - Storage errors that distinguish missing objects from other failures

pub mod client;
pub mod error;
pub mod memory;
pub mod store;

pub use client::{S3Client, S3Config};
pub use error::{StorageError, StorageResult};
pub use memory::InMemoryBlobStore;
pub use store::{BlobStore, LocalWriter};
