//! Iris Storage Library
//!
//! Object storage for ingested story files: the `Storage` trait and its S3
//! (object_store) and local filesystem implementations.
//!
//! # Storage key format
//!
//! Every object written by the pipeline lives under
//! `stories/{story_id}/{uuid}-{basename}{ext}`. The random id makes a key
//! unique even when the same file is uploaded twice, so keys are never reused.
//!
//! Keys must not contain `..` or a leading `/`. Key generation is centralized in the
//! `keys` module so all backends stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use iris_core::StorageBackend;
pub use keys::{generate_story_key, StoryKey};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};
