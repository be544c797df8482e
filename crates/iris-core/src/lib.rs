//! Iris Core Library
//!
//! Domain models, error types, configuration and constants shared by every
//! Iris component (server, storage, registry and client crates).

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{Config, RegistryBackend};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{derive_file_type, FileType};
pub use storage_types::StorageBackend;
