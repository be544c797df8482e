//! Iris metadata registry
//!
//! Durable file metadata rows and the read-only view of stories the ingestion
//! pipeline depends on.

pub mod db;

pub use db::{
    FileRegistry, InMemoryRegistry, PostgresFileRepository, PostgresStoryRepository,
    StoryDirectory,
};
