//! Data models for the application
//!
//! Ingested file rows, the story summary the registry exposes, and the
//! request/response bodies of the `/files` API.

mod file;
mod story;

pub use file::*;
pub use story::*;
