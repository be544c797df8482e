//! Iris API Library
//!
//! HTTP API for story file ingestion: handlers, the multipart ingestor and
//! ingestion orchestrator, and application setup.

mod api_doc;
mod handlers;
mod telemetry;

pub mod error;
pub mod services;
pub mod setup;
pub mod state;

// Re-exports
pub use error::{ErrorResponse, HttpAppError};
pub use services::ingest::{BufferedFile, IngestionOrchestrator, MultipartIngestor, PartSource};
pub use state::{AppState, IngestState};
