//! File ingestion pipeline.
//!
//! [`MultipartIngestor`] turns a streamed multipart body into buffered files,
//! one part at a time. [`IngestionOrchestrator`] stores each buffered file and
//! links it to a registry row, and owns the read/update/delete paths that must
//! keep storage and registry consistent.

mod multipart;
mod orchestrator;

pub use multipart::{BufferedFile, MultipartIngestor, PartSource, UploadLimits};
pub use orchestrator::IngestionOrchestrator;
