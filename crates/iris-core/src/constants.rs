//! Pipeline-wide constants.

/// Maximum size of a single uploaded file part (50 MiB).
pub const MAX_PART_SIZE_BYTES: usize = 50 * 1024 * 1024;

/// Maximum number of file parts accepted in one upload request.
pub const MAX_PARTS_PER_REQUEST: usize = 10;

/// Slack added on top of `parts * part_size` for multipart boundaries and headers.
pub const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Multipart field name carrying files.
pub const UPLOAD_FIELD_NAME: &str = "files";

/// Top-level prefix of every object written by the pipeline.
pub const STORY_KEY_PREFIX: &str = "stories";
