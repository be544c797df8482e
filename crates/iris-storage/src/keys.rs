//! Shared key generation for storage backends.
//!
//! Key format: `stories/{story_id}/{uuid}-{basename}{ext}`.

use iris_core::constants::STORY_KEY_PREFIX;
use std::path::Path;
use uuid::Uuid;

const MAX_BASENAME_LENGTH: usize = 100;
const MAX_EXTENSION_LENGTH: usize = 16;

/// A freshly generated object location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryKey {
    /// Last key segment, `{uuid}-{basename}{ext}`; recorded as the row's `filename`.
    pub filename: String,
    /// Full storage key.
    pub key: String,
}

/// Generate a new, never-reused storage key for a file uploaded to a story.
///
/// Only the base name of `original_name` is used. Characters outside
/// `[A-Za-z0-9_-]` in the base name become `_`, so the key can never climb out
/// of the story prefix.
pub fn generate_story_key(story_id: Uuid, original_name: &str) -> StoryKey {
    let (basename, extension) = split_name(original_name);
    let filename = format!("{}-{}{}", Uuid::new_v4(), basename, extension);
    let key = format!("{}/{}/{}", STORY_KEY_PREFIX, story_id, filename);
    StoryKey { filename, key }
}

fn split_name(original_name: &str) -> (String, String) {
    // Strip any client-side directory, including Windows separators.
    let name = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original_name);

    let path = Path::new(name);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LENGTH
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default();

    let basename: String = stem
        .chars()
        .take(MAX_BASENAME_LENGTH)
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let basename = if basename.trim_matches('_').is_empty() {
        "file".to_string()
    } else {
        basename
    };

    (basename, extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        let story_id = Uuid::new_v4();
        let generated = generate_story_key(story_id, "report.pdf");

        assert!(generated
            .key
            .starts_with(&format!("stories/{}/", story_id)));
        assert!(generated.key.ends_with(&generated.filename));
        assert!(generated.filename.ends_with("-report.pdf"));

        let uuid_part = &generated.filename[..36];
        assert!(Uuid::parse_str(uuid_part).is_ok());
    }

    #[test]
    fn test_keys_are_never_reused() {
        let story_id = Uuid::new_v4();
        let a = generate_story_key(story_id, "same.png");
        let b = generate_story_key(story_id, "same.png");
        assert_ne!(a.key, b.key);
    }

    #[test]
    fn test_path_components_are_stripped() {
        let story_id = Uuid::new_v4();
        let generated = generate_story_key(story_id, "../../etc/passwd");
        assert!(!generated.key.contains(".."));
        assert!(generated.filename.ends_with("-passwd"));

        let generated = generate_story_key(story_id, "C:\\Users\\me\\notes.txt");
        assert!(generated.filename.ends_with("-notes.txt"));
    }

    #[test]
    fn test_unsafe_characters_are_replaced() {
        let generated = generate_story_key(Uuid::new_v4(), "my holiday (1).jpg");
        assert!(generated.filename.ends_with("-my_holiday__1_.jpg"));

        let generated = generate_story_key(Uuid::new_v4(), "a..b.webm");
        assert!(!generated.key.contains(".."));
        assert!(generated.filename.ends_with(".webm"));
    }

    #[test]
    fn test_empty_basename_falls_back() {
        let generated = generate_story_key(Uuid::new_v4(), "");
        assert!(generated.filename.ends_with("-file"));

        let generated = generate_story_key(Uuid::new_v4(), "???.ogg");
        assert!(generated.filename.ends_with("-file.ogg"));
    }
}
