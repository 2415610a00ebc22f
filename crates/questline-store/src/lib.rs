//! Questline — Store.
//!
//! File-system adapters for the persistence ports: one JSON document per
//! snapshot key, an append-only JSON-lines audit trail, and a directory of
//! pre-rendered narration clips.

pub mod asset_directory;
pub mod file_snapshot_store;
pub mod jsonl_event_repository;

pub use asset_directory::DirectoryAssetSource;
pub use file_snapshot_store::FileSnapshotStore;
pub use jsonl_event_repository::JsonLinesEventRepository;

/// Returns `true` if `key` is safe to use as a single file name.
pub(crate) fn is_plain_file_name(key: &str) -> bool {
    !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_file_names() {
        assert!(is_plain_file_name("quest-session"));
        assert!(is_plain_file_name("clue-3.mp3"));
        assert!(!is_plain_file_name(""));
        assert!(!is_plain_file_name("../etc/passwd"));
        assert!(!is_plain_file_name(".hidden"));
        assert!(!is_plain_file_name("a/b"));
    }
}
