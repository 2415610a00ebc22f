//! Pre-rendered narration clips read from a local directory.

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use questline_narration::{AssetSource, AudioClip, NarrationError};

use crate::is_plain_file_name;

/// Serves `<root>/<key>` as a clip, e.g. `audio/clue-3.mp3`.
#[derive(Debug, Clone)]
pub struct DirectoryAssetSource {
    root: PathBuf,
}

impl DirectoryAssetSource {
    /// Creates a source rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

fn media_type_for(key: &str) -> &'static str {
    match key.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()) {
        Some(ext) if ext == "wav" => "audio/wav",
        Some(ext) if ext == "ogg" => "audio/ogg",
        _ => "audio/mpeg",
    }
}

#[async_trait]
impl AssetSource for DirectoryAssetSource {
    async fn fetch(&self, key: &str) -> Result<Option<AudioClip>, NarrationError> {
        if !is_plain_file_name(key) {
            return Err(NarrationError::Unavailable(format!("invalid asset key: {key:?}")));
        }
        let path = self.root.join(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => Ok(None),
            Ok(bytes) => Ok(Some(AudioClip {
                bytes: bytes.into(),
                media_type: media_type_for(key).to_owned(),
            })),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(NarrationError::Unavailable(format!(
                "failed to read {}: {e}",
                path.display()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_follows_extension() {
        assert_eq!(media_type_for("clue-1.mp3"), "audio/mpeg");
        assert_eq!(media_type_for("intro.WAV"), "audio/wav");
        assert_eq!(media_type_for("finale.ogg"), "audio/ogg");
        assert_eq!(media_type_for("noext"), "audio/mpeg");
    }
}
