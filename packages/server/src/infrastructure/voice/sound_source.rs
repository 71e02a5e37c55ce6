//! Directory-backed sound source.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::domain::{Sound, SoundClip, SoundSource};

pub const DEFAULT_VOLUME: f32 = 0.4;

/// Looks up `<dir>/<sound file>` on every resolve, so files can be added
/// or removed while the server runs.
#[derive(Debug, Clone)]
pub struct DirectorySoundSource {
    dir: PathBuf,
}

impl DirectorySoundSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl SoundSource for DirectorySoundSource {
    async fn resolve(&self, sound: Sound) -> Option<SoundClip> {
        let path = self.dir.join(sound.file_name());
        match tokio::fs::try_exists(&path).await {
            Ok(true) => Some(SoundClip {
                sound,
                path,
                volume: DEFAULT_VOLUME,
            }),
            Ok(false) => {
                tracing::warn!("Sound file not found: {}", path.display());
                None
            }
            Err(e) => {
                tracing::warn!("Failed to look up sound file {}: {}", path.display(), e);
                None
            }
        }
    }
}
