use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::session::quality::Quality;

/// Where finished recordings go.
pub trait ArtifactStore: Send + Sync {
    /// Persist `bytes` under (a variant of) `suggested_filename` and return its location.
    fn save(&self, bytes: &[u8], suggested_filename: &str) -> SlidecastResult<PathBuf>;
}

/// `presentation-<quality>-<UTC timestamp>.<ext>`, with the timestamp truncated to seconds and
/// colons replaced by hyphens.
pub fn suggested_filename(quality: Quality, at: DateTime<Utc>, extension: &str) -> String {
    format!(
        "presentation-{}-{}.{extension}",
        quality.label(),
        at.format("%Y-%m-%dT%H-%M-%S")
    )
}

/// Writes artifacts into one directory, never overwriting an existing file.
#[derive(Clone, Debug)]
pub struct DirectoryStore {
    dir: PathBuf,
}

impl DirectoryStore {
    /// Store into `dir`, created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Target directory.
    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }
}

impl ArtifactStore for DirectoryStore {
    fn save(&self, bytes: &[u8], suggested_filename: &str) -> SlidecastResult<PathBuf> {
        let name = std::path::Path::new(suggested_filename);
        if name.file_name() != Some(name.as_os_str()) {
            return Err(SlidecastError::validation(format!(
                "artifact name '{suggested_filename}' must be a plain file name"
            )));
        }
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create output directory '{}'", self.dir.display()))?;

        let stem = name
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = name.extension().map(|s| s.to_string_lossy().into_owned());
        let mut path = self.dir.join(name);
        let mut n = 1u32;
        while path.exists() {
            let candidate = match &ext {
                Some(ext) => format!("{stem}-{n}.{ext}"),
                None => format!("{stem}-{n}"),
            };
            path = self.dir.join(candidate);
            n += 1;
        }

        std::fs::write(&path, bytes)
            .with_context(|| format!("failed to write recording '{}'", path.display()))?;
        tracing::info!(path = %path.display(), bytes = bytes.len(), "recording saved");
        Ok(path)
    }
}

/// Keeps artifacts in memory. Clones share the same storage.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    saved: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every saved `(name, bytes)` pair in save order.
    pub fn saved(&self) -> Vec<(String, Vec<u8>)> {
        self.saved.lock().clone()
    }
}

impl ArtifactStore for MemoryStore {
    fn save(&self, bytes: &[u8], suggested_filename: &str) -> SlidecastResult<PathBuf> {
        self.saved
            .lock()
            .push((suggested_filename.to_owned(), bytes.to_vec()));
        Ok(PathBuf::from(format!("memory://{suggested_filename}")))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/persist.rs"]
mod tests;
