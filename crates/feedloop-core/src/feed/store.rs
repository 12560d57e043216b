//! Persisted feed id, for services without a list call.

use anyhow::{Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Remembers the id of the feed being consumed across restarts.
pub trait FeedIdStore: Send + Sync {
    /// The stored id, or None if nothing was stored yet.
    fn load(&self) -> Result<Option<String>>;
    fn save(&self, feed_id: &str) -> Result<()>;
}

/// Keeps the id as the only content of a text file.
#[derive(Debug, Clone)]
pub struct FileFeedIdStore {
    path: PathBuf,
}

impl FileFeedIdStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$XDG_STATE_HOME/feedloop/datafeed.id`
    pub fn default_path() -> Result<PathBuf> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("feedloop")?;
        Ok(xdg_dirs.place_state_file("datafeed.id")?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FeedIdStore for FileFeedIdStore {
    fn load(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(data) => {
                let id = data.trim();
                Ok((!id.is_empty()).then(|| id.to_string()))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => {
                Err(e).with_context(|| format!("reading feed id from {}", self.path.display()))
            }
        }
    }

    fn save(&self, feed_id: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        fs::write(&self.path, format!("{}\n", feed_id))
            .with_context(|| format!("writing feed id to {}", self.path.display()))?;
        tracing::debug!(feed_id, path = %self.path.display(), "feed id saved");
        Ok(())
    }
}
