//! JSON deck file
//!
//! The CLI keeps the whole store (cards, memory states, review log, daily
//! aggregates, sessions) in one pretty-printed JSON snapshot.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use cardwise_core::{InMemoryStore, StoreSnapshot};
use directories::ProjectDirs;

/// Location of a deck snapshot on disk
#[derive(Debug, Clone)]
pub struct DeckFile {
    path: PathBuf,
}

impl DeckFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<platform data dir>/deck.json`
    pub fn default_location() -> anyhow::Result<Self> {
        let dirs = ProjectDirs::from("com", "cardwise", "cardwise")
            .ok_or_else(|| anyhow!("Could not determine project directories"))?;
        Ok(Self::new(dirs.data_dir().join("deck.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the store; a missing file is an empty store
    pub fn load(&self) -> anyhow::Result<InMemoryStore> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "Deck file missing, starting empty");
            return Ok(InMemoryStore::new());
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let snapshot: StoreSnapshot = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid deck file {}", self.path.display()))?;
        Ok(InMemoryStore::from_snapshot(snapshot))
    }

    /// Write the store, replacing the file only once the new content is complete
    pub fn save(&self, store: &InMemoryStore) -> anyhow::Result<()> {
        let snapshot = store.snapshot()?;
        let json = serde_json::to_string_pretty(&snapshot)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, json)
            .with_context(|| format!("Failed to write {}", staging.display()))?;
        fs::rename(&staging, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }
}
