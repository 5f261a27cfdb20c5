//! Local JSON fallback store.
//!
//! All memories live in one human-readable JSON array:
//!
//! ```json
//! [
//!   {
//!     "id": "blake-preference-editor",
//!     "content": "Blake's preference for editor: helix",
//!     "container": "blake",
//!     "metadata": { "category": "preferences" },
//!     "createdAt": "2026-10-16T09:30:00.000Z",
//!     "updatedAt": "2026-10-16T09:30:00.000Z"
//!   }
//! ]
//! ```
//!
//! The file is read once when the store is opened and rewritten wholesale
//! on every mutation. There is no incremental append, no file lock and no
//! atomic rename; another process writing the same file in between is
//! silently overwritten.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::types::{Container, LocalMemory};

/// Totals over the local store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStats {
    /// Number of entries.
    pub total: usize,
    /// Entries per container tag.
    pub by_container: BTreeMap<String, usize>,
}

/// In-memory view of the local JSON file.
#[derive(Debug)]
pub struct LocalStore {
    path: PathBuf,
    memories: Vec<LocalMemory>,
}

impl LocalStore {
    /// Open the store at `path`, loading any existing entries.
    ///
    /// A missing file is an empty store. A file that cannot be read or
    /// parsed is logged and also treated as empty; the next write replaces
    /// it.
    #[must_use]
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let memories = load(&path);
        info!(
            path = %path.display(),
            memories = memories.len(),
            "Local memory store opened"
        );
        Self { path, memories }
    }

    /// An empty store that will write to `path` on the first mutation.
    #[must_use]
    pub fn empty<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            memories: Vec::new(),
        }
    }

    /// Insert `memory`, replacing any entry with the same id, then persist.
    ///
    /// The replaced entry is dropped entirely (last write wins). The new
    /// entry goes to the end of the array.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RecallError::Io`] or
    /// [`crate::RecallError::Serialization`] if the file cannot be written.
    /// The in-memory view is updated either way.
    pub fn upsert(&mut self, memory: LocalMemory) -> Result<()> {
        let replaced = self.remove_id(&memory.id);
        debug!(id = %memory.id, container = %memory.container, replaced, "Upserting local memory");
        self.memories.push(memory);
        self.save()
    }

    /// Remove every entry and persist the empty array.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RecallError::Io`] if the file cannot be written.
    pub fn clear(&mut self) -> Result<()> {
        let dropped = self.memories.len();
        self.memories.clear();
        warn!(dropped, path = %self.path.display(), "Cleared local memories");
        self.save()
    }

    /// Entry with the given id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&LocalMemory> {
        self.memories.iter().find(|m| m.id == id)
    }

    /// First entry in `container` whose content matches `content` after
    /// whitespace and case normalization.
    #[must_use]
    pub fn find_duplicate(&self, container: &Container, content: &str) -> Option<&LocalMemory> {
        let wanted = normalize(content);
        self.memories
            .iter()
            .find(|m| &m.container == container && normalize(&m.content) == wanted)
    }

    /// All entries in store order.
    #[must_use]
    pub fn memories(&self) -> &[LocalMemory] {
        &self.memories
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.memories.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.memories.is_empty()
    }

    /// Total and per-container counts.
    #[must_use]
    pub fn stats(&self) -> MemoryStats {
        let mut by_container = BTreeMap::new();
        for memory in &self.memories {
            *by_container.entry(memory.container.to_string()).or_insert(0) += 1;
        }
        MemoryStats {
            total: self.memories.len(),
            by_container,
        }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn remove_id(&mut self, id: &str) -> bool {
        let before = self.memories.len();
        self.memories.retain(|m| m.id != id);
        self.memories.len() != before
    }

    /// Rewrite the whole file from the in-memory view.
    fn save(&self) -> Result<()> {
        let start = Instant::now();
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let json = serde_json::to_string_pretty(&self.memories)?;
        std::fs::write(&self.path, json.as_bytes())?;
        debug!(
            path = %self.path.display(),
            memories = self.memories.len(),
            bytes = json.len(),
            elapsed_us = start.elapsed().as_micros(),
            "Saved local memories"
        );
        Ok(())
    }
}

fn load(path: &Path) -> Vec<LocalMemory> {
    if !path.exists() {
        return Vec::new();
    }
    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read local memories");
            return Vec::new();
        }
    };
    match serde_json::from_str(&data) {
        Ok(memories) => memories,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to parse local memories");
            Vec::new()
        }
    }
}

fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}
