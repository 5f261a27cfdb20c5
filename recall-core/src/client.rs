//! Storage client: remote memory API with a one-way fallback to the local
//! JSON store.
//!
//! ```text
//!            add / search
//!                 │
//!     remote set and latch open? ──no──► local store
//!                 │ yes
//!                 ▼
//!           remote call ──ok──► result
//!                 │ err
//!                 ▼
//!       trip latch (permanent) ──► local store
//! ```
//!
//! There is no retry, no backoff and no distinction between transient and
//! permanent failures: one failed call moves the client to local mode for
//! the rest of its life. The latch belongs to the client instance, so two
//! clients in one process fall back independently.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::ids::generate_id;
use crate::local::{LocalStore, MemoryStats};
use crate::search::search_local;
use crate::types::{Container, LocalMemory, MemoryEntry, MemoryResult, SearchOptions, now_millis, timestamp_now};

/// A remote memory service.
///
/// Implementations report every failure (non-success status, transport
/// error, undecodable body) as an `Err`; the client does not inspect it
/// beyond logging.
#[async_trait]
pub trait RemoteMemory: Send + Sync {
    /// Store `entry`, returning the id the service assigned.
    async fn add(&self, entry: &MemoryEntry) -> Result<String>;

    /// Ranked search.
    async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<MemoryResult>>;

    /// Label used in result source tags (`<name>:<scope>`).
    fn name(&self) -> &str {
        "supermemory"
    }

    /// Service name for status messages.
    fn display_name(&self) -> &str {
        self.name()
    }
}

/// Which backend serves calls right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    /// Remote memory API.
    #[serde(rename = "api")]
    Remote,
    /// Local JSON file.
    Local,
}

/// One-way switch from remote to local mode.
///
/// Starts open. Once tripped it stays tripped; there is no reset.
#[derive(Debug, Default)]
pub struct FallbackLatch {
    tripped: AtomicBool,
}

impl FallbackLatch {
    /// An open latch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Trip the latch. Returns `true` only for the call that tripped it.
    pub fn trip(&self) -> bool {
        !self.tripped.swap(true, Ordering::SeqCst)
    }

    /// Whether the latch has been tripped.
    #[must_use]
    pub fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::SeqCst)
    }
}

/// Dual-path storage client.
pub struct MemoryClient {
    local: Mutex<LocalStore>,
    remote: Option<Arc<dyn RemoteMemory>>,
    latch: FallbackLatch,
}

impl std::fmt::Debug for MemoryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryClient")
            .field("remote", &self.remote.as_ref().map(|r| r.name().to_string()))
            .field("latch", &self.latch)
            .finish_non_exhaustive()
    }
}

impl MemoryClient {
    /// Client over `local`, preferring `remote` while it keeps working.
    #[must_use]
    pub fn new(local: LocalStore, remote: Option<Arc<dyn RemoteMemory>>) -> Self {
        Self {
            local: Mutex::new(local),
            remote,
            latch: FallbackLatch::new(),
        }
    }

    /// Client that never talks to a remote service.
    #[must_use]
    pub fn local_only(local: LocalStore) -> Self {
        Self::new(local, None)
    }

    /// Current backend.
    #[must_use]
    pub fn mode(&self) -> StorageMode {
        if self.active_remote().is_some() {
            StorageMode::Remote
        } else {
            StorageMode::Local
        }
    }

    /// Label of the current backend for source tags: the remote's name, or
    /// `local`.
    #[must_use]
    pub fn backend_label(&self) -> &str {
        match self.active_remote() {
            Some(remote) => remote.name(),
            None => "local",
        }
    }

    /// Service name of the current backend for status messages.
    #[must_use]
    pub fn backend_display_name(&self) -> &str {
        match self.active_remote() {
            Some(remote) => remote.display_name(),
            None => "local file",
        }
    }

    /// Whether a remote is configured at all (regardless of the latch).
    #[must_use]
    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Force local mode for the rest of this client's life.
    pub fn fall_back(&self, reason: &str) {
        if self.latch.trip() {
            info!(reason, "Memory client switched to local storage");
        }
    }

    fn active_remote(&self) -> Option<&Arc<dyn RemoteMemory>> {
        self.remote.as_ref().filter(|_| !self.latch.is_tripped())
    }

    /// Store an entry, returning its resolved id.
    ///
    /// # Errors
    ///
    /// Remote failures never surface here; they trip the latch and the
    /// entry goes to the local store. Returns [`crate::RecallError::Io`] if
    /// the local file cannot be written.
    pub async fn add(&self, entry: MemoryEntry) -> Result<String> {
        if let Some(remote) = self.active_remote() {
            match remote.add(&entry).await {
                Ok(id) => {
                    debug!(id = %id, container = %entry.container_tag, "Stored memory via remote API");
                    return Ok(id);
                }
                Err(e) => {
                    warn!(error = %e, "Remote memory API add failed; falling back to local storage");
                    self.fall_back("remote add failed");
                }
            }
        }

        let now = timestamp_now();
        let id = entry.custom_id.clone().unwrap_or_else(|| {
            let millis = now_millis().to_string();
            generate_id(&[entry.container_tag.as_str(), millis.as_str()])
        });
        let memory = LocalMemory {
            id: id.clone(),
            content: entry.content,
            container: entry.container_tag,
            metadata: entry.metadata.unwrap_or_default(),
            created_at: now.clone(),
            updated_at: now,
        };
        self.local.lock().upsert(memory)?;
        Ok(id)
    }

    /// Ranked search over the active backend.
    ///
    /// # Errors
    ///
    /// Currently infallible in practice (remote errors fall back to local
    /// search); the `Result` leaves room for backends that can fail.
    pub async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<MemoryResult>> {
        if let Some(remote) = self.active_remote() {
            match remote.search(query, options).await {
                Ok(results) => {
                    debug!(query, hits = results.len(), "Searched remote memory API");
                    return Ok(results);
                }
                Err(e) => {
                    warn!(error = %e, "Remote memory API search failed; using local search");
                    self.fall_back("remote search failed");
                }
            }
        }

        let results = search_local(self.local.lock().memories(), query, options);
        debug!(query, hits = results.len(), "Searched local memories");
        Ok(results)
    }

    /// Entry in `container` with matching content, if the local view has one.
    #[must_use]
    pub fn find_local_duplicate(&self, container: &Container, content: &str) -> Option<String> {
        self.local
            .lock()
            .find_duplicate(container, content)
            .map(|m| m.id.clone())
    }

    /// Counts over the local store.
    #[must_use]
    pub fn local_stats(&self) -> MemoryStats {
        self.local.lock().stats()
    }

    /// Remove every local entry.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RecallError::Io`] if the file cannot be written.
    pub fn clear_local(&self) -> Result<()> {
        self.local.lock().clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RecallError;
    use std::sync::atomic::AtomicUsize;

    /// Remote that counts calls and fails on demand.
    #[derive(Default)]
    struct ScriptedRemote {
        fail: AtomicBool,
        adds: AtomicUsize,
        searches: AtomicUsize,
    }

    #[async_trait]
    impl RemoteMemory for ScriptedRemote {
        async fn add(&self, entry: &MemoryEntry) -> Result<String> {
            self.adds.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(RecallError::Remote("HTTP 503".into()));
            }
            Ok(entry.custom_id.clone().unwrap_or_else(|| "remote-id".into()))
        }

        async fn search(&self, _query: &str, _options: &SearchOptions) -> Result<Vec<MemoryResult>> {
            self.searches.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(RecallError::Remote("connection refused".into()));
            }
            Ok(Vec::new())
        }
    }

    fn entry(id: &str, content: &str) -> MemoryEntry {
        MemoryEntry {
            content: content.into(),
            custom_id: Some(id.into()),
            container_tag: Container::Blake,
            metadata: None,
        }
    }

    #[test]
    fn latch_trips_once() {
        let latch = FallbackLatch::new();
        assert!(!latch.is_tripped());
        assert!(latch.trip());
        assert!(!latch.trip());
        assert!(latch.is_tripped());
    }

    #[tokio::test]
    async fn healthy_remote_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let remote = Arc::new(ScriptedRemote::default());
        let client = MemoryClient::new(LocalStore::open(dir.path().join("m.json")), Some(remote.clone() as Arc<dyn RemoteMemory>));

        let id = client.add(entry("k", "v")).await.unwrap();
        assert_eq!(id, "k");
        assert_eq!(remote.adds.load(Ordering::SeqCst), 1);
        assert_eq!(client.mode(), StorageMode::Remote);
        assert_eq!(client.local_stats().total, 0);
    }

    #[tokio::test]
    async fn failure_trips_latch_and_stays_local() {
        let dir = tempfile::tempdir().unwrap();
        let remote = Arc::new(ScriptedRemote::default());
        remote.fail.store(true, Ordering::SeqCst);
        let client = MemoryClient::new(LocalStore::open(dir.path().join("m.json")), Some(remote.clone() as Arc<dyn RemoteMemory>));

        let id = client.add(entry("k", "kept locally")).await.unwrap();
        assert_eq!(id, "k");
        assert_eq!(client.mode(), StorageMode::Local);
        assert_eq!(client.local_stats().total, 1);

        // Recovery of the remote does not matter: the latch never resets.
        remote.fail.store(false, Ordering::SeqCst);
        client.add(entry("k2", "also local")).await.unwrap();
        let hits = client.search("local", &SearchOptions::default()).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(remote.adds.load(Ordering::SeqCst), 1);
        assert_eq!(remote.searches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn search_failure_also_trips() {
        let dir = tempfile::tempdir().unwrap();
        let remote = Arc::new(ScriptedRemote::default());
        remote.fail.store(true, Ordering::SeqCst);
        let client = MemoryClient::new(LocalStore::open(dir.path().join("m.json")), Some(remote.clone() as Arc<dyn RemoteMemory>));

        let hits = client.search("anything", &SearchOptions::default()).await.unwrap();
        assert!(hits.is_empty());
        client.add(entry("k", "v")).await.unwrap();
        assert_eq!(remote.adds.load(Ordering::SeqCst), 0);
        assert_eq!(client.backend_label(), "local");
    }

    #[tokio::test]
    async fn clients_fall_back_independently() {
        let dir = tempfile::tempdir().unwrap();
        let broken = Arc::new(ScriptedRemote::default());
        broken.fail.store(true, Ordering::SeqCst);
        let healthy = Arc::new(ScriptedRemote::default());

        let a = MemoryClient::new(LocalStore::open(dir.path().join("a.json")), Some(broken as Arc<dyn RemoteMemory>));
        let b = MemoryClient::new(LocalStore::open(dir.path().join("b.json")), Some(healthy as Arc<dyn RemoteMemory>));
        a.add(entry("k", "v")).await.unwrap();

        assert_eq!(a.mode(), StorageMode::Local);
        assert_eq!(b.mode(), StorageMode::Remote);
        assert_eq!(b.backend_label(), "supermemory");
    }

    #[tokio::test]
    async fn generated_id_when_no_custom_id() {
        let dir = tempfile::tempdir().unwrap();
        let client = MemoryClient::local_only(LocalStore::open(dir.path().join("m.json")));
        let mut e = entry("", "v");
        e.custom_id = None;
        e.container_tag = Container::Learnings;
        let id = client.add(e).await.unwrap();
        assert!(id.starts_with("learnings-"), "got {id}");
    }

    #[test]
    fn storage_mode_wire_names() {
        assert_eq!(serde_json::to_string(&StorageMode::Remote).unwrap(), "\"api\"");
        assert_eq!(serde_json::to_string(&StorageMode::Local).unwrap(), "\"local\"");
    }
}
