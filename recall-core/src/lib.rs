//! # recall core library
//!
//! Note memory with a remote memory API in front of a local JSON file.
//!
//! Entries live in named **containers** (`blake`, `slidetheory`,
//! `decisions`, …) and are found again through keyword recall:
//!
//! - [`MemoryClient`]: storage client. Talks to a [`RemoteMemory`] while it
//!   works and drops to the local file for good after the first failure
//!   (the [`FallbackLatch`]).
//! - [`MemorySystem`]: the facade most callers want: `remember` / `recall`,
//!   the typed `store_*` wrappers, intent-routed `smart_recall`, and a TTL
//!   cache in front of search.
//! - [`LocalStore`]: the on-disk JSON array, rewritten wholesale on every
//!   mutation.
//!
//! ## Consistency
//!
//! There is no file locking. Two processes sharing one file can lose each
//! other's writes (last writer wins). Within a process the store is guarded
//! by a mutex.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod ids;
pub mod intent;
pub mod local;
pub mod memory;
pub mod search;
pub mod templates;
pub mod types;

pub use client::{FallbackLatch, MemoryClient, RemoteMemory, StorageMode};
pub use config::RecallConfig;
pub use error::RecallError;
pub use local::{LocalStore, MemoryStats};
pub use memory::{InitStatus, MemorySystem, SmartRecall};
pub use types::*;
