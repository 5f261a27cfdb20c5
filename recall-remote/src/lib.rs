//! # recall-remote: HTTP backend for recall
//!
//! Implements [`recall_core::RemoteMemory`] against the Supermemory API
//! (`/add`, `/search`) with `reqwest`.
//!
//! Errors come back as [`RemoteError`] and convert into
//! [`recall_core::RecallError::Remote`]. The core's `MemoryClient` treats
//! any such error as the signal to latch into local mode, so nothing here
//! retries.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]

pub mod client;
pub mod error;

pub use client::SupermemoryClient;
pub use error::RemoteError;
