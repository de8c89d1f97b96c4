//! Lamad Sync - asynchronous data synchronization for the progress client
//!
//! Every read the client performs against a remote collaborator goes through
//! a [`Binding`]: a loader bound to reactive state and mirrored into a shared
//! [`FetchCache`].
//!
//! # Architecture
//!
//! ```text
//! consumer ──bind──▶ DataSynchronizer ──▶ Binding<T> ──spawn──▶ loader
//!                          │                  │                   │
//!                          ▼                  ▼                   │
//!                     FetchCache ◀──mirror── SyncState<T> ◀─apply─┘
//!                                        (generation-checked)
//! ```

// Error taxonomy
pub mod error;

// Process-wide fetch cache
pub mod cache;

// Loader bindings and reactive state
pub mod synchronizer;

pub use cache::{CacheEntry, CacheStatsSnapshot, FetchCache};
pub use error::{ErrorKind, LamadError, Result};
pub use synchronizer::{
    BindOptions, Binding, DataSynchronizer, SyncConfig, SyncState, DEFAULT_LOAD_TIMEOUT,
};
