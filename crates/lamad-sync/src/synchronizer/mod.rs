//! Data synchronizer
//!
//! Orchestrates one loader per binding on top of the shared [`FetchCache`]:
//! - Hydrates new bindings from the cache without a loading flicker
//! - Races each load against a timeout
//! - Discards results from superseded or detached load cycles
//! - Mirrors applied results back into the cache

mod binding;
mod state;

pub use binding::Binding;
pub use state::SyncState;

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::cache::FetchCache;
use crate::error::Result;
use binding::{fingerprint, BindingShared};

/// Default time budget for a single load cycle.
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Synchronizer configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// How long a loader may run before the cycle fails with `Timeout`
    pub load_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            load_timeout: DEFAULT_LOAD_TIMEOUT,
        }
    }
}

/// Per-binding options.
#[derive(Debug, Clone)]
pub struct BindOptions {
    /// When false, nothing runs and existing data is left alone
    pub enabled: bool,
    /// When false, only `refetch()` runs the loader
    pub immediate: bool,
    /// Mirror results into the fetch cache under this key
    pub cache_key: Option<String>,
    /// Dependency list; a changed serialization starts a new cycle
    pub watch: Vec<Value>,
}

impl Default for BindOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            immediate: true,
            cache_key: None,
            watch: Vec::new(),
        }
    }
}

impl BindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_immediate(mut self, immediate: bool) -> Self {
        self.immediate = immediate;
        self
    }

    pub fn with_watch(mut self, watch: Vec<Value>) -> Self {
        self.watch = watch;
        self
    }
}

/// Binds loaders to reactive state backed by a shared fetch cache.
///
/// # Example
///
/// ```rust,ignore
/// let sync = DataSynchronizer::new(Arc::new(FetchCache::new()));
///
/// let binding = sync.bind(
///     move || {
///         let store = store.clone();
///         async move { load_path(&store, "p1").await }
///     },
///     BindOptions::new().with_cache_key("path-p1"),
/// );
///
/// let mut rx = binding.subscribe();
/// rx.wait_for(|s| !s.is_loading()).await?;
/// ```
#[derive(Clone)]
pub struct DataSynchronizer {
    cache: Arc<FetchCache>,
    config: SyncConfig,
}

impl DataSynchronizer {
    pub fn new(cache: Arc<FetchCache>) -> Self {
        Self {
            cache,
            config: SyncConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    pub fn cache(&self) -> &Arc<FetchCache> {
        &self.cache
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Bind a loader. Must be called inside a tokio runtime when the binding
    /// is enabled and immediate, since the first cycle is spawned right away.
    pub fn bind<T, F, Fut>(&self, loader: F, options: BindOptions) -> Binding<T>
    where
        T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let hydrated = options.cache_key.as_deref().and_then(|key| self.hydrate::<T>(key));
        let seeded = hydrated.is_some();
        let auto_load = options.enabled && options.immediate;

        let initial = match hydrated {
            Some(value) => SyncState::Success(value),
            None if auto_load => SyncState::Loading { stale: None },
            None => SyncState::Idle,
        };
        let (state, _) = watch::channel(initial);

        let shared = Arc::new(BindingShared {
            loader: Arc::new(move || loader().boxed()),
            cache: Arc::clone(&self.cache),
            cache_key: options.cache_key,
            timeout: self.config.load_timeout,
            immediate: options.immediate,
            enabled: AtomicBool::new(options.enabled),
            attached: AtomicBool::new(true),
            generation: AtomicU64::new(0),
            watch_fingerprint: Mutex::new(fingerprint(&options.watch)),
            state,
        });

        if auto_load {
            // Cache-seeded bindings revalidate without flipping to loading.
            shared.dispatch(seeded);
        }

        Binding { shared }
    }

    fn hydrate<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.cache.get(key)?;
        match serde_json::from_value(value) {
            Ok(data) => {
                debug!(key = %key, "binding hydrated from cache");
                Some(data)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "cached value has unexpected shape, ignoring");
                None
            }
        }
    }
}
