//! Live association between a consumer and a loader.
//!
//! Every load cycle takes a fresh generation number at dispatch time. When
//! the loader settles, its result is applied only if that number is still the
//! newest and the consumer is still attached, so a slow early response can
//! never overwrite a faster later one. Loaders run in their own task and are
//! never cancelled; losing the race only suppresses their effect.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::state::SyncState;
use crate::cache::FetchCache;
use crate::error::{LamadError, Result};

pub(crate) type BoxLoader<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T>> + Send + Sync>;

/// Serialized form of a watch list, compared to decide when to reload.
pub(crate) fn fingerprint(deps: &[Value]) -> String {
    serde_json::to_string(deps).unwrap_or_default()
}

pub(crate) struct BindingShared<T> {
    pub(crate) loader: BoxLoader<T>,
    pub(crate) cache: Arc<FetchCache>,
    pub(crate) cache_key: Option<String>,
    pub(crate) timeout: Duration,
    pub(crate) immediate: bool,
    pub(crate) enabled: AtomicBool,
    pub(crate) attached: AtomicBool,
    pub(crate) generation: AtomicU64,
    pub(crate) watch_fingerprint: Mutex<String>,
    pub(crate) state: watch::Sender<SyncState<T>>,
}

impl<T> BindingShared<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation && self.attached.load(Ordering::SeqCst)
    }

    /// Take a new generation, unless `quiet` flip the state to loading, and
    /// invoke the loader.
    pub(crate) fn begin_cycle(&self, quiet: bool) -> (u64, BoxFuture<'static, Result<T>>) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if !quiet && self.attached.load(Ordering::SeqCst) {
            self.state.send_modify(|state| {
                *state = std::mem::take(state).into_loading();
            });
        }
        debug!(key = ?self.cache_key, generation, "load cycle dispatched");
        (generation, (self.loader)())
    }

    /// Run the loader for an already-dispatched generation and apply its
    /// outcome if it is still current.
    pub(crate) async fn finish_cycle(
        self: Arc<Self>,
        generation: u64,
        load: BoxFuture<'static, Result<T>>,
    ) -> Option<T> {
        let task = tokio::spawn(load);

        let outcome = match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) if join_err.is_panic() => {
                Err(LamadError::Unknown("loader panicked".into()))
            }
            Ok(Err(join_err)) => Err(LamadError::unknown(join_err)),
            Err(_) => Err(LamadError::Timeout(self.timeout)),
        };

        self.apply(generation, &outcome);
        outcome.ok()
    }

    /// Spawn a full cycle in the background.
    pub(crate) fn dispatch(self: &Arc<Self>, quiet: bool) {
        let (generation, load) = self.begin_cycle(quiet);
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            shared.finish_cycle(generation, load).await;
        });
    }

    fn apply(&self, generation: u64, outcome: &Result<T>) -> bool {
        // The currency check runs under the channel lock so a result cannot be
        // applied between a newer dispatch and its own application.
        self.state.send_if_modified(|state| {
            if !self.is_current(generation) {
                debug!(key = ?self.cache_key, generation, "discarding stale load result");
                return false;
            }

            match outcome {
                Ok(value) => {
                    self.mirror(Some(value));
                    *state = SyncState::Success(value.clone());
                }
                Err(error) => {
                    warn!(key = ?self.cache_key, generation, error = %error, "load failed");
                    *state = std::mem::take(state).into_failure(error.clone());
                }
            }
            true
        })
    }

    /// Write `value` into the fetch cache, or delete the entry for `None`.
    fn mirror(&self, value: Option<&T>) {
        let Some(key) = self.cache_key.as_deref() else {
            return;
        };

        match value {
            Some(value) => match serde_json::to_value(value) {
                Ok(json) => self.cache.set(key, json),
                Err(e) => warn!(key = %key, error = %e, "value not cacheable"),
            },
            None => {
                self.cache.delete(key);
            }
        }
    }
}

/// Reactive handle returned by [`DataSynchronizer::bind`](super::DataSynchronizer::bind).
///
/// Dropping the handle detaches the consumer; loads still in flight finish in
/// the background but no longer touch the state or the cache.
pub struct Binding<T> {
    pub(crate) shared: Arc<BindingShared<T>>,
}

impl<T> Binding<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Snapshot of the current state.
    pub fn state(&self) -> SyncState<T> {
        self.shared.state.borrow().clone()
    }

    /// Receiver that is notified on every applied change.
    pub fn subscribe(&self) -> watch::Receiver<SyncState<T>> {
        self.shared.state.subscribe()
    }

    pub fn data(&self) -> Option<T> {
        self.shared.state.borrow().data().cloned()
    }

    pub fn loading(&self) -> bool {
        self.shared.state.borrow().is_loading()
    }

    pub fn error(&self) -> Option<LamadError> {
        self.shared.state.borrow().error().cloned()
    }

    pub fn has_data(&self) -> bool {
        self.shared.state.borrow().has_data()
    }

    pub fn cache_key(&self) -> Option<&str> {
        self.shared.cache_key.as_deref()
    }

    /// Generation of the most recently dispatched load.
    pub fn generation(&self) -> u64 {
        self.shared.generation.load(Ordering::SeqCst)
    }

    pub fn is_enabled(&self) -> bool {
        self.shared.enabled.load(Ordering::SeqCst)
    }

    /// Run exactly one load cycle and return its value, or `None` on failure.
    ///
    /// Ignores `immediate` and the watch list, but a disabled binding does not
    /// run its loader at all.
    pub async fn refetch(&self) -> Option<T> {
        if !self.is_enabled() {
            debug!(key = ?self.shared.cache_key, "refetch skipped, binding disabled");
            return None;
        }
        let (generation, load) = self.shared.begin_cycle(false);
        Arc::clone(&self.shared).finish_cycle(generation, load).await
    }

    /// Replace the data without running the loader.
    pub fn set_data(&self, value: Option<T>) {
        self.update_data(|_| value);
    }

    /// Derive new data from the current value without running the loader.
    pub fn update_data<F>(&self, updater: F)
    where
        F: FnOnce(Option<&T>) -> Option<T>,
    {
        self.shared.state.send_modify(|state| {
            let next = updater(state.data());
            self.shared.mirror(next.as_ref());
            *state = std::mem::take(state).with_data(next);
        });
    }

    /// Remove the cache entry. Data already bound stays in place.
    pub fn invalidate(&self) {
        if let Some(key) = self.shared.cache_key.as_deref() {
            self.shared.cache.delete(key);
        }
    }

    /// Update the watch list. Starts a new cycle when its serialized form
    /// changed and the binding is enabled and immediate. Returns whether a
    /// cycle was started.
    pub fn set_watch(&self, deps: Vec<Value>) -> bool {
        let next = fingerprint(&deps);
        {
            let mut current = match self.shared.watch_fingerprint.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if *current == next {
                return false;
            }
            *current = next;
        }

        if self.is_enabled() && self.shared.immediate {
            self.shared.dispatch(false);
            true
        } else {
            false
        }
    }

    /// Toggle execution. Re-enabling an immediate binding starts a cycle.
    pub fn set_enabled(&self, enabled: bool) {
        let was = self.shared.enabled.swap(enabled, Ordering::SeqCst);
        if enabled && !was && self.shared.immediate {
            self.shared.dispatch(false);
        }
    }

    /// Stop any pending load from mutating state.
    pub fn detach(&self) {
        if self.shared.attached.swap(false, Ordering::SeqCst) {
            debug!(key = ?self.shared.cache_key, "binding detached");
        }
    }

    pub fn is_attached(&self) -> bool {
        self.shared.attached.load(Ordering::SeqCst)
    }
}

impl<T> Drop for Binding<T> {
    fn drop(&mut self) {
        self.shared.attached.store(false, Ordering::SeqCst);
    }
}
