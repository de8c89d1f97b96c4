//! Reactive state published by a binding

use crate::error::LamadError;

/// Observable state of one binding.
///
/// `stale` carries the last good value while a reload is in flight or after
/// a failed reload, so consumers can keep rendering it under a spinner or an
/// error banner.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncState<T> {
    /// Nothing loaded and nothing in flight
    Idle,
    /// A load cycle is in flight
    Loading { stale: Option<T> },
    /// Last applied load (or explicit set) produced a value
    Success(T),
    /// Last applied load failed
    Failure { error: LamadError, stale: Option<T> },
}

impl<T> Default for SyncState<T> {
    fn default() -> Self {
        SyncState::Idle
    }
}

impl<T> SyncState<T> {
    pub(crate) fn from_data(data: Option<T>) -> Self {
        match data {
            Some(value) => SyncState::Success(value),
            None => SyncState::Idle,
        }
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            SyncState::Idle => None,
            SyncState::Success(value) => Some(value),
            SyncState::Loading { stale } | SyncState::Failure { stale, .. } => stale.as_ref(),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, SyncState::Loading { .. })
    }

    pub fn error(&self) -> Option<&LamadError> {
        match self {
            SyncState::Failure { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn has_data(&self) -> bool {
        self.data().is_some()
    }

    /// True when the visible data predates the latest load attempt.
    pub fn is_stale(&self) -> bool {
        matches!(
            self,
            SyncState::Loading { stale: Some(_) } | SyncState::Failure { stale: Some(_), .. }
        )
    }

    pub(crate) fn into_data(self) -> Option<T> {
        match self {
            SyncState::Idle => None,
            SyncState::Success(value) => Some(value),
            SyncState::Loading { stale } | SyncState::Failure { stale, .. } => stale,
        }
    }

    pub(crate) fn into_loading(self) -> Self {
        SyncState::Loading {
            stale: self.into_data(),
        }
    }

    pub(crate) fn into_failure(self, error: LamadError) -> Self {
        SyncState::Failure {
            error,
            stale: self.into_data(),
        }
    }

    /// Replace the data while keeping the loading/error phase.
    pub(crate) fn with_data(self, data: Option<T>) -> Self {
        match self {
            SyncState::Loading { .. } => SyncState::Loading { stale: data },
            SyncState::Failure { error, .. } => SyncState::Failure { error, stale: data },
            SyncState::Idle | SyncState::Success(_) => SyncState::from_data(data),
        }
    }
}
