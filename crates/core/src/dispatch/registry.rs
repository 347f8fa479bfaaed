//! Registry of in-flight requests
//!
//! Maps transport task ids to the callback that must receive the task's
//! outcome. Retrieval removes the entry in the same step, which is what makes
//! delivery at-most-once.

use std::fmt;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::trace;

use crate::response::{RequestError, ResponseCallback};
use crate::transport::TaskId;

/// Registry lookup failures
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Task {0} is already registered")]
    DuplicateTaskId(TaskId),

    #[error("Task {0} is not registered")]
    UnknownTaskId(TaskId),
}

impl From<RegistryError> for RequestError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::DuplicateTaskId(id) => Self::DuplicateTaskId(id),
            RegistryError::UnknownTaskId(id) => Self::UnknownTaskId(id),
        }
    }
}

/// Rejected registration; hands the callback back so it can still be answered
pub struct DuplicateRegistration {
    pub task_id: TaskId,
    pub callback: ResponseCallback,
}

impl fmt::Debug for DuplicateRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DuplicateRegistration").field("task_id", &self.task_id).finish()
    }
}

impl fmt::Display for DuplicateRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        RegistryError::DuplicateTaskId(self.task_id).fmt(f)
    }
}

impl std::error::Error for DuplicateRegistration {}

/// Thread-safe map of pending request callbacks, one per client instance
#[derive(Default)]
pub struct TaskRegistry {
    // Callbacks are only `Send`; the mutex keeps the map `Sync`
    pending: DashMap<TaskId, Mutex<ResponseCallback>>,
}

impl TaskRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the callback for a freshly created task
    ///
    /// # Errors
    /// Returns the callback inside [`DuplicateRegistration`] if `task_id` is
    /// already pending; the existing entry is left untouched.
    pub fn register(
        &self,
        task_id: TaskId,
        callback: ResponseCallback,
    ) -> Result<(), DuplicateRegistration> {
        match self.pending.entry(task_id) {
            Entry::Occupied(_) => Err(DuplicateRegistration { task_id, callback }),
            Entry::Vacant(slot) => {
                slot.insert(Mutex::new(callback));
                trace!(%task_id, "Registered pending request");
                Ok(())
            }
        }
    }

    /// Remove and return the callback for `task_id`
    ///
    /// # Errors
    /// Returns `RegistryError::UnknownTaskId` if nothing is pending under the id.
    pub fn take(&self, task_id: TaskId) -> Result<ResponseCallback, RegistryError> {
        self.pending
            .remove(&task_id)
            .map(|(_, callback)| callback.into_inner())
            .ok_or(RegistryError::UnknownTaskId(task_id))
    }

    /// Drop every pending callback without invoking it
    ///
    /// Returns how many were dropped. Awaiters bridged through a channel see
    /// their sender go away.
    pub fn clear(&self) -> usize {
        let mut dropped = 0;
        self.pending.retain(|_, _| {
            dropped += 1;
            false
        });
        if dropped > 0 {
            trace!(dropped, "Cleared pending requests");
        }
        dropped
    }

    #[must_use]
    pub fn contains(&self, task_id: TaskId) -> bool {
        self.pending.contains_key(&task_id)
    }

    /// Number of requests still waiting for a completion
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRegistry").field("pending", &self.pending.len()).finish()
    }
}
