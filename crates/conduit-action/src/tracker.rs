//! In-flight execution tracking.
//!
//! The tracker is the only shared mutable structure on the dispatch path.
//! Admission (capacity check + insert) and release are each a single
//! critical section, so the cap holds under parallel dispatch.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use conduit_core::types::ExecutionId;
use tokio::task::AbortHandle;

use crate::error::DispatchError;
use crate::handler::ActionCancel;
use crate::types::{ExecutionContext, ExecutionRecord};

struct Tracked {
    record: ExecutionRecord,
    context: ExecutionContext,
    canceller: Option<Arc<dyn ActionCancel>>,
    abort: Option<AbortHandle>,
}

/// An execution taken out of the tracker for cancellation.
pub struct Evicted {
    pub record: ExecutionRecord,
    context: ExecutionContext,
    canceller: Option<Arc<dyn ActionCancel>>,
    abort: Option<AbortHandle>,
}

impl Evicted {
    /// Invoke the cancel hook, then abort the task.
    pub fn cancel(self) {
        if let Some(canceller) = &self.canceller {
            canceller.cancel(self.record.execution_id, &self.context);
        }
        if let Some(abort) = &self.abort {
            abort.abort();
        }
    }
}

pub struct ExecutionTracker {
    limit: usize,
    inflight: Mutex<HashMap<ExecutionId, Tracked>>,
}

impl ExecutionTracker {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            inflight: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ExecutionId, Tracked>> {
        self.inflight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Insert `record` if there is room, returning a guard that removes it
    /// when dropped.
    pub fn try_admit(
        &self,
        record: ExecutionRecord,
        context: ExecutionContext,
        canceller: Option<Arc<dyn ActionCancel>>,
    ) -> Result<ExecutionGuard<'_>, DispatchError> {
        let mut inflight = self.lock();
        if inflight.len() >= self.limit {
            return Err(DispatchError::ConcurrencyLimit { limit: self.limit });
        }
        let id = record.execution_id;
        inflight.insert(
            id,
            Tracked {
                record,
                context,
                canceller,
                abort: None,
            },
        );
        Ok(ExecutionGuard {
            tracker: self,
            id,
            abort: None,
        })
    }

    /// Remove one execution. Returns whether it was still tracked.
    fn release(&self, id: ExecutionId) -> bool {
        self.lock().remove(&id).is_some()
    }

    fn attach(&self, id: ExecutionId, abort: AbortHandle) {
        if let Some(tracked) = self.lock().get_mut(&id) {
            tracked.abort = Some(abort);
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: ExecutionId) -> bool {
        self.lock().contains_key(&id)
    }

    /// Snapshot of in-flight records, oldest first.
    pub fn snapshot(&self) -> Vec<ExecutionRecord> {
        let mut records: Vec<ExecutionRecord> =
            self.lock().values().map(|t| t.record.clone()).collect();
        records.sort_by_key(|r| r.started_at);
        records
    }

    /// Remove every execution, handing them back for cancellation.
    pub fn drain(&self) -> Vec<Evicted> {
        self.lock()
            .drain()
            .map(|(_, t)| Evicted {
                record: t.record,
                context: t.context,
                canceller: t.canceller,
                abort: t.abort,
            })
            .collect()
    }
}

/// Owns one tracker slot. Dropping it releases the slot exactly once and
/// aborts the attached task if it is still running.
pub struct ExecutionGuard<'a> {
    tracker: &'a ExecutionTracker,
    id: ExecutionId,
    abort: Option<AbortHandle>,
}

impl ExecutionGuard<'_> {
    pub fn id(&self) -> ExecutionId {
        self.id
    }

    /// Record the task running this execution so it can be aborted.
    pub fn attach(&mut self, abort: AbortHandle) {
        self.tracker.attach(self.id, abort.clone());
        self.abort = Some(abort);
    }
}

impl Drop for ExecutionGuard<'_> {
    fn drop(&mut self) {
        if let Some(abort) = self.abort.take() {
            abort.abort();
        }
        if !self.tracker.release(self.id) {
            tracing::debug!(execution_id = %self.id, "Execution already evicted");
        }
    }
}
