//! Run tracker: background pipeline runs, at most one per user, each
//! result consumed once.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::task::{AbortHandle, JoinHandle};

use crate::architecture::Architecture;
use crate::error::{MetacogError, MetacogResult};
use crate::types::{ConversationHistory, Event};

/// One user's run. The entry stays in the tracker until the join completes;
/// the handle is taken only once the task has finished.
struct RunSlot {
    abort: AbortHandle,
    handle: Mutex<Option<JoinHandle<MetacogResult<String>>>>,
}

/// Tracks in-flight pipeline runs by user id.
///
/// Runs are spawned onto the current tokio runtime, so `start_*` must be
/// called from within one.
pub struct RunTracker {
    architecture: Arc<Architecture>,
    runs: DashMap<String, Arc<RunSlot>>,
}

impl RunTracker {
    pub fn new(architecture: Arc<Architecture>) -> Self {
        Self {
            architecture,
            runs: DashMap::new(),
        }
    }

    /// Start a run for the event implied by the last message's author.
    pub fn start_run(&self, user_id: &str, history: ConversationHistory) -> MetacogResult<bool> {
        let last = history.last().ok_or(MetacogError::EmptyConversation)?;
        let event = Event::for_role(last.role);
        self.start_event(user_id, event, history)
    }

    /// Spawn the user's chains for `event` in the background.
    ///
    /// Returns `Ok(false)` without tracking anything when no chain listens to
    /// `event`. Fails with [`MetacogError::RunInFlight`] while an earlier run
    /// for the same user has not been consumed, including while it is being
    /// awaited; that run is left untouched.
    pub fn start_event(
        &self,
        user_id: &str,
        event: Event,
        history: ConversationHistory,
    ) -> MetacogResult<bool> {
        if history.is_empty() {
            return Err(MetacogError::EmptyConversation);
        }
        if self.runs.contains_key(user_id) {
            return Err(run_in_flight(user_id));
        }

        // Built outside the shard lock.
        let mut manager = self.architecture.manager_for(user_id)?;
        if manager.chains_for(event).is_empty() {
            return Ok(false);
        }

        match self.runs.entry(user_id.to_string()) {
            Entry::Occupied(_) => Err(run_in_flight(user_id)),
            Entry::Vacant(slot) => {
                tracing::info!(user_id, %event, "pipeline run started");
                let handle = tokio::spawn(async move {
                    manager.on_event(event, &history).await?;
                    Ok::<_, MetacogError>(manager.get_context())
                });
                slot.insert(Arc::new(RunSlot {
                    abort: handle.abort_handle(),
                    handle: Mutex::new(Some(handle)),
                }));
                Ok(true)
            }
        }
    }

    /// Wait for the user's run and take its agent context.
    ///
    /// `Ok(None)` when no run is tracked. The run stays tracked until its task
    /// has finished, so a second start is rejected while this waits, and a
    /// dropped waiter leaves the result for the next caller. Each result is
    /// handed out once; a failed run's error is returned as is.
    pub async fn await_context(&self, user_id: &str) -> MetacogResult<Option<String>> {
        let Some(slot) = self.runs.get(user_id).map(|r| Arc::clone(r.value())) else {
            return Ok(None);
        };

        let mut guard = slot.handle.lock().await;
        let Some(handle) = guard.as_mut() else {
            return Ok(None);
        };
        let joined = handle.await;
        guard.take();
        self.runs.remove_if(user_id, |_, s| Arc::ptr_eq(s, &slot));
        drop(guard);

        let context = joined.map_err(|e| MetacogError::TaskFailed(e.to_string()))??;
        tracing::debug!(user_id, len = context.len(), "pipeline run consumed");
        Ok(Some(context))
    }

    pub fn is_running(&self, user_id: &str) -> bool {
        self.runs.contains_key(user_id)
    }

    /// Abort and forget the user's run. Returns whether one was tracked.
    pub fn cancel(&self, user_id: &str) -> bool {
        match self.runs.remove(user_id) {
            Some((_, slot)) => {
                slot.abort.abort();
                tracing::debug!(user_id, "pipeline run cancelled");
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}

fn run_in_flight(user_id: &str) -> MetacogError {
    MetacogError::RunInFlight {
        user_id: user_id.to_string(),
    }
}
