//! Queue State Store: serialises intents and publishes immutable snapshots

use super::intent::{Intent, NoOpReason, Outcome};
use super::reducer::reduce;
use crate::types::{Event, QueueSnapshot, QueueStats, Quality, TaskStatus, VideoId};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

/// A task admitted by [`QueueStore::admit`], ready to be handed to the executor
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Admission {
    /// Task id
    pub id: VideoId,
    /// Attempt number assigned by this admission
    pub attempt: u32,
    /// Title sent to the executor
    pub title: String,
    /// Quality sent to the executor
    pub quality: Quality,
}

/// Authoritative owner of the queue
///
/// Every mutation runs inside the `watch` channel's write lock, so intents are
/// applied one at a time and readers only ever see whole snapshots.
#[derive(Debug)]
pub struct QueueStore {
    snapshot_tx: watch::Sender<Arc<QueueSnapshot>>,
    event_tx: broadcast::Sender<Event>,
}

impl QueueStore {
    /// Create an empty queue with the given concurrency budget
    pub fn new(budget: usize, event_tx: broadcast::Sender<Event>) -> Self {
        let (snapshot_tx, _) = watch::channel(Arc::new(QueueSnapshot {
            tasks: Vec::new(),
            budget,
        }));
        Self {
            snapshot_tx,
            event_tx,
        }
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<QueueSnapshot> {
        self.snapshot_tx.borrow().clone()
    }

    /// Receive every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<Arc<QueueSnapshot>> {
        self.snapshot_tx.subscribe()
    }

    /// Apply one intent and publish the result if anything changed
    pub fn dispatch(&self, intent: Intent) -> Outcome {
        let mut outcome = Outcome::NoOp(NoOpReason::Unchanged);
        let mut events = Vec::new();

        self.snapshot_tx.send_if_modified(|current| {
            let reduction = reduce(current, &intent);
            outcome = reduction.outcome;
            match reduction.state {
                Some(next) => {
                    *current = Arc::new(next);
                    events = reduction.events;
                    true
                }
                None => false,
            }
        });

        match &outcome {
            Outcome::NoOp(reason) => {
                tracing::debug!(intent = intent.name(), ?reason, "Intent left queue unchanged")
            }
            _ => tracing::debug!(intent = intent.name(), ?outcome, "Intent applied"),
        }

        self.emit(events);
        outcome
    }

    /// Admit queued tasks into free concurrency slots, oldest first
    ///
    /// Planning and the `starting` transitions happen under one lock, so two
    /// callers can never admit into the same slot.
    pub fn admit(&self) -> Vec<Admission> {
        let mut admitted = Vec::new();
        let mut events = Vec::new();

        self.snapshot_tx.send_if_modified(|current| {
            let slots = current.budget.saturating_sub(current.in_flight());
            if slots == 0 {
                return false;
            }

            let candidates: Vec<VideoId> = current
                .tasks
                .iter()
                .filter(|t| t.status == TaskStatus::Queued)
                .take(slots)
                .map(|t| t.id.clone())
                .collect();
            if candidates.is_empty() {
                return false;
            }

            let mut next = QueueSnapshot::clone(current);
            for id in candidates {
                let reduction = reduce(&next, &Intent::MarkStarting(id.clone()));
                let Some(state) = reduction.state else {
                    continue;
                };
                next = state;
                events.extend(reduction.events);
                if let Some(task) = next.get(&id) {
                    admitted.push(Admission {
                        id,
                        attempt: task.attempt,
                        title: task.title.clone(),
                        quality: task.selected_quality.clone(),
                    });
                }
            }
            *current = Arc::new(next);
            true
        });

        if !admitted.is_empty() {
            tracing::info!(count = admitted.len(), "Admitted queued tasks");
        }
        self.emit(events);
        admitted
    }

    /// Whether `attempt` is still the live, in-flight attempt of task `id`
    pub fn is_current(&self, id: &VideoId, attempt: u32) -> bool {
        self.snapshot_tx
            .borrow()
            .get(id)
            .is_some_and(|t| t.attempt == attempt && t.status.is_in_flight())
    }

    /// Average effective progress across the queue
    pub fn overall_progress(&self) -> f32 {
        self.snapshot_tx.borrow().overall_progress()
    }

    /// Per-status counts and derived progress
    pub fn stats(&self) -> QueueStats {
        self.snapshot_tx.borrow().stats()
    }

    fn emit(&self, events: Vec<Event>) {
        for event in events {
            // Ignore send errors - it's OK if there are no subscribers
            self.event_tx.send(event).ok();
        }
    }
}
