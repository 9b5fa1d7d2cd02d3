//! Pure transition function of the queue
//!
//! `reduce` never fails: every `(status, intent)` pair either yields the next
//! snapshot or a [`NoOpReason`].

use super::intent::{Intent, NoOpReason, Outcome};
use crate::types::{Event, QueueSnapshot, Task, TaskStatus, VideoId};
use std::collections::HashSet;

/// Result of reducing one intent
#[derive(Clone, Debug, PartialEq)]
pub struct Reduction {
    /// What happened
    pub outcome: Outcome,
    /// The next snapshot, `None` when nothing changed
    pub state: Option<QueueSnapshot>,
    /// Events describing the change
    pub events: Vec<Event>,
}

impl Reduction {
    fn noop(reason: NoOpReason) -> Self {
        Self {
            outcome: Outcome::NoOp(reason),
            state: None,
            events: Vec::new(),
        }
    }

    fn changed(outcome: Outcome, state: QueueSnapshot, events: Vec<Event>) -> Self {
        Self {
            outcome,
            state: Some(state),
            events,
        }
    }
}

/// Apply `intent` to `state`
pub fn reduce(state: &QueueSnapshot, intent: &Intent) -> Reduction {
    match intent {
        Intent::Enqueue(videos) => enqueue(state, videos),
        Intent::MarkStarting(id) => update_task(state, id, |task| {
            match task.status {
                TaskStatus::Queued | TaskStatus::Error | TaskStatus::Paused => {}
                from => return Err(NoOpReason::InvalidTransition { from }),
            }
            task.status = TaskStatus::Starting;
            task.progress = 0;
            task.error_message = None;
            task.download_locator = None;
            task.pending_locator = None;
            task.attempt += 1;
            Ok(Event::Starting {
                id: task.id.clone(),
                attempt: task.attempt,
            })
        }),
        Intent::MarkInProgress {
            id,
            attempt,
            locator,
        } => update_task(state, id, |task| {
            check_attempt(task, *attempt)?;
            match task.status {
                TaskStatus::Starting => {}
                TaskStatus::InProgress => return Err(NoOpReason::Unchanged),
                from => return Err(NoOpReason::InvalidTransition { from }),
            }
            task.status = TaskStatus::InProgress;
            task.pending_locator = Some(locator.clone());
            Ok(Event::Accepted {
                id: task.id.clone(),
                filename: locator.filename.clone(),
            })
        }),
        Intent::ReportProgress {
            id,
            attempt,
            percent,
        } => update_task(state, id, |task| {
            check_attempt(task, *attempt)?;
            if task.status != TaskStatus::InProgress {
                return Err(NoOpReason::InvalidTransition { from: task.status });
            }
            let percent = (*percent).min(99);
            if task.progress == percent {
                return Err(NoOpReason::Unchanged);
            }
            task.progress = percent;
            Ok(Event::Progress {
                id: task.id.clone(),
                percent,
            })
        }),
        Intent::MarkReady {
            id,
            attempt,
            locator,
        } => update_task(state, id, |task| {
            check_attempt(task, *attempt)?;
            if !task.status.is_in_flight() {
                return Err(NoOpReason::InvalidTransition { from: task.status });
            }
            task.status = TaskStatus::Ready;
            task.progress = 100;
            task.download_locator = Some(locator.clone());
            task.pending_locator = None;
            task.error_message = None;
            Ok(Event::Ready {
                id: task.id.clone(),
                locator: locator.clone(),
            })
        }),
        Intent::MarkError {
            id,
            attempt,
            message,
        } => update_task(state, id, |task| {
            check_attempt(task, *attempt)?;
            if !task.status.is_in_flight() {
                return Err(NoOpReason::InvalidTransition { from: task.status });
            }
            task.status = TaskStatus::Error;
            task.progress = 0;
            task.error_message = Some(message.clone());
            task.download_locator = None;
            task.pending_locator = None;
            Ok(Event::Failed {
                id: task.id.clone(),
                error: message.clone(),
            })
        }),
        Intent::Pause(id) => update_task(state, id, |task| {
            match task.status {
                TaskStatus::Queued | TaskStatus::Starting | TaskStatus::InProgress => {}
                TaskStatus::Paused => return Err(NoOpReason::Unchanged),
                from => return Err(NoOpReason::InvalidTransition { from }),
            }
            task.status = TaskStatus::Paused;
            task.pending_locator = None;
            Ok(Event::Paused {
                id: task.id.clone(),
            })
        }),
        Intent::Resume(id) | Intent::Retry(id) => update_task(state, id, |task| {
            match task.status {
                TaskStatus::Paused | TaskStatus::Error => {}
                TaskStatus::Queued => return Err(NoOpReason::Unchanged),
                from => return Err(NoOpReason::InvalidTransition { from }),
            }
            task.status = TaskStatus::Queued;
            task.progress = 0;
            task.error_message = None;
            task.download_locator = None;
            Ok(Event::Requeued {
                id: task.id.clone(),
            })
        }),
        Intent::Remove(id) => {
            if state.get(id).is_none() {
                return Reduction::noop(NoOpReason::UnknownTask);
            }
            let mut next = state.clone();
            next.tasks.retain(|t| &t.id != id);
            Reduction::changed(
                Outcome::Removed { count: 1 },
                next,
                vec![Event::Removed { id: id.clone() }],
            )
        }
        Intent::ClearFinished => {
            let count = state.tasks.iter().filter(|t| t.status.is_finished()).count();
            if count == 0 {
                return Reduction::noop(NoOpReason::Unchanged);
            }
            let mut next = state.clone();
            next.tasks.retain(|t| !t.status.is_finished());
            Reduction::changed(
                Outcome::Removed { count },
                next,
                vec![Event::Cleared { count }],
            )
        }
        Intent::SetBudget(budget) => {
            if state.budget == *budget {
                return Reduction::noop(NoOpReason::Unchanged);
            }
            let mut next = state.clone();
            next.budget = *budget;
            Reduction::changed(
                Outcome::Applied,
                next,
                vec![Event::BudgetChanged { budget: *budget }],
            )
        }
    }
}

fn enqueue(state: &QueueSnapshot, videos: &[crate::types::VideoRef]) -> Reduction {
    let mut seen: HashSet<&VideoId> = state.tasks.iter().map(|t| &t.id).collect();
    let mut added = Vec::new();
    let mut skipped = 0;

    for video in videos {
        if seen.insert(&video.id) {
            added.push(Task::from_ref(video.clone()));
        } else {
            skipped += 1;
        }
    }

    let outcome = Outcome::Enqueued {
        added: added.len(),
        skipped,
    };
    if added.is_empty() {
        return Reduction {
            outcome,
            state: None,
            events: Vec::new(),
        };
    }

    let events = added
        .iter()
        .map(|t| Event::Queued {
            id: t.id.clone(),
            title: t.title.clone(),
            quality: t.selected_quality.clone(),
        })
        .collect();
    let mut next = state.clone();
    next.tasks.extend(added);
    Reduction::changed(outcome, next, events)
}

fn check_attempt(task: &Task, attempt: u32) -> Result<(), NoOpReason> {
    if task.attempt == attempt {
        Ok(())
    } else {
        Err(NoOpReason::StaleAttempt)
    }
}

fn update_task(
    state: &QueueSnapshot,
    id: &VideoId,
    apply: impl FnOnce(&mut Task) -> Result<Event, NoOpReason>,
) -> Reduction {
    let Some(index) = state.tasks.iter().position(|t| &t.id == id) else {
        return Reduction::noop(NoOpReason::UnknownTask);
    };

    let mut task = state.tasks[index].clone();
    match apply(&mut task) {
        Ok(event) => {
            let mut next = state.clone();
            next.tasks[index] = task;
            Reduction::changed(Outcome::Applied, next, vec![event])
        }
        Err(reason) => Reduction::noop(reason),
    }
}
