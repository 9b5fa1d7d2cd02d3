//! In-memory registry of launched download processes, keyed by filename

use crate::types::JobState;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Tracks the state of every download launched by this process
#[derive(Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<Mutex<HashMap<String, JobState>>>,
}

impl JobRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, JobState>> {
        self.jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a new run for `filename`
    ///
    /// Returns `false` when the file is already being written or was already
    /// completed, in which case no new process should be launched. A failed
    /// job may be started again.
    pub fn try_begin(&self, filename: &str) -> bool {
        let mut jobs = self.lock();
        match jobs.get(filename) {
            Some(JobState::Running { .. }) | Some(JobState::Completed) => false,
            _ => {
                jobs.insert(filename.to_string(), JobState::Running { progress: 0 });
                true
            }
        }
    }

    /// Record progress for a running job
    pub fn set_progress(&self, filename: &str, percent: u8) {
        if let Some(JobState::Running { progress }) = self.lock().get_mut(filename) {
            *progress = percent.min(100);
        }
    }

    /// Record the end of a job
    pub fn finish(&self, filename: &str, result: Result<(), String>) {
        let state = match result {
            Ok(()) => JobState::Completed,
            Err(message) => JobState::Failed { message },
        };
        self.lock().insert(filename.to_string(), state);
    }

    /// Current state of a job, if it was launched by this process
    pub fn state(&self, filename: &str) -> Option<JobState> {
        self.lock().get(filename).cloned()
    }

    /// Number of jobs still running
    pub fn running(&self) -> usize {
        self.lock()
            .values()
            .filter(|s| matches!(s, JobState::Running { .. }))
            .count()
    }
}
