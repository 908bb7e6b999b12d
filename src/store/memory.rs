use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::sync::Mutex;

use super::{JobKey, JobStore};
use crate::core::types::JobState;

/// In-process store. Keeps every persisted snapshot so callers can replay
/// the history of a job.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    slots: Mutex<HashMap<JobKey, JobState>>,
    history: Mutex<Vec<JobState>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every document passed to `set`, oldest first.
    pub fn snapshots(&self) -> Vec<JobState> {
        self.history
            .lock()
            .map(|h| h.clone())
            .unwrap_or_default()
    }
}

impl JobStore for MemoryJobStore {
    fn get(&self, key: &JobKey) -> Result<Option<JobState>> {
        let slots = self
            .slots
            .lock()
            .map_err(|_| anyhow!("memory store poisoned"))?;
        Ok(slots.get(key).cloned())
    }

    fn set(&self, key: &JobKey, job: &JobState) -> Result<()> {
        self.slots
            .lock()
            .map_err(|_| anyhow!("memory store poisoned"))?
            .insert(key.clone(), job.clone());
        self.history
            .lock()
            .map_err(|_| anyhow!("memory store poisoned"))?
            .push(job.clone());
        Ok(())
    }

    fn clear(&self, key: &JobKey) -> Result<()> {
        self.slots
            .lock()
            .map_err(|_| anyhow!("memory store poisoned"))?
            .remove(key);
        Ok(())
    }
}
