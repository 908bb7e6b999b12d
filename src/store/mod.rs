//! Job state store: the durable slot that carries a job across navigations.
//!
//! One serialized [`JobState`] per [`JobKey`]. The key stands for the tab /
//! profile identity a job is bound to; nothing else about a job survives a
//! page load.

mod file;
mod memory;

pub use file::FileJobStore;
pub use memory::MemoryJobStore;

use anyhow::Result;
use std::fmt;

use crate::core::types::JobState;

/// Identity a job is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobKey(String);

impl JobKey {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        let key = key.trim();
        if key.is_empty() {
            Self::default()
        } else {
            Self(key.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Filesystem-safe form used as a file stem.
    pub fn file_stem(&self) -> String {
        self.0
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }
}

impl Default for JobKey {
    fn default() -> Self {
        Self("default".to_string())
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub trait JobStore: Send + Sync {
    /// `Ok(None)` when no job is bound to `key`.
    fn get(&self, key: &JobKey) -> Result<Option<JobState>>;

    fn set(&self, key: &JobKey, job: &JobState) -> Result<()>;

    /// Reset the slot to absent. Clearing an empty slot is not an error.
    fn clear(&self, key: &JobKey) -> Result<()>;
}
