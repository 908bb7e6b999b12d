//! JSON-file job store.
//!
//! Each key gets `{dir}/{key}.json`. Writes are atomic (write-to-temp then
//! rename) so an interrupted run never leaves a half-written document behind.

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{JobKey, JobStore};
use crate::core::types::JobState;

#[derive(Debug, Clone)]
pub struct FileJobStore {
    dir: PathBuf,
}

impl FileJobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &JobKey) -> PathBuf {
        self.dir.join(format!("{}.json", key.file_stem()))
    }
}

impl JobStore for FileJobStore {
    fn get(&self, key: &JobKey) -> Result<Option<JobState>> {
        let path = self.path_for(key);
        let content = match std::fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(anyhow!("job_store: failed to read {}: {}", path.display(), e))
            }
        };
        let job = serde_json::from_str::<JobState>(&content)
            .with_context(|| format!("job_store: failed to parse {}", path.display()))?;
        Ok(Some(job))
    }

    fn set(&self, key: &JobKey, job: &JobState) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("job_store: failed to create {}", self.dir.display()))?;

        let path = self.path_for(key);
        let json = serde_json::to_string_pretty(job).context("job_store: serialization failed")?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)
            .with_context(|| format!("job_store: failed to write temp file {}", tmp.display()))?;
        std::fs::rename(&tmp, &path).with_context(|| {
            format!(
                "job_store: failed to rename {} → {}",
                tmp.display(),
                path.display()
            )
        })?;
        debug!(
            "job_store: persisted job {} (action {}) to {}",
            job.job_id,
            job.action_id,
            path.display()
        );
        Ok(())
    }

    fn clear(&self, key: &JobKey) -> Result<()> {
        let path = self.path_for(key);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                info!("job_store: cleared job slot '{}'", key);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(anyhow!(
                "job_store: failed to remove {}: {}",
                path.display(),
                e
            )),
        }
    }
}
