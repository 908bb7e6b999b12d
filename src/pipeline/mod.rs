//! Action Pipeline: the resumable five-action state machine.
//!
//! A [`Pipeline`] lives for exactly one page load. It is rebuilt from the
//! persisted [`JobState`] every time, runs the action the document points at,
//! persists every mutation, and hands back a [`Transition`] telling the host
//! what to do with the tab. Navigation ends the pipeline's life.

pub mod extract;
mod listing;
pub mod location;
mod reviews;
pub mod wait;

use chrono::Utc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::core::config::{ScoutConfig, TabMissingPolicy};
use crate::core::error::{PipelineError, PipelineResult};
use crate::core::types::{Action, DeliveryPayload, JobState, JobStatus, StatusCode};
use crate::scraping::inspector::{Control, PageInspector, Probe};
use crate::sink::{Exporter, OutputSink, SinkReply};
use crate::store::{JobKey, JobStore};
use location::expected_location;
use wait::Waiter;

/// What the host does after one pipeline step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Load this URL; the next load resumes the job.
    Navigate(String),
    /// No foreground work: no job, or a terminal/delivery status.
    Idle,
    /// Fatal path already applied (job cleared). Show `message`, go `home`.
    Aborted { message: String, home: String },
}

/// Knobs the actions read.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub search_url: String,
    /// Where the tab goes after a fatal error.
    pub home: String,
    pub places_per_page: u32,
    pub tab_policy: TabMissingPolicy,
    /// Pause after an in-page click that loads more content.
    pub dynamic_load: Duration,
}

impl PipelineSettings {
    pub fn from_config(cfg: &ScoutConfig) -> Self {
        Self {
            search_url: cfg.resolve_search_url(),
            home: cfg
                .resolve_home_locations()
                .into_iter()
                .next()
                .unwrap_or_default(),
            places_per_page: cfg.resolve_places_per_page(),
            tab_policy: cfg.resolve_tab_missing_policy(),
            dynamic_load: cfg.resolve_dynamic_load(),
        }
    }
}

/// Collaborators of one pipeline step.
#[derive(Clone, Copy)]
pub struct PipelineEnv<'a> {
    pub page: &'a dyn PageInspector,
    pub store: &'a dyn JobStore,
    pub sink: &'a dyn OutputSink,
    pub exporter: &'a dyn Exporter,
    pub waiter: &'a Waiter,
    pub settings: &'a PipelineSettings,
}

pub struct Pipeline<'a> {
    env: PipelineEnv<'a>,
    key: &'a JobKey,
    job: JobState,
}

impl<'a> Pipeline<'a> {
    /// Entry behaviour on every page load.
    ///
    /// `Err` only for store/page infrastructure failures; the job is then left
    /// as last persisted and can be resumed.
    pub async fn resume(env: PipelineEnv<'a>, key: &'a JobKey) -> anyhow::Result<Transition> {
        let Some(job) = env.store.get(key)? else {
            debug!("pipeline: no job bound to '{}', dormant", key);
            return Ok(Transition::Idle);
        };
        if job.status.code.is_foreground_terminal() {
            debug!(
                "pipeline: job {} is {}, nothing to do in the foreground",
                job.job_id,
                job.status.code.as_str()
            );
            return Ok(Transition::Idle);
        }

        let mut pipeline = Pipeline { env, key, job };
        match pipeline.step().await {
            Ok(t) => Ok(t),
            Err(e) if e.is_fatal() => pipeline.abort(e),
            Err(e) => Err(e.into()),
        }
    }

    async fn step(&mut self) -> PipelineResult<Transition> {
        let action = self
            .job
            .action()
            .ok_or(PipelineError::UnknownAction(self.job.action_id))?;

        let location = self
            .env
            .page
            .location()
            .await
            .map_err(PipelineError::Page)?;
        if !expected_location(action, &location) {
            return Err(PipelineError::LocationMismatch {
                location: location.to_string(),
            });
        }

        info!("pipeline: job {} at action {}", self.job.job_id, action);
        match action {
            Action::SubmitSearch => self.submit_search().await,
            Action::SelectCategoryTab => self.select_category_tab().await,
            Action::WalkListing => self.walk_listing().await,
            Action::WalkReviews => self.walk_reviews().await,
            Action::DeliverOutput => self.deliver_output().await,
        }
    }

    fn abort(&self, e: PipelineError) -> anyhow::Result<Transition> {
        let message = e.user_message();
        error!(
            "pipeline: job {} aborted at action {}: {}",
            self.job.job_id, self.job.action_id, message
        );
        self.env.store.clear(self.key)?;
        Ok(Transition::Aborted {
            message,
            home: self.env.settings.home.clone(),
        })
    }

    fn persist(&mut self) -> PipelineResult<()> {
        self.job.updated_at = Some(Utc::now());
        self.env
            .store
            .set(self.key, &self.job)
            .map_err(PipelineError::Store)
    }

    /// Move forward to `next`. Never moves backward.
    fn advance_to(&mut self, next: Action) {
        if next.id() > self.job.action_id {
            self.job.action_id = next.id();
        }
    }

    fn set_status(&mut self, code: StatusCode, message: impl Into<String>) {
        self.job.status = JobStatus::new(code, message);
    }

    // ── action 1 ────────────────────────────────────────────────────────────

    async fn submit_search(&mut self) -> PipelineResult<Transition> {
        let keyword = self.job.inputs.keyword.trim().to_string();
        if keyword.is_empty() {
            return Err(PipelineError::MissingInputs);
        }
        let url = location::search_url(&self.env.settings.search_url, &keyword).map_err(|e| {
            PipelineError::InvalidUrl(format!("{} ({})", self.env.settings.search_url, e))
        })?;

        self.set_status(StatusCode::Running, "searching...");
        self.advance_to(Action::SelectCategoryTab);
        self.persist()?;
        info!("pipeline: searching for '{}'", keyword);
        Ok(Transition::Navigate(url.to_string()))
    }

    // ── action 2 ────────────────────────────────────────────────────────────

    async fn select_category_tab(&mut self) -> PipelineResult<Transition> {
        let page = self.env.page;
        let waiter = self.env.waiter;

        if waiter.until_present(page, Probe::CategoryTabs).await? {
            let clicked = page
                .click(Control::AllResultsTab)
                .await
                .map_err(PipelineError::Page)?;
            if !clicked {
                warn!("pipeline: tab bar has no \"all results\" tab, staying on the current one");
            }
        } else {
            match self.env.settings.tab_policy {
                TabMissingPolicy::Fatal => {
                    return Err(PipelineError::ContainerMissing {
                        what: "\"all results\" tab",
                    })
                }
                TabMissingPolicy::Continue => {
                    warn!("pipeline: no category tabs on the results page, continuing")
                }
            }
        }

        if waiter.until_present(page, Probe::ShowMore).await? {
            page.click(Control::ShowMore)
                .await
                .map_err(PipelineError::Page)?;
            waiter.pause(self.env.settings.dynamic_load).await;
        } else {
            warn!("pipeline: \"show more\" button not found, using the visible results");
        }

        if waiter.until_present(page, Probe::ResultCount).await? {
            let label = page
                .result_count_label()
                .await
                .map_err(PipelineError::Page)?;
            match label.as_deref().and_then(parse_result_count) {
                Some(available) => {
                    let cap = self.job.inputs.max_places.min_with(available);
                    info!(
                        "pipeline: {} result(s) available, place cap {}",
                        available, cap
                    );
                    self.job.state.effective_max_places = Some(cap);
                }
                None => debug!("pipeline: unreadable result count {:?}", label),
            }
        }

        self.advance_to(Action::WalkListing);
        self.persist()?;
        self.walk_listing().await
    }

    // ── action 5 ────────────────────────────────────────────────────────────

    async fn deliver_output(&mut self) -> PipelineResult<Transition> {
        self.set_status(StatusCode::Downloading, "sending data to server...");
        self.persist()?;

        let payload = DeliveryPayload {
            inputs: self.job.inputs.clone(),
            output: self.job.output.clone(),
        };
        match self.env.sink.deliver(&payload).await {
            Ok(SinkReply::Ack { message }) => {
                info!("pipeline: sink accepted {} place(s)", payload.output.len());
                self.set_status(StatusCode::Processing, message);
                self.persist()?;
                return Ok(Transition::Idle);
            }
            Ok(SinkReply::Error { message }) => {
                warn!("pipeline: sink refused output ({}), exporting locally", message)
            }
            Err(e) => warn!("pipeline: sink unreachable ({:#}), exporting locally", e),
        }

        match self.env.exporter.export(&self.job.output) {
            Ok(path) => {
                info!("pipeline: raw output saved to {}", path.display());
                self.set_status(StatusCode::Complete, "downloaded raw json");
            }
            Err(e) => {
                error!("pipeline: local export failed: {:#}", e);
                self.set_status(StatusCode::Running, format!("export failed: {:#}", e));
            }
        }
        self.persist()?;
        Ok(Transition::Idle)
    }
}

/// Last whitespace token of the results label, thousands separators dropped.
fn parse_result_count(label: &str) -> Option<u32> {
    label
        .split_whitespace()
        .last()?
        .replace(',', "")
        .parse()
        .ok()
}

/// The sink reported that processing finished: retire the job as COMPLETE.
/// The processor owns the data from here, so the output is dropped.
pub fn complete_delivery(
    store: &dyn JobStore,
    key: &JobKey,
    message: &str,
) -> anyhow::Result<Option<JobState>> {
    let Some(mut job) = store.get(key)? else {
        return Ok(None);
    };
    job.status = JobStatus::new(StatusCode::Complete, message);
    job.output.clear();
    job.updated_at = Some(Utc::now());
    store.set(key, &job)?;
    Ok(Some(job))
}
