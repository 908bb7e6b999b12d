//! Driver loop: plays the role of "every page load" for the pipeline.
//!
//! Each iteration rebuilds the pipeline from the store, runs one step, and
//! carries out the transition it returns. The tab is the only thing kept
//! between iterations.

use anyhow::{anyhow, Result};
use tracing::{info, warn};

use crate::command::{CommandReply, InitialCommand};
use crate::core::types::{Action, JobState, JobStatus, StatusCode};
use crate::core::AppState;
use crate::pipeline::location::{is_home, search_url};
use crate::pipeline::{complete_delivery, Pipeline, PipelineSettings, Transition};
use crate::scraping::inspector::{Navigator, PageInspector};
use crate::store::JobKey;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// No job bound to the key.
    Dormant,
    /// Foreground work is over; the job's last persisted status.
    Finished(JobStatus),
    /// Fatal error; the job was cleared.
    Aborted(String),
}

/// Accept an initial command and bind a fresh job to `key`.
///
/// The tab is sent to the first allowed home location unless it already is on
/// one; that location becomes the job's `host`.
pub async fn start_job<P>(
    app: &AppState,
    page: &P,
    key: &JobKey,
    command: &InitialCommand,
) -> Result<CommandReply>
where
    P: PageInspector + Navigator,
{
    if let Some(Err(e)) = command.validate() {
        warn!("runner: initial command refused: {}", e);
        return Ok(CommandReply::Error {
            message: e.user_message(),
        });
    }

    let homes = app.scout_config.resolve_home_locations();
    let here = page.location().await.ok().map(|u| u.to_string());
    let host = match here {
        Some(here) if is_home(&here, &homes) => here,
        _ => {
            let home = homes
                .first()
                .cloned()
                .ok_or_else(|| anyhow!("no home location configured"))?;
            info!("runner: going home to {}", home);
            page.navigate(&home).await?;
            home
        }
    };

    let Some((reply, job)) = command.accept(&host) else {
        return Err(anyhow!("not an initial command (actionId must be 1)"));
    };
    if let Some(job) = job {
        info!(
            "runner: job {} created for '{}' (places {}, reviews {})",
            job.job_id, job.inputs.keyword, job.inputs.max_places, job.inputs.max_reviews
        );
        app.store.set(key, &job)?;
    }
    Ok(reply)
}

/// Page the job's current action runs on, for a tab that has lost it (a new
/// browser after an interruption).
pub fn resume_location(job: &JobState, settings: &PipelineSettings) -> Result<String> {
    let host = if job.host.trim().is_empty() {
        settings.home.clone()
    } else {
        job.host.clone()
    };
    let search = || -> Result<String> {
        Ok(search_url(&settings.search_url, job.inputs.keyword.trim())
            .map_err(|e| anyhow!("invalid search url {}: {}", settings.search_url, e))?
            .to_string())
    };
    Ok(match job.action() {
        Some(Action::SelectCategoryTab) => search()?,
        Some(Action::WalkListing) => match &job.state.listing_url {
            Some(url) => url.clone(),
            None => search()?,
        },
        Some(Action::WalkReviews) => match job.current_place_ref() {
            Some(place) => place.url.clone(),
            None => host,
        },
        Some(Action::SubmitSearch) | Some(Action::DeliverOutput) | None => host,
    })
}

/// Put the tab back where the job bound to `key` left off. `false` when there
/// is nothing to reopen (no job, or no foreground work left).
pub async fn reopen<P>(app: &AppState, page: &P, key: &JobKey) -> Result<bool>
where
    P: PageInspector + Navigator,
{
    let Some(job) = app.store.get(key)? else {
        return Ok(false);
    };
    if job.status.code.is_foreground_terminal() {
        return Ok(false);
    }
    let url = resume_location(&job, &app.settings)?;
    info!(
        "runner: reopening job {} at action {} on {}",
        job.job_id, job.action_id, url
    );
    page.navigate(&url).await?;
    Ok(true)
}

/// Run the job bound to `key` until it needs no more foreground work.
pub async fn drive<P>(app: &AppState, page: &P, key: &JobKey) -> Result<RunOutcome>
where
    P: PageInspector + Navigator,
{
    loop {
        match Pipeline::resume(app.env(page), key).await? {
            Transition::Navigate(url) => page.navigate(&url).await?,
            Transition::Aborted { message, home } => {
                if let Err(e) = page.navigate(&home).await {
                    warn!("runner: could not return home to {}: {:#}", home, e);
                }
                return Ok(RunOutcome::Aborted(message));
            }
            Transition::Idle => break,
        }
    }

    let Some(job) = app.store.get(key)? else {
        return Ok(RunOutcome::Dormant);
    };

    if job.status.code == StatusCode::Processing {
        info!("runner: {}", job.status.message);
        match app.sink.completion().await {
            Some(message) => {
                if let Some(done) = complete_delivery(app.store.as_ref(), key, &message)? {
                    info!("runner: processor finished: {}", message);
                    return Ok(RunOutcome::Finished(done.status));
                }
            }
            None => warn!("runner: processor went away before reporting completion"),
        }
    }

    Ok(RunOutcome::Finished(job.status))
}
