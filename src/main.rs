use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn};

use review_scout::cli::{Cli, Command};
use review_scout::command::{CommandReply, InitialCommand};
use review_scout::core::config::load_scout_config;
use review_scout::runner::{drive, reopen, start_job, RunOutcome};
use review_scout::scraping::browser_manager::{BrowserSession, LaunchOptions};
use review_scout::scraping::cdp_page::CdpPage;
use review_scout::scraping::layout::SiteLayout;
use review_scout::{AppState, JobKey};

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,chromiumoxide=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let app = AppState::new(load_scout_config());

    match cli.command {
        Command::Status(arg) => {
            let key = JobKey::new(arg.job);
            match app.store.get(&key)? {
                Some(job) => println!(
                    "{} action={} {}: {}",
                    key,
                    job.action_id,
                    job.status.code.as_str(),
                    job.status.message
                ),
                None => println!("{}: no job", key),
            }
            Ok(())
        }
        Command::Reset(arg) => {
            let key = JobKey::new(arg.job);
            app.store.clear(&key)?;
            println!("{}: cleared", key);
            Ok(())
        }
        Command::Run(args) => {
            let key = JobKey::new(args.job.job.clone());
            let command = InitialCommand::new(args.inputs());
            run_in_browser(&app, &key, args.headful, Some(command)).await
        }
        Command::Resume(args) => {
            let key = JobKey::new(args.job.job);
            if app.store.get(&key)?.is_none() {
                println!("{}: no job to resume", key);
                return Ok(());
            }
            run_in_browser(&app, &key, args.headful, None).await
        }
    }
}

async fn run_in_browser(
    app: &AppState,
    key: &JobKey,
    headful: bool,
    command: Option<InitialCommand>,
) -> Result<()> {
    let session = BrowserSession::launch(LaunchOptions::new(headful)).await?;
    let page = CdpPage::new(
        session.page().clone(),
        SiteLayout::tripadvisor(),
        &app.scout_config,
    );

    let result = tokio::select! {
        r = run_job(app, &page, key, command) => r,
        _ = tokio::signal::ctrl_c() => {
            warn!(
                "interrupted: job '{}' is left as last saved; `review-scout resume --job {}` continues it",
                key, key
            );
            Ok(())
        }
    };

    session.shutdown().await;
    result
}

async fn run_job(
    app: &AppState,
    page: &CdpPage,
    key: &JobKey,
    command: Option<InitialCommand>,
) -> Result<()> {
    match command {
        Some(command) => {
            if let CommandReply::Error { message } = start_job(app, page, key, &command).await? {
                error!("{}", message);
                return Ok(());
            }
        }
        None => {
            reopen(app, page, key).await?;
        }
    }

    match drive(app, page, key).await? {
        RunOutcome::Finished(status) => {
            info!("{}: {}", status.code.as_str(), status.message);
            println!("{}: {}", status.code.as_str(), status.message);
        }
        RunOutcome::Aborted(message) => {
            error!("job aborted: {}", message);
            println!("ERROR: {}", message);
        }
        RunOutcome::Dormant => println!("{}: no job", key),
    }
    Ok(())
}
