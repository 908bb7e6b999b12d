use clap::{Args, Parser, Subcommand};

use crate::core::types::{JobInputs, Limit};

/// Resumable review scraper for a travel-listing site.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Start a new job and run it to completion.
    Run(RunArgs),
    /// Pick an interrupted job up at its persisted action.
    Resume(ResumeArgs),
    /// Print the persisted status of a job.
    Status(JobArg),
    /// Clear a job.
    Reset(JobArg),
}

#[derive(Args, Debug, PartialEq)]
pub struct JobArg {
    /// Job slot (one per tab/profile identity).
    #[clap(long, default_value = "default")]
    pub job: String,
}

#[derive(Args, Debug, PartialEq)]
pub struct RunArgs {
    /// Search keyword.
    #[clap(short, long)]
    pub keyword: String,
    /// Places to visit.
    #[clap(short = 'p', long, default_value_t = 1, conflicts_with = "unbounded_places")]
    pub max_places: u32,
    /// Reviews to collect per place.
    #[clap(short = 'r', long, default_value_t = 10, conflicts_with = "unbounded_reviews")]
    pub max_reviews: u32,
    /// Visit every place the search offers.
    #[clap(long)]
    pub unbounded_places: bool,
    /// Collect every review of each place.
    #[clap(long)]
    pub unbounded_reviews: bool,
    /// Ask the processor to download review images.
    #[clap(long)]
    pub save_images: bool,
    /// Show the browser window.
    #[clap(long)]
    pub headful: bool,
    #[clap(flatten)]
    pub job: JobArg,
}

#[derive(Args, Debug, PartialEq)]
pub struct ResumeArgs {
    /// Show the browser window.
    #[clap(long)]
    pub headful: bool,
    #[clap(flatten)]
    pub job: JobArg,
}

impl RunArgs {
    pub fn inputs(&self) -> JobInputs {
        JobInputs {
            keyword: self.keyword.clone(),
            max_places: if self.unbounded_places {
                Limit::UNBOUNDED
            } else {
                Limit::at_most(self.max_places)
            },
            max_reviews: if self.unbounded_reviews {
                Limit::UNBOUNDED
            } else {
                Limit::at_most(self.max_reviews)
            },
            save_images: self.save_images,
        }
    }
}
