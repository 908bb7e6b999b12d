pub mod cli;
pub mod command;
pub mod core;
pub mod pipeline;
pub mod runner;
pub mod scraping;
pub mod sink;
pub mod store;

// --- Primary core exports ---
pub use core::types;
pub use core::types::*;
pub use core::AppState;
pub use pipeline::{Pipeline, PipelineEnv, PipelineSettings, Transition};
pub use store::{JobKey, JobStore};
