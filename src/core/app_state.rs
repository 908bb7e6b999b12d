use std::sync::Arc;

use crate::core::config::ScoutConfig;
use crate::pipeline::wait::{Clock, TokioClock, Waiter};
use crate::pipeline::{PipelineEnv, PipelineSettings};
use crate::scraping::inspector::PageInspector;
use crate::sink::{Exporter, LocalExport, OutputSink, RelaySink};
use crate::store::{FileJobStore, JobStore};

/// Long-lived collaborators shared by every pipeline step of a run.
#[derive(Clone)]
pub struct AppState {
    /// File-based config loaded from `review-scout.json` (env-var fallback for all fields).
    pub scout_config: Arc<ScoutConfig>,
    pub store: Arc<dyn JobStore>,
    pub sink: Arc<dyn OutputSink>,
    pub exporter: Arc<dyn Exporter>,
    pub settings: Arc<PipelineSettings>,
    pub waiter: Waiter,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("settings", &self.settings)
            .field("waiter", &self.waiter)
            .finish()
    }
}

impl AppState {
    /// Production wiring: file store, WebSocket relay, `data.json` fallback, wall clock.
    pub fn new(cfg: ScoutConfig) -> Self {
        let store: Arc<dyn JobStore> = Arc::new(FileJobStore::new(cfg.resolve_jobs_dir()));
        let sink: Arc<dyn OutputSink> = Arc::new(RelaySink::new(cfg.resolve_relay_url()));
        let exporter: Arc<dyn Exporter> = Arc::new(LocalExport::new(cfg.resolve_export_dir()));
        let waiter = Waiter::new(
            Arc::new(TokioClock::default()),
            cfg.resolve_poll_interval(),
            cfg.resolve_wait_timeout(),
        );
        Self {
            settings: Arc::new(PipelineSettings::from_config(&cfg)),
            scout_config: Arc::new(cfg),
            store,
            sink,
            exporter,
            waiter,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn JobStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn OutputSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_exporter(mut self, exporter: Arc<dyn Exporter>) -> Self {
        self.exporter = exporter;
        self
    }

    /// Swap the clock behind container waits (virtual clocks in tests).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.waiter = Waiter::new(
            clock,
            self.scout_config.resolve_poll_interval(),
            self.scout_config.resolve_wait_timeout(),
        );
        self
    }

    pub fn env<'a>(&'a self, page: &'a dyn PageInspector) -> PipelineEnv<'a> {
        PipelineEnv {
            page,
            store: self.store.as_ref(),
            sink: self.sink.as_ref(),
            exporter: self.exporter.as_ref(),
            waiter: &self.waiter,
            settings: self.settings.as_ref(),
        }
    }
}
