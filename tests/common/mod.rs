//! Scripted site, sink and exporter shared by the scenario tests.
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use url::Url;

use review_scout::core::config::{ScoutConfig, TabMissingPolicy};
use review_scout::pipeline::wait::ManualClock;
use review_scout::scraping::inspector::{
    Control, ListingCandidate, Navigator, PageInspector, Probe, ReviewField,
};
use review_scout::sink::{Exporter, OutputSink, SinkReply};
use review_scout::store::MemoryJobStore;
use review_scout::{
    Action, AppState, DeliveryPayload, JobInputs, JobKey, JobState, JobStatus, JobStore, Limit,
    Pipeline, PlaceOutput, PlaceVariant, StatusCode, Transition,
};

pub const HOME: &str = "https://www.tripadvisor.in";
pub const SEARCH: &str = "https://www.tripadvisor.in/Search?q=ooty";

pub fn init_logger() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn norm(url: &str) -> String {
    Url::parse(url)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| url.to_string())
}

// ── Fake site ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct FakeReview {
    pub fields: HashMap<ReviewField, String>,
    pub images: Vec<String>,
    /// Body revealed by "read more".
    pub full_body: Option<String>,
    pub terminator: bool,
}

impl FakeReview {
    pub fn new(user: &str) -> Self {
        let mut fields = HashMap::new();
        fields.insert(ReviewField::Username, user.to_string());
        fields.insert(ReviewField::RatingLabel, "4.0 of 5 bubbles".to_string());
        fields.insert(ReviewField::Title, format!("{} liked it", user));
        fields.insert(ReviewField::VisitDate, "Mar 2024 • Couples".to_string());
        fields.insert(ReviewField::Body, format!("review by {}", user));
        fields.insert(ReviewField::WrittenDate, "Written March 3, 2024".to_string());
        Self {
            fields,
            ..Default::default()
        }
    }

    pub fn with(mut self, field: ReviewField, value: &str) -> Self {
        self.fields.insert(field, value.to_string());
        self
    }

    pub fn without(mut self, field: ReviewField) -> Self {
        self.fields.remove(&field);
        self
    }

    pub fn with_images(mut self, srcsets: &[&str]) -> Self {
        self.images = srcsets.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn truncated(mut self, full: &str) -> Self {
        self.fields
            .insert(ReviewField::ReadMoreLabel, " Read more ".to_string());
        self.full_body = Some(full.to_string());
        self
    }

    pub fn terminator() -> Self {
        Self {
            terminator: true,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct FakeFeed {
    pub variant: PlaceVariant,
    /// In-place pages of the feed; "next" moves to the following one. An
    /// empty page renders no feed container.
    pub pages: Vec<Vec<FakeReview>>,
}

#[derive(Debug, Clone, Default)]
pub struct FakePage {
    pub category_tabs: bool,
    pub all_results_tab: bool,
    pub show_more: bool,
    pub result_count: Option<String>,
    /// `None` means the listing container is not rendered.
    pub listing: Option<Vec<ListingCandidate>>,
    pub feed: Option<FakeFeed>,
}

impl FakePage {
    pub fn search(items: Vec<ListingCandidate>) -> Self {
        Self {
            category_tabs: true,
            all_results_tab: true,
            show_more: true,
            listing: Some(items),
            ..Default::default()
        }
    }

    pub fn place(variant: PlaceVariant, pages: Vec<Vec<FakeReview>>) -> Self {
        Self {
            feed: Some(FakeFeed { variant, pages }),
            ..Default::default()
        }
    }
}

pub fn item(tag: &str, url: &str, name: &str) -> ListingCandidate {
    ListingCandidate {
        url: Some(url.to_string()),
        type_tag: Some(tag.to_string()),
        name: Some(name.to_string()),
    }
}

pub fn place_url(n: usize) -> String {
    format!("https://www.tripadvisor.in/Attraction_Review-g1-d{}-Reviews.html", n)
}

#[derive(Default)]
struct SiteState {
    pages: HashMap<String, FakePage>,
    location: Option<Url>,
    current: FakePage,
    feed_page: usize,
    visits: Vec<String>,
    clicks: Vec<Control>,
}

impl SiteState {
    fn review(&self, variant: PlaceVariant, index: usize) -> Option<&FakeReview> {
        let feed = self.current.feed.as_ref().filter(|f| f.variant == variant)?;
        feed.pages.get(self.feed_page)?.get(index)
    }
}

/// In-memory site: pages keyed by URL, one tab.
#[derive(Default)]
pub struct FakeSite {
    state: Mutex<SiteState>,
}

impl FakeSite {
    pub fn new() -> Self {
        let site = Self::default();
        site.open("about:blank");
        site
    }

    pub fn with_page(self, url: &str, page: FakePage) -> Self {
        self.add_page(url, page);
        self
    }

    pub fn add_page(&self, url: &str, page: FakePage) {
        self.state.lock().unwrap().pages.insert(norm(url), page);
    }

    /// Put the tab on `url` without recording a visit.
    pub fn open(&self, url: &str) {
        let mut s = self.state.lock().unwrap();
        s.location = Url::parse(url).ok();
        s.current = s.pages.get(&norm(url)).cloned().unwrap_or_default();
        s.feed_page = 0;
    }

    pub fn visits(&self) -> Vec<String> {
        self.state.lock().unwrap().visits.clone()
    }

    pub fn clicks(&self) -> Vec<Control> {
        self.state.lock().unwrap().clicks.clone()
    }
}

#[async_trait]
impl PageInspector for FakeSite {
    async fn location(&self) -> Result<Url> {
        self.state
            .lock()
            .unwrap()
            .location
            .clone()
            .ok_or_else(|| anyhow!("tab has no url"))
    }

    async fn exists(&self, probe: Probe) -> Result<bool> {
        let s = self.state.lock().unwrap();
        Ok(match probe {
            Probe::CategoryTabs => s.current.category_tabs,
            Probe::ShowMore => s.current.show_more,
            Probe::ResultCount => s.current.result_count.is_some(),
            Probe::ListingItems => s.current.listing.is_some(),
            Probe::ReviewFeed(v) => s
                .current
                .feed
                .as_ref()
                .filter(|f| f.variant == v)
                .and_then(|f| f.pages.get(s.feed_page))
                .map_or(false, |p| !p.is_empty()),
        })
    }

    async fn click(&self, control: Control) -> Result<bool> {
        let mut s = self.state.lock().unwrap();
        s.clicks.push(control);
        Ok(match control {
            Control::AllResultsTab => s.current.all_results_tab,
            Control::ShowMore => s.current.show_more,
            Control::NextReviewPage(v) => {
                let pages = s
                    .current
                    .feed
                    .as_ref()
                    .filter(|f| f.variant == v)
                    .map_or(0, |f| f.pages.len());
                if s.feed_page + 1 < pages {
                    s.feed_page += 1;
                    true
                } else {
                    false
                }
            }
            Control::ReadMore(v, i) => {
                let page = s.feed_page;
                let review = s
                    .current
                    .feed
                    .as_mut()
                    .filter(|f| f.variant == v)
                    .and_then(|f| f.pages.get_mut(page))
                    .and_then(|p| p.get_mut(i));
                match review {
                    Some(r) => {
                        if let Some(full) = r.full_body.take() {
                            r.fields.insert(ReviewField::Body, full);
                        }
                        true
                    }
                    None => false,
                }
            }
        })
    }

    async fn result_count_label(&self) -> Result<Option<String>> {
        Ok(self.state.lock().unwrap().current.result_count.clone())
    }

    async fn scroll_to_bottom(&self) -> Result<()> {
        Ok(())
    }

    async fn listing_items(&self) -> Result<Vec<ListingCandidate>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .current
            .listing
            .clone()
            .unwrap_or_default())
    }

    async fn review_count(&self, variant: PlaceVariant) -> Result<usize> {
        let s = self.state.lock().unwrap();
        Ok(s.current
            .feed
            .as_ref()
            .filter(|f| f.variant == variant)
            .and_then(|f| f.pages.get(s.feed_page))
            .map_or(0, |p| p.len()))
    }

    async fn is_feed_terminator(&self, variant: PlaceVariant, index: usize) -> Result<bool> {
        let s = self.state.lock().unwrap();
        Ok(s.review(variant, index).map_or(false, |r| r.terminator))
    }

    async fn review_field(
        &self,
        variant: PlaceVariant,
        index: usize,
        field: ReviewField,
    ) -> Result<Option<String>> {
        let s = self.state.lock().unwrap();
        Ok(s.review(variant, index)
            .and_then(|r| r.fields.get(&field).cloned()))
    }

    async fn review_images(&self, variant: PlaceVariant, index: usize) -> Result<Vec<String>> {
        let s = self.state.lock().unwrap();
        Ok(s.review(variant, index)
            .map(|r| r.images.clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl Navigator for FakeSite {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.open(url);
        self.state.lock().unwrap().visits.push(norm(url));
        Ok(())
    }
}

// ── Sink & exporter ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum SinkScript {
    Ack(&'static str),
    Refuse(&'static str),
    Unreachable,
}

pub struct ScriptedSink {
    script: SinkScript,
    completion: Option<String>,
    pub delivered: Mutex<Vec<DeliveryPayload>>,
}

impl ScriptedSink {
    pub fn new(script: SinkScript) -> Self {
        Self {
            script,
            completion: None,
            delivered: Mutex::new(Vec::new()),
        }
    }

    pub fn completing_with(mut self, message: &str) -> Self {
        self.completion = Some(message.to_string());
        self
    }
}

#[async_trait]
impl OutputSink for ScriptedSink {
    async fn deliver(&self, payload: &DeliveryPayload) -> Result<SinkReply> {
        self.delivered.lock().unwrap().push(payload.clone());
        match &self.script {
            SinkScript::Ack(m) => Ok(SinkReply::Ack {
                message: m.to_string(),
            }),
            SinkScript::Refuse(m) => Ok(SinkReply::Error {
                message: m.to_string(),
            }),
            SinkScript::Unreachable => Err(anyhow!("connection refused")),
        }
    }

    async fn completion(&self) -> Option<String> {
        self.completion.clone()
    }
}

#[derive(Default)]
pub struct RecordingExporter {
    pub fail: bool,
    pub exports: Mutex<Vec<Vec<PlaceOutput>>>,
}

impl Exporter for RecordingExporter {
    fn export(&self, output: &[PlaceOutput]) -> Result<PathBuf> {
        if self.fail {
            return Err(anyhow!("read-only file system"));
        }
        self.exports.lock().unwrap().push(output.to_vec());
        Ok(PathBuf::from("/downloads/data.json"))
    }
}

// ── Harness ─────────────────────────────────────────────────────────────────

pub fn config(policy: TabMissingPolicy) -> ScoutConfig {
    ScoutConfig {
        poll_interval_ms: Some(500),
        wait_timeout_ms: Some(10_000),
        search_url: Some("https://www.tripadvisor.in/Search".into()),
        home_locations: Some(vec![HOME.into(), "https://www.tripadvisor.com".into()]),
        places_per_page: Some(30),
        dynamic_load_ms: Some(500),
        tab_missing_policy: Some(policy),
        ..Default::default()
    }
}

pub fn inputs(max_places: Limit, max_reviews: Limit) -> JobInputs {
    JobInputs {
        keyword: "ooty".into(),
        max_places,
        max_reviews,
        save_images: false,
    }
}

/// A job already running at `action`.
pub fn job_at(action: Action, inputs: JobInputs) -> JobState {
    let mut job = JobState::new(inputs, HOME);
    job.action_id = action.id();
    job.status = JobStatus::new(StatusCode::Running, "scraping...");
    job
}

pub struct Harness {
    pub site: Arc<FakeSite>,
    pub store: Arc<MemoryJobStore>,
    pub sink: Arc<ScriptedSink>,
    pub exporter: Arc<RecordingExporter>,
    pub clock: ManualClock,
    pub app: AppState,
    pub key: JobKey,
}

impl Harness {
    pub fn new(site: FakeSite, sink: ScriptedSink) -> Self {
        Self::build(site, sink, RecordingExporter::default(), TabMissingPolicy::Fatal)
    }

    pub fn build(
        site: FakeSite,
        sink: ScriptedSink,
        exporter: RecordingExporter,
        policy: TabMissingPolicy,
    ) -> Self {
        init_logger();
        let site = Arc::new(site);
        let store = Arc::new(MemoryJobStore::new());
        let sink = Arc::new(sink);
        let exporter = Arc::new(exporter);
        let clock = ManualClock::new();
        let app = AppState::new(config(policy))
            .with_store(store.clone())
            .with_sink(sink.clone())
            .with_exporter(exporter.clone())
            .with_clock(Arc::new(clock.clone()));
        Self {
            site,
            store,
            sink,
            exporter,
            clock,
            app,
            key: JobKey::new("tab-1"),
        }
    }

    pub fn seed(&self, job: &JobState) {
        self.store.set(&self.key, job).unwrap();
    }

    pub fn job(&self) -> Option<JobState> {
        self.store.get(&self.key).unwrap()
    }

    /// One page load.
    pub async fn step(&self) -> Transition {
        Pipeline::resume(self.app.env(self.site.as_ref()), &self.key)
            .await
            .unwrap()
    }
}
