use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

// ───────────────────────────────────────────────────────────────────────────
// Actions
// ───────────────────────────────────────────────────────────────────────────

/// One numbered phase of the pipeline. Persisted as its integer id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Action {
    SubmitSearch,
    SelectCategoryTab,
    WalkListing,
    WalkReviews,
    DeliverOutput,
}

impl Action {
    pub const FIRST: u8 = 1;

    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Action::SubmitSearch),
            2 => Some(Action::SelectCategoryTab),
            3 => Some(Action::WalkListing),
            4 => Some(Action::WalkReviews),
            5 => Some(Action::DeliverOutput),
            _ => None,
        }
    }

    pub fn id(self) -> u8 {
        match self {
            Action::SubmitSearch => 1,
            Action::SelectCategoryTab => 2,
            Action::WalkListing => 3,
            Action::WalkReviews => 4,
            Action::DeliverOutput => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::SubmitSearch => "submit-search",
            Action::SelectCategoryTab => "select-category-tab",
            Action::WalkListing => "walk-listing",
            Action::WalkReviews => "walk-reviews",
            Action::DeliverOutput => "deliver-output",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id(), self.as_str())
    }
}

// ───────────────────────────────────────────────────────────────────────────
// Inputs
// ───────────────────────────────────────────────────────────────────────────

/// A count cap. `null` on the wire means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Limit(pub Option<u32>);

impl Limit {
    pub const UNBOUNDED: Limit = Limit(None);

    pub fn at_most(n: u32) -> Self {
        Limit(Some(n))
    }

    /// `true` once `count` has met the cap.
    pub fn reached(&self, count: usize) -> bool {
        match self.0 {
            Some(max) => count >= max as usize,
            None => false,
        }
    }

    /// Tighten the cap to what is actually available.
    pub fn min_with(self, available: u32) -> Self {
        match self.0 {
            Some(max) => Limit(Some(max.min(available))),
            None => Limit(Some(available)),
        }
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(n) => write!(f, "{}", n),
            None => f.write_str("unbounded"),
        }
    }
}

/// User-supplied inputs. Immutable for the lifetime of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobInputs {
    pub keyword: String,
    pub max_places: Limit,
    pub max_reviews: Limit,
    pub save_images: bool,
}

// ───────────────────────────────────────────────────────────────────────────
// Status
// ───────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatusCode {
    Uninitiated,
    Running,
    Processing,
    Downloading,
    Complete,
}

impl StatusCode {
    /// No foreground action runs once one of these is set.
    pub fn is_foreground_terminal(self) -> bool {
        matches!(
            self,
            StatusCode::Processing | StatusCode::Downloading | StatusCode::Complete
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StatusCode::Uninitiated => "UNINITIATED",
            StatusCode::Running => "RUNNING",
            StatusCode::Processing => "PROCESSING",
            StatusCode::Downloading => "DOWNLOADING",
            StatusCode::Complete => "COMPLETE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
    pub code: StatusCode,
    pub message: String,
}

impl JobStatus {
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

// ───────────────────────────────────────────────────────────────────────────
// Places & reviews
// ───────────────────────────────────────────────────────────────────────────

/// Place category tag; selects which review layout applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaceVariant {
    /// Listing item ("things to do").
    #[serde(rename = "things to do")]
    Attraction,
    /// Lodging.
    #[serde(rename = "hotel")]
    Hotel,
    /// Dining.
    #[serde(rename = "restaurant")]
    Restaurant,
}

impl PlaceVariant {
    pub const ALL: [PlaceVariant; 3] = [
        PlaceVariant::Attraction,
        PlaceVariant::Hotel,
        PlaceVariant::Restaurant,
    ];

    /// Resolve a lower-cased listing type tag. Unsupported tags yield `None`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_lowercase().as_str() {
            "things to do" => Some(PlaceVariant::Attraction),
            "hotel" => Some(PlaceVariant::Hotel),
            "restaurant" => Some(PlaceVariant::Restaurant),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            PlaceVariant::Attraction => "things to do",
            PlaceVariant::Hotel => "hotel",
            PlaceVariant::Restaurant => "restaurant",
        }
    }
}

impl fmt::Display for PlaceVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A place collected by the listing walk.
///
/// `place_type` keeps the raw tag so a document written by an older build
/// (or edited by hand) still deserializes; the review walk skips tags it
/// cannot resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceRef {
    pub url: String,
    pub place_type: String,
    pub place_name: String,
}

impl PlaceRef {
    pub fn variant(&self) -> Option<PlaceVariant> {
        PlaceVariant::from_tag(&self.place_type)
    }
}

/// Descriptor → URL, e.g. `{"1x": "https://…", "2x": "https://…"}`.
pub type ImageSources = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRecord {
    pub username: String,
    pub rating: Option<f64>,
    pub title: String,
    pub travel_date: String,
    pub trip_type: String,
    pub text: String,
    pub images: Vec<ImageSources>,
    pub review_date: String,
}

/// One aggregate per visited place, in visitation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOutput {
    pub name: String,
    pub url: String,
    pub place_type: String,
    pub reviews: Vec<ReviewRecord>,
}

// ───────────────────────────────────────────────────────────────────────────
// Job state document
// ───────────────────────────────────────────────────────────────────────────

/// Mutable scratch data of the walk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct WalkState {
    pub places_count: usize,
    pub place_urls: Vec<PlaceRef>,
    pub current_place: Option<usize>,
    pub current_reviews: Vec<ReviewRecord>,
    pub current_reviews_count: usize,
    /// Place cap after action 2 narrowed it to what the search offers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_max_places: Option<Limit>,
    /// Listing page action 3 navigated to last.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listing_url: Option<String>,
}

/// The single persisted document that carries a job across navigations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobState {
    #[serde(default = "Uuid::new_v4")]
    pub job_id: Uuid,
    pub action_id: u8,
    pub inputs: JobInputs,
    pub status: JobStatus,
    pub host: String,
    #[serde(default)]
    pub state: WalkState,
    #[serde(default)]
    pub output: Vec<PlaceOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl JobState {
    /// Fresh document for an accepted initial command.
    pub fn new(inputs: JobInputs, host: impl Into<String>) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            action_id: Action::FIRST,
            inputs,
            status: JobStatus::new(StatusCode::Uninitiated, "starting scraper..."),
            host: host.into(),
            state: WalkState::default(),
            output: Vec::new(),
            updated_at: None,
        }
    }

    pub fn action(&self) -> Option<Action> {
        Action::from_id(self.action_id)
    }

    /// Place cap in force: the narrowed one if action 2 computed it.
    pub fn max_places(&self) -> Limit {
        self.state
            .effective_max_places
            .unwrap_or(self.inputs.max_places)
    }

    pub fn current_place_ref(&self) -> Option<&PlaceRef> {
        self.state
            .current_place
            .and_then(|i| self.state.place_urls.get(i))
    }
}

/// What the sink receives at action 5.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryPayload {
    pub inputs: JobInputs,
    pub output: Vec<PlaceOutput>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> JobInputs {
        JobInputs {
            keyword: "darjeeling".into(),
            max_places: Limit::at_most(2),
            max_reviews: Limit::UNBOUNDED,
            save_images: true,
        }
    }

    #[test]
    fn job_state_uses_camel_case_wire_names() {
        let job = JobState::new(inputs(), "https://www.tripadvisor.in");
        let v = serde_json::to_value(&job).unwrap();
        assert_eq!(v["actionId"], 1);
        assert_eq!(v["inputs"]["maxPlaces"], 2);
        assert!(v["inputs"]["maxReviews"].is_null());
        assert_eq!(v["status"]["code"], "UNINITIATED");
        assert_eq!(v["state"]["placesCount"], 0);
        assert!(v["state"]["currentPlace"].is_null());
    }

    #[test]
    fn walk_state_fields_default_when_absent() {
        let raw = r#"{
            "actionId": 3,
            "inputs": {"keyword": "goa", "maxPlaces": 4, "maxReviews": 10, "saveImages": false},
            "status": {"code": "RUNNING", "message": "scraping places..."},
            "host": "https://www.tripadvisor.com",
            "state": {},
            "output": []
        }"#;
        let job: JobState = serde_json::from_str(raw).unwrap();
        assert_eq!(job.action(), Some(Action::WalkListing));
        assert_eq!(job.state.places_count, 0);
        assert!(job.state.place_urls.is_empty());
        assert_eq!(job.state.current_place, None);
        assert_eq!(job.max_places(), Limit::at_most(4));
    }

    #[test]
    fn round_trip_preserves_walk_progress() {
        let mut job = JobState::new(inputs(), "https://www.tripadvisor.in");
        job.action_id = 4;
        job.state.place_urls = vec![PlaceRef {
            url: "https://www.tripadvisor.in/Attraction_Review-g1-d2.html".into(),
            place_type: "things to do".into(),
            place_name: "tiger hill".into(),
        }];
        job.state.places_count = 1;
        job.state.current_place = Some(0);
        job.state.current_reviews = vec![ReviewRecord::default()];
        job.state.current_reviews_count = 1;

        let back: JobState = serde_json::from_str(&serde_json::to_string(&job).unwrap()).unwrap();
        assert_eq!(back.state.places_count, 1);
        assert_eq!(back.state.place_urls, job.state.place_urls);
        assert_eq!(back.state.current_place, Some(0));
        assert_eq!(back.state.current_reviews_count, 1);
        assert_eq!(back.job_id, job.job_id);
    }

    #[test]
    fn limit_semantics() {
        assert!(Limit::at_most(2).reached(2));
        assert!(!Limit::at_most(2).reached(1));
        assert!(!Limit::UNBOUNDED.reached(usize::MAX));
        assert_eq!(Limit::at_most(10).min_with(3), Limit::at_most(3));
        assert_eq!(Limit::UNBOUNDED.min_with(7), Limit::at_most(7));
    }

    #[test]
    fn variant_tags_resolve_case_insensitively() {
        assert_eq!(PlaceVariant::from_tag("Hotel"), Some(PlaceVariant::Hotel));
        assert_eq!(
            PlaceVariant::from_tag("things to do"),
            Some(PlaceVariant::Attraction)
        );
        assert_eq!(PlaceVariant::from_tag("vacation rental"), None);
        assert_eq!(
            serde_json::to_value(PlaceVariant::Restaurant).unwrap(),
            "restaurant"
        );
    }

    #[test]
    fn foreground_terminal_codes() {
        assert!(StatusCode::Complete.is_foreground_terminal());
        assert!(StatusCode::Processing.is_foreground_terminal());
        assert!(StatusCode::Downloading.is_foreground_terminal());
        assert!(!StatusCode::Running.is_foreground_terminal());
        assert!(!StatusCode::Uninitiated.is_foreground_terminal());
    }
}
