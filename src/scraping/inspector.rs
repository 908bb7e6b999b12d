//! Capability-shaped view of the current page.
//!
//! The pipeline never sees selectors. It asks questions ("is the review feed
//! for a hotel rendered?", "what is field X of review N?") and the
//! implementation answers them against whatever layout it knows.

use anyhow::Result;
use async_trait::async_trait;
use url::Url;

use crate::core::types::PlaceVariant;

/// Things the pipeline waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Probe {
    /// Results-scope tab bar on the search page.
    CategoryTabs,
    /// "Show more" expansion under the results.
    ShowMore,
    /// Total-results label.
    ResultCount,
    /// At least one listing item.
    ListingItems,
    /// Review feed of a place page.
    ReviewFeed(PlaceVariant),
}

/// Things the pipeline clicks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    /// The "all results" tab, in whichever tab-bar shape is rendered.
    AllResultsTab,
    ShowMore,
    /// In-place "next page" of a review feed.
    NextReviewPage(PlaceVariant),
    /// "Read more" on the review at this index.
    ReadMore(PlaceVariant, usize),
}

/// Text fields of one review item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReviewField {
    Username,
    /// e.g. "4.0 of 5 bubbles"
    RatingLabel,
    Title,
    /// Visit / stay date, sometimes "date • trip type".
    VisitDate,
    /// Label of the expansion affordance, if any.
    ReadMoreLabel,
    Body,
    /// e.g. "Written March 3, 2024"
    WrittenDate,
}

/// One listing entry as read from the results page; every part may be absent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListingCandidate {
    pub url: Option<String>,
    pub type_tag: Option<String>,
    pub name: Option<String>,
}

#[async_trait]
pub trait PageInspector: Send + Sync {
    /// Current location of the tab.
    async fn location(&self) -> Result<Url>;

    async fn exists(&self, probe: Probe) -> Result<bool>;

    /// Click a control. `Ok(false)` when it is not on the page.
    async fn click(&self, control: Control) -> Result<bool>;

    async fn result_count_label(&self) -> Result<Option<String>>;

    /// Drive lazy-load-on-scroll until the document stops growing.
    async fn scroll_to_bottom(&self) -> Result<()>;

    /// Listing entries in document order.
    async fn listing_items(&self) -> Result<Vec<ListingCandidate>>;

    /// Number of item nodes currently in the review feed.
    async fn review_count(&self, variant: PlaceVariant) -> Result<usize>;

    /// `true` if the node at `index` is the feed's trailing non-review node.
    async fn is_feed_terminator(&self, variant: PlaceVariant, index: usize) -> Result<bool>;

    async fn review_field(
        &self,
        variant: PlaceVariant,
        index: usize,
        field: ReviewField,
    ) -> Result<Option<String>>;

    /// Raw `srcset` (or `src`) strings of the review's images.
    async fn review_images(&self, variant: PlaceVariant, index: usize) -> Result<Vec<String>>;
}

/// Full-page navigation. Everything in the page context is gone afterwards.
#[async_trait]
pub trait Navigator: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<()>;
}
