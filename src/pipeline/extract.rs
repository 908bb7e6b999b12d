//! Review extraction, one extractor per place variant.
//!
//! All three share the skeleton in [`ReviewExtractor::extract`]; they differ in
//! how the visit line and the "written" line are worded and whether the feed
//! ends with a non-review node. Every field read is independent: a failing
//! lookup degrades that field only.

use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

use crate::core::types::{ImageSources, PlaceVariant, ReviewRecord};
use crate::scraping::inspector::{Control, PageInspector, ReviewField};

const TRIP_TYPE_SEPARATOR: char = '•';

#[async_trait]
pub trait ReviewExtractor: Send + Sync {
    fn variant(&self) -> PlaceVariant;

    /// Whether the feed carries a trailing non-review node that ends the scan.
    fn has_terminator(&self) -> bool {
        false
    }

    /// Visit line → (travel date, trip type).
    fn split_visit(&self, raw: &str) -> (String, String) {
        split_on_separator(raw)
    }

    /// "Written …" line → review date.
    fn clean_written(&self, raw: &str) -> String {
        raw.to_lowercase().replace("written", "").trim().to_string()
    }

    /// Read review `index` of the current feed.
    async fn extract(&self, page: &dyn PageInspector, index: usize) -> ReviewRecord {
        let variant = self.variant();

        let username = read(page, variant, index, ReviewField::Username)
            .await
            .unwrap_or_default();
        let rating = read(page, variant, index, ReviewField::RatingLabel)
            .await
            .and_then(|label| parse_rating(&label));
        let title = read(page, variant, index, ReviewField::Title)
            .await
            .unwrap_or_default();
        let (travel_date, trip_type) = read(page, variant, index, ReviewField::VisitDate)
            .await
            .map(|raw| self.split_visit(&raw))
            .unwrap_or_default();

        if let Some(label) = read(page, variant, index, ReviewField::ReadMoreLabel).await {
            if label.trim().eq_ignore_ascii_case("read more") {
                if let Err(e) = page.click(Control::ReadMore(variant, index)).await {
                    debug!("extract: read-more on {} review {} failed: {}", variant, index, e);
                }
            }
        }
        let text = read(page, variant, index, ReviewField::Body)
            .await
            .unwrap_or_default();

        let images = match page.review_images(variant, index).await {
            Ok(sources) => sources
                .iter()
                .filter(|s| !s.trim().is_empty())
                .map(|s| parse_srcset(s))
                .collect(),
            Err(e) => {
                debug!("extract: images of {} review {} unreadable: {}", variant, index, e);
                Vec::new()
            }
        };

        let review_date = read(page, variant, index, ReviewField::WrittenDate)
            .await
            .map(|raw| self.clean_written(&raw))
            .unwrap_or_default();

        ReviewRecord {
            username,
            rating,
            title,
            travel_date,
            trip_type,
            text,
            images,
            review_date,
        }
    }
}

async fn read(
    page: &dyn PageInspector,
    variant: PlaceVariant,
    index: usize,
    field: ReviewField,
) -> Option<String> {
    match page.review_field(variant, index, field).await {
        Ok(v) => v,
        Err(e) => {
            debug!(
                "extract: {:?} of {} review {} unreadable: {}",
                field, variant, index, e
            );
            None
        }
    }
}

/// Attraction ("things to do") feed.
pub struct AttractionReviews;

impl ReviewExtractor for AttractionReviews {
    fn variant(&self) -> PlaceVariant {
        PlaceVariant::Attraction
    }

    fn has_terminator(&self) -> bool {
        true
    }
}

/// Hotel feed: stay date has no trip type, author line reads "… wrote a review …".
pub struct HotelReviews;

impl ReviewExtractor for HotelReviews {
    fn variant(&self) -> PlaceVariant {
        PlaceVariant::Hotel
    }

    fn split_visit(&self, raw: &str) -> (String, String) {
        (raw.trim().to_lowercase(), String::new())
    }

    fn clean_written(&self, raw: &str) -> String {
        raw.to_lowercase()
            .replace("wrote a review", "")
            .trim()
            .to_string()
    }
}

/// Restaurant feed.
pub struct RestaurantReviews;

impl ReviewExtractor for RestaurantReviews {
    fn variant(&self) -> PlaceVariant {
        PlaceVariant::Restaurant
    }
}

pub fn extractor_for(variant: PlaceVariant) -> &'static dyn ReviewExtractor {
    match variant {
        PlaceVariant::Attraction => &AttractionReviews,
        PlaceVariant::Hotel => &HotelReviews,
        PlaceVariant::Restaurant => &RestaurantReviews,
    }
}

fn leading_number() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)").expect("valid rating regex"))
}

/// "4.0 of 5 bubbles" → 4.0. Anything without a leading number → `None`.
pub fn parse_rating(label: &str) -> Option<f64> {
    let first = label.split_whitespace().next()?;
    let m = leading_number().find(first)?;
    m.as_str().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// "Mar 2024 • Couples" → ("Mar 2024", "Couples"); no separator → (line, "").
pub fn split_on_separator(raw: &str) -> (String, String) {
    let mut parts = raw.split(TRIP_TYPE_SEPARATOR);
    let date = parts.next().unwrap_or_default().trim().to_string();
    let trip = parts.next().unwrap_or_default().trim().to_string();
    (date, trip)
}

/// Parse a `srcset` into descriptor → URL. A bare URL lands under `url`.
pub fn parse_srcset(srcset: &str) -> ImageSources {
    let srcset = srcset.trim();
    let mut map = ImageSources::new();

    if srcset.contains(',') {
        for candidate in srcset.split(',') {
            map.extend(parse_srcset(candidate));
        }
        return map;
    }

    let mut tokens = srcset.split_whitespace();
    match (tokens.next(), tokens.next()) {
        (Some(url), Some(descriptor)) => {
            map.insert(descriptor.to_string(), url.to_string());
        }
        (Some(url), None) => {
            map.insert("url".to_string(), url.to_string());
        }
        _ => {}
    }
    map
}
