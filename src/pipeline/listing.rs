//! Listing walker (action 3): paginated search results → `placeUrls`.

use tracing::{debug, info, warn};

use super::location::next_listing_page;
use super::{Pipeline, Transition};
use crate::core::error::{PipelineError, PipelineResult};
use crate::core::types::{Action, PlaceRef, PlaceVariant, StatusCode};
use crate::scraping::inspector::Probe;

impl Pipeline<'_> {
    /// One listing page. Either paginates (same action, next offset) or
    /// finishes and heads to the first place.
    pub(super) async fn walk_listing(&mut self) -> PipelineResult<Transition> {
        let cap = self.job.max_places();
        if cap.reached(self.job.state.places_count) {
            return self.places_finished();
        }

        let page = self.env.page;
        if !self.env.waiter.until_present(page, Probe::ListingItems).await? {
            if self.job.state.places_count == 0 {
                return Err(PipelineError::ContainerMissing {
                    what: "container for places",
                });
            }
            info!(
                "listing: no results container, finishing with {} place(s)",
                self.job.state.places_count
            );
            return self.places_finished();
        }
        self.set_status(StatusCode::Running, "scraping places...");

        if let Err(e) = page.scroll_to_bottom().await {
            warn!("listing: scroll failed: {:#}", e);
        }

        let items = page.listing_items().await.map_err(PipelineError::Page)?;
        let mut finished = false;
        for item in items {
            let Some(url) = item.url.filter(|u| !u.trim().is_empty()) else {
                continue;
            };
            let Some(variant) = item.type_tag.as_deref().and_then(PlaceVariant::from_tag) else {
                debug!("listing: skipping {} ({:?})", url, item.type_tag);
                continue;
            };

            self.job.state.place_urls.push(PlaceRef {
                url,
                place_type: variant.tag().to_string(),
                place_name: item.name.unwrap_or_default().trim().to_lowercase(),
            });
            self.job.state.places_count += 1;

            if cap.reached(self.job.state.places_count) {
                finished = true;
                break;
            }
        }

        if finished {
            return self.places_finished();
        }

        let here = page.location().await.map_err(PipelineError::Page)?;
        let next = next_listing_page(&here, self.env.settings.places_per_page);
        debug!(
            "listing: {} place(s) so far, next page {}",
            self.job.state.places_count, next
        );
        self.job.state.listing_url = Some(next.to_string());
        self.persist()?;
        Ok(Transition::Navigate(next.to_string()))
    }

    fn places_finished(&mut self) -> PipelineResult<Transition> {
        self.set_status(StatusCode::Running, "scraped places");
        self.advance_to(Action::WalkReviews);
        self.job.state.current_place = Some(0);
        self.persist()?;

        match self.job.state.place_urls.first() {
            Some(first) => {
                info!(
                    "listing: {} place(s) collected",
                    self.job.state.place_urls.len()
                );
                Ok(Transition::Navigate(first.url.clone()))
            }
            None => {
                warn!("listing: no supported places found, nothing to review");
                self.reviews_finished()
            }
        }
    }
}
