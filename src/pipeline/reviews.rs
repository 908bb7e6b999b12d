//! Review walker (action 4): one place's feed, paginated in place.
//!
//! A page load always shows the first feed page, so a place is walked from
//! scratch on every load. Reviews reach the store only when the place is
//! flushed into `output`.

use tracing::{debug, info, warn};

use super::extract::extractor_for;
use super::{Pipeline, Transition};
use crate::core::error::{PipelineError, PipelineResult};
use crate::core::types::{Action, PlaceOutput, PlaceRef, StatusCode};
use crate::scraping::inspector::{Control, Probe};

impl Pipeline<'_> {
    pub(super) async fn walk_reviews(&mut self) -> PipelineResult<Transition> {
        let index = self.job.state.current_place.unwrap_or(0);
        self.job.state.current_place = Some(index);

        let Some(place) = self.job.state.place_urls.get(index).cloned() else {
            return self.reviews_finished();
        };
        let Some(variant) = place.variant() else {
            warn!(
                "reviews: scraping for {} is not supported yet, skipping '{}'",
                place.place_type, place.place_name
            );
            return self.next_place();
        };
        if self.job.state.current_reviews_count > 0 || !self.job.state.current_reviews.is_empty() {
            debug!(
                "reviews: discarding {} partial review(s) of '{}', the feed starts over",
                self.job.state.current_reviews.len(),
                place.place_name
            );
            self.job.state.current_reviews.clear();
            self.job.state.current_reviews_count = 0;
        }
        let extractor = extractor_for(variant);
        let cap = self.job.inputs.max_reviews;
        let page = self.env.page;

        loop {
            if cap.reached(self.job.state.current_reviews_count) {
                self.flush_place(&place);
                return self.next_place();
            }

            if let Err(e) = page.scroll_to_bottom().await {
                warn!("reviews: scroll failed: {:#}", e);
            }

            if !self
                .env
                .waiter
                .until_present(page, Probe::ReviewFeed(variant))
                .await?
            {
                warn!("reviews: container for reviews not found on {}", place.url);
                if self.job.state.current_reviews_count > 0 {
                    self.flush_place(&place);
                }
                return self.next_place();
            }
            self.set_status(StatusCode::Running, "scraping reviews...");

            let items = page
                .review_count(variant)
                .await
                .map_err(PipelineError::Page)?;
            let mut finished = false;
            for i in 0..items {
                if extractor.has_terminator()
                    && page.is_feed_terminator(variant, i).await.unwrap_or(false)
                {
                    break;
                }
                let record = extractor.extract(page, i).await;
                self.job.state.current_reviews.push(record);
                self.job.state.current_reviews_count += 1;

                if cap.reached(self.job.state.current_reviews_count) {
                    finished = true;
                    break;
                }
            }

            if finished {
                self.flush_place(&place);
                return self.next_place();
            }

            let turned = page
                .click(Control::NextReviewPage(variant))
                .await
                .map_err(PipelineError::Page)?;
            if !turned {
                info!(
                    "reviews: no more review pages for '{}' ({} review(s))",
                    place.place_name, self.job.state.current_reviews_count
                );
                self.flush_place(&place);
                return self.next_place();
            }
            debug!("reviews: next review page of '{}'", place.place_name);
            self.env.waiter.pause(self.env.settings.dynamic_load).await;
        }
    }

    /// Append the place's reviews to `output`. Persisted by the
    /// next-place transition together with the reset, so a place can never
    /// be flushed twice.
    fn flush_place(&mut self, place: &PlaceRef) {
        self.job.output.push(PlaceOutput {
            name: place.place_name.clone(),
            url: place.url.clone(),
            place_type: place.place_type.clone(),
            reviews: self.job.state.current_reviews.clone(),
        });
    }

    fn next_place(&mut self) -> PipelineResult<Transition> {
        let next = self.job.state.current_place.unwrap_or(0) + 1;
        self.job.state.current_place = Some(next);
        self.job.state.current_reviews.clear();
        self.job.state.current_reviews_count = 0;
        self.persist()?;

        match self.job.state.place_urls.get(next) {
            Some(place) => Ok(Transition::Navigate(place.url.clone())),
            None => self.reviews_finished(),
        }
    }

    pub(super) fn reviews_finished(&mut self) -> PipelineResult<Transition> {
        self.set_status(StatusCode::Running, "finished scraping reviews");
        self.advance_to(Action::DeliverOutput);
        self.persist()?;
        info!(
            "reviews: {} place(s) in output, returning to {}",
            self.job.output.len(),
            self.job.host
        );

        let home = if self.job.host.trim().is_empty() {
            self.env.settings.home.clone()
        } else {
            self.job.host.clone()
        };
        Ok(Transition::Navigate(home))
    }
}
