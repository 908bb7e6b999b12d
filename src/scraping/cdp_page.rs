//! [`PageInspector`] and [`Navigator`] over a live CDP tab.
//!
//! Every query is a small script built from the [`SiteLayout`]; scripts return
//! `JSON.stringify(...)` so the result crosses CDP as one string and is decoded
//! with serde on this side.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::browser_manager::wait_until_stable;
use super::inspector::{Control, ListingCandidate, Navigator, PageInspector, Probe, ReviewField};
use super::layout::{FeedLayout, SiteLayout, TextSource};
use crate::core::config::ScoutConfig;
use crate::core::types::PlaceVariant;

/// Quiet window for the network-idle check after a navigation.
const SETTLE_QUIET: Duration = Duration::from_millis(1_000);

pub struct CdpPage {
    page: Page,
    layout: SiteLayout,
    dynamic_load: Duration,
    max_scroll_repeat: u32,
    settle_timeout: Duration,
}

/// JS string literal for `s`.
fn js_str(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

/// Script that selects review item `index` of `feed` as `item`, then runs `body`.
/// A missing item yields `null`.
fn item_script(feed: &FeedLayout, index: usize, body: &str) -> String {
    format!(
        "(() => {{ const item = document.querySelectorAll({items})[{index}]; \
         if (!item) return JSON.stringify(null); {body} }})()",
        items = js_str(feed.items),
    )
}

fn text_expr(source: TextSource) -> String {
    match source {
        TextSource::InnerText => "el.innerText".to_string(),
        TextSource::TextContent => "el.textContent".to_string(),
        TextSource::ChildNode(n) => format!(
            "(el.childNodes.length > {n} ? el.childNodes[{n}].nodeValue : null)"
        ),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawListing {
    url: Option<String>,
    type_tag: Option<String>,
    name: Option<String>,
}

impl CdpPage {
    pub fn new(page: Page, layout: SiteLayout, cfg: &ScoutConfig) -> Self {
        Self {
            page,
            layout,
            dynamic_load: cfg.resolve_dynamic_load(),
            max_scroll_repeat: cfg.resolve_max_scroll_repeat(),
            settle_timeout: cfg.resolve_settle_timeout(),
        }
    }

    async fn eval_json<T: DeserializeOwned>(&self, script: String) -> Result<T> {
        let raw: String = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| anyhow!("CDP evaluate failed: {}", e))?
            .into_value()
            .context("script did not return a string")?;
        serde_json::from_str(&raw).context("script returned malformed JSON")
    }

    async fn selector_exists(&self, css: &str) -> Result<bool> {
        self.eval_json(format!(
            "JSON.stringify(document.querySelector({}) !== null)",
            js_str(css)
        ))
        .await
    }

    async fn click_selector(&self, css: &str) -> Result<bool> {
        self.eval_json(format!(
            "(() => {{ const el = document.querySelector({}); \
             if (!el) return JSON.stringify(false); el.click(); return JSON.stringify(true); }})()",
            js_str(css)
        ))
        .await
    }

    async fn click_all_results_tab(&self) -> Result<bool> {
        for bar in &self.layout.tab_bars {
            if !self.selector_exists(bar.container).await? {
                continue;
            }
            debug!("cdp: tab bar '{}'", bar.container);
            return self
                .eval_json(format!(
                    "(() => {{ for (const tab of document.querySelectorAll({tabs})) {{ \
                       if ((tab.innerText || '').trim().toLowerCase() === {label}) {{ tab.click(); return JSON.stringify(true); }} \
                     }} return JSON.stringify(false); }})()",
                    tabs = js_str(bar.tabs),
                    label = js_str(self.layout.all_results_label),
                ))
                .await;
        }
        Ok(false)
    }

    async fn document_height(&self) -> Result<u64> {
        self.eval_json("JSON.stringify(document.body ? document.body.scrollHeight : 0)".to_string())
            .await
    }
}

#[async_trait]
impl PageInspector for CdpPage {
    async fn location(&self) -> Result<Url> {
        let href = self
            .page
            .url()
            .await
            .map_err(|e| anyhow!("CDP url failed: {}", e))?
            .ok_or_else(|| anyhow!("tab has no url"))?;
        Url::parse(&href).with_context(|| format!("unparseable tab url '{}'", href))
    }

    async fn exists(&self, probe: Probe) -> Result<bool> {
        match probe {
            Probe::CategoryTabs => {
                for bar in &self.layout.tab_bars {
                    if self.selector_exists(bar.container).await? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Probe::ShowMore => self.selector_exists(self.layout.show_more).await,
            Probe::ResultCount => self.selector_exists(self.layout.result_count).await,
            Probe::ListingItems => self.selector_exists(self.layout.listing_items).await,
            Probe::ReviewFeed(v) => self.selector_exists(self.layout.feed(v).items).await,
        }
    }

    async fn click(&self, control: Control) -> Result<bool> {
        match control {
            Control::AllResultsTab => self.click_all_results_tab().await,
            Control::ShowMore => self.click_selector(self.layout.show_more).await,
            Control::NextReviewPage(v) => self.click_selector(self.layout.feed(v).next_page).await,
            Control::ReadMore(v, index) => {
                let feed = self.layout.feed(v);
                let body = format!(
                    "const el = item.querySelector({}); \
                     if (!el) return JSON.stringify(false); el.click(); return JSON.stringify(true);",
                    js_str(feed.read_more.css)
                );
                let clicked: Option<bool> = self.eval_json(item_script(feed, index, &body)).await?;
                Ok(clicked.unwrap_or(false))
            }
        }
    }

    async fn result_count_label(&self) -> Result<Option<String>> {
        self.eval_json(format!(
            "(() => {{ const el = document.querySelector({}); \
             return JSON.stringify(el ? el.innerText : null); }})()",
            js_str(self.layout.result_count)
        ))
        .await
    }

    async fn scroll_to_bottom(&self) -> Result<()> {
        let mut last = self.document_height().await?;
        for _ in 0..self.max_scroll_repeat {
            self.page
                .evaluate("window.scrollTo(0, document.body.scrollHeight)")
                .await
                .map_err(|e| anyhow!("CDP scroll failed: {}", e))?;
            tokio::time::sleep(self.dynamic_load).await;

            let height = self.document_height().await?;
            if height == last {
                break;
            }
            last = height;
        }
        Ok(())
    }

    async fn listing_items(&self) -> Result<Vec<ListingCandidate>> {
        let script = format!(
            "(() => JSON.stringify(Array.from(document.querySelectorAll({items})).map(a => {{ \
               const t = a.querySelector({ty}); const n = a.querySelector({name}); \
               return {{ url: a.href || a.getAttribute('href'), \
                        typeTag: t ? t.innerText.toLowerCase() : null, \
                        name: n ? n.innerText : null }}; \
             }})))()",
            items = js_str(self.layout.listing_items),
            ty = js_str(self.layout.listing_type),
            name = js_str(self.layout.listing_name),
        );
        let raw: Vec<RawListing> = self.eval_json(script).await?;
        Ok(raw
            .into_iter()
            .map(|r| ListingCandidate {
                url: r.url,
                type_tag: r.type_tag,
                name: r.name,
            })
            .collect())
    }

    async fn review_count(&self, variant: PlaceVariant) -> Result<usize> {
        self.eval_json(format!(
            "JSON.stringify(document.querySelectorAll({}).length)",
            js_str(self.layout.feed(variant).items)
        ))
        .await
    }

    async fn is_feed_terminator(&self, variant: PlaceVariant, index: usize) -> Result<bool> {
        let feed = self.layout.feed(variant);
        let Some(marker) = feed.terminator else {
            return Ok(false);
        };
        let body = format!(
            "return JSON.stringify(item.querySelector({}) !== null);",
            js_str(marker)
        );
        let hit: Option<bool> = self.eval_json(item_script(feed, index, &body)).await?;
        Ok(hit.unwrap_or(false))
    }

    async fn review_field(
        &self,
        variant: PlaceVariant,
        index: usize,
        field: ReviewField,
    ) -> Result<Option<String>> {
        let feed = self.layout.feed(variant);
        let sel = feed.field(field);
        let body = format!(
            "const el = item.querySelector({}); \
             if (!el) return JSON.stringify(null); return JSON.stringify({});",
            js_str(sel.css),
            text_expr(sel.source)
        );
        self.eval_json(item_script(feed, index, &body)).await
    }

    async fn review_images(&self, variant: PlaceVariant, index: usize) -> Result<Vec<String>> {
        let feed = self.layout.feed(variant);
        let attrs = serde_json::to_string(feed.image_attrs)?;
        let body = format!(
            "const box = item.querySelector({container}); \
             if (!box) return JSON.stringify([]); \
             const attrs = {attrs}; \
             return JSON.stringify(Array.from(box.querySelectorAll({images})) \
               .map(img => {{ for (const a of attrs) {{ const v = img.getAttribute(a); if (v) return v; }} return null; }}) \
               .filter(v => v !== null));",
            container = js_str(feed.image_container),
            images = js_str(feed.images),
        );
        let sources: Option<Vec<String>> = self.eval_json(item_script(feed, index, &body)).await?;
        Ok(sources.unwrap_or_default())
    }
}

#[async_trait]
impl Navigator for CdpPage {
    async fn navigate(&self, url: &str) -> Result<()> {
        debug!("cdp: navigating to {}", url);
        self.page
            .goto(url)
            .await
            .map_err(|e| anyhow!("Failed to navigate to {}: {}", url, e))?;
        wait_until_stable(&self.page, SETTLE_QUIET, self.settle_timeout).await
    }
}
