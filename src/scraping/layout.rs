//! Selector table for the travel site's current markup.
//!
//! Pure data: [`CdpPage`](super::cdp_page::CdpPage) turns these into DOM
//! queries. When the site reshuffles its class names, this is the only file
//! that changes.

use crate::core::types::PlaceVariant;
use crate::scraping::inspector::ReviewField;

/// How text is read off a matched element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSource {
    InnerText,
    TextContent,
    /// `nodeValue` of the n-th child node (bare text next to an inline tag).
    ChildNode(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSelector {
    /// Relative to the review item.
    pub css: &'static str,
    pub source: TextSource,
}

const fn inner(css: &'static str) -> FieldSelector {
    FieldSelector {
        css,
        source: TextSource::InnerText,
    }
}

/// One tab-bar shape: the bar itself and the clickable tabs inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TabBar {
    pub container: &'static str,
    pub tabs: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedLayout {
    /// Every review item of the feed, in document order.
    pub items: &'static str,
    /// Present inside an item that is not a review and ends the feed.
    pub terminator: Option<&'static str>,
    pub username: FieldSelector,
    pub rating: FieldSelector,
    pub title: FieldSelector,
    pub visit_date: FieldSelector,
    pub read_more: FieldSelector,
    pub body: FieldSelector,
    pub written_date: FieldSelector,
    pub image_container: &'static str,
    /// Relative to `image_container`.
    pub images: &'static str,
    /// Attributes tried in order for each image.
    pub image_attrs: &'static [&'static str],
    pub next_page: &'static str,
}

impl FeedLayout {
    pub fn field(&self, field: ReviewField) -> FieldSelector {
        match field {
            ReviewField::Username => self.username,
            ReviewField::RatingLabel => self.rating,
            ReviewField::Title => self.title,
            ReviewField::VisitDate => self.visit_date,
            ReviewField::ReadMoreLabel => self.read_more,
            ReviewField::Body => self.body,
            ReviewField::WrittenDate => self.written_date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteLayout {
    /// Both tab-bar shapes; the narrow one is tried first.
    pub tab_bars: Vec<TabBar>,
    /// Compared lower-cased against each tab's text.
    pub all_results_label: &'static str,
    pub show_more: &'static str,
    pub result_count: &'static str,
    pub listing_items: &'static str,
    /// Relative to a listing item.
    pub listing_type: &'static str,
    pub listing_name: &'static str,
    pub attraction: FeedLayout,
    pub hotel: FeedLayout,
    pub restaurant: FeedLayout,
}

impl SiteLayout {
    pub fn feed(&self, variant: PlaceVariant) -> &FeedLayout {
        match variant {
            PlaceVariant::Attraction => &self.attraction,
            PlaceVariant::Hotel => &self.hotel,
            PlaceVariant::Restaurant => &self.restaurant,
        }
    }

    pub fn tripadvisor() -> Self {
        Self {
            tab_bars: vec![
                TabBar {
                    container: "header.xySeT > div.YvlOj > div.eGVWv",
                    tabs: "header.xySeT > div.YvlOj > div.eGVWv > button",
                },
                TabBar {
                    container: "div.giPtt",
                    tabs: "div.giPtt > div.Ph > a > div",
                },
            ],
            all_results_label: "all results",
            show_more: "div.SVuzf button.rmyCe",
            result_count: "div.uYzlj > div.biGQs > div.Ci",
            listing_items: "div.SVuzf > div > div.kgrOn > a",
            listing_type: "div > div.yJIls.z.y > header > div > div > div > div.ngpKT > span.biGQs",
            listing_name: "div > div.yJIls.z.y > header > div > div > div.biGQs._P.fiohW.ngXxk > a",
            attraction: FeedLayout {
                items: r#"div#tab-data-qa-reviews-0 > div.eSDnY > div.LbPSX > div > div[data-automation="tab"]"#,
                terminator: Some("div.uYzlj"),
                username: inner("div > div > div.mwPje.f.M.k > div.XExLl.f.u.o > div.zpDvc.Zb > span > a"),
                rating: FieldSelector {
                    css: "svg.UctUV title",
                    source: TextSource::TextContent,
                },
                title: inner("div.biGQs > a > span.yCeTE"),
                visit_date: inner("div.RpeCd"),
                read_more: inner("div.FKffI > div.lszDU button span"),
                body: inner("div.FKffI > div.fIrGe > div.biGQs > span.JguWG > span.yCeTE"),
                written_date: inner("div.TreSq > div:nth-child(1)"),
                image_container: "div.LblVz",
                images: "div > button > span > picture > img",
                image_attrs: &["srcset"],
                next_page: r#"div#tab-data-qa-reviews-0 > div.eSDnY > div.LbPSX > div > div[data-automation="tab"]:last-child > div:nth-child(2) > div > div.OvVFl.j > div.xkSty > div.UCacc > a"#,
            },
            hotel: FeedLayout {
                items: r#"div[data-test-target="reviews-tab"] > div.ruCQl > div.uqMDf > div.azLzJ"#,
                terminator: None,
                username: inner("div.MD > div > div.w.o > div > div > span > a.blnum.BDpWK"),
                rating: FieldSelector {
                    css: "div.kmMXA._T.Gi > div.WcRsW.f.O > div > svg title",
                    source: TextSource::TextContent,
                },
                title: inner("div.kmMXA._T.Gi > div.joSMp.MI._S.b.S6.H5.Cj._a > a > span > span"),
                visit_date: FieldSelector {
                    css: "div.kmMXA._T.Gi > div.yJgrn > div.PDZqu > span.iSNGb._R.Me.S4.H3.Cj",
                    source: TextSource::ChildNode(1),
                },
                read_more: inner("div.kmMXA._T.Gi > div.yJgrn > div._T.FKffI.bmUTE > div.lszDU > div > span.bcpeg._S.Ci"),
                body: inner("div.kmMXA._T.Gi > div.yJgrn > div._T.FKffI > div.fIrGe._T > span > span"),
                written_date: FieldSelector {
                    css: "div.MD > div > div.w.o > div > div > span",
                    source: TextSource::ChildNode(1),
                },
                image_container: "div.f.z.QBsxC",
                images: "div > picture > img",
                image_attrs: &["src"],
                next_page: r#"div[data-test-target="reviews-tab"] > div.ruCQl.z > div.uqMDf.z.BGJxv.xOykd.jFVeD.yikFK > div > div.uYzlj.c > div.lATJZ > div.OvVFl.j > div.xkSty > div.UCacc > a"#,
            },
            restaurant: FeedLayout {
                items: "section#REVIEWS > div.iTazX > div.zyBif > div > div > div.JmLZe > div > div",
                terminator: None,
                username: inner("div > div.jOdBK.k > div.XExLl.f.u.o > div.zpDvc.Zb > span > a"),
                rating: FieldSelector {
                    css: "div > div.kKMmV.J.k > svg > title",
                    source: TextSource::TextContent,
                },
                title: inner(r#"div > div[data-test-target="review-title"] > span > div > a"#),
                visit_date: inner("div > div.Szuxy"),
                read_more: inner(r#"div > div[data-test-target="review-body"] > span > div > div.lszDU > button > span"#),
                body: inner(r#"div > div[data-test-target="review-body"] > span > div > div.fIrGe._T.bgMZj > div > span"#),
                written_date: inner("div > div.ncVYc > div.biGQs._P.pZUbB.ncFvv.osNWb"),
                image_container: "div > div.XzlVY",
                images: "button > picture > img",
                image_attrs: &["srcset", "src"],
                next_page: "section#REVIEWS > div.iTazX > div.zyBif > div > div > div.uYzlj > div.lATJZ > div.OvVFl.j > div.xkSty > div.UCacc > a",
            },
        }
    }
}

impl Default for SiteLayout {
    fn default() -> Self {
        Self::tripadvisor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_has_a_feed() {
        let layout = SiteLayout::default();
        for v in PlaceVariant::ALL {
            let feed = layout.feed(v);
            assert!(!feed.items.is_empty());
            assert!(!feed.next_page.is_empty());
            assert!(!feed.image_attrs.is_empty());
        }
    }

    #[test]
    fn only_attraction_feed_has_terminator() {
        let layout = SiteLayout::tripadvisor();
        assert!(layout.attraction.terminator.is_some());
        assert!(layout.hotel.terminator.is_none());
        assert!(layout.restaurant.terminator.is_none());
    }

    #[test]
    fn hotel_dates_come_from_bare_text_nodes() {
        let hotel = &SiteLayout::tripadvisor().hotel;
        assert_eq!(
            hotel.field(ReviewField::VisitDate).source,
            TextSource::ChildNode(1)
        );
        assert_eq!(
            hotel.field(ReviewField::WrittenDate).source,
            TextSource::ChildNode(1)
        );
    }
}
