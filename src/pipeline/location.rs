//! Per-action location gates.

use url::Url;

use crate::core::types::Action;

/// Whether `location` is a page `action` may resume on.
///
/// Search-result actions need the results path; the review walk needs a place
/// detail page. Submitting the search and delivering output run anywhere.
pub fn expected_location(action: Action, location: &Url) -> bool {
    let path = location.path().to_lowercase();
    match action {
        Action::SubmitSearch | Action::DeliverOutput => true,
        Action::SelectCategoryTab | Action::WalkListing => {
            path.trim_end_matches('/') == "/search"
        }
        Action::WalkReviews => path.ends_with(".html"),
    }
}

/// `true` if `location` is one of the allowed home locations.
/// A trailing slash on either side is ignored.
pub fn is_home(location: &str, homes: &[String]) -> bool {
    let here = location.trim().trim_end_matches('/');
    homes
        .iter()
        .any(|h| h.trim().trim_end_matches('/').eq_ignore_ascii_case(here))
}

/// Search endpoint with the keyword as the `q` parameter.
pub fn search_url(endpoint: &str, keyword: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(endpoint)?;
    url.query_pairs_mut().clear().append_pair("q", keyword);
    Ok(url)
}

/// Advance the listing `offset` parameter by `per_page`; absent counts as 0.
pub fn next_listing_page(current: &Url, per_page: u32) -> Url {
    let offset = current
        .query_pairs()
        .find(|(k, _)| k == "offset")
        .and_then(|(_, v)| v.parse::<u64>().ok())
        .unwrap_or(0);

    let kept: Vec<(String, String)> = current
        .query_pairs()
        .filter(|(k, _)| k != "offset")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut next = current.clone();
    {
        let mut q = next.query_pairs_mut();
        q.clear();
        for (k, v) in &kept {
            q.append_pair(k, v);
        }
        q.append_pair("offset", &(offset + per_page as u64).to_string());
    }
    next
}
