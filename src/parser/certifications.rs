use std::sync::LazyLock;

use regex::Regex;

use super::text::clean_text;
use crate::model::{CertificationItem, CertificationRating};

const ITEM_MARKER: &str = r#"data-testid="certificates-item""#;

static CONTAINER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)data-testid="certificates-container".*?(?:</section>|<footer)"#).unwrap()
});
static COUNTRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ipc-metadata-list-item__label[^>]*>([^<]+)").unwrap());
static RATING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)ipc-metadata-list-item__list-content-item--link[^>]*>([^<]+)</a>(?:<span class="ipc-metadata-list-item__list-content-item--subText">([^<]*)</span>)?"#,
    )
    .unwrap()
});

/// Extract the ratings-by-country table. Per-country blocks with no
/// country label, or with a label but zero ratings, are discarded.
pub fn extract_certifications(html: &str) -> Vec<CertificationItem> {
    let Some(container) = CONTAINER_RE.find(html) else {
        return Vec::new();
    };

    split_keeping_marker(container.as_str(), ITEM_MARKER)
        .into_iter()
        .filter_map(parse_country_block)
        .collect()
}

fn parse_country_block(block: &str) -> Option<CertificationItem> {
    let country = COUNTRY_RE
        .captures(block)
        .map(|c| clean_text(&c[1]))
        .unwrap_or_default();
    if country.is_empty() {
        return None;
    }

    let ratings: Vec<CertificationRating> = RATING_RE
        .captures_iter(block)
        .filter_map(|caps| {
            let rating = clean_text(&caps[1]);
            if rating.is_empty() {
                return None;
            }
            let note = caps.get(2).map(|m| clean_text(m.as_str())).unwrap_or_default();
            Some(CertificationRating { rating, note })
        })
        .collect();

    if ratings.is_empty() {
        return None;
    }
    Some(CertificationItem { country, ratings })
}

/// Split `text` at every occurrence of `marker`, each piece keeping its
/// leading marker. Text before the first marker is not returned.
fn split_keeping_marker<'a>(text: &'a str, marker: &str) -> Vec<&'a str> {
    let starts: Vec<usize> = text.match_indices(marker).map(|(i, _)| i).collect();
    starts
        .iter()
        .enumerate()
        .map(|(k, &start)| {
            let end = starts.get(k + 1).copied().unwrap_or(text.len());
            &text[start..end]
        })
        .collect()
}
