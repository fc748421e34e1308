mod categories;
mod certifications;
mod spans;
mod text;

use std::sync::LazyLock;

use regex::Regex;

use crate::fetch::guide_url;
use crate::model::GuideRecord;
use spans::SectionSpans;
use text::clean_text;

static SUBTITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"data-testid="subtitle"[^>]*>([^<]+)"#).unwrap());
static TITLE_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<title>([^<]+)</title>").unwrap());
static TITLE_YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)\s*\(\d{4}\)").unwrap());
static CONTENT_RATING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)data-testid="content-rating".*?Motion Picture Rating.*?ipc-html-content-inner-div[^>]*>([^<]+)"#,
    )
    .unwrap()
});

/// Turn one raw parental guide page into a typed record. Never fails:
/// sections missing from the page degrade to empty fields.
pub fn extract(html: &str, id: &str) -> GuideRecord {
    let spans = SectionSpans::locate(html);
    let category =
        |anchor: &str| categories::extract_category(spans.section(html, anchor));

    GuideRecord {
        id: id.to_string(),
        title: extract_title(html),
        source_url: guide_url(id),
        content_rating: extract_content_rating(html),
        sex_nudity: category("nudity"),
        violence_gore: category("violence"),
        profanity: category("profanity"),
        alcohol_drugs_smoking: category("alcohol"),
        frightening_intense: category("frightening"),
        certifications: certifications::extract_certifications(html),
    }
}

/// Subtitle marker first; fall back to the `<title>` element with the
/// trailing "(YYYY)" suffix stripped.
fn extract_title(html: &str) -> String {
    if let Some(caps) = SUBTITLE_RE.captures(html) {
        return clean_text(&caps[1]);
    }
    if let Some(caps) = TITLE_TAG_RE.captures(html) {
        if let Some(year_caps) = TITLE_YEAR_RE.captures(&caps[1]) {
            return clean_text(&year_caps[1]);
        }
    }
    String::new()
}

/// First readable text node after the content-rating anchor. The lazy
/// span stops at the first inner-div marker so it cannot overrun into
/// unrelated page content.
fn extract_content_rating(html: &str) -> String {
    CONTENT_RATING_RE
        .captures(html)
        .map(|c| clean_text(&c[1]))
        .unwrap_or_default()
}
