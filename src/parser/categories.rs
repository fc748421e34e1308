use std::sync::LazyLock;

use regex::Regex;

use super::text::clean_text;
use crate::model::CategoryInfo;

static SEVERITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ipc-signpost__text[^>]*>([^<]+)").unwrap());
static ITEM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)data-testid="item-html".*?ipc-html-content-inner-div[^>]*>([^<]+)"#).unwrap()
});

/// Extract one category from its bounded span. Severity is the first
/// signpost label in the span (later duplicates are ignored); items are
/// every item-html text node in order of appearance, dropping entries
/// that normalize to empty.
pub fn extract_category(section: Option<&str>) -> CategoryInfo {
    let Some(section) = section else {
        return CategoryInfo::default();
    };

    let severity = SEVERITY_RE
        .captures(section)
        .map(|c| clean_text(&c[1]))
        .unwrap_or_default();

    let items: Vec<String> = ITEM_RE
        .captures_iter(section)
        .map(|c| clean_text(&c[1]))
        .filter(|t| !t.is_empty())
        .collect();

    CategoryInfo { severity, items }
}
