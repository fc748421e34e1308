use std::path::Path;
use std::sync::LazyLock;

use anyhow::{bail, Context, Result};
use regex::Regex;
use tracing::info;

static IMDB_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""imdbId"\s*:\s*"(tt\d+)""#).unwrap());
static TITLE_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/title/(tt\d+)/").unwrap());

/// Scan a source file for embedded IMDb ids. Order of appearance is
/// preserved; duplicates are kept (the caller decides).
pub fn extract_ids(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read ids file {}", path.display()))?;

    let ids: Vec<String> = IMDB_ID_RE
        .captures_iter(&content)
        .map(|c| c[1].to_string())
        .collect();

    if ids.is_empty() {
        bail!("no IMDb ids found in {}", path.display());
    }
    info!("Found {} ids in {}", ids.len(), path.display());
    Ok(ids)
}

/// Normalize a raw id to the canonical `tt` + digits form.
pub fn normalize_id(raw: &str) -> String {
    if raw.starts_with("tt") {
        raw.to_string()
    } else {
        format!("tt{raw}")
    }
}

/// Accept either a bare id ("tt0111161", "0111161") or a full title URL.
pub fn id_from_input(input: &str) -> Result<String> {
    if input.starts_with("http") {
        let caps = TITLE_URL_RE
            .captures(input)
            .with_context(|| format!("no title id in URL {input}"))?;
        Ok(caps[1].to_string())
    } else {
        Ok(normalize_id(input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_from_embedded_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("movies.ts");
        std::fs::write(
            &path,
            r#"{ "title": "A", "imdbId": "tt0111161" }, { "imdbId":"tt0068646" }"#,
        )
        .unwrap();
        let ids = extract_ids(&path).unwrap();
        assert_eq!(ids, vec!["tt0111161", "tt0068646"]);
    }

    #[test]
    fn empty_source_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("movies.ts");
        std::fs::write(&path, "no ids here").unwrap();
        assert!(extract_ids(&path).is_err());
    }

    #[test]
    fn missing_source_is_an_error() {
        assert!(extract_ids(Path::new("/nonexistent/movies.ts")).is_err());
    }

    #[test]
    fn normalize() {
        assert_eq!(normalize_id("tt0111161"), "tt0111161");
        assert_eq!(normalize_id("0111161"), "tt0111161");
    }

    #[test]
    fn id_from_url() {
        let id = id_from_input("https://www.imdb.com/title/tt0111161/parentalguide/").unwrap();
        assert_eq!(id, "tt0111161");
        assert!(id_from_input("https://www.imdb.com/chart/top/").is_err());
    }

    #[test]
    fn id_from_bare_digits() {
        assert_eq!(id_from_input("0111161").unwrap(), "tt0111161");
    }
}
