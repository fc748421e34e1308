use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use rand::Rng;
use serde_json::{json, Value};
use tracing::{info, warn};

/// Category fields of a persisted guide record whose `items` get translated.
const CATEGORIES: [&str; 5] = [
    "sex_nudity",
    "violence_gore",
    "profanity",
    "alcohol_drugs_smoking",
    "frightening_intense",
];

const ITEM_SEPARATOR: &str = "---";
const MAX_RETRIES: u32 = 3;
const REQUEST_TIMEOUT_SECS: u64 = 60;

const SYSTEM_PROMPT: &str = "You are a professional movie content translator. \
Translate the following parental guide entries into the target language. \
Keep the tone and register of the original, use standard film-industry \
terminology, and preserve the one-entry-per-segment structure: each \
translated entry corresponds to one original entry, separated by ---. \
Return only the translations, with no extra commentary or numbering.";

#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    /// The service cannot be used at all; decided at startup, not lazily.
    #[error("translation service unavailable: {0}")]
    Unavailable(String),
    #[error("translation failed after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },
}

pub struct TranslateConfig {
    pub guides_dir: PathBuf,
    pub api_base: String,
    pub api_key: String,
    pub model: String,
    pub target_lang: String,
    /// Re-translate even when a translation already exists.
    pub force: bool,
    /// Delay in seconds before each service call.
    pub delay: f64,
    /// Restrict the pass to one file instead of the whole directory.
    pub file: Option<String>,
    /// List the files that would be processed; no network calls.
    pub dry_run: bool,
}

/// Chat-completion client for the translation pass.
#[derive(Debug)]
pub struct TranslationClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    target_lang: String,
}

impl TranslationClient {
    /// Explicit factory: a missing key is a typed error at startup rather
    /// than a failure surfacing on the first translation call.
    pub fn connect(
        api_base: &str,
        api_key: &str,
        model: &str,
        target_lang: &str,
    ) -> Result<Self, TranslateError> {
        if api_key.trim().is_empty() {
            return Err(TranslateError::Unavailable(
                "no API key configured (set OPENAI_API_KEY or pass --api-key)".to_string(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| TranslateError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", api_base.trim_end_matches('/')),
            api_key: api_key.to_string(),
            model: model.to_string(),
            target_lang: target_lang.to_string(),
        })
    }

    /// Translate an ordered item list; the returned list always has the
    /// same length as the input. Retries with exponential backoff before
    /// giving up on the category.
    pub async fn translate_items(&self, items: &[String]) -> Result<Vec<String>, TranslateError> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let joined = items.join(&format!("\n{ITEM_SEPARATOR}\n"));
        let user_prompt = format!(
            "Translate the following {} entries into {}, each separated by {}:\n\n{}",
            items.len(),
            self.target_lang,
            ITEM_SEPARATOR,
            joined
        );
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": user_prompt },
            ],
            "temperature": 0.3,
        });

        let mut last_error = String::new();
        for attempt in 0..MAX_RETRIES {
            match self.request_once(&body).await {
                Ok(content) => {
                    let translated = split_translated(&content);
                    return Ok(align_translations(translated, items));
                }
                Err(e) => {
                    warn!(
                        "Translation attempt {}/{} failed: {e}",
                        attempt + 1,
                        MAX_RETRIES
                    );
                    last_error = e;
                }
            }
            if attempt + 1 < MAX_RETRIES {
                tokio::time::sleep(backoff(attempt)).await;
            }
        }

        Err(TranslateError::Exhausted {
            attempts: MAX_RETRIES,
            last_error,
        })
    }

    async fn request_once(&self, body: &Value) -> Result<String, String> {
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| e.to_string())?;
        if !status.is_success() {
            return Err(format!("HTTP {status}: {}", snippet(&text)));
        }

        let parsed: Value =
            serde_json::from_str(&text).map_err(|_| "invalid JSON from service".to_string())?;
        parsed
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(|s| s.trim().to_string())
            .ok_or_else(|| "missing choices[0].message.content in response".to_string())
    }
}

fn backoff(attempt: u32) -> Duration {
    let jitter: u64 = rand::thread_rng().gen_range(0..200);
    Duration::from_millis(1000 * 2u64.pow(attempt + 1) + jitter)
}

fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() > 400 {
        format!("{}...", trimmed.chars().take(400).collect::<String>())
    } else {
        trimmed.to_string()
    }
}

fn split_translated(content: &str) -> Vec<String> {
    content
        .split(ITEM_SEPARATOR)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Recover a count mismatch: pad a short list with the corresponding
/// originals, truncate a long one. Output length always equals input length.
fn align_translations(mut translated: Vec<String>, originals: &[String]) -> Vec<String> {
    if translated.len() != originals.len() {
        warn!(
            "Translation count mismatch: {} originals, {} translated",
            originals.len(),
            translated.len()
        );
    }
    if translated.len() < originals.len() {
        translated.extend(originals[translated.len()..].iter().cloned());
    } else {
        translated.truncate(originals.len());
    }
    translated
}

/// Run the translation pass over persisted guide files.
pub async fn run(config: &TranslateConfig) -> Result<()> {
    let files = collect_files(config)?;
    info!("Found {} guide files", files.len());

    if config.dry_run {
        for f in &files {
            println!("  {}", f.display());
        }
        return Ok(());
    }

    let client = TranslationClient::connect(
        &config.api_base,
        &config.api_key,
        &config.model,
        &config.target_lang,
    )?;

    let mut ok = 0usize;
    let mut failed = 0usize;
    for (i, path) in files.iter().enumerate() {
        info!("[{}/{}] {}", i + 1, files.len(), path.display());
        match translate_file(&client, path, config.force, config.delay).await {
            Ok(()) => ok += 1,
            Err(e) => {
                warn!("{}: {e}", path.display());
                failed += 1;
            }
        }
    }

    println!("Translation pass done: {ok} ok, {failed} failed");
    Ok(())
}

fn collect_files(config: &TranslateConfig) -> Result<Vec<PathBuf>> {
    if let Some(name) = &config.file {
        let path = if Path::new(name).is_absolute() {
            PathBuf::from(name)
        } else {
            config.guides_dir.join(name)
        };
        if !path.exists() {
            bail!("file not found: {}", path.display());
        }
        return Ok(vec![path]);
    }

    let entries = std::fs::read_dir(&config.guides_dir)
        .with_context(|| format!("failed to read {}", config.guides_dir.display()))?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with("_guide.json"))
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Translate all categories of one persisted record, writing the file back
/// when anything changed. A failed category is left untranslated.
async fn translate_file(
    client: &TranslationClient,
    path: &Path,
    force: bool,
    delay: f64,
) -> Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let mut data: Value =
        serde_json::from_str(&raw).with_context(|| format!("invalid JSON in {}", path.display()))?;

    if !force && is_translated(&data) {
        info!("Skipping {} (already translated)", path.display());
        return Ok(());
    }

    let mut modified = false;
    for category in CATEGORIES {
        let Some(cat) = data.get_mut(category) else {
            continue;
        };
        if !cat.is_object() {
            continue;
        }

        let items: Vec<String> = cat
            .get("items")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        // Empty lists map to an empty output without a service call.
        if items.is_empty() {
            cat["items_translated"] = json!([]);
            modified = true;
            continue;
        }

        if !force && has_translation(cat) {
            continue;
        }

        tokio::time::sleep(Duration::from_secs_f64(delay)).await;
        match client.translate_items(&items).await {
            Ok(translated) => {
                cat["items_translated"] = json!(translated);
                modified = true;
            }
            Err(e) => warn!("{category}: {e}"),
        }
    }

    if modified {
        std::fs::write(path, serde_json::to_string_pretty(&data)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    Ok(())
}

fn has_translation(cat: &Value) -> bool {
    cat.get("items_translated")
        .and_then(|v| v.as_array())
        .is_some_and(|arr| !arr.is_empty())
}

fn is_translated(data: &Value) -> bool {
    CATEGORIES
        .iter()
        .any(|c| data.get(c).is_some_and(has_translation))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn align_pads_short_list_with_originals() {
        let originals = strings(&["one", "two", "three"]);
        let out = align_translations(strings(&["uno"]), &originals);
        assert_eq!(out, strings(&["uno", "two", "three"]));
    }

    #[test]
    fn align_truncates_long_list() {
        let originals = strings(&["one"]);
        let out = align_translations(strings(&["uno", "dos", "tres"]), &originals);
        assert_eq!(out, strings(&["uno"]));
    }

    #[test]
    fn align_length_always_matches() {
        let originals = strings(&["a", "b", "c", "d"]);
        for n in 0..8 {
            let translated: Vec<String> = (0..n).map(|i| format!("t{i}")).collect();
            assert_eq!(align_translations(translated, &originals).len(), 4);
        }
    }

    #[test]
    fn split_drops_blank_segments() {
        let content = "uno\n---\n\n---\ndos\n---\n  ";
        assert_eq!(split_translated(content), strings(&["uno", "dos"]));
    }

    #[test]
    fn translated_detection() {
        let data: Value = json!({
            "profanity": { "items": ["damn"], "items_translated": ["zut"] },
            "violence_gore": { "items": [], "items_translated": [] },
        });
        assert!(is_translated(&data));

        let fresh: Value = json!({
            "profanity": { "items": ["damn"] },
        });
        assert!(!is_translated(&fresh));
    }

    #[test]
    fn connect_without_key_is_unavailable() {
        let err = TranslationClient::connect("https://api.openai.com/v1", " ", "gpt-4o-mini", "zh")
            .unwrap_err();
        assert!(matches!(err, TranslateError::Unavailable(_)));
    }

    #[test]
    fn connect_builds_endpoint() {
        let client =
            TranslationClient::connect("https://api.example.com/v1/", "sk-test", "m", "fr")
                .unwrap();
        assert_eq!(client.endpoint, "https://api.example.com/v1/chat/completions");
    }

    #[test]
    fn collect_files_filters_by_suffix() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("tt0000001_guide.json"), "{}").unwrap();
        std::fs::write(dir.path().join("scrape_summary.json"), "{}").unwrap();
        std::fs::write(dir.path().join("checkpoint.json"), "{}").unwrap();

        let config = TranslateConfig {
            guides_dir: dir.path().to_path_buf(),
            api_base: String::new(),
            api_key: String::new(),
            model: String::new(),
            target_lang: String::new(),
            force: false,
            delay: 0.0,
            file: None,
            dry_run: true,
        };
        let files = collect_files(&config).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("tt0000001_guide.json"));
    }

    #[test]
    fn collect_files_single_target_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let config = TranslateConfig {
            guides_dir: dir.path().to_path_buf(),
            api_base: String::new(),
            api_key: String::new(),
            model: String::new(),
            target_lang: String::new(),
            force: false,
            delay: 0.0,
            file: Some("missing_guide.json".to_string()),
            dry_run: true,
        };
        assert!(collect_files(&config).is_err());
    }
}
