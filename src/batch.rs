use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;
use tracing::{info, warn};

use crate::fetch::{guide_url, FetchError, Fetcher};
use crate::model::{BatchState, FailedItem, ItemResult, SummaryRecord};
use crate::parser;

const CHECKPOINT_FILE: &str = "checkpoint.json";
const SUMMARY_FILE: &str = "scrape_summary.json";
const CHECKPOINT_INTERVAL: usize = 10;

pub struct BatchConfig {
    pub output_dir: PathBuf,
    /// Base inter-request delay in seconds; a random jitter in [0, 2) is
    /// added on top of it between requests.
    pub delay: f64,
    /// Explicit resume point. Non-zero skips the checkpoint lookup.
    pub start_index: usize,
}

/// Why one id failed. Fetch exhaustion and persistence problems are both
/// recorded into the failed list; neither aborts the run.
#[derive(Debug, thiserror::Error)]
enum ItemError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write record: {0}")]
    Write(#[from] std::io::Error),
}

/// Drive fetch + extract + persist over the whole id list sequentially.
pub async fn run(fetcher: &Fetcher, ids: &[String], config: &BatchConfig) -> Result<SummaryRecord> {
    run_with(|url: String| async move { fetcher.fetch(&url).await }, ids, config).await
}

/// The orchestrator proper, generic over the fetch call so the loop can be
/// exercised against simulated outcomes.
async fn run_with<F, Fut>(fetch: F, ids: &[String], config: &BatchConfig) -> Result<SummaryRecord>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<String, FetchError>>,
{
    fs::create_dir_all(&config.output_dir).with_context(|| {
        format!("failed to create output dir {}", config.output_dir.display())
    })?;
    let checkpoint_path = config.output_dir.join(CHECKPOINT_FILE);

    let mut results: Vec<ItemResult> = Vec::new();
    let mut failed: Vec<FailedItem> = Vec::new();
    let mut start_index = config.start_index;

    if start_index == 0 && checkpoint_path.exists() {
        let state = load_checkpoint(&checkpoint_path)?;
        start_index = state.last_completed_index + 1;
        results = state.results;
        failed = state.failed;
        info!("Resuming from checkpoint at index {start_index}");
    }

    let total = ids.len();
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );
    pb.set_position(start_index as u64);

    for (i, id) in ids.iter().enumerate().skip(start_index) {
        pb.set_message(id.clone());

        match process_one(&fetch, id, &config.output_dir).await {
            Ok(title) => {
                info!("[{}/{}] {} ok: {}", i + 1, total, id, title);
                results.push(ItemResult {
                    id: id.clone(),
                    status: "success".to_string(),
                    title,
                });
            }
            Err(e) => {
                warn!("[{}/{}] {} failed: {}", i + 1, total, id, e);
                failed.push(FailedItem {
                    id: id.clone(),
                    error: e.to_string(),
                });
            }
        }

        if (i + 1) % CHECKPOINT_INTERVAL == 0 {
            let state = BatchState {
                last_completed_index: i,
                results: results.clone(),
                failed: failed.clone(),
            };
            save_checkpoint(&checkpoint_path, &state)?;
        }

        pb.inc(1);

        // Randomized inter-request delay, an anti-detection measure.
        if i + 1 < total {
            let jitter: f64 = rand::thread_rng().gen_range(0.0..2.0);
            tokio::time::sleep(Duration::from_secs_f64(config.delay + jitter)).await;
        }
    }

    pb.finish_and_clear();

    let summary = SummaryRecord {
        total,
        success: results.len(),
        failed_count: failed.len(),
        failed,
    };
    let summary_path = config.output_dir.join(SUMMARY_FILE);
    fs::write(&summary_path, serde_json::to_string_pretty(&summary)?)
        .with_context(|| format!("failed to write summary {}", summary_path.display()))?;

    if checkpoint_path.exists() {
        fs::remove_file(&checkpoint_path).with_context(|| {
            format!("failed to remove checkpoint {}", checkpoint_path.display())
        })?;
    }

    info!(
        "Batch complete: {} ok, {} failed",
        summary.success, summary.failed_count
    );
    Ok(summary)
}

async fn process_one<F, Fut>(fetch: &F, id: &str, output_dir: &Path) -> Result<String, ItemError>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<String, FetchError>>,
{
    let url = guide_url(id);
    let html = fetch(url).await?;
    let record = parser::extract(&html, id);
    let json = serde_json::to_string_pretty(&record)?;
    fs::write(output_dir.join(format!("{id}_guide.json")), json)?;
    Ok(record.title)
}

/// A malformed checkpoint is fatal: fabricating a fresh run over a
/// partially-checkpointed state would silently reprocess or skip ids.
fn load_checkpoint(path: &Path) -> Result<BatchState> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read checkpoint {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| {
        format!(
            "corrupt checkpoint {}; fix or remove it before resuming",
            path.display()
        )
    })
}

fn save_checkpoint(path: &Path, state: &BatchState) -> Result<()> {
    fs::write(path, serde_json::to_string_pretty(state)?)
        .with_context(|| format!("failed to write checkpoint {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn make_ids(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("tt{i:07}")).collect()
    }

    fn page_for(url: &str) -> String {
        format!(r#"<div data-testid="subtitle">Title for {url}</div>"#)
    }

    /// Fetch closure that fails deterministically for the given ids and
    /// records every url it was called with.
    fn scripted_fetch(
        fail_for: &'static [&'static str],
        calls: Arc<Mutex<Vec<String>>>,
    ) -> impl Fn(String) -> std::future::Ready<Result<String, FetchError>> {
        move |url: String| {
            calls.lock().unwrap().push(url.clone());
            let outcome = if fail_for.iter().any(|frag| url.contains(frag)) {
                Err(FetchError {
                    attempts: 3,
                    last_error: "HTTP 403 Forbidden".to_string(),
                })
            } else {
                Ok(page_for(&url))
            };
            std::future::ready(outcome)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn every_id_accounted_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        let ids = make_ids(12);
        let config = BatchConfig {
            output_dir: dir.path().to_path_buf(),
            delay: 3.0,
            start_index: 0,
        };
        let calls = Arc::new(Mutex::new(Vec::new()));
        let fetch = scripted_fetch(&["tt0000003", "tt0000007"], Arc::clone(&calls));

        let summary = run_with(fetch, &ids, &config).await.unwrap();

        assert_eq!(summary.total, 12);
        assert_eq!(summary.success + summary.failed_count, 12);
        assert_eq!(summary.failed_count, 2);
        let failed_ids: Vec<&str> = summary.failed.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(failed_ids, vec!["tt0000003", "tt0000007"]);

        // One fetch per id, no duplicates, no omissions.
        assert_eq!(calls.lock().unwrap().len(), 12);

        // Per-id files for successes only.
        assert!(dir.path().join("tt0000001_guide.json").exists());
        assert!(!dir.path().join("tt0000003_guide.json").exists());

        // Summary written, checkpoint cleaned up.
        assert!(dir.path().join(SUMMARY_FILE).exists());
        assert!(!dir.path().join(CHECKPOINT_FILE).exists());
    }

    #[tokio::test(start_paused = true)]
    async fn resumes_from_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let ids = make_ids(15);

        // State as left behind after the 10th id: indexes 0..=9 done.
        let prior: Vec<ItemResult> = ids[..10]
            .iter()
            .map(|id| ItemResult {
                id: id.clone(),
                status: "success".to_string(),
                title: format!("Title {id}"),
            })
            .collect();
        let state = BatchState {
            last_completed_index: 9,
            results: prior,
            failed: Vec::new(),
        };
        save_checkpoint(&dir.path().join(CHECKPOINT_FILE), &state).unwrap();

        let config = BatchConfig {
            output_dir: dir.path().to_path_buf(),
            delay: 0.0,
            start_index: 0,
        };
        let calls = Arc::new(Mutex::new(Vec::new()));
        let fetch = scripted_fetch(&[], Arc::clone(&calls));

        let summary = run_with(fetch, &ids, &config).await.unwrap();

        // Only indexes 10..15 were fetched.
        let fetched = calls.lock().unwrap();
        assert_eq!(fetched.len(), 5);
        assert!(fetched[0].contains("tt0000011"));

        assert_eq!(summary.total, 15);
        assert_eq!(summary.success, 15);
        assert_eq!(summary.failed_count, 0);
        assert!(!dir.path().join(CHECKPOINT_FILE).exists());
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_start_index_overrides_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let ids = make_ids(8);

        let state = BatchState {
            last_completed_index: 5,
            results: Vec::new(),
            failed: Vec::new(),
        };
        save_checkpoint(&dir.path().join(CHECKPOINT_FILE), &state).unwrap();

        let config = BatchConfig {
            output_dir: dir.path().to_path_buf(),
            delay: 0.0,
            start_index: 3,
        };
        let calls = Arc::new(Mutex::new(Vec::new()));
        let fetch = scripted_fetch(&[], Arc::clone(&calls));

        let summary = run_with(fetch, &ids, &config).await.unwrap();

        let fetched = calls.lock().unwrap();
        assert!(fetched[0].contains("tt0000004"), "got {}", fetched[0]);
        assert_eq!(fetched.len(), 5);
        assert_eq!(summary.success, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn corrupt_checkpoint_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CHECKPOINT_FILE), "{ not valid json").unwrap();

        let config = BatchConfig {
            output_dir: dir.path().to_path_buf(),
            delay: 0.0,
            start_index: 0,
        };
        let calls = Arc::new(Mutex::new(Vec::new()));
        let fetch = scripted_fetch(&[], Arc::clone(&calls));

        let err = run_with(fetch, &make_ids(3), &config).await.unwrap_err();
        assert!(err.to_string().contains("corrupt checkpoint"));
        assert!(calls.lock().unwrap().is_empty());
        assert!(!dir.path().join(SUMMARY_FILE).exists());
    }

    #[test]
    fn checkpoint_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CHECKPOINT_FILE);
        let state = BatchState {
            last_completed_index: 19,
            results: vec![ItemResult {
                id: "tt0000001".to_string(),
                status: "success".to_string(),
                title: "A Film".to_string(),
            }],
            failed: vec![FailedItem {
                id: "tt0000002".to_string(),
                error: "fetch failed after 3 attempts: HTTP 429".to_string(),
            }],
        };
        save_checkpoint(&path, &state).unwrap();
        let loaded = load_checkpoint(&path).unwrap();
        assert_eq!(loaded.last_completed_index, 19);
        assert_eq!(loaded.results, state.results);
        assert_eq!(loaded.failed, state.failed);
    }
}
