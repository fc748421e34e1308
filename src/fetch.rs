use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::{Client, StatusCode};
use tracing::warn;

const BASE_URL: &str = "https://www.imdb.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_RETRY_DELAY_MS: u64 = 2000;

const UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                  (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// All retries against the source exhausted. Recorded as a per-item
/// failure by the batch loop, never fatal to the run.
#[derive(Debug, thiserror::Error)]
#[error("fetch failed after {attempts} attempts: {last_error}")]
pub struct FetchError {
    pub attempts: u32,
    pub last_error: String,
}

/// Parental guide URL for a normalized title id.
pub fn guide_url(id: &str) -> String {
    format!("{BASE_URL}/title/{id}/parentalguide/")
}

pub struct Fetcher {
    client: Client,
    max_retries: u32,
    retry_delay: Duration,
}

impl Fetcher {
    pub fn new() -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(UA));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        })
    }

    /// Fetch one document with bounded retries. 429 waits longer than the
    /// linear inter-attempt backoff; every other non-2xx outcome (403
    /// included) and transport errors are retried the same way.
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let mut last_error = String::from("no attempts made");

        for attempt in 0..self.max_retries {
            match self.client.get(url).send().await {
                Ok(resp) if resp.status().is_success() => match resp.text().await {
                    Ok(body) => return Ok(body),
                    Err(e) => {
                        warn!("Body read failed for {url}: {e}");
                        last_error = e.to_string();
                    }
                },
                Ok(resp) if resp.status() == StatusCode::TOO_MANY_REQUESTS => {
                    warn!(
                        "Rate limited (429) on {url}, attempt {}/{}, waiting longer",
                        attempt + 1,
                        self.max_retries
                    );
                    last_error = "HTTP 429 Too Many Requests".to_string();
                    tokio::time::sleep(rate_limit_backoff(self.retry_delay, attempt)).await;
                }
                Ok(resp) => {
                    warn!(
                        "HTTP {} on {url}, attempt {}/{}",
                        resp.status(),
                        attempt + 1,
                        self.max_retries
                    );
                    last_error = format!("HTTP {}", resp.status());
                }
                Err(e) => {
                    warn!(
                        "Request failed for {url}: {e}, attempt {}/{}",
                        attempt + 1,
                        self.max_retries
                    );
                    last_error = e.to_string();
                }
            }

            if attempt + 1 < self.max_retries {
                tokio::time::sleep(linear_backoff(self.retry_delay, attempt)).await;
            }
        }

        Err(FetchError {
            attempts: self.max_retries,
            last_error,
        })
    }
}

/// Standard inter-attempt delay: base scaled by attempt index.
fn linear_backoff(base: Duration, attempt: u32) -> Duration {
    base * (attempt + 1)
}

/// Extra wait after a 429, longer than the linear backoff at the same attempt.
fn rate_limit_backoff(base: Duration, attempt: u32) -> Duration {
    base * (attempt + 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guide_url_format() {
        assert_eq!(
            guide_url("tt0111161"),
            "https://www.imdb.com/title/tt0111161/parentalguide/"
        );
    }

    #[test]
    fn backoff_scales_with_attempt() {
        let base = Duration::from_secs(2);
        assert_eq!(linear_backoff(base, 0), Duration::from_secs(2));
        assert_eq!(linear_backoff(base, 2), Duration::from_secs(6));
    }

    #[test]
    fn rate_limit_waits_longer_than_linear() {
        let base = Duration::from_secs(2);
        for attempt in 0..4 {
            assert!(rate_limit_backoff(base, attempt) > linear_backoff(base, attempt));
        }
    }

    #[test]
    fn fetch_error_display() {
        let e = FetchError {
            attempts: 3,
            last_error: "HTTP 403 Forbidden".into(),
        };
        assert_eq!(
            e.to_string(),
            "fetch failed after 3 attempts: HTTP 403 Forbidden"
        );
    }
}
