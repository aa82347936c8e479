use anyhow::{Context, Result, anyhow};
use futures_util::StreamExt;
use reqwest::header::HeaderMap;
use reqwest::{StatusCode, Url};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

pub(crate) const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);
pub(crate) const RETRY_MAX_DELAY: Duration = Duration::from_secs(16);
const MAX_ARCHIVE_BYTES: usize = 64 * 1024 * 1024;

pub type FontFuture = Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send>>;

/// Source of compressed font-family archives.
pub trait FontProvider: Send + Sync {
    fn fetch_archive(&self, family: &str) -> FontFuture;
}

#[derive(Debug, Clone)]
pub struct HttpFontProvider {
    client: reqwest::Client,
    base_url: String,
    max_retries: usize,
    retry_delay: Duration,
}

impl HttpFontProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration, max_retries: usize) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .with_context(|| "failed to build font provider client")?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            max_retries,
            retry_delay: RETRY_BASE_DELAY,
        })
    }

    /// First backoff step; later steps double up to [`RETRY_MAX_DELAY`].
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn download_url(&self, family: &str) -> Result<Url> {
        let endpoint = format!("{}/download", self.base_url.trim_end_matches('/'));
        Url::parse_with_params(&endpoint, &[("family", family)])
            .with_context(|| format!("invalid font provider url: {}", self.base_url))
    }
}

impl FontProvider for HttpFontProvider {
    fn fetch_archive(&self, family: &str) -> FontFuture {
        let client = self.client.clone();
        let url = self.download_url(family);
        let max_retries = self.max_retries;
        let retry_delay = self.retry_delay;
        Box::pin(async move { download_with_retry(&client, url?, max_retries, retry_delay).await })
    }
}

async fn download_with_retry(
    client: &reqwest::Client,
    url: Url,
    max_retries: usize,
    base_delay: Duration,
) -> Result<Vec<u8>> {
    let mut delay = base_delay;
    let mut attempt = 0;
    loop {
        attempt += 1;
        debug!("fetching font archive {} (attempt {})", url, attempt);
        match client.get(url.clone()).send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return read_archive(response).await;
                }
                if is_retryable(status) && attempt <= max_retries {
                    let hint = retry_after(response.headers());
                    wait_with_backoff(&url, attempt, max_retries, delay, hint).await;
                    delay = next_delay(delay, base_delay);
                    continue;
                }
                return Err(anyhow!(
                    "font provider returned status {} for {}",
                    status,
                    url
                ));
            }
            Err(err) if err.is_connect() && attempt <= max_retries => {
                wait_with_backoff(&url, attempt, max_retries, delay, None).await;
                delay = next_delay(delay, base_delay);
            }
            Err(err) if err.is_timeout() => {
                return Err(anyhow!("font provider timed out: {}", url));
            }
            Err(err) => {
                return Err(err).with_context(|| format!("failed to download font archive: {}", url));
            }
        }
    }
}

async fn read_archive(response: reqwest::Response) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.with_context(|| "failed to read font archive bytes")?;
        if bytes.len() + chunk.len() > MAX_ARCHIVE_BYTES {
            return Err(anyhow!(
                "font archive exceeds {} bytes",
                MAX_ARCHIVE_BYTES
            ));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

pub(crate) fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

pub(crate) fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get("retry-after")?.to_str().ok()?.trim();
    if value.is_empty() {
        return None;
    }
    value.parse::<u64>().ok().map(Duration::from_secs)
}

async fn wait_with_backoff(
    url: &Url,
    attempt: usize,
    max_retries: usize,
    delay: Duration,
    retry_after: Option<Duration>,
) {
    let mut wait = delay;
    if let Some(retry_after) = retry_after
        && retry_after > wait
    {
        wait = retry_after.min(RETRY_MAX_DELAY);
    }
    warn!(
        "font download from {} failed; retrying in {:.1}s (attempt {}/{})",
        url,
        wait.as_secs_f32(),
        attempt,
        max_retries
    );
    sleep(wait).await;
}

pub(crate) fn next_delay(current: Duration, floor: Duration) -> Duration {
    current.saturating_mul(2).max(floor).min(RETRY_MAX_DELAY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::extract::State;
    use axum::routing::get;
    use reqwest::header::HeaderValue;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers `/download` with `statuses[n]` on the n-th hit, then 200.
    #[derive(Clone)]
    struct Scripted {
        hits: Arc<AtomicUsize>,
        statuses: Arc<Vec<StatusCode>>,
        stall: Option<Duration>,
    }

    impl Scripted {
        fn new(statuses: Vec<StatusCode>) -> Self {
            Self {
                hits: Arc::new(AtomicUsize::new(0)),
                statuses: Arc::new(statuses),
                stall: None,
            }
        }

        fn hits(&self) -> usize {
            self.hits.load(Ordering::SeqCst)
        }
    }

    async fn scripted_download(State(script): State<Scripted>) -> (StatusCode, Vec<u8>) {
        let hit = script.hits.fetch_add(1, Ordering::SeqCst);
        if let Some(stall) = script.stall {
            tokio::time::sleep(stall).await;
        }
        let status = script.statuses.get(hit).copied().unwrap_or(StatusCode::OK);
        if status.is_success() {
            (status, b"PK archive".to_vec())
        } else {
            (status, Vec::new())
        }
    }

    async fn serve(script: Scripted) -> String {
        let app = Router::new()
            .route("/download", get(scripted_download))
            .with_state(script);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });
        format!("http://{}", addr)
    }

    fn provider(base_url: String, timeout: Duration, max_retries: usize) -> HttpFontProvider {
        HttpFontProvider::new(base_url, timeout, max_retries)
            .expect("provider")
            .with_retry_delay(Duration::from_millis(10))
    }

    #[tokio::test]
    async fn transient_statuses_are_retried_until_success() {
        let script = Scripted::new(vec![
            StatusCode::SERVICE_UNAVAILABLE,
            StatusCode::TOO_MANY_REQUESTS,
        ]);
        let base = serve(script.clone()).await;
        let archive = provider(base, Duration::from_secs(5), 2)
            .fetch_archive("Roboto")
            .await
            .expect("archive");
        assert_eq!(archive, b"PK archive");
        assert_eq!(script.hits(), 3);
    }

    #[tokio::test]
    async fn retries_stop_at_the_configured_bound() {
        let script = Scripted::new(vec![StatusCode::BAD_GATEWAY; 5]);
        let base = serve(script.clone()).await;
        let err = provider(base, Duration::from_secs(5), 1)
            .fetch_archive("Roboto")
            .await
            .expect_err("exhausted");
        assert!(err.to_string().contains("502"), "{}", err);
        assert_eq!(script.hits(), 2);
    }

    #[tokio::test]
    async fn not_found_fails_without_retrying() {
        let script = Scripted::new(vec![StatusCode::NOT_FOUND]);
        let base = serve(script.clone()).await;
        let err = provider(base, Duration::from_secs(5), 3)
            .fetch_archive("Nonexistent")
            .await
            .expect_err("404");
        assert!(err.to_string().contains("404"), "{}", err);
        assert_eq!(script.hits(), 1);
    }

    #[tokio::test]
    async fn stalled_provider_times_out_without_retrying() {
        let mut script = Scripted::new(Vec::new());
        script.stall = Some(Duration::from_secs(5));
        let base = serve(script.clone()).await;
        let err = provider(base, Duration::from_millis(200), 3)
            .fetch_archive("Roboto")
            .await
            .expect_err("timeout");
        assert!(err.to_string().contains("timed out"), "{}", err);
        assert_eq!(script.hits(), 1);
    }

    #[tokio::test]
    async fn refused_connections_are_retried_then_reported() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);
        let err = provider(format!("http://{}", addr), Duration::from_secs(5), 2)
            .fetch_archive("Roboto")
            .await
            .expect_err("refused");
        assert!(
            err.to_string().contains("failed to download font archive"),
            "{}",
            err
        );
    }

    #[test]
    fn download_url_encodes_family() {
        let provider =
            HttpFontProvider::new("https://fonts.google.com/", Duration::from_secs(5), 0)
                .expect("provider");
        let url = provider.download_url("Open Sans").expect("url");
        assert_eq!(
            url.as_str(),
            "https://fonts.google.com/download?family=Open+Sans"
        );
    }

    #[test]
    fn rejects_unparsable_base_url() {
        let provider =
            HttpFontProvider::new("not a url", Duration::from_secs(5), 0).expect("provider");
        assert!(provider.download_url("Roboto").is_err());
    }

    #[test]
    fn retries_only_transient_statuses() {
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable(StatusCode::BAD_GATEWAY));
        assert!(is_retryable(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!is_retryable(StatusCode::NOT_FOUND));
        assert!(!is_retryable(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn parses_retry_after_seconds() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after(&headers), None);
        headers.insert("retry-after", HeaderValue::from_static("3"));
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(3)));
        headers.insert("retry-after", HeaderValue::from_static("soon"));
        assert_eq!(retry_after(&headers), None);
    }

    #[test]
    fn backoff_doubles_up_to_cap() {
        assert_eq!(next_delay(Duration::ZERO, RETRY_BASE_DELAY), RETRY_BASE_DELAY);
        assert_eq!(
            next_delay(Duration::from_secs(2), RETRY_BASE_DELAY),
            Duration::from_secs(4)
        );
        assert_eq!(
            next_delay(Duration::from_secs(12), RETRY_BASE_DELAY),
            RETRY_MAX_DELAY
        );
        assert_eq!(
            next_delay(Duration::from_millis(5), Duration::from_millis(5)),
            Duration::from_millis(10)
        );
    }
}
