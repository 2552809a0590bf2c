//! HTTP client for the FDSN event service.
//!
//! One GET per attempt, bounded by a request timeout. Connection failures,
//! timeouts and 5xx/429 statuses are retried with exponential backoff;
//! any other status is reported immediately.

use crate::config::{FetchSettings, QueryConfig};
use crate::error::{QuakeError, QuakeResult};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Upper bound on a single backoff delay.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Configuration for the fetcher.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub endpoint: String,
    pub timeout: Duration,
    pub retries: u32,
    pub retry_base_delay: Duration,
    /// Show a spinner while the request is in flight.
    pub show_progress: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self::from(&FetchSettings::default())
    }
}

impl From<&FetchSettings> for FetchConfig {
    fn from(settings: &FetchSettings) -> Self {
        Self {
            endpoint: settings.endpoint.clone(),
            timeout: Duration::from_secs(settings.timeout_seconds),
            retries: settings.retries,
            retry_base_delay: Duration::from_millis(settings.retry_base_delay_ms),
            show_progress: true,
        }
    }
}

/// Outcome of a failed attempt.
#[derive(Debug)]
enum AttemptError {
    /// Worth retrying.
    Transient(String),
    Fatal(String),
}

/// Fetches the event feed for a fixed query.
pub struct EventFetcher {
    config: FetchConfig,
    query: Vec<(&'static str, String)>,
    http_client: reqwest::Client,
}

impl EventFetcher {
    /// Create a fetcher for the given query.
    pub fn new(config: FetchConfig, query: &QueryConfig) -> QuakeResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("quakestats/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| QuakeError::Network(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            query: query.query_pairs(),
            http_client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    /// Retrieve the raw response body, retrying transient failures.
    pub async fn fetch_body(&self) -> QuakeResult<String> {
        info!("Querying {}", self.config.endpoint);
        debug!("Query parameters: {:?}", self.query);

        let spinner = self.config.show_progress.then(new_spinner);
        let result = self.fetch_with_retries(spinner.as_ref()).await;

        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }

        result
    }

    async fn fetch_with_retries(&self, spinner: Option<&ProgressBar>) -> QuakeResult<String> {
        let mut attempt = 0;

        loop {
            if let Some(pb) = spinner {
                pb.set_message(format!(
                    "Fetching earthquakes (attempt {}/{})",
                    attempt + 1,
                    self.config.retries + 1
                ));
            }

            match self.attempt().await {
                Ok(body) => {
                    info!("Received {} bytes", body.len());
                    return Ok(body);
                }
                Err(AttemptError::Transient(message)) if attempt < self.config.retries => {
                    let delay = backoff_delay(self.config.retry_base_delay, attempt);
                    warn!(
                        "Attempt {} failed: {}. Retrying in {}ms",
                        attempt + 1,
                        message,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(AttemptError::Transient(message)) | Err(AttemptError::Fatal(message)) => {
                    return Err(QuakeError::Network(message));
                }
            }
        }
    }

    /// A single GET request.
    async fn attempt(&self) -> Result<String, AttemptError> {
        let response = self
            .http_client
            .get(&self.config.endpoint)
            .query(&self.query)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AttemptError::Transient(format!(
                        "request timed out after {}s",
                        self.config.timeout.as_secs()
                    ))
                } else if e.is_connect() {
                    AttemptError::Transient(format!(
                        "cannot connect to {}",
                        self.config.endpoint
                    ))
                } else {
                    AttemptError::Fatal(format!("failed to send request: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = format!("service returned {}: {}", status, body.trim());
            return Err(if is_transient_status(status) {
                AttemptError::Transient(message)
            } else {
                AttemptError::Fatal(message)
            });
        }

        response
            .text()
            .await
            .map_err(|e| AttemptError::Transient(format!("failed to read response body: {}", e)))
    }
}

fn is_transient_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

/// Delay before retry number `attempt + 1`.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt);
    base.saturating_mul(factor).min(MAX_BACKOFF)
}

fn new_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const BODY: &str = r#"{"metadata": {"count": 1}, "features": [
        {"properties": {"mag": 3.1, "time": 1000}, "geometry": {"coordinates": [-1.5, 53.2, 5.0]}}
    ]}"#;

    /// Serve the given `(status, body)` responses, one per connection.
    /// Returns the endpoint URL, the request counter and the last request line.
    pub(crate) async fn serve(
        responses: Vec<(u16, &'static str)>,
    ) -> (String, Arc<AtomicUsize>, Arc<tokio::sync::Mutex<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let last_request = Arc::new(tokio::sync::Mutex::new(String::new()));

        let counter = hits.clone();
        let request_line = last_request.clone();
        tokio::spawn(async move {
            for (status, body) in responses {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let mut buf = vec![0u8; 8192];
                let n = socket.read(&mut buf).await.unwrap_or(0);
                let request = String::from_utf8_lossy(&buf[..n]).to_string();
                *request_line.lock().await = request.lines().next().unwrap_or("").to_string();
                counter.fetch_add(1, Ordering::SeqCst);

                let reason = match status {
                    200 => "OK",
                    400 => "Bad Request",
                    503 => "Service Unavailable",
                    _ => "Status",
                };
                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    reason,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{}/query.geojson", addr), hits, last_request)
    }

    pub(crate) fn test_config(endpoint: String, retries: u32) -> FetchConfig {
        FetchConfig {
            endpoint,
            timeout: Duration::from_secs(5),
            retries,
            retry_base_delay: Duration::from_millis(1),
            show_progress: false,
        }
    }

    #[tokio::test]
    async fn test_fetch_body_sends_query() {
        let (url, hits, last_request) = serve(vec![(200, BODY)]).await;
        let fetcher = EventFetcher::new(test_config(url, 0), &QueryConfig::default()).unwrap();

        let body = fetcher.fetch_body().await.unwrap();
        assert_eq!(body, BODY);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let line = last_request.lock().await.clone();
        assert!(line.starts_with("GET /query.geojson?"));
        assert!(line.contains("starttime=2000-01-01"));
        assert!(line.contains("endtime=2018-10-11"));
        assert!(line.contains("minlongitude=-9.756"));
        assert!(line.contains("minmagnitude=1"));
        assert!(line.contains("orderby=time-asc"));
    }

    #[tokio::test]
    async fn test_retries_transient_status() {
        let (url, hits, _) = serve(vec![(503, "busy"), (503, "busy"), (200, BODY)]).await;
        let fetcher = EventFetcher::new(test_config(url, 3), &QueryConfig::default()).unwrap();

        let body = fetcher.fetch_body().await.unwrap();
        assert_eq!(body, BODY);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_retries() {
        let (url, hits, _) = serve(vec![(503, "busy"), (503, "busy")]).await;
        let fetcher = EventFetcher::new(test_config(url, 1), &QueryConfig::default()).unwrap();

        let err = fetcher.fetch_body().await.unwrap_err();
        assert!(matches!(err, QuakeError::Network(_)));
        assert!(err.to_string().contains("503"));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_client_error_not_retried() {
        let (url, hits, _) = serve(vec![(400, "bad query"), (200, BODY)]).await;
        let fetcher = EventFetcher::new(test_config(url, 3), &QueryConfig::default()).unwrap();

        let err = fetcher.fetch_body().await.unwrap_err();
        assert!(err.to_string().contains("bad query"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unreachable_host() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let fetcher = EventFetcher::new(
            test_config(format!("http://{}/query.geojson", addr), 0),
            &QueryConfig::default(),
        )
        .unwrap();

        assert!(matches!(
            fetcher.fetch_body().await,
            Err(QuakeError::Network(_))
        ));
    }

    #[test]
    fn test_backoff_delay() {
        let base = Duration::from_millis(500);
        assert_eq!(backoff_delay(base, 0), Duration::from_millis(500));
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(1000));
        assert_eq!(backoff_delay(base, 2), Duration::from_millis(2000));
        assert_eq!(backoff_delay(base, 20), MAX_BACKOFF);
    }

    #[test]
    fn test_transient_statuses() {
        assert!(is_transient_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(is_transient_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(!is_transient_status(StatusCode::BAD_REQUEST));
        assert!(!is_transient_status(StatusCode::NOT_FOUND));
    }
}
