use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::header::{self, HeaderMap, HeaderValue};
use tokio::sync::{mpsc, Semaphore};
use tracing::{info, warn};

use crate::config::Settings;
use crate::error::FetchError;
use crate::parser::Listing;

/// Where listing pages and documents come from.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Turns a downloaded document into plain text.
pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, url: &str, bytes: &[u8]) -> Result<String, FetchError>;
}

pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract_text(&self, url: &str, bytes: &[u8]) -> Result<String, FetchError> {
        // pdf-extract panics on some malformed fonts; treat that as a failed document.
        match panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes))) {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(FetchError::Extract {
                url: url.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Err(FetchError::Extract {
                url: url.to_string(),
                reason: "pdf parser panicked".to_string(),
            }),
        }
    }
}

/// Already-text documents, decoded lossily.
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract_text(&self, _url: &str, bytes: &[u8]) -> Result<String, FetchError> {
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}

/// HTTP source with browser-like headers and fixed-backoff retries.
pub struct HttpSource {
    client: reqwest::Client,
    max_attempts: u32,
    backoff: Duration,
}

impl HttpSource {
    pub fn new(settings: &Settings) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,application/pdf,*/*;q=0.8",
            ),
        );
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-GB,en-US;q=0.9,en;q=0.8,hi;q=0.7"),
        );
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
        headers.insert(header::UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));

        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.as_str())
            .default_headers(headers)
            .timeout(settings.timeout())
            .build()?;

        Ok(HttpSource {
            client,
            max_attempts: settings.max_attempts,
            backoff: settings.retry_backoff(),
        })
    }

    async fn get_once(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let request_err = |source| FetchError::Request {
            url: url.to_string(),
            source,
        };
        let response = self.client.get(url).send().await.map_err(request_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.bytes().await.map_err(request_err)?;
        Ok(body.to_vec())
    }
}

#[async_trait]
impl DocumentSource for HttpSource {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        with_retry(url, self.max_attempts, self.backoff, || self.get_once(url)).await
    }
}

/// Run `op` up to `max_attempts` times, sleeping `backoff` between
/// retryable failures.
pub async fn with_retry<T, F, Fut>(
    url: &str,
    max_attempts: u32,
    backoff: Duration,
    mut op: F,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) if attempt >= max_attempts => {
                return Err(if attempt == 1 {
                    e
                } else {
                    FetchError::RetriesExhausted {
                        url: url.to_string(),
                        attempts: attempt,
                        last: Box::new(e),
                    }
                });
            }
            Err(e) => {
                warn!(
                    "{} (attempt {}/{}), retrying in {:.1}s",
                    e,
                    attempt,
                    max_attempts,
                    backoff.as_secs_f64()
                );
                tokio::time::sleep(backoff).await;
            }
        }
    }
}

/// Listing page as text.
pub async fn fetch_listing<S: DocumentSource + ?Sized>(source: &S, url: &str) -> Result<String> {
    info!("Fetching cause list page: {}", url);
    let body = source.fetch(url).await?;
    Ok(String::from_utf8_lossy(&body).into_owned())
}

pub struct FetchedDocument {
    pub id: String,
    pub url: String,
    pub bytes: Vec<u8>,
}

pub struct FetchStats {
    pub total: usize,
    pub ok: usize,
    pub errors: usize,
}

/// Download every listed document with at most `concurrency` requests in
/// flight. Failed documents are logged and left out. Output is ordered by
/// listing id.
pub async fn fetch_documents<S: DocumentSource + 'static>(
    source: Arc<S>,
    listing: &Listing,
    concurrency: usize,
) -> (Vec<FetchedDocument>, FetchStats) {
    let concurrency = concurrency.max(1);
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let total = listing.len();

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );

    let (tx, mut rx) = mpsc::channel(concurrency * 2);

    for (id, entry) in listing {
        let source = Arc::clone(&source);
        let sem = Arc::clone(&semaphore);
        let tx = tx.clone();
        let id = id.clone();
        let url = entry.document_link.clone();

        tokio::spawn(async move {
            let Ok(_permit) = sem.acquire().await else {
                return;
            };
            let result = source.fetch(&url).await;
            let _ = tx.send((id, url, result)).await;
        });
    }

    // rx closes once every task has sent its result
    drop(tx);

    let mut docs = Vec::with_capacity(total);
    let mut errors = 0usize;
    while let Some((id, url, result)) = rx.recv().await {
        match result {
            Ok(bytes) => docs.push(FetchedDocument { id, url, bytes }),
            Err(e) => {
                errors += 1;
                warn!(document = %id, error = %e, "document fetch failed, skipping");
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    docs.sort_by(|a, b| a.id.cmp(&b.id));
    let ok = docs.len();
    info!("Fetched {} documents ({} ok, {} errors)", total, ok, errors);
    (docs, FetchStats { total, ok, errors })
}
