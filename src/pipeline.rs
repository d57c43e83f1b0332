use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::fetch::{self, DocumentSource, FetchStats, FetchedDocument, TextExtractor};
use crate::parser::{self, CaseRecord, DocumentRecords, DocumentText, Listing, ListingScanner, RecordExtractor};

/// Listing scan, document retrieval and record extraction wired together.
pub struct Pipeline<S, X> {
    source: Arc<S>,
    text: Arc<X>,
    scanner: ListingScanner,
    records: RecordExtractor,
    concurrency: usize,
}

pub struct RunOutput {
    pub listing: Listing,
    pub documents: Vec<DocumentRecords>,
    pub fetch: FetchStats,
    pub failed_extractions: usize,
}

impl RunOutput {
    /// All records, document by document, in extraction order.
    pub fn records(&self) -> impl Iterator<Item = &CaseRecord> {
        self.documents.iter().flat_map(|d| d.records.iter())
    }

    pub fn record_count(&self) -> usize {
        self.documents.iter().map(|d| d.records.len()).sum()
    }
}

impl<S, X> Pipeline<S, X>
where
    S: DocumentSource + 'static,
    X: TextExtractor + 'static,
{
    pub fn new(
        source: Arc<S>,
        text: X,
        scanner: ListingScanner,
        records: RecordExtractor,
        concurrency: usize,
    ) -> Self {
        Pipeline {
            source,
            text: Arc::new(text),
            scanner,
            records,
            concurrency,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn scan(&self, html: &str) -> Listing {
        self.scanner.scan(html)
    }

    /// Fetch and extract every document in `listing`. One bad document never
    /// aborts the batch.
    pub async fn run_listing(&self, listing: Listing) -> Result<RunOutput> {
        let (docs, fetch) =
            fetch::fetch_documents(Arc::clone(&self.source), &listing, self.concurrency).await;

        // PDF parsing is CPU-bound; keep it off the async workers.
        let text = Arc::clone(&self.text);
        let records = self.records.clone();
        let (documents, failed_extractions) =
            tokio::task::spawn_blocking(move || extract_documents(text.as_ref(), &records, &docs))
                .await
                .context("Extraction task failed")?;
        info!(
            documents = documents.len(),
            records = documents.iter().map(|d| d.records.len()).sum::<usize>(),
            failed_extractions,
            "extraction finished"
        );
        Ok(RunOutput {
            listing,
            documents,
            fetch,
            failed_extractions,
        })
    }
}

/// Text extraction and record extraction in parallel; output keeps the
/// input order. Blocks the calling thread.
pub fn extract_documents<X: TextExtractor + ?Sized>(
    text: &X,
    records: &RecordExtractor,
    docs: &[FetchedDocument],
) -> (Vec<DocumentRecords>, usize) {
    let results: Vec<Option<DocumentRecords>> = docs
        .par_iter()
        .map(|doc| match text.extract_text(&doc.url, &doc.bytes) {
            Ok(body) => Some(parser::process_document(
                records,
                &DocumentText {
                    id: doc.id.clone(),
                    text: body,
                },
            )),
            Err(e) => {
                warn!(document = %doc.id, error = %e, "text extraction failed, skipping");
                None
            }
        })
        .collect();

    let failed = results.iter().filter(|r| r.is_none()).count();
    (results.into_iter().flatten().collect(), failed)
}

/// Keep the raw listing page next to the run so it can be re-scanned offline.
pub fn save_snapshot(dir: &Path, hit_date_slug: &str, html: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
    let path = dir.join(format!("causelist_pdf_{}.html", hit_date_slug));
    std::fs::write(&path, html).with_context(|| format!("Failed to write {:?}", path))?;
    Ok(path)
}
