//! Optional PDF enrichment of screened papers.
//!
//! Runs after screening, over the written paper table. Each paper's PDF is
//! downloaded concurrently, its text mined for model names and metric
//! values. Failures are recorded per row and never abort the batch.

pub mod extract;

use crate::error::{Result, ScreenError};
use extract::{metric_key, Extraction, Extractor, METRIC_KEYWORDS};
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use std::cmp::Ordering;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Enrichment configuration
#[derive(Debug, Clone)]
pub struct EnrichConfig {
    pub concurrency: usize,
    pub max_pages: usize,
    /// Only the first `limit` rows with a URL
    pub limit: Option<usize>,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            max_pages: 50,
            limit: None,
        }
    }
}

/// The columns enrichment needs from the screened table
#[derive(Debug, Clone, Deserialize)]
pub struct PaperLink {
    pub title: String,
    #[serde(default)]
    pub url: String,
}

/// Enrichment outcome for one paper
#[derive(Debug, Clone, Default)]
pub struct EnrichmentResult {
    pub file: String,
    pub title: String,
    pub url: String,
    pub extraction: Extraction,
    pub error: Option<String>,
}

impl EnrichmentResult {
    pub fn metric(&self, key: &str) -> Option<f64> {
        self.extraction.metrics.get(key).copied()
    }
}

/// PDF location for a paper URL (`.../2021.acl-long.1` -> `....1.pdf`)
pub fn pdf_url_for(url: &str) -> String {
    let url = url.trim().trim_end_matches('/');
    if url.to_ascii_lowercase().ends_with(".pdf") {
        url.to_string()
    } else {
        format!("{url}.pdf")
    }
}

/// File name for a PDF URL, from the last path segment
pub fn pdf_file_name(pdf_url: &str) -> String {
    let segment = url::Url::parse(pdf_url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|segments| segments.last().map(str::to_string))
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "paper.pdf".to_string());
    if segment.to_ascii_lowercase().ends_with(".pdf") {
        segment
    } else {
        format!("{segment}.pdf")
    }
}

/// Read paper links from a screened CSV table.
pub fn read_paper_links(path: &Path) -> Result<Vec<PaperLink>> {
    let mut rdr = csv::Reader::from_path(path)?;
    let mut links = Vec::new();
    for row in rdr.deserialize() {
        let link: PaperLink = row?;
        links.push(link);
    }
    Ok(links)
}

/// Download and mine every paper with a URL.
pub async fn enrich_papers(config: &EnrichConfig, papers: &[PaperLink]) -> Result<Vec<EnrichmentResult>> {
    let targets: Vec<&PaperLink> = papers
        .iter()
        .filter(|p| !p.url.trim().is_empty())
        .take(config.limit.unwrap_or(usize::MAX))
        .collect();

    if targets.is_empty() {
        return Ok(Vec::new());
    }

    info!(
        count = targets.len(),
        skipped_without_url = papers.len() - papers.iter().filter(|p| !p.url.trim().is_empty()).count(),
        "Starting PDF enrichment"
    );

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
        .map_err(|e| ScreenError::Config(format!("Failed to build HTTP client: {}", e)))?;

    let concurrency = config.concurrency.max(1);
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let client = Arc::new(client);
    let extractor = Arc::new(Extractor::new()?);
    let max_pages = config.max_pages;

    let mut results: Vec<(usize, EnrichmentResult)> = stream::iter(targets.into_iter().enumerate())
        .map(|(idx, paper)| {
            let semaphore = Arc::clone(&semaphore);
            let client = Arc::clone(&client);
            let extractor = Arc::clone(&extractor);

            async move {
                let pdf_url = pdf_url_for(&paper.url);
                let mut result = EnrichmentResult {
                    file: pdf_file_name(&pdf_url),
                    title: paper.title.clone(),
                    url: paper.url.clone(),
                    ..Default::default()
                };

                let _permit = match semaphore.acquire().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        result.error = Some(format!("semaphore closed: {e}"));
                        return (idx, result);
                    }
                };

                match enrich_single_paper(&client, &extractor, &pdf_url, max_pages).await {
                    Ok(extraction) => {
                        debug!(
                            idx = idx,
                            models = extraction.models.len(),
                            metrics = extraction.metrics.len(),
                            "Paper enriched"
                        );
                        result.extraction = extraction;
                    }
                    Err(e) => {
                        warn!(idx = idx, url = %pdf_url, error = %e, "Failed to enrich paper");
                        result.error = Some(e.to_string());
                    }
                }
                (idx, result)
            }
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    // Restore input order so the output is stable before sorting
    results.sort_by_key(|(idx, _)| *idx);
    let results: Vec<EnrichmentResult> = results.into_iter().map(|(_, r)| r).collect();

    let failed = results.iter().filter(|r| r.error.is_some()).count();
    info!(enriched = results.len() - failed, failed = failed, "PDF enrichment complete");
    Ok(results)
}

async fn enrich_single_paper(
    client: &reqwest::Client,
    extractor: &Extractor,
    pdf_url: &str,
    max_pages: usize,
) -> Result<Extraction> {
    debug!(url = pdf_url, "Downloading PDF");
    let response = client.get(pdf_url).send().await?;
    if !response.status().is_success() {
        return Err(ScreenError::Pdf(format!(
            "download failed with status {}",
            response.status().as_u16()
        )));
    }
    let bytes = response.bytes().await?;

    // lopdf is synchronous and CPU-bound
    let text = tokio::task::spawn_blocking(move || extract::extract_pdf_text(&bytes, max_pages))
        .await
        .map_err(|e| ScreenError::Pdf(format!("extraction task failed: {e}")))??;

    Ok(extractor.extract(&text))
}

/// Sort by `metric` descending; rows without it go last.
pub fn sort_by_metric(results: &mut [EnrichmentResult], metric: &str) {
    let key = metric_key(metric);
    results.sort_by(|a, b| match (a.metric(&key), b.metric(&key)) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

/// Fixed leading columns of the performance table
const PERFORMANCE_COLUMNS: &[&str] = &["file", "title", "url", "models", "metrics", "error"];

/// Write `model_performance.csv`: fixed columns then one column per metric.
pub fn write_performance_csv(path: &Path, results: &[EnrichmentResult]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    let mut header: Vec<String> = PERFORMANCE_COLUMNS.iter().map(|s| s.to_string()).collect();
    header.extend(METRIC_KEYWORDS.iter().map(|m| metric_key(m)));
    wtr.write_record(&header)?;

    for result in results {
        let models = result
            .extraction
            .models
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");
        let mut record = vec![
            result.file.clone(),
            result.title.clone(),
            result.url.clone(),
            models,
            serde_json::to_string(&result.extraction.metrics)?,
            result.error.clone().unwrap_or_default(),
        ];
        record.extend(METRIC_KEYWORDS.iter().map(|m| {
            result
                .metric(&metric_key(m))
                .map(|v| v.to_string())
                .unwrap_or_default()
        }));
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    info!(path = %path.display(), rows = results.len(), "Saved model performance table");
    Ok(())
}
