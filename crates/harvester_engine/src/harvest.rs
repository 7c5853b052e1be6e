use std::collections::BTreeSet;
use std::sync::Arc;

use engine_logging::{engine_debug, engine_info};
use futures_util::{stream, StreamExt};
use harvester_core::{normalize_url, HarvestRequest, HarvestResult, Heading, HeadingLevel, UrlOutcome};

use crate::decode::decode_body;
use crate::extract::{HeadingExtractor, ScraperHeadingExtractor};
use crate::fetch::{FetchSettings, Fetcher, ReqwestFetcher};
use crate::{FetchError, HarvestEvent};

pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub fetch: FetchSettings,
    /// Upper bound on URLs fetched at once. `1` processes URLs strictly one
    /// after another; `0` is treated as `1`.
    pub max_concurrency: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fetch: FetchSettings::default(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: HarvestEvent);
}

/// Sink for callers that do not track progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn emit(&self, _event: HarvestEvent) {}
}

/// Runs the normalize -> fetch -> decode -> extract pipeline for every URL of
/// a request. Holds no per-request state, so one harvester can serve any
/// number of requests.
pub struct Harvester {
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn HeadingExtractor>,
    max_concurrency: usize,
}

impl Harvester {
    pub fn new(config: EngineConfig) -> Result<Self, FetchError> {
        let fetcher = ReqwestFetcher::new(config.fetch)?;
        Ok(Self::with_parts(
            Arc::new(fetcher),
            Arc::new(ScraperHeadingExtractor),
            config.max_concurrency,
        ))
    }

    pub fn with_parts(
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<dyn HeadingExtractor>,
        max_concurrency: usize,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub async fn harvest(&self, request: &HarvestRequest) -> HarvestResult {
        self.harvest_with_sink(request, &NullProgressSink).await
    }

    /// Returns exactly one outcome per requested URL, in request order,
    /// whatever order the fetches complete in.
    pub async fn harvest_with_sink(
        &self,
        request: &HarvestRequest,
        sink: &dyn ProgressSink,
    ) -> HarvestResult {
        let levels = request.heading_levels();
        engine_info!(
            "Harvesting {} url(s) for levels {:?} with concurrency {}",
            request.urls().len(),
            levels,
            self.max_concurrency
        );

        let outcomes: Vec<UrlOutcome> = stream::iter(request.urls().iter().enumerate())
            .map(|(index, raw_url)| self.harvest_one(index, raw_url, levels, sink))
            .buffered(self.max_concurrency)
            .collect()
            .await;

        let result = HarvestResult::new(outcomes);
        engine_info!(
            "Harvest finished: {} succeeded, {} failed",
            result.len() - result.failure_count(),
            result.failure_count()
        );
        result
    }

    async fn harvest_one(
        &self,
        index: usize,
        raw_url: &str,
        levels: &BTreeSet<HeadingLevel>,
        sink: &dyn ProgressSink,
    ) -> UrlOutcome {
        let resolved_url = normalize_url(raw_url);
        sink.emit(HarvestEvent::Started {
            index,
            url: resolved_url.clone(),
        });

        match self.fetch_and_extract(&resolved_url, levels).await {
            Ok(headings) => {
                engine_debug!("{resolved_url}: {} heading(s)", headings.len());
                sink.emit(HarvestEvent::Completed {
                    index,
                    url: resolved_url.clone(),
                    result: Ok(headings.len()),
                });
                UrlOutcome::Success {
                    resolved_url,
                    headings,
                }
            }
            Err(err) => {
                engine_debug!("{resolved_url} failed ({}): {}", err.kind, err.message);
                sink.emit(HarvestEvent::Completed {
                    index,
                    url: resolved_url.clone(),
                    result: Err(err.kind),
                });
                UrlOutcome::Failure {
                    resolved_url,
                    error_message: err.message,
                }
            }
        }
    }

    async fn fetch_and_extract(
        &self,
        url: &str,
        levels: &BTreeSet<HeadingLevel>,
    ) -> Result<Vec<Heading>, FetchError> {
        let output = self.fetcher.fetch(url).await?;
        let meta = &output.metadata;
        engine_debug!(
            "{url}: status {} from {}, {} byte(s)",
            meta.status,
            meta.final_url,
            meta.byte_len
        );
        let decoded = decode_body(&output.bytes, output.metadata.content_type.as_deref());
        Ok(self.extractor.extract(&decoded.text, levels))
    }
}
