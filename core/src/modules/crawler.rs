use std::sync::Arc;

use anyhow::Context;
use log::{debug, warn};
use url::Url;

use crate::core::config::CrawlConfig;
use crate::core::executor::BoundedExecutor;
use crate::core::retry::RetryPolicy;
use crate::core::state::{CrawlResult, CrawlState};
use crate::http::{HttpClient, PageFetcher};
use crate::utils::extractor::{extract_forms, extract_links, FormDescriptor};
use crate::SinkRef;

/// What one crawled page contributes to the crawl.
#[derive(Debug, Default)]
struct PageOutcome {
    links: Vec<String>,
    forms: Vec<FormDescriptor>,
}

impl PageOutcome {
    fn merge(mut self, other: PageOutcome) -> Self {
        self.links.extend(other.links);
        self.forms.extend(other.forms);
        self
    }
}

/// Breadth-first crawler over static markup.
///
/// One layer of the frontier is processed per depth step, in batches of
/// `concurrency` URLs. Only the coordinating task touches `CrawlState`.
pub struct Spider {
    config: CrawlConfig,
    fetcher: Arc<dyn PageFetcher>,
    sink: SinkRef,
}

impl Spider {
    pub fn new(config: CrawlConfig, fetcher: Arc<dyn PageFetcher>, sink: SinkRef) -> Self {
        Self {
            config,
            fetcher,
            sink,
        }
    }

    /// Spider backed by a real HTTP client using the configured timeout.
    pub fn with_http(config: CrawlConfig, sink: SinkRef) -> anyhow::Result<Self> {
        let client = HttpClient::new(config.timeout())?;
        Ok(Self::new(config, Arc::new(client), sink))
    }

    pub async fn scan(&self) -> anyhow::Result<CrawlResult> {
        let mut state = CrawlState::new(self.config.seed().as_str());
        let executor = BoundedExecutor::new(self.config.concurrency());
        let batch_retry = RetryPolicy::fixed(self.config.max_retries());

        self.sink.on_log(
            "phase",
            &format!(
                "[*] Spidering {} (max depth {}, concurrency {})",
                self.config.seed(),
                self.config.max_depth(),
                executor.limit()
            ),
        );

        while !state.frontier().is_empty() && state.depth() < self.config.max_depth() {
            let layer = state.take_layer();
            let depth = state.depth() + 1;
            self.sink.on_progress(
                &format!("Crawling depth {} ({} URL(s))", depth, layer.len()),
                depth as usize,
                self.config.max_depth() as usize,
            );

            for batch in layer.chunks(executor.limit()) {
                let outcome = batch_retry
                    .run(|| self.crawl_batch(&executor, batch))
                    .await
                    .with_context(|| format!("crawl batch at depth {} failed", depth))?;

                let queued = state.absorb_batch(batch, outcome.links);
                state.record_forms(outcome.forms);
                debug!(
                    "Depth {}: batch of {} queued {} new URL(s), {} visited so far",
                    depth,
                    batch.len(),
                    queued,
                    state.visited_count()
                );
            }

            state.advance_depth();
        }

        if !state.frontier().is_empty() {
            self.sink.on_log(
                "info",
                &format!(
                    "[*] Depth limit reached with {} URL(s) left unvisited",
                    state.frontier().len()
                ),
            );
        }

        let result = state.into_result();
        self.sink.on_log(
            "success",
            &format!(
                "[+] Spider finished. Total unique URLs: {}, forms: {}",
                result.urls.len(),
                result.forms.len()
            ),
        );
        Ok(result)
    }

    async fn crawl_batch(
        &self,
        executor: &BoundedExecutor,
        batch: &[String],
    ) -> anyhow::Result<PageOutcome> {
        let tasks: Vec<_> = batch
            .iter()
            .map(|raw| move || self.crawl_url(raw))
            .collect();

        let pages = executor.run(tasks).await;
        Ok(pages.into_iter().fold(PageOutcome::default(), PageOutcome::merge))
    }

    /// Fetches one page and returns the links worth following plus its forms.
    /// Every failure mode ends in an empty outcome so the rest of the batch is
    /// unaffected.
    async fn crawl_url(&self, raw: &str) -> PageOutcome {
        let url = match Url::parse(raw) {
            Ok(url) => url,
            Err(e) => {
                warn!("Skipping unparseable URL {}: {}", raw, e);
                return PageOutcome::default();
            }
        };

        let body = match RetryPolicy::fixed(self.config.max_retries())
            .run(|| self.fetcher.fetch(&url))
            .await
        {
            Ok(Some(body)) => body,
            Ok(None) => {
                self.sink.on_log("debug", &format!("[-] No content: {}", url));
                return PageOutcome::default();
            }
            Err(e) => {
                self.sink
                    .on_log("warn", &format!("[!] Failed to fetch {}: {:#}", url, e));
                return PageOutcome::default();
            }
        };

        let links = extract_links(
            &body,
            &url,
            self.config.seed(),
            self.config.ignore_external_links(),
        );
        let forms = extract_forms(&body, &url);
        self.sink.on_log(
            "debug",
            &format!("[*] {} -> {} link(s), {} form(s)", url, links.len(), forms.len()),
        );

        PageOutcome {
            links: links.into_iter().map(String::from).collect(),
            forms,
        }
    }
}
