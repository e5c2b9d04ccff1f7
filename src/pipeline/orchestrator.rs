// src/pipeline/orchestrator.rs

//! Two-phase crawl orchestration for one pharmacy site.
//!
//! Discovery enumerates and persists product URLs; extraction reads them
//! back and turns pages into product records through a bounded worker pool.
//! The phases are independently runnable, so a crashed extraction can resume
//! from the persisted worklist without re-crawling the catalog.

use std::time::Duration;

use futures::stream::{self, StreamExt};

use crate::browser::{BrowserPage, PageFetcher};
use crate::discover::DiscoveryEngine;
use crate::error::{AppError, Result};
use crate::extract::extract_product;
use crate::models::{
    Config, CrawlerConfig, DiscoveryOutcome, Pharmacy, Product, SiteConfig,
};
use crate::store::Store;
use crate::utils::http;

/// Pipeline state, advanced by the run methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Discovering,
    Discovered,
    Extracting,
    Completed,
    Failed,
}

/// Aggregate result of an extraction phase.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOutcome {
    pub products_scraped: usize,
    pub products_failed: usize,
}

/// Drives the crawl for one pharmacy against a store and a page fetcher.
pub struct Orchestrator<'a> {
    config: &'a Config,
    store: &'a dyn Store,
    fetcher: &'a dyn PageFetcher,
    phase: Phase,
}

impl<'a> Orchestrator<'a> {
    pub fn new(config: &'a Config, store: &'a dyn Store, fetcher: &'a dyn PageFetcher) -> Self {
        Self {
            config,
            store,
            fetcher,
            phase: Phase::Idle,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Phase 1: enumerate the site's catalog into the store.
    pub async fn run_discovery(
        &mut self,
        pharmacy: Pharmacy,
        page: Option<&dyn BrowserPage>,
    ) -> Result<DiscoveryOutcome> {
        let site = self.config.site(pharmacy)?;
        self.phase = Phase::Discovering;

        let run_id = self.store.start_run(pharmacy, "discovery").await?;
        let client = http::create_client(&self.config.crawler, None)?;
        let engine = DiscoveryEngine::new(site, self.store);

        match engine.discover(page, &client).await {
            Ok(outcome) => {
                self.store
                    .complete_run(run_id, outcome.urls_inserted, 0, None)
                    .await?;
                self.phase = Phase::Discovered;
                Ok(outcome)
            }
            Err(e) => {
                self.phase = Phase::Failed;
                self.store
                    .complete_run(run_id, 0, 0, Some(e.to_string()))
                    .await?;
                Err(e)
            }
        }
    }

    /// Phase 2: fetch and extract every persisted URL for the pharmacy.
    ///
    /// Worker failures are counted, never fatal; the phase only errors on
    /// store or configuration problems, which leave it in `Failed`.
    pub async fn run_extraction(
        &mut self,
        pharmacy: Pharmacy,
        limit: Option<usize>,
    ) -> Result<RunOutcome> {
        self.phase = Phase::Extracting;
        match self.extract_all(pharmacy, limit).await {
            Ok(outcome) => {
                self.phase = Phase::Completed;
                Ok(outcome)
            }
            Err(e) => {
                self.phase = Phase::Failed;
                Err(e)
            }
        }
    }

    async fn extract_all(&self, pharmacy: Pharmacy, limit: Option<usize>) -> Result<RunOutcome> {
        let site = self.config.site(pharmacy)?;
        let crawler = &self.config.crawler;

        let mut urls = self.store.urls_to_scrape(pharmacy).await?;
        if let Some(limit) = limit {
            urls.truncate(limit);
        }
        if crawler.max_requests > 0 && urls.len() > crawler.max_requests {
            log::warn!(
                "{pharmacy}: worklist of {} truncated to the request ceiling {}",
                urls.len(),
                crawler.max_requests
            );
            urls.truncate(crawler.max_requests);
        }
        log::info!("{pharmacy}: extracting {} product pages", urls.len());

        let run_id = self.store.start_run(pharmacy, "extraction").await?;
        let concurrency = site.concurrency(crawler);
        let store = self.store;
        let fetcher = self.fetcher;

        let results: Vec<bool> = stream::iter(urls)
            .map(|url| async move {
                let outcome = async {
                    let product = scrape_one(fetcher, site, crawler, &url).await?;
                    store.upsert_product(&product).await?;
                    Ok::<(), AppError>(())
                }
                .await;
                if crawler.request_delay_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(crawler.request_delay_ms)).await;
                }
                match outcome {
                    Ok(()) => true,
                    Err(e) => {
                        log::warn!("Extraction failed for {url}: {e}");
                        false
                    }
                }
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let outcome = RunOutcome {
            products_scraped: results.iter().filter(|ok| **ok).count(),
            products_failed: results.iter().filter(|ok| !**ok).count(),
        };

        self.store
            .complete_run(
                run_id,
                outcome.products_scraped,
                outcome.products_failed,
                None,
            )
            .await?;
        log::info!(
            "{pharmacy}: extraction finished, {} scraped, {} failed",
            outcome.products_scraped,
            outcome.products_failed
        );
        Ok(outcome)
    }

    /// Both phases back to back.
    pub async fn run_pipeline(
        &mut self,
        pharmacy: Pharmacy,
        page: Option<&dyn BrowserPage>,
        limit: Option<usize>,
    ) -> Result<RunOutcome> {
        self.run_discovery(pharmacy, page).await?;
        self.run_extraction(pharmacy, limit).await
    }
}

/// One fetch+extract unit of work, with a hard wall-clock cap per attempt
/// and a bounded retry loop.
pub(crate) async fn scrape_one(
    fetcher: &dyn PageFetcher,
    site: &SiteConfig,
    crawler: &CrawlerConfig,
    url: &str,
) -> Result<Product> {
    let cap = Duration::from_secs(crawler.page_timeout_secs);
    let mut attempt = 0u32;

    loop {
        let result = tokio::time::timeout(cap, async {
            let html = fetcher.fetch(url, &site.wait_selector, cap).await?;
            extract_product(&html, url, site.pharmacy, &site.rules)
        })
        .await;

        let error = match result {
            Ok(Ok(product)) => return Ok(product),
            Ok(Err(e)) => e,
            Err(_) => AppError::navigation(url, format!("unit exceeded {}s", cap.as_secs())),
        };

        attempt += 1;
        if attempt > crawler.max_retries {
            return Err(error);
        }
        log::warn!(
            "Retrying {url} (attempt {attempt}/{}): {error}",
            crawler.max_retries
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::models::DiscoveredUrl;
    use crate::store::MemoryStore;

    /// Fetcher serving canned HTML, failing the first N calls per URL.
    struct CannedFetcher {
        html: String,
        failures_before_success: usize,
        calls: AtomicUsize,
    }

    impl CannedFetcher {
        fn new(html: &str) -> Self {
            Self {
                html: html.to_string(),
                failures_before_success: 0,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PageFetcher for CannedFetcher {
        async fn fetch(&self, url: &str, _selector: &str, _timeout: Duration) -> Result<String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures_before_success {
                return Err(AppError::navigation(url, "transient failure"));
            }
            Ok(self.html.clone())
        }
    }

    fn catedral_page(name: &str, price: &str) -> String {
        format!(
            r#"<html><body>
                <h1 class="title-ficha">{name}</h1>
                <p class="codigo-ficha">CÓD.: 66</p>
                <p class="precio-web">Gs. {price}</p>
            </body></html>"#
        )
    }

    async fn seed_urls(store: &MemoryStore, count: usize) {
        let urls: Vec<DiscoveredUrl> = (0..count)
            .map(|i| {
                DiscoveredUrl::new(
                    Pharmacy::FarmaciaCatedral,
                    format!("https://www.farmaciacatedral.com.py/producto/{i}/item-{i}"),
                    Some(i.to_string()),
                )
            })
            .collect();
        store.insert_discovered_urls(&urls).await.unwrap();
    }

    fn quiet_config() -> Config {
        let mut config = Config::default();
        config.crawler.request_delay_ms = 0;
        config.crawler.max_retries = 0;
        config
    }

    #[tokio::test]
    async fn extraction_upserts_and_records_the_run() {
        let config = quiet_config();
        let store = MemoryStore::new();
        seed_urls(&store, 3).await;
        let fetcher = CannedFetcher::new(&catedral_page("Ibuprofeno 400", "12.500"));

        let mut orchestrator = Orchestrator::new(&config, &store, &fetcher);
        let outcome = orchestrator
            .run_extraction(Pharmacy::FarmaciaCatedral, None)
            .await
            .unwrap();

        assert_eq!(outcome.products_scraped, 3);
        assert_eq!(outcome.products_failed, 0);
        assert_eq!(orchestrator.phase(), Phase::Completed);

        let runs = store.runs().await;
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].scope, "extraction");
        assert_eq!(runs[0].products_scraped, 3);
    }

    #[tokio::test]
    async fn worker_failures_are_counted_not_fatal() {
        let config = quiet_config();
        let store = MemoryStore::new();
        seed_urls(&store, 2).await;
        // A page without any name source fails extraction.
        let fetcher = CannedFetcher::new("<html><body><div>mantenimiento</div></body></html>");

        let mut orchestrator = Orchestrator::new(&config, &store, &fetcher);
        let outcome = orchestrator
            .run_extraction(Pharmacy::FarmaciaCatedral, None)
            .await
            .unwrap();

        assert_eq!(outcome.products_scraped, 0);
        assert_eq!(outcome.products_failed, 2);
        assert_eq!(store.product_count().await, 0);
    }

    #[tokio::test]
    async fn transient_fetch_errors_are_retried() {
        let mut config = quiet_config();
        config.crawler.max_retries = 2;
        let store = MemoryStore::new();
        seed_urls(&store, 1).await;

        let mut fetcher = CannedFetcher::new(&catedral_page("Amoxicilina 500", "24.000"));
        fetcher.failures_before_success = 2;

        let mut orchestrator = Orchestrator::new(&config, &store, &fetcher);
        let outcome = orchestrator
            .run_extraction(Pharmacy::FarmaciaCatedral, None)
            .await
            .unwrap();

        assert_eq!(outcome.products_scraped, 1);
        assert_eq!(store.product_count().await, 1);
    }

    #[tokio::test]
    async fn fatal_extraction_errors_leave_the_phase_failed() {
        let mut config = quiet_config();
        config
            .sites
            .retain(|s| s.pharmacy != Pharmacy::FarmaciaCatedral);
        let store = MemoryStore::new();
        let fetcher = CannedFetcher::new("<html></html>");

        let mut orchestrator = Orchestrator::new(&config, &store, &fetcher);
        let result = orchestrator
            .run_extraction(Pharmacy::FarmaciaCatedral, None)
            .await;

        assert!(matches!(result, Err(AppError::Config(_))));
        assert_eq!(orchestrator.phase(), Phase::Failed);
    }

    #[tokio::test]
    async fn limit_caps_the_worklist() {
        let config = quiet_config();
        let store = MemoryStore::new();
        seed_urls(&store, 10).await;
        let fetcher = CannedFetcher::new(&catedral_page("Paracetamol 500", "8.000"));

        let mut orchestrator = Orchestrator::new(&config, &store, &fetcher);
        let outcome = orchestrator
            .run_extraction(Pharmacy::FarmaciaCatedral, Some(4))
            .await
            .unwrap();

        assert_eq!(outcome.products_scraped + outcome.products_failed, 4);
    }
}
