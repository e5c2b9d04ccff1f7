// src/discover/mod.rs

//! URL-discovery phase.
//!
//! Enumerates the full set of product-detail URLs for one site without
//! missing pages or looping forever, flushing every batch to the store
//! immediately so a crash mid-discovery loses nothing. Four interchangeable
//! strategies cover the observed site topologies.

pub mod api;
pub mod click;
pub mod pagination;
pub mod scroll;

use std::collections::HashSet;

use crate::browser::BrowserPage;
use crate::error::{AppError, Result};
use crate::models::{
    DiscoveredUrl, DiscoveryOutcome, DiscoveryStrategy, SiteConfig, Termination,
};
use crate::store::Store;
use crate::utils::url::{resolve, site_code_from_url};

/// Result of one strategy pass over one entry point.
#[derive(Debug, Clone, Copy)]
pub struct StrategyOutcome {
    /// Pages fetched, scrolls performed, or clicks issued
    pub steps: usize,
    pub termination: Termination,
}

/// Counts returned by a [`UrlSink::submit`] batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubmitCounts {
    /// URLs not seen earlier in this run
    pub new_in_run: usize,
    /// Rows the store actually inserted (excludes already-known URLs)
    pub inserted: usize,
}

/// Deduplicating sink for harvested links.
///
/// Dedup happens twice: an in-memory seen set scoped to the run, and the
/// store's insert-or-ignore key. Every batch is flushed immediately.
pub struct UrlSink<'a> {
    store: &'a dyn Store,
    site: &'a SiteConfig,
    seen: HashSet<String>,
    inserted: usize,
}

impl<'a> UrlSink<'a> {
    pub fn new(store: &'a dyn Store, site: &'a SiteConfig) -> Self {
        Self {
            store,
            site,
            seen: HashSet::new(),
            inserted: 0,
        }
    }

    /// Resolve, filter, and dedup a batch of hrefs, then flush the genuinely
    /// new ones to the store.
    pub async fn submit(&mut self, hrefs: impl IntoIterator<Item = String>) -> Result<SubmitCounts> {
        let mut batch = Vec::new();
        for href in hrefs {
            if href.is_empty() {
                continue;
            }
            let absolute = resolve(&self.site.base_url, &href);
            if !absolute.contains(&self.site.product_link_contains) {
                continue;
            }
            if !self.seen.insert(absolute.clone()) {
                continue;
            }
            let site_code = match &self.site.site_code_pattern {
                Some(pattern) => site_code_from_url(pattern, &absolute)?,
                None => None,
            };
            batch.push(DiscoveredUrl::new(self.site.pharmacy, absolute, site_code));
        }

        if batch.is_empty() {
            return Ok(SubmitCounts::default());
        }
        let inserted = self.store.insert_discovered_urls(&batch).await?;
        self.inserted += inserted;
        Ok(SubmitCounts {
            new_in_run: batch.len(),
            inserted,
        })
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    pub fn inserted_total(&self) -> usize {
        self.inserted
    }
}

/// Drives one site's discovery strategy over its entry points.
pub struct DiscoveryEngine<'a> {
    site: &'a SiteConfig,
    store: &'a dyn Store,
}

impl<'a> DiscoveryEngine<'a> {
    pub fn new(site: &'a SiteConfig, store: &'a dyn Store) -> Self {
        Self { site, store }
    }

    /// Enumerate product URLs from every entry point.
    ///
    /// Browser-driven strategies need `page`; HTTP-driven ones need `client`.
    /// Failure to reach an entry point propagates; per-page errors inside a
    /// strategy loop are logged and skipped.
    pub async fn discover(
        &self,
        page: Option<&dyn BrowserPage>,
        client: &reqwest::Client,
    ) -> Result<DiscoveryOutcome> {
        let mut sink = UrlSink::new(self.store, self.site);
        let mut steps = 0;
        let mut termination = Termination::NaturalEnd;

        for entry in &self.site.entry_points {
            log::info!("Discovering {} from {entry}", self.site.pharmacy);

            let outcome = match &self.site.discovery {
                DiscoveryStrategy::InfiniteScroll {
                    max_no_change,
                    max_scrolls,
                    pause_ms,
                } => {
                    let page = self.require_page(page)?;
                    scroll::run(
                        page,
                        entry,
                        self.site,
                        *max_no_change,
                        *max_scrolls,
                        *pause_ms,
                        &mut sink,
                    )
                    .await?
                }
                DiscoveryStrategy::ClickToLoad {
                    button_selector,
                    max_missing,
                    max_clicks,
                    pause_ms,
                } => {
                    let page = self.require_page(page)?;
                    click::run(
                        page,
                        entry,
                        self.site,
                        button_selector,
                        *max_missing,
                        *max_clicks,
                        *pause_ms,
                        &mut sink,
                    )
                    .await?
                }
                DiscoveryStrategy::NumberedPagination {
                    next_selector,
                    max_pages,
                } => {
                    pagination::run(client, entry, self.site, next_selector, *max_pages, &mut sink)
                        .await?
                }
                DiscoveryStrategy::PaginationApi(api) => {
                    api::run(client, entry, api, &mut sink).await?
                }
            };

            steps += outcome.steps;
            match outcome.termination {
                Termination::NaturalEnd => {
                    log::info!(
                        "{}: entry {entry} ended naturally after {} steps",
                        self.site.pharmacy,
                        outcome.steps
                    );
                }
                Termination::CeilingHit => {
                    // Distinct from a clean end: the catalog may be larger
                    // than the configured bounds assume.
                    log::warn!(
                        "{}: entry {entry} hit the safety ceiling after {} steps without a natural end",
                        self.site.pharmacy,
                        outcome.steps
                    );
                    termination = Termination::CeilingHit;
                }
            }
        }

        log::info!(
            "{}: discovery finished, {} unique URLs seen, {} new rows persisted",
            self.site.pharmacy,
            sink.seen_count(),
            sink.inserted_total()
        );

        Ok(DiscoveryOutcome {
            urls_inserted: sink.inserted_total(),
            urls_seen: sink.seen_count(),
            steps,
            termination,
        })
    }

    fn require_page<'p>(&self, page: Option<&'p dyn BrowserPage>) -> Result<&'p dyn BrowserPage> {
        page.ok_or_else(|| {
            AppError::config(format!(
                "{} discovery strategy requires a browser page",
                self.site.pharmacy
            ))
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted browser page used by the strategy tests.

    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use crate::browser::{BrowserPage, SCROLL_HEIGHT};
    use crate::error::{AppError, Result};

    /// One step of scripted page state.
    #[derive(Debug, Clone)]
    pub struct PageStep {
        pub links: Vec<String>,
        pub height: u64,
        pub button_visible: bool,
    }

    /// Browser fake that advances through scripted steps on scroll/click.
    pub struct ScriptedPage {
        steps: Vec<PageStep>,
        cursor: Mutex<usize>,
        pub fail_navigation: bool,
        pub fail_click: bool,
    }

    impl ScriptedPage {
        pub fn new(steps: Vec<PageStep>) -> Self {
            Self {
                steps,
                cursor: Mutex::new(0),
                fail_navigation: false,
                fail_click: false,
            }
        }

        fn current(&self) -> PageStep {
            let cursor = *self.cursor.lock().unwrap();
            self.steps[cursor.min(self.steps.len() - 1)].clone()
        }

        fn advance(&self) {
            let mut cursor = self.cursor.lock().unwrap();
            if *cursor + 1 < self.steps.len() {
                *cursor += 1;
            }
        }
    }

    #[async_trait]
    impl BrowserPage for ScriptedPage {
        async fn navigate(&self, url: &str) -> Result<()> {
            if self.fail_navigation {
                return Err(AppError::navigation(url, "connection refused"));
            }
            Ok(())
        }

        async fn wait_for_selector(&self, _selector: &str, _timeout: Duration) -> Result<()> {
            Ok(())
        }

        async fn evaluate(&self, script: &str) -> Result<Value> {
            if script == SCROLL_HEIGHT {
                return Ok(json!(self.current().height));
            }
            // A scroll triggers the next lazy-load batch.
            self.advance();
            Ok(Value::Null)
        }

        async fn content(&self) -> Result<String> {
            Ok(String::new())
        }

        async fn attr_values(&self, _selector: &str, _attr: &str) -> Result<Vec<String>> {
            Ok(self.current().links)
        }

        async fn is_visible(&self, _selector: &str) -> Result<bool> {
            Ok(self.current().button_visible)
        }

        async fn click(&self, _selector: &str) -> Result<()> {
            if self.fail_click {
                return Err(AppError::navigation("click", "element detached"));
            }
            self.advance();
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{PageStep, ScriptedPage};
    use super::*;
    use crate::models::Termination;
    use crate::sites;
    use crate::store::MemoryStore;

    fn scroll_site() -> SiteConfig {
        let mut site = sites::farmacia_catedral();
        site.discovery = DiscoveryStrategy::InfiniteScroll {
            max_no_change: 2,
            max_scrolls: 10,
            pause_ms: 0,
        };
        site
    }

    fn growing_page() -> ScriptedPage {
        ScriptedPage::new(vec![
            PageStep {
                links: vec!["/producto/1/uno".into(), "/producto/2/dos".into()],
                height: 1000,
                button_visible: false,
            },
            PageStep {
                links: vec![
                    "/producto/1/uno".into(),
                    "/producto/2/dos".into(),
                    "/producto/3/tres".into(),
                ],
                height: 2000,
                button_visible: false,
            },
        ])
    }

    #[tokio::test]
    async fn discovery_is_idempotent_across_runs() {
        let store = MemoryStore::new();
        let site = scroll_site();
        let client = reqwest::Client::new();

        let engine = DiscoveryEngine::new(&site, &store);
        let first = engine
            .discover(Some(&growing_page()), &client)
            .await
            .unwrap();
        assert_eq!(first.urls_inserted, 3);
        assert_eq!(first.urls_seen, 3);

        let second = engine
            .discover(Some(&growing_page()), &client)
            .await
            .unwrap();
        assert_eq!(second.urls_inserted, 0, "re-run must insert nothing new");
        assert_eq!(store.url_count().await, 3);
    }

    #[tokio::test]
    async fn site_codes_are_parsed_from_urls() {
        let store = MemoryStore::new();
        let site = scroll_site();
        let client = reqwest::Client::new();

        DiscoveryEngine::new(&site, &store)
            .discover(Some(&growing_page()), &client)
            .await
            .unwrap();

        let urls = store.urls_to_scrape(site.pharmacy).await.unwrap();
        assert_eq!(urls.len(), 3);
        assert!(urls
            .iter()
            .all(|u| u.starts_with("https://www.farmaciacatedral.com.py/producto/")));
    }

    #[tokio::test]
    async fn entry_point_failure_propagates() {
        let store = MemoryStore::new();
        let site = scroll_site();
        let client = reqwest::Client::new();

        let mut page = growing_page();
        page.fail_navigation = true;

        let result = DiscoveryEngine::new(&site, &store)
            .discover(Some(&page), &client)
            .await;
        assert!(matches!(result, Err(AppError::Navigation { .. })));
    }

    #[tokio::test]
    async fn browser_strategy_without_page_is_a_config_error() {
        let store = MemoryStore::new();
        let site = scroll_site();
        let client = reqwest::Client::new();

        let result = DiscoveryEngine::new(&site, &store)
            .discover(None, &client)
            .await;
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn stalled_page_terminates_at_ceiling_with_distinct_signal() {
        let store = MemoryStore::new();
        let site = {
            let mut site = scroll_site();
            site.discovery = DiscoveryStrategy::InfiniteScroll {
                max_no_change: 50, // never reached; height never changes either way
                max_scrolls: 5,
                pause_ms: 0,
            };
            site
        };
        let client = reqwest::Client::new();

        // Height is frozen from the start; only the ceiling can stop the loop.
        let page = ScriptedPage::new(vec![PageStep {
            links: vec!["/producto/9/nueve".into()],
            height: 1000,
            button_visible: false,
        }]);

        let outcome = DiscoveryEngine::new(&site, &store)
            .discover(Some(&page), &client)
            .await
            .unwrap();
        assert_eq!(outcome.termination, Termination::CeilingHit);
        assert_eq!(outcome.steps, 5);
        assert_eq!(outcome.urls_inserted, 1);
    }
}
