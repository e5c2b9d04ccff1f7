// src/pipeline/tracker.rs

//! Daily price-tracking campaign.
//!
//! Re-visits the URLs marked for tracking, refreshes the catalog record, and
//! writes one price snapshot per (pharmacy, barcode) for today. Snapshots are
//! written unconditionally on every visit so the price history has a point
//! per day even when nothing changed.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::Utc;
use futures::stream::{self, StreamExt};

use crate::browser::PageFetcher;
use crate::error::Result;
use crate::models::{Config, Pharmacy, PriceSnapshot, TrackedUrl};
use crate::store::Store;

use super::orchestrator::{scrape_one, RunOutcome};

/// Run the tracking campaign across every pharmacy with tracked URLs.
pub async fn run_daily_tracker(
    config: &Config,
    store: &dyn Store,
    fetcher: &dyn PageFetcher,
) -> Result<RunOutcome> {
    let tracked = store.tracking_urls().await?;
    if tracked.is_empty() {
        log::info!("No URLs marked for tracking, nothing to do");
        return Ok(RunOutcome::default());
    }

    let mut by_pharmacy: BTreeMap<Pharmacy, Vec<TrackedUrl>> = BTreeMap::new();
    for url in tracked {
        by_pharmacy.entry(url.pharmacy_source).or_default().push(url);
    }

    let mut total = RunOutcome::default();
    for (pharmacy, urls) in by_pharmacy {
        log::info!("Tracking {} URLs for {pharmacy}", urls.len());
        let outcome = track_pharmacy(config, store, fetcher, pharmacy, urls).await?;
        total.products_scraped += outcome.products_scraped;
        total.products_failed += outcome.products_failed;
    }
    Ok(total)
}

async fn track_pharmacy(
    config: &Config,
    store: &dyn Store,
    fetcher: &dyn PageFetcher,
    pharmacy: Pharmacy,
    urls: Vec<TrackedUrl>,
) -> Result<RunOutcome> {
    let site = config.site(pharmacy)?;
    let crawler = &config.crawler;
    let run_id = store.start_run(pharmacy, "daily_tracker").await?;
    let today = Utc::now().date_naive();

    let results: Vec<bool> = stream::iter(urls)
        .map(|tracked| async move {
            let outcome = async {
                let mut product =
                    scrape_one(fetcher, site, crawler, &tracked.product_url).await?;

                // The tracking table is the source of truth for identifiers
                // the page no longer shows.
                if product.site_code.is_none() {
                    product.site_code = tracked.site_code.clone();
                }
                if product.barcode.is_none() {
                    product.barcode = tracked.barcode.clone();
                }

                store.upsert_product(&product).await?;
                if let Some(snapshot) = PriceSnapshot::from_product(&product, today) {
                    store.insert_snapshot(&snapshot).await?;
                } else {
                    log::warn!(
                        "No barcode for {}, snapshot skipped",
                        tracked.product_url
                    );
                }
                Ok::<(), crate::error::AppError>(())
            }
            .await;

            if crawler.request_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(crawler.request_delay_ms)).await;
            }
            match outcome {
                Ok(()) => true,
                Err(e) => {
                    log::warn!("Tracking failed for {}: {e}", tracked.product_url);
                    false
                }
            }
        })
        .buffer_unordered(site.concurrency(crawler))
        .collect()
        .await;

    let outcome = RunOutcome {
        products_scraped: results.iter().filter(|ok| **ok).count(),
        products_failed: results.iter().filter(|ok| !**ok).count(),
    };
    store
        .complete_run(
            run_id,
            outcome.products_scraped,
            outcome.products_failed,
            None,
        )
        .await?;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::error::AppError;
    use crate::models::RunStatus;
    use crate::store::MemoryStore;

    struct CannedFetcher(String);

    #[async_trait]
    impl PageFetcher for CannedFetcher {
        async fn fetch(&self, _url: &str, _sel: &str, _timeout: Duration) -> Result<String> {
            if self.0.is_empty() {
                return Err(AppError::navigation("x", "down"));
            }
            Ok(self.0.clone())
        }
    }

    fn quiet_config() -> Config {
        let mut config = Config::default();
        config.crawler.request_delay_ms = 0;
        config.crawler.max_retries = 0;
        config
    }

    fn tracked(pharmacy: Pharmacy, url: &str, barcode: Option<&str>) -> TrackedUrl {
        TrackedUrl {
            pharmacy_source: pharmacy,
            product_url: url.to_string(),
            site_code: Some("66".into()),
            barcode: barcode.map(str::to_string),
        }
    }

    // Page with a price but no barcode; the tracking record supplies it.
    const PAGE: &str = r#"<html><body>
        <h1 class="title-ficha">Ensure Advance Vainilla</h1>
        <p class="precio-web">Gs. 193.200</p>
    </body></html>"#;

    #[tokio::test]
    async fn snapshots_are_written_for_tracked_barcodes() {
        let config = quiet_config();
        let store = MemoryStore::new();
        store
            .track(tracked(
                Pharmacy::FarmaciaCatedral,
                "https://www.farmaciacatedral.com.py/producto/66/ensure",
                Some("7840036005616"),
            ))
            .await;
        let fetcher = CannedFetcher(PAGE.to_string());

        let outcome = run_daily_tracker(&config, &store, &fetcher).await.unwrap();
        assert_eq!(outcome.products_scraped, 1);
        assert_eq!(store.snapshot_count().await, 1);
        assert_eq!(store.product_count().await, 1);

        let runs = store.runs().await;
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].scope, "daily_tracker");
        assert_eq!(runs[0].status, RunStatus::Completed);
    }

    #[tokio::test]
    async fn missing_barcode_skips_the_snapshot_not_the_product() {
        let config = quiet_config();
        let store = MemoryStore::new();
        store
            .track(tracked(
                Pharmacy::FarmaciaCatedral,
                "https://www.farmaciacatedral.com.py/producto/67/sin-barras",
                None,
            ))
            .await;
        let fetcher = CannedFetcher(PAGE.to_string());

        let outcome = run_daily_tracker(&config, &store, &fetcher).await.unwrap();
        assert_eq!(outcome.products_scraped, 1);
        assert_eq!(store.product_count().await, 1);
        assert_eq!(store.snapshot_count().await, 0);
    }

    #[tokio::test]
    async fn per_pharmacy_runs_are_recorded() {
        let config = quiet_config();
        let store = MemoryStore::new();
        store
            .track(tracked(
                Pharmacy::FarmaciaCatedral,
                "https://www.farmaciacatedral.com.py/producto/66/ensure",
                Some("7840036005616"),
            ))
            .await;
        store
            .track(TrackedUrl {
                pharmacy_source: Pharmacy::PuntoFarma,
                product_url: "https://www.puntofarma.com.py/producto/139212/item".into(),
                site_code: Some("139212".into()),
                barcode: Some("7891058001231".into()),
            })
            .await;
        // Both rule tables resolve a name from this page (plain h1 for Punto).
        let fetcher = CannedFetcher(PAGE.to_string());

        let outcome = run_daily_tracker(&config, &store, &fetcher).await.unwrap();
        assert_eq!(store.runs().await.len(), 2);
        assert_eq!(outcome.products_scraped, 2);
    }
}
