// src/store/memory.rs

//! In-memory store for tests and dry runs.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::{
    DiscoveredUrl, Pharmacy, PriceSnapshot, Product, ScrapeRun, TrackedUrl,
};

use super::Store;

#[derive(Default)]
struct Inner {
    products: HashMap<(Pharmacy, String), Product>,
    urls: HashMap<(Pharmacy, String), DiscoveredUrl>,
    snapshots: HashMap<(Pharmacy, String, NaiveDate), PriceSnapshot>,
    runs: Vec<ScrapeRun>,
    tracked: Vec<TrackedUrl>,
}

/// HashMap-backed store with the same conflict-key semantics as the real
/// backends.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a URL for daily tracking (test/seed helper).
    pub async fn track(&self, url: TrackedUrl) {
        self.inner.lock().await.tracked.push(url);
    }

    pub async fn product_count(&self) -> usize {
        self.inner.lock().await.products.len()
    }

    pub async fn url_count(&self) -> usize {
        self.inner.lock().await.urls.len()
    }

    pub async fn snapshot_count(&self) -> usize {
        self.inner.lock().await.snapshots.len()
    }

    pub async fn product(&self, pharmacy: Pharmacy, site_code: &str) -> Option<Product> {
        self.inner
            .lock()
            .await
            .products
            .get(&(pharmacy, site_code.to_string()))
            .cloned()
    }

    pub async fn runs(&self) -> Vec<ScrapeRun> {
        self.inner.lock().await.runs.clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn upsert_product(&self, product: &Product) -> Result<String> {
        let mut inner = self.inner.lock().await;
        let mut record = product.clone();
        record.scraped_at = Some(Utc::now());
        let key = record.catalog_key();
        let id = format!("{}:{}", key.0, key.1);
        inner.products.insert(key, record);
        Ok(id)
    }

    async fn insert_discovered_urls(&self, urls: &[DiscoveredUrl]) -> Result<usize> {
        let mut inner = self.inner.lock().await;
        let mut inserted = 0;
        for url in urls {
            let key = (url.pharmacy_source, url.product_url.clone());
            if !inner.urls.contains_key(&key) {
                inner.urls.insert(key, url.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn urls_to_scrape(&self, pharmacy: Pharmacy) -> Result<Vec<String>> {
        let inner = self.inner.lock().await;
        let mut urls: Vec<String> = inner
            .urls
            .values()
            .filter(|u| u.pharmacy_source == pharmacy)
            .map(|u| u.product_url.clone())
            .collect();
        urls.sort();
        Ok(urls)
    }

    async fn tracking_urls(&self) -> Result<Vec<TrackedUrl>> {
        Ok(self.inner.lock().await.tracked.clone())
    }

    async fn insert_snapshot(&self, snapshot: &PriceSnapshot) -> Result<String> {
        let mut inner = self.inner.lock().await;
        let key = (
            snapshot.pharmacy_source,
            snapshot.barcode.clone(),
            snapshot.snapshot_date,
        );
        let id = format!("{}:{}:{}", key.0, key.1, key.2);
        inner.snapshots.insert(key, snapshot.clone());
        Ok(id)
    }

    async fn start_run(&self, pharmacy: Pharmacy, scope: &str) -> Result<u64> {
        let mut inner = self.inner.lock().await;
        let id = inner.runs.len() as u64 + 1;
        inner.runs.push(ScrapeRun::start(id, pharmacy, scope));
        Ok(id)
    }

    async fn complete_run(
        &self,
        run_id: u64,
        scraped: usize,
        failed: usize,
        error: Option<String>,
    ) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let run = inner
            .runs
            .iter_mut()
            .find(|r| r.id == run_id)
            .ok_or_else(|| AppError::store_write(format!("unknown run id {run_id}")))?;
        run.complete(scraped, failed, error);
        Ok(())
    }
}
