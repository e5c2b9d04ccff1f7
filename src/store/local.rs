// src/store/local.rs

//! Local JSON-file store.
//!
//! One file per table under a data directory. Good enough for single-process
//! runs and inspection with standard tools; the relational backend lives
//! behind the same trait.
//!
//! ```text
//! data/
//! ├── products.json
//! ├── discovered_urls.json
//! ├── snapshots.json
//! ├── runs.json
//! └── tracking_urls.json   # input: URLs marked for daily tracking
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::{
    DiscoveredUrl, Pharmacy, PriceSnapshot, Product, ScrapeRun, TrackedUrl,
};

use super::Store;

const PRODUCTS_FILE: &str = "products.json";
const URLS_FILE: &str = "discovered_urls.json";
const SNAPSHOTS_FILE: &str = "snapshots.json";
const RUNS_FILE: &str = "runs.json";
const TRACKING_FILE: &str = "tracking_urls.json";

/// JSON-file store rooted at a data directory.
pub struct LocalStore {
    dir: PathBuf,
    // Serializes load-modify-write cycles across concurrent workers.
    write_lock: Mutex<()>,
}

impl LocalStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    async fn load<T: DeserializeOwned>(&self, file: &str) -> Result<Vec<T>> {
        let path = self.path(file);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save<T: Serialize>(&self, file: &str, rows: &[T]) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_vec_pretty(rows)?;
        tokio::fs::write(self.path(file), json)
            .await
            .map_err(|e| AppError::store_write(format!("writing {file}: {e}")))
    }
}

#[async_trait]
impl Store for LocalStore {
    async fn upsert_product(&self, product: &Product) -> Result<String> {
        let _guard = self.write_lock.lock().await;
        let mut rows: Vec<Product> = self.load(PRODUCTS_FILE).await?;

        let mut record = product.clone();
        record.scraped_at = Some(Utc::now());
        let key = record.catalog_key();
        let id = format!("{}:{}", key.0, key.1);

        match rows.iter_mut().find(|r| r.catalog_key() == key) {
            Some(existing) => *existing = record,
            None => rows.push(record),
        }
        self.save(PRODUCTS_FILE, &rows).await?;
        Ok(id)
    }

    async fn insert_discovered_urls(&self, urls: &[DiscoveredUrl]) -> Result<usize> {
        let _guard = self.write_lock.lock().await;
        let mut rows: Vec<DiscoveredUrl> = self.load(URLS_FILE).await?;

        let mut inserted = 0;
        for url in urls {
            let known = rows.iter().any(|r| {
                r.pharmacy_source == url.pharmacy_source && r.product_url == url.product_url
            });
            if !known {
                rows.push(url.clone());
                inserted += 1;
            }
        }
        if inserted > 0 {
            self.save(URLS_FILE, &rows).await?;
        }
        Ok(inserted)
    }

    async fn urls_to_scrape(&self, pharmacy: Pharmacy) -> Result<Vec<String>> {
        let rows: Vec<DiscoveredUrl> = self.load(URLS_FILE).await?;
        Ok(rows
            .into_iter()
            .filter(|r| r.pharmacy_source == pharmacy)
            .map(|r| r.product_url)
            .collect())
    }

    async fn tracking_urls(&self) -> Result<Vec<TrackedUrl>> {
        self.load(TRACKING_FILE).await
    }

    async fn insert_snapshot(&self, snapshot: &PriceSnapshot) -> Result<String> {
        let _guard = self.write_lock.lock().await;
        let mut rows: Vec<PriceSnapshot> = self.load(SNAPSHOTS_FILE).await?;

        let id = format!(
            "{}:{}:{}",
            snapshot.pharmacy_source, snapshot.barcode, snapshot.snapshot_date
        );
        match rows.iter_mut().find(|r| {
            r.pharmacy_source == snapshot.pharmacy_source
                && r.barcode == snapshot.barcode
                && r.snapshot_date == snapshot.snapshot_date
        }) {
            Some(existing) => *existing = snapshot.clone(),
            None => rows.push(snapshot.clone()),
        }
        self.save(SNAPSHOTS_FILE, &rows).await?;
        Ok(id)
    }

    async fn start_run(&self, pharmacy: Pharmacy, scope: &str) -> Result<u64> {
        let _guard = self.write_lock.lock().await;
        let mut rows: Vec<ScrapeRun> = self.load(RUNS_FILE).await?;
        let id = rows.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        rows.push(ScrapeRun::start(id, pharmacy, scope));
        self.save(RUNS_FILE, &rows).await?;
        Ok(id)
    }

    async fn complete_run(
        &self,
        run_id: u64,
        scraped: usize,
        failed: usize,
        error: Option<String>,
    ) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut rows: Vec<ScrapeRun> = self.load(RUNS_FILE).await?;
        let run = rows
            .iter_mut()
            .find(|r| r.id == run_id)
            .ok_or_else(|| AppError::store_write(format!("unknown run id {run_id}")))?;
        run.complete(scraped, failed, error);
        self.save(RUNS_FILE, &rows).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_product() -> Product {
        let mut product = Product::new(
            Pharmacy::FarmaOliva,
            "Novalgina Adulto 1g".into(),
            "https://www.farmaoliva.com.py/producto/novalgina".into(),
        );
        product.site_code = Some("4471".into());
        product.barcode = Some("7891058001231".into());
        product.current_price = Some(59_400.0);
        product
    }

    #[tokio::test]
    async fn products_survive_a_store_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = LocalStore::new(dir.path());
            store.upsert_product(&sample_product()).await.unwrap();
        }

        let store = LocalStore::new(dir.path());
        store.upsert_product(&sample_product()).await.unwrap();

        let rows: Vec<Product> = store.load(PRODUCTS_FILE).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn discovered_urls_are_insert_or_ignore() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());

        let urls = vec![DiscoveredUrl::new(
            Pharmacy::FarmaOliva,
            "https://www.farmaoliva.com.py/producto/novalgina".into(),
            None,
        )];
        assert_eq!(store.insert_discovered_urls(&urls).await.unwrap(), 1);
        assert_eq!(store.insert_discovered_urls(&urls).await.unwrap(), 0);

        let list = store.urls_to_scrape(Pharmacy::FarmaOliva).await.unwrap();
        assert_eq!(list.len(), 1);
        assert!(store
            .urls_to_scrape(Pharmacy::PuntoFarma)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn missing_tracking_file_means_no_tracked_urls() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        assert!(store.tracking_urls().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn run_ids_are_sequential_across_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let first = {
            let store = LocalStore::new(dir.path());
            store.start_run(Pharmacy::PuntoFarma, "discovery").await.unwrap()
        };
        let store = LocalStore::new(dir.path());
        let second = store.start_run(Pharmacy::PuntoFarma, "extraction").await.unwrap();
        assert_eq!(second, first + 1);
        store.complete_run(second, 5, 0, None).await.unwrap();
    }
}
