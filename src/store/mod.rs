// src/store/mod.rs

//! Storage abstractions for scraped data.
//!
//! The crawler only ever talks to the [`Store`] trait; correctness under
//! concurrent workers comes from the conflict-key upsert contract, not from
//! in-process locking. Every write carries a full, self-consistent record.

pub mod local;
pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{DiscoveredUrl, Pharmacy, PriceSnapshot, Product, TrackedUrl};

pub use local::LocalStore;
pub use memory::MemoryStore;

/// Persistence interface consumed by the pipeline.
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert or replace a product, keyed by (pharmacy_source, site_code).
    /// Sets `scraped_at` at write time. Returns the row id.
    async fn upsert_product(&self, product: &Product) -> Result<String>;

    /// Insert-or-ignore discovered URLs, keyed by (pharmacy_source,
    /// product_url). Returns the count of genuinely new rows only.
    async fn insert_discovered_urls(&self, urls: &[DiscoveredUrl]) -> Result<usize>;

    /// URLs previously discovered for a pharmacy, for the extraction worklist.
    async fn urls_to_scrape(&self, pharmacy: Pharmacy) -> Result<Vec<String>>;

    /// URLs marked for the daily price-tracking campaign.
    async fn tracking_urls(&self) -> Result<Vec<TrackedUrl>>;

    /// Insert or replace a snapshot, keyed by (pharmacy_source, barcode,
    /// snapshot_date). Returns the row id.
    async fn insert_snapshot(&self, snapshot: &PriceSnapshot) -> Result<String>;

    /// Create a run record in the `running` state; returns its id.
    async fn start_run(&self, pharmacy: Pharmacy, scope: &str) -> Result<u64>;

    /// Move a run to its terminal state with aggregate counts.
    async fn complete_run(
        &self,
        run_id: u64,
        scraped: usize,
        failed: usize,
        error: Option<String>,
    ) -> Result<()>;
}
