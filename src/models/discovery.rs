// src/models/discovery.rs

//! Records produced by the URL-discovery phase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::product::Pharmacy;

/// A product URL found during discovery.
///
/// Uniqueness key: (`pharmacy_source`, `product_url`). Rows are never
/// deleted; re-discovery is an insert-or-ignore no-op.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredUrl {
    pub pharmacy_source: Pharmacy,
    pub product_url: String,

    /// Site code parsed out of the URL itself, when the site encodes it there
    pub site_code: Option<String>,

    pub discovered_at: DateTime<Utc>,
}

impl DiscoveredUrl {
    pub fn new(pharmacy: Pharmacy, product_url: String, site_code: Option<String>) -> Self {
        Self {
            pharmacy_source: pharmacy,
            product_url,
            site_code,
            discovered_at: Utc::now(),
        }
    }
}

/// How a discovery loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Clean end-of-catalog signal (no next page, button gone, height stable)
    NaturalEnd,
    /// Safety ceiling reached without a clear end signal; the catalog may be
    /// larger than the configured bounds assume
    CeilingHit,
}

/// Aggregate result of one discovery run.
#[derive(Debug, Clone)]
pub struct DiscoveryOutcome {
    /// Genuinely new rows persisted (store-level duplicates excluded)
    pub urls_inserted: usize,
    /// Unique URLs seen this run, including already-known ones
    pub urls_seen: usize,
    /// Pages fetched, scrolls performed, or clicks issued
    pub steps: usize,
    pub termination: Termination,
}

/// A URL marked for the daily price-tracking campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedUrl {
    pub pharmacy_source: Pharmacy,
    pub product_url: String,
    pub site_code: Option<String>,
    pub barcode: Option<String>,
}
