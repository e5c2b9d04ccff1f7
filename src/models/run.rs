// src/models/run.rs

//! Scrape-run lifecycle records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::product::Pharmacy;

/// Lifecycle state of a scrape run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

/// One discovery or extraction run. Created at start, mutated exactly once
/// at completion; terminal states are never resumed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeRun {
    pub id: u64,
    pub pharmacy_source: Pharmacy,

    /// Free-text description of categories/phase (e.g. "discovery:medicamentos")
    pub scope: String,

    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub products_scraped: usize,
    pub products_failed: usize,
    pub error_message: Option<String>,
}

impl ScrapeRun {
    pub fn start(id: u64, pharmacy: Pharmacy, scope: impl Into<String>) -> Self {
        Self {
            id,
            pharmacy_source: pharmacy,
            scope: scope.into(),
            status: RunStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
            products_scraped: 0,
            products_failed: 0,
            error_message: None,
        }
    }

    /// Move the run to its terminal state. A `failed` status is reserved for
    /// runs that could not meaningfully start or continue; a run with some
    /// failed pages but no fatal error still completes.
    pub fn complete(&mut self, scraped: usize, failed: usize, error: Option<String>) {
        self.status = if error.is_some() {
            RunStatus::Failed
        } else {
            RunStatus::Completed
        };
        self.completed_at = Some(Utc::now());
        self.products_scraped = scraped;
        self.products_failed = failed;
        self.error_message = error;
    }
}
