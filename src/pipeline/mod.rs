// src/pipeline/mod.rs

//! Crawl orchestration: the two-phase pipeline and the daily price tracker.

pub mod orchestrator;
pub mod tracker;

pub use orchestrator::{Orchestrator, Phase, RunOutcome};
pub use tracker::run_daily_tracker;
