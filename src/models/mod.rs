// src/models/mod.rs

//! Data structures shared across the crawler.

pub mod config;
pub mod discovery;
pub mod product;
pub mod rules;
pub mod run;
pub mod snapshot;

pub use config::{
    ApiHeader, ApiMethod, ApiPagination, Config, CrawlerConfig, DiscoveryStrategy, SiteConfig,
};
pub use discovery::{DiscoveredUrl, DiscoveryOutcome, Termination, TrackedUrl};
pub use product::{Pharmacy, Product};
pub use rules::{
    BankOfferRules, CategoryRules, CodeSplitRule, FieldRules, PrescriptionRule, RuleSource,
    SiteRules,
};
pub use run::{RunStatus, ScrapeRun};
pub use snapshot::PriceSnapshot;
