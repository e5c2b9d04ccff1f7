// src/models/config.rs

//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::product::Pharmacy;
use crate::models::rules::SiteRules;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP and crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Site adapter definitions; defaults to the four built-in pharmacies
    #[serde(default = "crate::sites::default_sites")]
    pub sites: Vec<SiteConfig>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return the built-in defaults if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Look up the adapter config for one pharmacy.
    pub fn site(&self, pharmacy: Pharmacy) -> Result<&SiteConfig> {
        self.sites
            .iter()
            .find(|s| s.pharmacy == pharmacy)
            .ok_or_else(|| AppError::config(format!("no site config for {pharmacy}")))
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.page_timeout_secs == 0 {
            return Err(AppError::validation("crawler.page_timeout_secs must be > 0"));
        }
        if self.crawler.max_concurrent == 0 {
            return Err(AppError::validation("crawler.max_concurrent must be > 0"));
        }
        if self.sites.is_empty() {
            return Err(AppError::validation("No sites defined"));
        }
        for site in &self.sites {
            site.validate()?;
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            crawler: CrawlerConfig::default(),
            sites: crate::sites::default_sites(),
        }
    }
}

/// HTTP client and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Hard wall-clock cap for one fetch+extract unit of work
    #[serde(default = "defaults::page_timeout")]
    pub page_timeout_secs: u64,

    /// Delay between completed requests in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Maximum concurrent fetch+extract workers
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Retry bound for a failed unit of work
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,

    /// Global circuit breaker on total work units per run (0 = unlimited)
    #[serde(default = "defaults::max_requests")]
    pub max_requests: usize,

    /// Upstream proxy endpoints, rotated round-robin; empty = direct
    #[serde(default)]
    pub proxy_urls: Vec<String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            page_timeout_secs: defaults::page_timeout(),
            request_delay_ms: defaults::request_delay(),
            max_concurrent: defaults::max_concurrent(),
            max_retries: defaults::max_retries(),
            max_requests: defaults::max_requests(),
            proxy_urls: Vec::new(),
        }
    }
}

/// How a site's catalog is enumerated during discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum DiscoveryStrategy {
    /// Follow a "next page" link until absent or cycling
    NumberedPagination {
        next_selector: String,
        #[serde(default = "defaults::max_pages")]
        max_pages: usize,
    },

    /// Scroll to the bottom until the page height stops growing
    InfiniteScroll {
        /// Consecutive no-growth scrolls that count as the end of the catalog
        #[serde(default = "defaults::scroll_no_change")]
        max_no_change: u32,
        /// Hard scroll ceiling
        #[serde(default = "defaults::scroll_ceiling")]
        max_scrolls: u32,
        #[serde(default = "defaults::scroll_pause")]
        pause_ms: u64,
    },

    /// Click a "load more" control until it disappears
    ClickToLoad {
        button_selector: String,
        /// Consecutive missing-button checks that count as the end
        #[serde(default = "defaults::click_missing")]
        max_missing: u32,
        /// Hard click ceiling
        #[serde(default = "defaults::click_ceiling")]
        max_clicks: u32,
        #[serde(default = "defaults::click_pause")]
        pause_ms: u64,
    },

    /// Direct HTTP requests to the site's internal pagination endpoint.
    /// Preferred over browser automation when available.
    PaginationApi(ApiPagination),
}

/// Internal pagination endpoint description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiPagination {
    /// Request URL; `{page}` is substituted with the 1-based page number
    pub endpoint: String,

    #[serde(default)]
    pub method: ApiMethod,

    /// Extra request headers
    #[serde(default)]
    pub headers: Vec<ApiHeader>,

    /// Request body template; `{page}` substituted (POST endpoints)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_template: Option<String>,

    /// Products per page, used with `total_pattern` to compute page count
    pub page_size: usize,

    /// Capture regex for the catalog's total item count in the first response;
    /// when absent, pages are fetched until one yields nothing new
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_pattern: Option<String>,

    /// Regex harvesting product paths/URLs from a response body
    pub link_pattern: String,

    /// Hard page ceiling when no total count is available
    #[serde(default = "defaults::max_pages")]
    pub max_pages: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiMethod {
    #[default]
    Get,
    Post,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiHeader {
    pub name: String,
    pub value: String,
}

/// Full adapter configuration for one pharmacy site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub pharmacy: Pharmacy,
    pub base_url: String,

    /// Category pages discovery starts from
    pub entry_points: Vec<String>,

    /// Anchors harvested on listing pages
    pub product_link_selector: String,

    /// Substring a harvested href must contain to count as a product page
    pub product_link_contains: String,

    /// Capture regex pulling the site code out of a product URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_code_pattern: Option<String>,

    /// Content-ready signal on a product page
    pub wait_selector: String,

    pub discovery: DiscoveryStrategy,

    /// Worker-pool override for this site; falls back to `crawler.max_concurrent`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrent: Option<usize>,

    #[serde(default)]
    pub rules: SiteRules,
}

impl SiteConfig {
    /// Effective concurrency degree for this site.
    pub fn concurrency(&self, crawler: &CrawlerConfig) -> usize {
        self.max_concurrent.unwrap_or(crawler.max_concurrent).max(1)
    }

    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.base_url)?;
        if self.entry_points.is_empty() {
            return Err(AppError::validation(format!(
                "{}: no entry points",
                self.pharmacy
            )));
        }
        if self.wait_selector.trim().is_empty() {
            return Err(AppError::validation(format!(
                "{}: wait_selector is empty",
                self.pharmacy
            )));
        }
        if self.rules.fields.product_name.is_empty() {
            return Err(AppError::validation(format!(
                "{}: product_name rule chain is empty",
                self.pharmacy
            )));
        }
        Ok(())
    }
}

mod defaults {
    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; pharmacrawl/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn page_timeout() -> u64 {
        30
    }
    pub fn request_delay() -> u64 {
        500
    }
    pub fn max_concurrent() -> usize {
        5
    }
    pub fn max_retries() -> u32 {
        2
    }
    pub fn max_requests() -> usize {
        100_000
    }

    // Discovery defaults, from bounds observed in production runs
    pub fn max_pages() -> usize {
        500
    }
    pub fn scroll_no_change() -> u32 {
        15
    }
    pub fn scroll_ceiling() -> u32 {
        1000
    }
    pub fn scroll_pause() -> u64 {
        3000
    }
    pub fn click_missing() -> u32 {
        3
    }
    pub fn click_ceiling() -> u32 {
        600
    }
    pub fn click_pause() -> u64 {
        500
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let mut config = Config::default();
        config.crawler.max_concurrent = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_unparseable_base_url() {
        let mut config = Config::default();
        config.sites[0].base_url = "not a url".into();
        assert!(matches!(config.validate(), Err(AppError::Url(_))));
    }

    #[test]
    fn validate_rejects_site_without_name_rules() {
        let mut config = Config::default();
        config.sites[0].rules.fields.product_name.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn site_lookup_finds_all_builtins() {
        let config = Config::default();
        for pharmacy in Pharmacy::ALL {
            assert!(config.site(pharmacy).is_ok());
        }
    }

    #[test]
    fn site_concurrency_override_wins() {
        let config = Config::default();
        let crawler = CrawlerConfig::default();
        let mut site = config.sites[0].clone();
        site.max_concurrent = Some(1);
        assert_eq!(site.concurrency(&crawler), 1);
        site.max_concurrent = None;
        assert_eq!(site.concurrency(&crawler), crawler.max_concurrent);
    }
}
