// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use crate::error::Result;
use crate::models::CrawlerConfig;

/// Create a configured client, optionally routed through one proxy endpoint.
pub fn create_client(config: &CrawlerConfig, proxy: Option<&str>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs));

    if let Some(proxy_url) = proxy {
        builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
    }

    Ok(builder.build()?)
}

/// One client per configured proxy for round-robin rotation, or a single
/// direct client when no proxies are configured.
pub fn create_clients(config: &CrawlerConfig) -> Result<Vec<reqwest::Client>> {
    if config.proxy_urls.is_empty() {
        log::info!("No proxies configured, using direct connection");
        return Ok(vec![create_client(config, None)?]);
    }

    log::info!("Using {} proxies for rotation", config.proxy_urls.len());
    config
        .proxy_urls
        .iter()
        .map(|proxy| create_client(config, Some(proxy)))
        .collect()
}
