// src/browser.rs

//! Browser-automation and page-fetch capabilities.
//!
//! The crawler never talks to a browser engine directly; discovery drives
//! whatever implements [`BrowserPage`], and the extraction phase only needs a
//! [`PageFetcher`]. Tests script both.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use scraper::Html;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::CrawlerConfig;
use crate::utils::http;

/// Script run to trigger a lazy-load scroll.
pub const SCROLL_TO_BOTTOM: &str = "window.scrollTo(0, document.body.scrollHeight)";
/// Script returning the current page height.
pub const SCROLL_HEIGHT: &str = "document.body.scrollHeight";

/// One browser-page-equivalent resource, supplied by the embedding binary.
#[async_trait]
pub trait BrowserPage: Send + Sync {
    /// Navigate to a URL and wait for the load to settle.
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Block until a selector is present, bounded by a timeout.
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()>;

    /// Evaluate a script in the page and return its JSON value.
    async fn evaluate(&self, script: &str) -> Result<Value>;

    /// Full rendered page content.
    async fn content(&self) -> Result<String>;

    /// Attribute values of every element matching a selector, in DOM order.
    async fn attr_values(&self, selector: &str, attr: &str) -> Result<Vec<String>>;

    /// Whether the first element matching a selector is currently visible.
    async fn is_visible(&self, selector: &str) -> Result<bool>;

    /// Click the first element matching a selector.
    async fn click(&self, selector: &str) -> Result<()>;
}

/// Fetch the rendered content of one product page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch `url` and return its content once `wait_selector` is present.
    async fn fetch(&self, url: &str, wait_selector: &str, timeout: Duration) -> Result<String>;
}

/// Plain-HTTP fetcher for server-rendered pages. Rotates across one client
/// per configured proxy endpoint, round-robin.
pub struct HttpFetcher {
    clients: Vec<reqwest::Client>,
    next: AtomicUsize,
}

impl HttpFetcher {
    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        let clients = http::create_clients(config)?;
        Ok(Self {
            clients,
            next: AtomicUsize::new(0),
        })
    }

    fn client(&self) -> &reqwest::Client {
        let idx = self.next.fetch_add(1, Ordering::Relaxed);
        &self.clients[idx % self.clients.len()]
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, wait_selector: &str, timeout: Duration) -> Result<String> {
        let response = self
            .client()
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| AppError::navigation(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::navigation(url, format!("HTTP {status}")));
        }
        let body = response
            .text()
            .await
            .map_err(|e| AppError::navigation(url, e))?;

        // An HTTP fetch cannot wait for late-rendering content; absence of the
        // readiness selector means the page did not deliver what a browser would.
        let doc = Html::parse_document(&body);
        let sel = crate::extract::sources::parse_selector(wait_selector)?;
        if doc.select(&sel).next().is_none() {
            return Err(AppError::selector_timeout(wait_selector, url));
        }
        Ok(body)
    }
}

/// Fetcher backed by a browser page: navigate, wait for the readiness
/// selector, then hand back the rendered DOM.
pub struct BrowserFetcher<P: BrowserPage> {
    page: P,
}

impl<P: BrowserPage> BrowserFetcher<P> {
    pub fn new(page: P) -> Self {
        Self { page }
    }
}

#[async_trait]
impl<P: BrowserPage> PageFetcher for BrowserFetcher<P> {
    async fn fetch(&self, url: &str, wait_selector: &str, timeout: Duration) -> Result<String> {
        self.page.navigate(url).await?;
        self.page.wait_for_selector(wait_selector, timeout).await?;
        self.page.content().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubPage {
        html: &'static str,
        reachable: bool,
    }

    #[async_trait]
    impl BrowserPage for StubPage {
        async fn navigate(&self, url: &str) -> Result<()> {
            if self.reachable {
                Ok(())
            } else {
                Err(AppError::navigation(url, "connection refused"))
            }
        }

        async fn wait_for_selector(&self, _selector: &str, _timeout: Duration) -> Result<()> {
            Ok(())
        }

        async fn evaluate(&self, _script: &str) -> Result<Value> {
            Ok(Value::Null)
        }

        async fn content(&self) -> Result<String> {
            Ok(self.html.to_string())
        }

        async fn attr_values(&self, _selector: &str, _attr: &str) -> Result<Vec<String>> {
            Ok(Vec::new())
        }

        async fn is_visible(&self, _selector: &str) -> Result<bool> {
            Ok(false)
        }

        async fn click(&self, _selector: &str) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn browser_fetcher_hands_back_the_rendered_dom() {
        let fetcher = BrowserFetcher::new(StubPage {
            html: "<h1 class='title-ficha'>Producto</h1>",
            reachable: true,
        });
        let body = fetcher
            .fetch(
                "https://www.farmaciacatedral.com.py/producto/66/x",
                "h1.title-ficha",
                Duration::from_secs(5),
            )
            .await
            .unwrap();
        assert!(body.contains("Producto"));
    }

    #[tokio::test]
    async fn browser_fetcher_propagates_navigation_failure() {
        let fetcher = BrowserFetcher::new(StubPage {
            html: "",
            reachable: false,
        });
        let result = fetcher
            .fetch("https://example.com/p", "h1", Duration::from_secs(5))
            .await;
        assert!(matches!(result, Err(AppError::Navigation { .. })));
    }
}
