// src/utils/url.rs

//! URL manipulation utilities.

use regex::Regex;
use url::Url;

use crate::error::{AppError, Result};

/// Resolve a potentially relative URL against a base URL.
///
/// # Examples
/// ```
/// use pharmacrawl::utils::url::resolve;
///
/// assert_eq!(
///     resolve("https://example.com", "/producto/66/enterogermina"),
///     "https://example.com/producto/66/enterogermina"
/// );
/// ```
pub fn resolve(base: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }

    match Url::parse(base).and_then(|b| b.join(href)) {
        Ok(joined) => joined.into(),
        // Unparseable bases are caught by config validation; this keeps the
        // harvest loop infallible.
        Err(_) => format!(
            "{}/{}",
            base.trim_end_matches('/'),
            href.trim_start_matches('/')
        ),
    }
}

/// Pull a site code out of a product URL using a site-specific capture regex
/// (e.g. `/producto/(\d+)/` or `/catalogo/(\d+)-`).
pub fn site_code_from_url(pattern: &str, url: &str) -> Result<Option<String>> {
    let re = Regex::new(pattern)
        .map_err(|e| AppError::config(format!("invalid site_code_pattern '{pattern}': {e}")))?;
    Ok(re
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string()))
}
