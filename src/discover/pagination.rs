// src/discover/pagination.rs

//! Numbered-pagination discovery over plain HTTP.
//!
//! Follows the "next page" link until it disappears. A next link that points
//! back at the current page is treated as the end rather than looped on, and
//! a page ceiling bounds catalogs whose pagination widget misbehaves.

use scraper::Html;

use crate::error::{AppError, Result};
use crate::extract::sources::parse_selector;
use crate::models::{SiteConfig, Termination};
use crate::utils::url::resolve;

use super::{StrategyOutcome, UrlSink};

pub async fn run(
    client: &reqwest::Client,
    entry: &str,
    site: &SiteConfig,
    next_selector: &str,
    max_pages: usize,
    sink: &mut UrlSink<'_>,
) -> Result<StrategyOutcome> {
    let link_selector = parse_selector(&site.product_link_selector)?;
    let next_sel = parse_selector(next_selector)?;

    let mut current = entry.to_string();
    let mut pages = 0usize;

    loop {
        if pages >= max_pages {
            return Ok(StrategyOutcome {
                steps: pages,
                termination: Termination::CeilingHit,
            });
        }

        let html = match fetch_page(client, &current).await {
            Ok(html) => html,
            Err(e) if pages == 0 => return Err(e),
            Err(e) => {
                // Mid-catalog fetch failure: everything up to here is already
                // flushed, but we cannot tell whether more pages exist.
                log::warn!("Stopping pagination at {current}: {e}");
                return Ok(StrategyOutcome {
                    steps: pages,
                    termination: Termination::CeilingHit,
                });
            }
        };
        pages += 1;

        // Html is not Send; keep it scoped away from the await below.
        let (hrefs, next) = {
            let doc = Html::parse_document(&html);
            let hrefs: Vec<String> = doc
                .select(&link_selector)
                .filter_map(|el| el.value().attr("href"))
                .map(str::to_string)
                .collect();
            let next = doc
                .select(&next_sel)
                .filter_map(|el| el.value().attr("href"))
                .map(|href| resolve(&site.base_url, href))
                .next();
            (hrefs, next)
        };

        sink.submit(hrefs).await?;
        log::debug!("{current}: page {pages}, {} URLs seen", sink.seen_count());

        match next {
            None => {
                return Ok(StrategyOutcome {
                    steps: pages,
                    termination: Termination::NaturalEnd,
                });
            }
            Some(next_url) if next_url == current => {
                log::debug!("Next link points at the current page, stopping at {current}");
                return Ok(StrategyOutcome {
                    steps: pages,
                    termination: Termination::NaturalEnd,
                });
            }
            Some(next_url) => current = next_url,
        }
    }
}

async fn fetch_page(client: &reqwest::Client, url: &str) -> Result<String> {
    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(AppError::navigation(
            url,
            format!("HTTP {}", response.status()),
        ));
    }
    Ok(response.text().await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn next_from(html: &str, selector: &str, base: &str) -> Option<String> {
        let doc = Html::parse_document(html);
        let sel = parse_selector(selector).unwrap();
        doc.select(&sel)
            .filter_map(|el| el.value().attr("href"))
            .map(|href| resolve(base, href))
            .next()
    }

    #[test]
    fn next_link_resolves_relative_hrefs() {
        let html = r#"<nav><a class="next page-numbers" href="/productos/page/2/">→</a></nav>"#;
        assert_eq!(
            next_from(html, "a.next.page-numbers", "https://www.farmaoliva.com.py"),
            Some("https://www.farmaoliva.com.py/productos/page/2/".into())
        );
    }

    #[test]
    fn missing_next_link_means_last_page() {
        let html = r#"<nav><span class="page-numbers current">7</span></nav>"#;
        assert_eq!(
            next_from(html, "a.next.page-numbers", "https://www.farmaoliva.com.py"),
            None
        );
    }
}
