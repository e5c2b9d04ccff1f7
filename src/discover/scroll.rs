// src/discover/scroll.rs

//! Infinite-scroll discovery.
//!
//! Scrolls to the bottom repeatedly and watches `document.body.scrollHeight`.
//! The page has no "last page" marker, so termination is dual-bound: a streak
//! of unchanged heights is the natural end, and a hard scroll ceiling guards
//! against pages that keep growing (or lie about their height) forever.

use std::time::Duration;

use crate::browser::{BrowserPage, SCROLL_HEIGHT, SCROLL_TO_BOTTOM};
use crate::error::Result;
use crate::models::{SiteConfig, Termination};

use super::{StrategyOutcome, UrlSink};

const WAIT_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn run(
    page: &dyn BrowserPage,
    entry: &str,
    site: &SiteConfig,
    max_no_change: u32,
    max_scrolls: u32,
    pause_ms: u64,
    sink: &mut UrlSink<'_>,
) -> Result<StrategyOutcome> {
    page.navigate(entry).await?;
    page.wait_for_selector(&site.product_link_selector, WAIT_TIMEOUT)
        .await?;

    let mut previous_height = 0u64;
    let mut no_change = 0u32;
    let mut scrolls = 0u32;

    while scrolls < max_scrolls {
        harvest(page, site, sink).await?;

        if let Err(e) = page.evaluate(SCROLL_TO_BOTTOM).await {
            log::warn!("Scroll step failed on {entry}: {e}");
        }
        tokio::time::sleep(Duration::from_millis(pause_ms)).await;
        scrolls += 1;

        let height = match page.evaluate(SCROLL_HEIGHT).await {
            Ok(value) => value.as_u64().unwrap_or(previous_height),
            Err(e) => {
                log::warn!("Could not read page height on {entry}: {e}");
                previous_height
            }
        };

        if height == previous_height {
            no_change += 1;
            if no_change >= max_no_change {
                harvest(page, site, sink).await?;
                return Ok(StrategyOutcome {
                    steps: scrolls as usize,
                    termination: Termination::NaturalEnd,
                });
            }
        } else {
            no_change = 0;
            previous_height = height;
        }

        if scrolls % 50 == 0 {
            log::info!(
                "{entry}: {scrolls} scrolls, {} URLs seen so far",
                sink.seen_count()
            );
        }
    }

    harvest(page, site, sink).await?;
    Ok(StrategyOutcome {
        steps: max_scrolls as usize,
        termination: Termination::CeilingHit,
    })
}

/// Collect the currently rendered product links. Harvest failures are
/// logged and skipped so a transient DOM error never aborts the scroll.
async fn harvest(page: &dyn BrowserPage, site: &SiteConfig, sink: &mut UrlSink<'_>) -> Result<()> {
    match page.attr_values(&site.product_link_selector, "href").await {
        Ok(hrefs) => {
            let counts = sink.submit(hrefs).await?;
            if counts.new_in_run > 0 {
                log::debug!("Harvested {} new URLs", counts.new_in_run);
            }
        }
        Err(e) => log::warn!("Link harvest failed, continuing: {e}"),
    }
    Ok(())
}
