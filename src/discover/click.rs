// src/discover/click.rs

//! Click-to-load discovery.
//!
//! The catalog appends products when a "load more" button is clicked and
//! hides the button once exhausted. A streak of consecutive checks where the
//! button is missing or hidden is the natural end; a hard click ceiling
//! guards against a button that never goes away.

use std::time::Duration;

use crate::browser::BrowserPage;
use crate::error::Result;
use crate::models::{SiteConfig, Termination};

use super::{StrategyOutcome, UrlSink};

const WAIT_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn run(
    page: &dyn BrowserPage,
    entry: &str,
    site: &SiteConfig,
    button_selector: &str,
    max_missing: u32,
    max_clicks: u32,
    pause_ms: u64,
    sink: &mut UrlSink<'_>,
) -> Result<StrategyOutcome> {
    page.navigate(entry).await?;
    page.wait_for_selector(&site.product_link_selector, WAIT_TIMEOUT)
        .await?;

    let mut missing = 0u32;
    let mut clicks = 0u32;

    while clicks < max_clicks {
        match page.attr_values(&site.product_link_selector, "href").await {
            Ok(hrefs) => {
                sink.submit(hrefs).await?;
            }
            Err(e) => log::warn!("Link harvest failed, continuing: {e}"),
        }

        // A visibility-check failure counts toward the missing streak: the
        // button being unquery-able and being gone look the same here.
        let visible = match page.is_visible(button_selector).await {
            Ok(v) => v,
            Err(e) => {
                log::debug!("Button check failed on {entry}: {e}");
                false
            }
        };

        if visible {
            missing = 0;
            // A failed click still spends a slot toward the ceiling; a button
            // that stays visible but errors forever must not stall the loop.
            if let Err(e) = page.click(button_selector).await {
                log::warn!("Click failed on {entry}: {e}");
            }
            clicks += 1;
        } else {
            missing += 1;
        }

        if missing >= max_missing {
            return Ok(StrategyOutcome {
                steps: clicks as usize,
                termination: Termination::NaturalEnd,
            });
        }

        tokio::time::sleep(Duration::from_millis(pause_ms)).await;

        if clicks > 0 && clicks % 50 == 0 {
            log::info!(
                "{entry}: {clicks} clicks, {} URLs seen so far",
                sink.seen_count()
            );
        }
    }

    Ok(StrategyOutcome {
        steps: max_clicks as usize,
        termination: Termination::CeilingHit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discover::testing::{PageStep, ScriptedPage};
    use crate::discover::DiscoveryEngine;
    use crate::models::{DiscoveryStrategy, Termination};
    use crate::sites;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn hidden_button_streak_is_a_natural_end() {
        let store = MemoryStore::new();
        let mut site = sites::punto_farma();
        site.entry_points = vec!["https://www.puntofarma.com.py/categoria/1/med".into()];
        site.discovery = DiscoveryStrategy::ClickToLoad {
            button_selector: "#btn-cargar-mas".into(),
            max_missing: 2,
            max_clicks: 100,
            pause_ms: 0,
        };

        // Two loads, then the button disappears.
        let page = ScriptedPage::new(vec![
            PageStep {
                links: vec!["/producto/10/parace".into()],
                height: 0,
                button_visible: true,
            },
            PageStep {
                links: vec!["/producto/10/parace".into(), "/producto/11/ibupro".into()],
                height: 0,
                button_visible: false,
            },
        ]);

        let client = reqwest::Client::new();
        let outcome = DiscoveryEngine::new(&site, &store)
            .discover(Some(&page), &client)
            .await
            .unwrap();

        assert_eq!(outcome.termination, Termination::NaturalEnd);
        assert_eq!(outcome.urls_inserted, 2);
        assert_eq!(store.url_count().await, 2);
    }

    #[tokio::test]
    async fn persistent_button_hits_the_click_ceiling() {
        let store = MemoryStore::new();
        let mut site = sites::punto_farma();
        site.entry_points = vec!["https://www.puntofarma.com.py/categoria/1/med".into()];
        site.discovery = DiscoveryStrategy::ClickToLoad {
            button_selector: "#btn-cargar-mas".into(),
            max_missing: 3,
            max_clicks: 4,
            pause_ms: 0,
        };

        let page = ScriptedPage::new(vec![PageStep {
            links: vec!["/producto/10/parace".into()],
            height: 0,
            button_visible: true,
        }]);

        let client = reqwest::Client::new();
        let outcome = DiscoveryEngine::new(&site, &store)
            .discover(Some(&page), &client)
            .await
            .unwrap();

        assert_eq!(outcome.termination, Termination::CeilingHit);
        assert_eq!(outcome.steps, 4);
    }

    #[tokio::test]
    async fn erroring_button_still_hits_the_click_ceiling() {
        let store = MemoryStore::new();
        let mut site = sites::punto_farma();
        site.entry_points = vec!["https://www.puntofarma.com.py/categoria/1/med".into()];
        site.discovery = DiscoveryStrategy::ClickToLoad {
            button_selector: "#btn-cargar-mas".into(),
            max_missing: 3,
            max_clicks: 5,
            pause_ms: 0,
        };

        // The button stays visible but every click errors out.
        let mut page = ScriptedPage::new(vec![PageStep {
            links: vec!["/producto/10/parace".into()],
            height: 0,
            button_visible: true,
        }]);
        page.fail_click = true;

        let client = reqwest::Client::new();
        let outcome = DiscoveryEngine::new(&site, &store)
            .discover(Some(&page), &client)
            .await
            .unwrap();

        assert_eq!(outcome.termination, Termination::CeilingHit);
        assert_eq!(outcome.steps, 5);
        assert_eq!(outcome.urls_inserted, 1);
    }
}
