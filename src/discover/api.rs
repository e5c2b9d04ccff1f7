// src/discover/api.rs

//! Discovery against a site's internal pagination endpoint.
//!
//! Much faster than driving a browser: one HTTP request per page, product
//! links harvested by regex from the raw response body (HTML fragment or
//! JSON alike). When the first response carries a total item count, the page
//! count is computed up front; otherwise pages are walked until one yields
//! nothing new, bounded by a hard page ceiling.

use regex::Regex;

use crate::error::{AppError, Result};
use crate::models::{ApiMethod, ApiPagination, Termination};

use super::{StrategyOutcome, UrlSink};

pub async fn run(
    client: &reqwest::Client,
    entry: &str,
    api: &ApiPagination,
    sink: &mut UrlSink<'_>,
) -> Result<StrategyOutcome> {
    let link_re = Regex::new(&api.link_pattern)
        .map_err(|e| AppError::config(format!("bad link_pattern: {e}")))?;
    let total_re = match &api.total_pattern {
        Some(pattern) => Some(
            Regex::new(pattern).map_err(|e| AppError::config(format!("bad total_pattern: {e}")))?,
        ),
        None => None,
    };

    // The endpoint template may reference the entry point it was reached from.
    let endpoint = api.endpoint.replace("{entry}", entry);

    // First page failure means the endpoint itself is broken; propagate.
    let first = fetch_api_page(client, api, &endpoint, 1).await?;
    sink.submit(harvest(&link_re, &first)).await?;
    let mut pages = 1usize;

    let total_pages = total_re
        .as_ref()
        .and_then(|re| capture_total(re, &first))
        .map(|total| pages_for(total, api.page_size));

    match total_pages {
        Some(count) => {
            log::info!("{endpoint}: {count} pages announced by the endpoint");
            for page in 2..=count {
                match fetch_api_page(client, api, &endpoint, page).await {
                    Ok(body) => {
                        sink.submit(harvest(&link_re, &body)).await?;
                    }
                    Err(e) => log::warn!("Page {page} failed, skipping: {e}"),
                }
                pages += 1;
            }
            Ok(StrategyOutcome {
                steps: pages,
                termination: Termination::NaturalEnd,
            })
        }
        None => {
            // No announced total: walk until a page adds nothing new.
            let mut page = 2usize;
            loop {
                if page > api.max_pages {
                    return Ok(StrategyOutcome {
                        steps: pages,
                        termination: Termination::CeilingHit,
                    });
                }
                let body = match fetch_api_page(client, api, &endpoint, page).await {
                    Ok(body) => body,
                    Err(e) => {
                        log::warn!("Page {page} failed, stopping walk: {e}");
                        return Ok(StrategyOutcome {
                            steps: pages,
                            termination: Termination::CeilingHit,
                        });
                    }
                };
                pages += 1;
                let counts = sink.submit(harvest(&link_re, &body)).await?;
                if counts.new_in_run == 0 {
                    return Ok(StrategyOutcome {
                        steps: pages,
                        termination: Termination::NaturalEnd,
                    });
                }
                page += 1;
            }
        }
    }
}

async fn fetch_api_page(
    client: &reqwest::Client,
    api: &ApiPagination,
    endpoint: &str,
    page: usize,
) -> Result<String> {
    let url = endpoint.replace("{page}", &page.to_string());
    let mut request = match api.method {
        ApiMethod::Get => client.get(&url),
        ApiMethod::Post => {
            let mut builder = client.post(&url);
            if let Some(template) = &api.body_template {
                builder = builder.body(template.replace("{page}", &page.to_string()));
            }
            builder
        }
    };
    for header in &api.headers {
        request = request.header(&header.name, &header.value);
    }

    let response = request.send().await?;
    if !response.status().is_success() {
        return Err(AppError::navigation(
            &url,
            format!("HTTP {}", response.status()),
        ));
    }
    Ok(response.text().await?)
}

fn harvest(link_re: &Regex, body: &str) -> Vec<String> {
    link_re
        .captures_iter(body)
        .filter_map(|caps| caps.get(caps.len().min(2) - 1))
        .map(|m| m.as_str().to_string())
        .collect()
}

fn capture_total(re: &Regex, body: &str) -> Option<usize> {
    re.captures(body)?.get(1)?.as_str().parse().ok()
}

/// Page count for a known total, rounding the last partial page up.
pub fn pages_for(total: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size)
}
