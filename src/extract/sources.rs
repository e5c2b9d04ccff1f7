// src/extract/sources.rs

//! Structured-data readers: JSON-LD, embedded JSON payloads, microdata.
//!
//! Pharmacy sites inconsistently duplicate product data between a
//! machine-readable blob and the rendered HTML; either can be absent or
//! stale, so these only ever feed a fallback chain.

use scraper::{Html, Selector};
use serde_json::Value;

use crate::error::{AppError, Result};

/// Parse a CSS selector, mapping the error into the crate's error type.
pub fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

/// First `<script type="application/ld+json">` blob that parses as JSON.
pub fn json_ld(doc: &Html) -> Option<Value> {
    let sel = Selector::parse(r#"script[type="application/ld+json"]"#).ok()?;
    for script in doc.select(&sel) {
        let raw: String = script.text().collect();
        if let Ok(value) = serde_json::from_str::<Value>(raw.trim()) {
            return Some(value);
        }
    }
    None
}

/// JSON payload hidden in an element attribute (e.g. Farmacia Center's
/// `<input class="json" type="hidden" value="...">`).
pub fn embedded_json(doc: &Html, carrier: &str, attr: &str) -> Result<Option<Value>> {
    let sel = parse_selector(carrier)?;
    let Some(element) = doc.select(&sel).next() else {
        return Ok(None);
    };
    let Some(raw) = element.value().attr(attr) else {
        return Ok(None);
    };
    // The attribute is HTML-escaped JSON; the parser already unescaped it.
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            log::warn!("Failed to parse embedded JSON from {carrier}: {e}");
            Ok(None)
        }
    }
}

/// schema.org microdata lookup by `itemprop` name.
pub fn microdata_text(doc: &Html, itemprop: &str) -> Result<Option<String>> {
    let sel = parse_selector(&format!(r#"[itemprop="{itemprop}"]"#))?;
    Ok(doc.select(&sel).next().map(|el| {
        el.text()
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }))
}

/// Stringify a JSON value reached by pointer: strings verbatim, numbers via
/// display, everything else is treated as missing.
pub fn pointer_string(value: &Value, pointer: &str) -> Option<String> {
    match value.pointer(pointer)? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_ld_picks_first_parseable_blob() {
        let html = Html::parse_document(
            r#"<html><head>
            <script type="application/ld+json">not json</script>
            <script type="application/ld+json">{"name":"Enterogermina","sku":"66"}</script>
            </head><body></body></html>"#,
        );
        let value = json_ld(&html).unwrap();
        assert_eq!(pointer_string(&value, "/name").unwrap(), "Enterogermina");
        assert_eq!(pointer_string(&value, "/sku").unwrap(), "66");
    }

    #[test]
    fn embedded_json_reads_attribute() {
        let html = Html::parse_document(
            r#"<input class="json" type="hidden"
                value='{"producto":{"nombre":"Ensure Advance","marca":"ABBOTT"}}'>"#,
        );
        let value = embedded_json(&html, "input.json[type=\"hidden\"]", "value")
            .unwrap()
            .unwrap();
        assert_eq!(
            pointer_string(&value, "/producto/nombre").unwrap(),
            "Ensure Advance"
        );
    }

    #[test]
    fn microdata_lookup() {
        let html = Html::parse_document(
            r#"<div itemtype="http://schema.org/Product">
                <span itemprop="sku">1002677810026778</span>
            </div>"#,
        );
        assert_eq!(
            microdata_text(&html, "sku").unwrap().unwrap(),
            "1002677810026778"
        );
        assert!(microdata_text(&html, "brand").unwrap().is_none());
    }

    #[test]
    fn pointer_string_handles_numbers() {
        let value: Value = serde_json::from_str(r#"{"offers":{"price":74950}}"#).unwrap();
        assert_eq!(pointer_string(&value, "/offers/price").unwrap(), "74950");
        assert!(pointer_string(&value, "/offers/missing").is_none());
    }
}
