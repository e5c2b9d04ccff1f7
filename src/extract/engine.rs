// src/extract/engine.rs

//! Fallback-chain extraction engine.
//!
//! Pure with respect to its inputs (page content, URL, rule table): no I/O,
//! so it can be unit-tested against captured HTML fixtures.

use regex::Regex;
use scraper::{ElementRef, Html};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{
    BankOfferRules, CategoryRules, Pharmacy, PrescriptionRule, Product, RuleSource, SiteRules,
};

use super::price;
use super::sources;

/// Extract a canonical product record from one rendered page.
///
/// Every optional field tolerates missing sources; only an unresolvable
/// `product_name` fails the extraction, since a nameless record is not
/// actionable.
pub fn extract_product(
    html: &str,
    url: &str,
    pharmacy: Pharmacy,
    rules: &SiteRules,
) -> Result<Product> {
    let doc = Html::parse_document(html);
    let json_ld = sources::json_ld(&doc);

    let product_name = resolve_chain(&doc, json_ld.as_ref(), &rules.fields.product_name)?
        .ok_or_else(|| AppError::extraction(url, "product_name unresolved by any rule"))?;

    let mut product = Product::new(pharmacy, product_name, url.to_string());

    product.site_code = resolve_chain(&doc, json_ld.as_ref(), &rules.fields.site_code)?;
    product.barcode = resolve_chain(&doc, json_ld.as_ref(), &rules.fields.barcode)?;
    product.brand = resolve_chain(&doc, json_ld.as_ref(), &rules.fields.brand)?;
    product.product_description =
        resolve_chain(&doc, json_ld.as_ref(), &rules.fields.product_description)?;

    if let Some(split) = &rules.code_split {
        apply_code_split(&doc, &split.selector, &split.separator, &mut product)?;
    }

    let current = resolve_chain(&doc, json_ld.as_ref(), &rules.fields.current_price)?
        .and_then(|s| price::parse_guarani(&s));
    let original = resolve_chain(&doc, json_ld.as_ref(), &rules.fields.original_price)?
        .and_then(|s| price::parse_guarani(&s));
    let badge = resolve_chain(&doc, json_ld.as_ref(), &rules.fields.discount_percentage)?
        .and_then(|s| price::parse_percent(&s));
    apply_pricing(&mut product, current, original, badge);

    let (path, main) = resolve_category(&doc, json_ld.as_ref(), &rules.category)?;
    product.category_path = path;
    product.main_category = main;

    if let Some(rule) = &rules.prescription {
        apply_prescription(&doc, rule, &mut product)?;
    }

    if let Some(offer) = &rules.bank_offer {
        apply_bank_offer(&doc, offer, &mut product)?;
    }

    product.image_url = resolve_chain(&doc, json_ld.as_ref(), &rules.fields.image_url)?
        .and_then(|raw| normalize_image_url(&raw));
    product.image_urls = product.image_url.iter().cloned().collect();

    Ok(product)
}

/// Evaluate a fallback chain; the first rule yielding a non-empty value wins.
fn resolve_chain(
    doc: &Html,
    json_ld: Option<&Value>,
    chain: &[RuleSource],
) -> Result<Option<String>> {
    for rule in chain {
        if let Some(value) = resolve_rule(doc, json_ld, rule)? {
            return Ok(Some(value));
        }
    }
    Ok(None)
}

fn resolve_rule(doc: &Html, json_ld: Option<&Value>, rule: &RuleSource) -> Result<Option<String>> {
    match rule {
        RuleSource::JsonLd { pointer } => {
            Ok(json_ld.and_then(|value| sources::pointer_string(value, pointer)))
        }
        RuleSource::EmbeddedJson {
            carrier,
            attr,
            pointer,
        } => Ok(sources::embedded_json(doc, carrier, attr)?
            .and_then(|value| sources::pointer_string(&value, pointer))),
        RuleSource::Microdata { itemprop } => {
            Ok(sources::microdata_text(doc, itemprop)?.filter(|s| !s.is_empty()))
        }
        RuleSource::Css {
            selector,
            attr,
            pattern,
        } => {
            let sel = sources::parse_selector(selector)?;
            let Some(element) = doc.select(&sel).next() else {
                return Ok(None);
            };
            let raw = element_value(element, attr.as_deref());
            Ok(apply_pattern(&raw, pattern.as_deref())?)
        }
    }
}

/// Element text (whitespace-normalized) or one of its attributes.
fn element_value(element: ElementRef<'_>, attr: Option<&str>) -> String {
    match attr {
        Some(name) => element.value().attr(name).unwrap_or("").trim().to_string(),
        None => element
            .text()
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" "),
    }
}

/// Post-filter a raw value through an optional capture regex.
fn apply_pattern(raw: &str, pattern: Option<&str>) -> Result<Option<String>> {
    if raw.is_empty() {
        return Ok(None);
    }
    let Some(pattern) = pattern else {
        return Ok(Some(raw.to_string()));
    };
    let re = Regex::new(pattern)
        .map_err(|e| AppError::config(format!("invalid rule pattern '{pattern}': {e}")))?;
    Ok(re.captures(raw).and_then(|caps| {
        caps.get(1)
            .or_else(|| caps.get(0))
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty())
    }))
}

/// Normalize prices and enforce the discount invariant: with both prices and
/// no explicit badge, `percentage = round2(100 * (original - current) / original)`.
/// A badge value wins over the derived one when present.
fn apply_pricing(
    product: &mut Product,
    current: Option<f64>,
    original: Option<f64>,
    badge: Option<f64>,
) {
    let (mut current, mut original) = (current, original);

    // Sites render undiscounted products with only the list price.
    if current.is_none() && original.is_some() {
        current = original.take();
    }

    product.current_price = current;
    product.original_price = original;
    product.discount_percentage = badge;

    if let (Some(now), Some(before)) = (current, original) {
        if before > 0.0 {
            let amount = before - now;
            product.discount_amount = Some(amount);
            if product.discount_percentage.is_none() {
                product.discount_percentage = Some(price::round2(100.0 * amount / before));
            }
        }
    }
}

fn apply_code_split(
    doc: &Html,
    selector: &str,
    separator: &str,
    product: &mut Product,
) -> Result<()> {
    let sel = sources::parse_selector(selector)?;
    let Some(element) = doc.select(&sel).next() else {
        return Ok(());
    };
    let text = element_value(element, None);
    if text.is_empty() {
        return Ok(());
    }

    match text.split_once(separator) {
        Some((code, barcode)) if !code.trim().is_empty() && !barcode.trim().is_empty() => {
            product.site_code = Some(code.trim().to_string());
            product.barcode = Some(barcode.trim().to_string());
        }
        _ => {
            if product.site_code.is_none() {
                product.site_code = Some(text);
            }
        }
    }
    Ok(())
}

fn resolve_category(
    doc: &Html,
    json_ld: Option<&Value>,
    rules: &CategoryRules,
) -> Result<(Vec<String>, Option<String>)> {
    let mut path = Vec::new();

    if let Some(selector) = &rules.breadcrumb_selector {
        let sel = sources::parse_selector(selector)?;
        for element in doc.select(&sel) {
            let crumb = element_value(element, None);
            if !crumb.is_empty() && !rules.home_tokens.iter().any(|t| t == &crumb) {
                path.push(crumb);
            }
        }
    }

    if path.is_empty() {
        if let Some(joined) = resolve_chain(doc, json_ld, &rules.path_chain)? {
            path = joined
                .split(&rules.separator)
                .map(|part| part.trim().to_string())
                .filter(|part| !part.is_empty() && !rules.home_tokens.iter().any(|t| t == part))
                .collect();
        }
    }

    let main = path.first().cloned();
    Ok((path, main))
}

fn apply_prescription(doc: &Html, rule: &PrescriptionRule, product: &mut Product) -> Result<()> {
    match rule {
        PrescriptionRule::BadgeFreeToken {
            selector,
            free_token,
        } => {
            let sel = sources::parse_selector(selector)?;
            if let Some(element) = doc.select(&sel).next() {
                let text = element_value(element, None);
                if !text.is_empty() {
                    product.requires_prescription =
                        !text.to_lowercase().contains(&free_token.to_lowercase());
                    product.prescription_type = Some(text);
                }
            }
        }
        PrescriptionRule::AlertKeyword {
            selector,
            keyword,
            label,
        } => {
            let sel = sources::parse_selector(selector)?;
            if let Some(element) = doc.select(&sel).next() {
                let text = element_value(element, None).to_lowercase();
                if text.contains(&keyword.to_lowercase()) {
                    product.requires_prescription = true;
                    product.prescription_type = Some(label.clone());
                }
            }
        }
    }
    Ok(())
}

fn apply_bank_offer(doc: &Html, rules: &BankOfferRules, product: &mut Product) -> Result<()> {
    // The name element is found by pattern, not position: the block shares
    // its tag with unrelated headings.
    let name_sel = sources::parse_selector(&rules.name_selector)?;
    let mut bank = None;
    for element in doc.select(&name_sel) {
        let raw = element_value(element, rules.name_attr.as_deref());
        if let Some(name) = apply_pattern(&raw, rules.name_pattern.as_deref())? {
            bank = Some(name);
            break;
        }
    }

    // Percent lines and amount lines share the same list markup; a line
    // carrying a `%` is never read as an amount.
    let price = match &rules.price_selector {
        Some(selector) => {
            let sel = sources::parse_selector(selector)?;
            doc.select(&sel)
                .map(|el| element_value(el, None))
                .filter(|text| !text.contains('%'))
                .find_map(|text| price::parse_guarani(&text))
        }
        None => None,
    };

    let percent = match &rules.percent_selector {
        Some(selector) => {
            let sel = sources::parse_selector(selector)?;
            doc.select(&sel)
                .find_map(|el| price::parse_percent(&element_value(el, None)))
        }
        None => None,
    };

    product.bank_discount_price = price;
    product.bank_discount_bank_name = bank.clone();
    product.bank_payment_offers = match (bank, percent) {
        (Some(bank), Some(percent)) => {
            Some(format!("{}% descuento con {bank}", fmt_percent(percent)))
        }
        (Some(bank), None) => Some(format!("Descuento exclusivo con {bank}")),
        (None, Some(percent)) => Some(format!("{}% descuento", fmt_percent(percent))),
        (None, None) => None,
    };
    Ok(())
}

fn fmt_percent(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Keep absolute URLs, upgrade protocol-relative ones, drop the rest.
fn normalize_image_url(raw: &str) -> Option<String> {
    if raw.starts_with("http://") || raw.starts_with("https://") {
        Some(raw.to_string())
    } else if let Some(rest) = raw.strip_prefix("//") {
        Some(format!("https://{rest}"))
    } else {
        None
    }
}
