// src/models/product.rs

//! Canonical product record and the pharmacy source enum.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Known pharmacy e-commerce sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pharmacy {
    FarmaOliva,
    PuntoFarma,
    FarmaCenter,
    FarmaciaCatedral,
}

impl Pharmacy {
    /// All known pharmacies, in default pipeline order.
    pub const ALL: [Pharmacy; 4] = [
        Pharmacy::FarmaOliva,
        Pharmacy::PuntoFarma,
        Pharmacy::FarmaCenter,
        Pharmacy::FarmaciaCatedral,
    ];

    /// Wire name used as the `pharmacy_source` value in stored records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Pharmacy::FarmaOliva => "farma_oliva",
            Pharmacy::PuntoFarma => "punto_farma",
            Pharmacy::FarmaCenter => "farma_center",
            Pharmacy::FarmaciaCatedral => "farmacia_catedral",
        }
    }
}

impl fmt::Display for Pharmacy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Pharmacy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "farma_oliva" => Ok(Pharmacy::FarmaOliva),
            "punto_farma" => Ok(Pharmacy::PuntoFarma),
            "farma_center" => Ok(Pharmacy::FarmaCenter),
            "farmacia_catedral" => Ok(Pharmacy::FarmaciaCatedral),
            other => Err(AppError::validation(format!("unknown pharmacy: {other}"))),
        }
    }
}

/// A product scraped from a pharmacy site, normalized to the common schema.
///
/// Catalog uniqueness key: (`pharmacy_source`, `site_code`). The URL is not
/// part of the key since sites regenerate slugs for the same code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub pharmacy_source: Pharmacy,

    /// Site-internal SKU, parsed from the page or the URL
    pub site_code: Option<String>,

    /// Universal barcode (GTIN/EAN)
    pub barcode: Option<String>,

    /// Display name; extraction fails without it
    pub product_name: String,

    pub brand: Option<String>,
    pub product_description: Option<String>,

    /// Breadcrumb trail, root to leaf, home tokens removed
    #[serde(default)]
    pub category_path: Vec<String>,

    /// First entry of `category_path`
    pub main_category: Option<String>,

    pub current_price: Option<f64>,

    /// Pre-discount list price; `None` when the product is not discounted
    pub original_price: Option<f64>,

    pub discount_percentage: Option<f64>,
    pub discount_amount: Option<f64>,

    pub bank_discount_price: Option<f64>,
    pub bank_discount_bank_name: Option<String>,
    pub bank_payment_offers: Option<String>,

    pub requires_prescription: bool,
    pub prescription_type: Option<String>,

    pub image_url: Option<String>,
    #[serde(default)]
    pub image_urls: Vec<String>,

    pub product_url: String,

    /// Set by the store at write time
    pub scraped_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Create an empty record for a page; extraction fills the rest in.
    pub fn new(pharmacy: Pharmacy, product_name: String, product_url: String) -> Self {
        Self {
            pharmacy_source: pharmacy,
            site_code: None,
            barcode: None,
            product_name,
            brand: None,
            product_description: None,
            category_path: Vec::new(),
            main_category: None,
            current_price: None,
            original_price: None,
            discount_percentage: None,
            discount_amount: None,
            bank_discount_price: None,
            bank_discount_bank_name: None,
            bank_payment_offers: None,
            requires_prescription: false,
            prescription_type: None,
            image_url: None,
            image_urls: Vec::new(),
            product_url,
            scraped_at: None,
        }
    }

    /// Key the catalog table deduplicates on. Falls back to the URL when the
    /// site never exposed a code, so such rows still upsert rather than pile up.
    pub fn catalog_key(&self) -> (Pharmacy, String) {
        let code = self
            .site_code
            .clone()
            .unwrap_or_else(|| self.product_url.clone());
        (self.pharmacy_source, code)
    }
}
