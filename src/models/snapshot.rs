// src/models/snapshot.rs

//! Unconditional daily price observations.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::product::{Pharmacy, Product};

/// One price observation per (pharmacy, barcode, calendar date).
///
/// Written unconditionally by the daily tracker, unlike the change-triggered
/// price history the store may derive from catalog upserts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub pharmacy_source: Pharmacy,
    pub barcode: String,
    pub snapshot_date: NaiveDate,
    pub site_code: Option<String>,
    pub product_name: Option<String>,
    pub current_price: Option<f64>,
    pub original_price: Option<f64>,
    pub discount_percentage: Option<f64>,
    pub product_url: String,
    pub recorded_at: DateTime<Utc>,
}

impl PriceSnapshot {
    /// Build a snapshot from an extracted product. Returns `None` when the
    /// product has no barcode, since the snapshot table keys on it.
    pub fn from_product(product: &Product, date: NaiveDate) -> Option<Self> {
        let barcode = product.barcode.clone()?;
        Some(Self {
            pharmacy_source: product.pharmacy_source,
            barcode,
            snapshot_date: date,
            site_code: product.site_code.clone(),
            product_name: Some(product.product_name.clone()),
            current_price: product.current_price,
            original_price: product.original_price,
            discount_percentage: product.discount_percentage,
            product_url: product.product_url.clone(),
            recorded_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_requires_barcode() {
        let mut product = Product::new(
            Pharmacy::PuntoFarma,
            "Ibuprofeno 400".into(),
            "https://example.com/producto/1/ibuprofeno".into(),
        );
        let today = NaiveDate::from_ymd_opt(2026, 8, 29).unwrap();
        assert!(PriceSnapshot::from_product(&product, today).is_none());

        product.barcode = Some("7840036005616".into());
        product.current_price = Some(25_000.0);
        let snapshot = PriceSnapshot::from_product(&product, today).unwrap();
        assert_eq!(snapshot.barcode, "7840036005616");
        assert_eq!(snapshot.current_price, Some(25_000.0));
        assert_eq!(snapshot.snapshot_date, today);
    }
}
