// src/extract/mod.rs

//! Extraction phase: rendered page content in, canonical product record out.

pub mod engine;
pub mod price;
pub mod sources;

pub use engine::extract_product;
