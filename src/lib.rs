// src/lib.rs

//! Pharmacy catalog crawler library.
//!
//! Two-phase pipeline: discovery enumerates product URLs per site, extraction
//! turns rendered product pages into canonical [`models::Product`] records.

pub mod browser;
pub mod config;
pub mod discover;
pub mod error;
pub mod extract;
pub mod models;
pub mod pipeline;
pub mod sites;
pub mod store;
pub mod utils;
