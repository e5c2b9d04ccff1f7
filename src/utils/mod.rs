// src/utils/mod.rs

//! Shared utilities.

pub mod http;
pub mod url;

pub use url::resolve;
