// src/config.rs

//! Configuration loading utilities.

use std::path::Path;

use crate::error::{AppError, Result};
use crate::models::Config;

/// Load configuration from a TOML file.
///
/// Falls back to defaults if loading fails; the result is always validated,
/// so a config that parses but makes no sense still errors out.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load_or_default(path),
        None => Config::default(),
    };
    config
        .validate()
        .map_err(|e| AppError::config(format!("invalid configuration: {e}")))?;
    Ok(config)
}
