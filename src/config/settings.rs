//! Application settings loaded from `config.toml`.
//!
//! The file configures the HTTP server and lists the tags and ingredients the
//! catalog is seeded with on startup. Every section is optional; a missing file
//! yields [`AppConfig::default`].

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, warn};

/// Environment variable naming an alternative config file.
pub const CONFIG_PATH_VAR: &str = "RECIPE_BOX_CONFIG";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server settings
    pub server: ServerConfig,
    /// Tags to seed
    pub tags: Vec<TagConfig>,
    /// Ingredients to seed
    pub ingredients: Vec<IngredientConfig>,
}

/// HTTP server settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind, e.g. `0.0.0.0:8000`
    pub address: String,
    /// Page size used when a request does not pass `limit`
    pub page_size: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0:8000".to_string(),
            page_size: 6,
        }
    }
}

/// A tag to seed into the catalog
#[derive(Debug, Clone, Deserialize)]
pub struct TagConfig {
    /// Display name
    pub name: String,
    /// Hex color, `#RRGGBB`
    pub color: Option<String>,
    /// URL-safe slug
    pub slug: String,
}

/// An ingredient to seed into the catalog
#[derive(Debug, Clone, Deserialize)]
pub struct IngredientConfig {
    /// Display name
    pub name: String,
    /// Measurement unit
    pub measurement_unit: String,
}

/// Loads configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - A field has the wrong type
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    debug!("Loading configuration from {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {path_ref:?}: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {path_ref:?}: {e}"),
    })
}

/// Loads configuration from `$RECIPE_BOX_CONFIG` or `./config.toml`.
///
/// A missing file is not an error: defaults are used and a warning is logged.
pub fn load_default_config() -> Result<AppConfig> {
    let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| "config.toml".to_string());
    if !Path::new(&path).exists() {
        warn!("Config file {path} not found, using defaults");
        return Ok(AppConfig::default());
    }
    load_config(path)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r##"
            [server]
            address = "127.0.0.1:9000"
            page_size = 10

            [[tags]]
            name = "Breakfast"
            color = "#E26C2D"
            slug = "breakfast"

            [[tags]]
            name = "Dinner"
            slug = "dinner"

            [[ingredients]]
            name = "Salt"
            measurement_unit = "g"
        "##;

        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.address, "127.0.0.1:9000");
        assert_eq!(config.server.page_size, 10);
        assert_eq!(config.tags.len(), 2);
        assert_eq!(config.tags[0].color.as_deref(), Some("#E26C2D"));
        assert!(config.tags[1].color.is_none());
        assert_eq!(config.ingredients[0].measurement_unit, "g");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.page_size, 6);
        assert!(config.tags.is_empty());
        assert!(config.ingredients.is_empty());
    }

    #[test]
    fn test_load_config_missing_file_is_config_error() {
        let result = load_config("definitely/not/here.toml");
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
