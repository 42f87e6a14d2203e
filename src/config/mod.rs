/// Database configuration and connection management
pub mod database;

/// Server settings and catalog seed lists from config.toml
pub mod settings;

pub use settings::{AppConfig, load_default_config};
