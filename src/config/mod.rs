/// Database connection, schema creation and legacy migration
pub mod database;

/// Settings from `plants_hub.toml` and environment variables
pub mod settings;

pub use settings::{AppConfig, FileConfig, ImageSettings, SeedProduct, load_app_config};
