//! Application settings.
//!
//! Settings come from two places: an optional TOML file (`plants_hub.toml` by default, or the
//! path in `PLANTS_HUB_CONFIG`) and environment variables, which always win. Secrets are only
//! ever read from the environment.

use crate::{
    config::database::normalize_database_url,
    errors::{Error, Result},
    images::{DEFAULT_FOLDER, ProviderCredentials, ProviderKind},
};
use serde::Deserialize;
use std::{net::SocketAddr, path::Path, time::Duration};
use tracing::{debug, info, warn};

/// Config file read when `PLANTS_HUB_CONFIG` is not set.
pub const DEFAULT_CONFIG_PATH: &str = "plants_hub.toml";
/// Port used when neither `BIND_ADDR` nor `PORT` is set.
pub const DEFAULT_PORT: u16 = 5000;
/// Default per-request timeout for image host calls.
pub const DEFAULT_UPLOAD_TIMEOUT_SECS: u64 = 30;
/// Default request body limit (16 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Contents of the optional TOML config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// HTTP server settings
    pub server: ServerSection,
    /// Image host settings (never credentials)
    pub images: ImagesSection,
    /// Products inserted into an empty catalog at startup
    pub seed_products: Vec<SeedProduct>,
}

/// `[server]` table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Listen address, e.g. `127.0.0.1:8080`
    pub bind_addr: Option<String>,
    /// Maximum request body size in bytes
    pub max_upload_bytes: Option<usize>,
}

/// `[images]` table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ImagesSection {
    /// `imagekit` or `cloudinary`
    pub provider: Option<String>,
    /// Folder product images are stored under
    pub folder: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
    /// Override for the upload API host
    pub upload_base: Option<String>,
    /// Override for the management API host
    pub api_base: Option<String>,
}

/// A sample product from the `[[seed_products]]` array.
///
/// Values go through the same validation as form input, so they are kept as strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SeedProduct {
    /// Product name
    pub name: String,
    /// Decimal price, e.g. `"165.00"`
    pub price: String,
    /// Optional description
    pub description: Option<String>,
    /// Category value, e.g. `ceramic_pot`
    pub category: Option<String>,
    /// Stock on hand
    pub quantity: u32,
    /// Local image file name under `/static/images`
    pub image: Option<String>,
}

/// Resolved image host settings.
#[derive(Debug, Clone)]
pub struct ImageSettings {
    /// Provider wired into the gateway
    pub provider: ProviderKind,
    /// Credentials for that provider
    pub credentials: ProviderCredentials,
    /// Folder product images go to
    pub folder: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Upload API host override
    pub upload_base: Option<String>,
    /// Management API host override
    pub api_base: Option<String>,
}

/// Fully resolved application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Listen address
    pub bind_addr: SocketAddr,
    /// Normalised database connection string
    pub database_url: String,
    /// Maximum request body size in bytes
    pub max_upload_bytes: usize,
    /// Image host settings
    pub images: ImageSettings,
    /// Sample products for an empty catalog
    pub seed_products: Vec<SeedProduct>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| Error::Config {
        message: format!("{name} must be a non-negative integer, got '{value}'"),
    })
}

/// Parses a TOML config document.
///
/// # Errors
/// Returns [`Error::Config`] if the document is not valid TOML or has the wrong shape.
pub fn parse_file_config(contents: &str) -> Result<FileConfig> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config file: {e}"),
    })
}

/// Reads the config file at `path`.
///
/// # Errors
/// Returns [`Error::Config`] if the file cannot be read or parsed.
pub fn load_file_config<P: AsRef<Path>>(path: P) -> Result<FileConfig> {
    let path = path.as_ref();
    debug!("Loading configuration from {}", path.display());
    let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path.display()),
    })?;
    parse_file_config(&contents)
}

impl ImageSettings {
    fn resolve(section: ImagesSection, env: &impl Fn(&str) -> Option<String>) -> Result<Self> {
        let provider = match non_blank(env("IMAGE_PROVIDER")).or(non_blank(section.provider)) {
            Some(name) => name.parse()?,
            None => ProviderKind::ImageKit,
        };

        let (public, private, endpoint) = match provider {
            ProviderKind::ImageKit => (
                "IMAGEKIT_PUBLIC_KEY",
                "IMAGEKIT_PRIVATE_KEY",
                "IMAGEKIT_URL_ENDPOINT",
            ),
            ProviderKind::Cloudinary => (
                "CLOUDINARY_API_KEY",
                "CLOUDINARY_API_SECRET",
                "CLOUDINARY_CLOUD_NAME",
            ),
        };
        let credentials = ProviderCredentials {
            public_key: non_blank(env(public)),
            private_key: non_blank(env(private)),
            endpoint: non_blank(env(endpoint)),
        };

        let timeout_secs = match non_blank(env("IMAGE_UPLOAD_TIMEOUT_SECS")) {
            Some(raw) => parse_number("IMAGE_UPLOAD_TIMEOUT_SECS", &raw)?,
            None => section.timeout_secs.unwrap_or(DEFAULT_UPLOAD_TIMEOUT_SECS),
        };

        Ok(Self {
            provider,
            credentials,
            folder: non_blank(section.folder).unwrap_or_else(|| DEFAULT_FOLDER.to_string()),
            timeout: Duration::from_secs(timeout_secs),
            upload_base: non_blank(section.upload_base),
            api_base: non_blank(section.api_base),
        })
    }
}

/// `SECRET_KEY` (or the legacy `FLASK_SECRET_KEY`) is recognised so deployments keep one
/// configured, but there is no session or cookie state that consumes it.
fn secret_key_missing(env: &impl Fn(&str) -> Option<String>) -> bool {
    non_blank(env("SECRET_KEY"))
        .or_else(|| non_blank(env("FLASK_SECRET_KEY")))
        .is_none()
}

impl AppConfig {
    /// Combines the file config with environment variables looked up through `env`.
    ///
    /// # Errors
    /// Returns [`Error::Config`] for an unknown provider, an unparseable address or a
    /// malformed number.
    pub fn resolve(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bind_addr = match (non_blank(env("BIND_ADDR")), non_blank(env("PORT"))) {
            (Some(addr), _) => addr,
            (None, Some(port)) => format!("0.0.0.0:{}", parse_number::<u16>("PORT", &port)?),
            (None, None) => non_blank(file.server.bind_addr)
                .unwrap_or_else(|| format!("0.0.0.0:{DEFAULT_PORT}")),
        };
        let bind_addr: SocketAddr = bind_addr.parse().map_err(|e| Error::Config {
            message: format!("Invalid bind address '{bind_addr}': {e}"),
        })?;

        if secret_key_missing(&env) {
            warn!("SECRET_KEY not set");
        }

        let max_upload_bytes = match non_blank(env("MAX_UPLOAD_BYTES")) {
            Some(raw) => parse_number("MAX_UPLOAD_BYTES", &raw)?,
            None => file
                .server
                .max_upload_bytes
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
        };

        Ok(Self {
            bind_addr,
            database_url: normalize_database_url(env("DATABASE_URL").as_deref()),
            max_upload_bytes,
            images: ImageSettings::resolve(file.images, &env)?,
            seed_products: file.seed_products,
        })
    }
}

/// Loads the configuration from the config file and the process environment.
///
/// A missing default config file is not an error; a missing file named explicitly through
/// `PLANTS_HUB_CONFIG` is.
///
/// # Errors
/// Returns [`Error::Config`] if the file cannot be parsed or a value is invalid.
pub fn load_app_config() -> Result<AppConfig> {
    let file = match non_blank(std::env::var("PLANTS_HUB_CONFIG").ok()) {
        Some(path) => load_file_config(path)?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => load_file_config(DEFAULT_CONFIG_PATH)?,
        None => {
            debug!("No {DEFAULT_CONFIG_PATH} found; using defaults");
            FileConfig::default()
        }
    };

    let config = AppConfig::resolve(file, |key| std::env::var(key).ok())?;
    info!(
        bind_addr = %config.bind_addr,
        provider = %config.images.provider,
        seed_products = config.seed_products.len(),
        "Configuration loaded"
    );
    Ok(config)
}
