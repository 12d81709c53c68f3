//! Image upload gateway - mediates between the catalog and the external image host.
//!
//! Exactly one provider is wired in at startup (see [`ImageGateway::from_settings`]). The
//! gateway enforces the preconditions every provider shares (credentials present, non-empty
//! payload, usable identifier) so that those failures never reach the network, and converts
//! every provider failure into an [`ImageHostError`] value.

/// Cloudinary signed-upload client
pub mod cloudinary;
/// Live round-trip check of the configured provider
pub mod diagnostics;
/// ImageKit upload API client
pub mod imagekit;

use crate::{
    config::settings::ImageSettings,
    errors::{Error, Result},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, sync::Arc};
use tracing::{info, warn};

pub use cloudinary::CloudinaryProvider;
pub use diagnostics::DiagnosticsReport;
pub use imagekit::ImageKitProvider;

/// File extensions accepted for product images.
pub const ALLOWED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

/// Folder product images are stored under.
pub const DEFAULT_FOLDER: &str = "plants_hub";

/// Supported image hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// ImageKit.io
    ImageKit,
    /// Cloudinary
    Cloudinary,
}

impl ProviderKind {
    /// Lower-case name used in configuration and URLs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ImageKit => "imagekit",
            Self::Cloudinary => "cloudinary",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "imagekit" => Ok(Self::ImageKit),
            "cloudinary" => Ok(Self::Cloudinary),
            other => Err(Error::Config {
                message: format!("Unknown image provider '{other}' (expected imagekit or cloudinary)"),
            }),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three credentials every provider needs.
///
/// For ImageKit these are the public key, private key and URL endpoint; for Cloudinary the
/// API key, API secret and cloud name.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ProviderCredentials {
    /// Public key or client id
    pub public_key: Option<String>,
    /// Private key or secret
    pub private_key: Option<String>,
    /// URL endpoint or account name
    pub endpoint: Option<String>,
}

impl ProviderCredentials {
    /// True when all three values are present and non-blank.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        [&self.public_key, &self.private_key, &self.endpoint]
            .iter()
            .all(|value| value.as_deref().is_some_and(|v| !v.trim().is_empty()))
    }

    /// Credentials safe to log or return from diagnostics.
    #[must_use]
    pub fn masked(&self) -> MaskedCredentials {
        MaskedCredentials {
            public_key: mask_secret(self.public_key.as_deref()),
            private_key: mask_secret(self.private_key.as_deref()),
            endpoint: self.endpoint.clone(),
        }
    }
}

// Never print secrets, not even in debug output.
impl fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("public_key", &mask_secret(self.public_key.as_deref()))
            .field("private_key", &mask_secret(self.private_key.as_deref()))
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Redacted view of [`ProviderCredentials`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaskedCredentials {
    /// First and last three characters of the public key
    pub public_key: Option<String>,
    /// First and last three characters of the private key
    pub private_key: Option<String>,
    /// Endpoint, unmasked
    pub endpoint: Option<String>,
}

/// Keeps the first and last three characters; short values are fully hidden.
#[must_use]
pub fn mask_secret(value: Option<&str>) -> Option<String> {
    let value = value.filter(|v| !v.is_empty())?;
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 6 {
        return Some("***".to_string());
    }
    let head: String = chars[..3].iter().collect();
    let tail: String = chars[chars.len() - 3..].iter().collect();
    Some(format!("{head}***{tail}"))
}

/// An image file received from a client.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageUpload {
    /// Original (unsanitised) file name
    pub file_name: String,
    /// File contents
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Creates an upload from a received file.
    #[must_use]
    pub const fn new(file_name: String, bytes: Vec<u8>) -> Self {
        Self { file_name, bytes }
    }

    /// Whether the file name carries an allowed image extension.
    #[must_use]
    pub fn has_allowed_extension(&self) -> bool {
        is_allowed_image(&self.file_name)
    }
}

impl fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageUpload")
            .field("file_name", &self.file_name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// A stored image as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedImage {
    /// Stable public fetch URL
    pub url: String,
    /// Opaque provider id used for deletion
    pub file_id: Option<String>,
    /// File name after any provider-side renaming
    pub name: String,
}

/// Structured upload/delete failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImageHostError {
    /// Credentials for the provider are missing
    #[error("{provider} is not configured")]
    NotConfigured {
        /// Provider that was asked
        provider: ProviderKind,
    },

    /// Zero-byte upload
    #[error("Empty file")]
    EmptyFile,

    /// Provider accepted the request but returned no URL
    #[error("Image host returned no URL")]
    NoUrl,

    /// Delete requested without a usable identifier
    #[error("Missing or blank image file id")]
    InvalidFileId,

    /// File name rejected before upload
    #[error("Invalid file type '{file_name}'. Allowed: png, jpg, jpeg, gif")]
    DisallowedExtension {
        /// Rejected file name
        file_name: String,
    },

    /// Transport, HTTP or decoding failure
    #[error("Image host request failed: {message}")]
    Exception {
        /// Underlying error description
        message: String,
    },
}

impl ImageHostError {
    /// Machine-readable failure code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotConfigured { .. } => "not_configured",
            Self::EmptyFile => "empty_file",
            Self::NoUrl => "no_url",
            Self::InvalidFileId => "invalid_file_id",
            Self::DisallowedExtension { .. } => "disallowed_extension",
            Self::Exception { .. } => "exception",
        }
    }

    /// True for failures caused by the client's input rather than the provider or server.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyFile | Self::InvalidFileId | Self::DisallowedExtension { .. }
        )
    }

    /// Wraps any displayable error as [`ImageHostError::Exception`].
    pub fn exception(err: impl fmt::Display) -> Self {
        Self::Exception {
            message: err.to_string(),
        }
    }
}

/// Case-insensitive extension check against [`ALLOWED_EXTENSIONS`].
#[must_use]
pub fn is_allowed_image(file_name: &str) -> bool {
    file_name.rsplit_once('.').is_some_and(|(_, ext)| {
        let ext = ext.to_lowercase();
        ALLOWED_EXTENSIONS.contains(&ext.as_str())
    })
}

/// Strips directory components and replaces characters outside `[A-Za-z0-9._-]`.
#[must_use]
pub fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name)
        .trim();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

/// MIME type sent along with the file part.
#[must_use]
pub fn content_type_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}

/// Base URL without trailing slash, falling back to `default` when unset or blank.
fn trim_base(base: Option<String>, default: &str) -> String {
    base.filter(|b| !b.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
        .trim_end_matches('/')
        .to_string()
}

/// Builds a failure from a non-success HTTP response, keeping the provider's message.
async fn http_failure(action: &str, response: reqwest::Response) -> ImageHostError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    ImageHostError::Exception {
        message: format!("{action} failed with status {status}: {body}"),
    }
}

/// Capability set of an external image host.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Which host this is.
    fn kind(&self) -> ProviderKind;

    /// Credentials the provider was built with.
    fn credentials(&self) -> &ProviderCredentials;

    /// Cheap, side-effect free configuration check.
    fn is_configured(&self) -> bool {
        self.credentials().is_complete()
    }

    /// Sends a single create-object request.
    async fn put(
        &self,
        upload: ImageUpload,
        folder: &str,
    ) -> std::result::Result<UploadedImage, ImageHostError>;

    /// Sends a single delete-object request.
    async fn remove(&self, file_id: &str) -> std::result::Result<(), ImageHostError>;
}

/// Application-facing handle to the configured image host.
#[derive(Clone)]
pub struct ImageGateway {
    provider: Arc<dyn ImageProvider>,
    folder: String,
}

impl fmt::Debug for ImageGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageGateway")
            .field("provider", &self.provider.kind())
            .field("configured", &self.provider.is_configured())
            .field("folder", &self.folder)
            .finish()
    }
}

impl ImageGateway {
    /// Wraps an already constructed provider.
    pub fn new(provider: Arc<dyn ImageProvider>, folder: impl Into<String>) -> Self {
        Self {
            provider,
            folder: folder.into(),
        }
    }

    /// Builds the provider selected by configuration, sharing one HTTP client.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the HTTP client cannot be constructed.
    pub fn from_settings(settings: &ImageSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| Error::Config {
                message: format!("Failed to build image host HTTP client: {e}"),
            })?;

        let provider: Arc<dyn ImageProvider> = match settings.provider {
            ProviderKind::ImageKit => Arc::new(ImageKitProvider::new(
                settings.credentials.clone(),
                client,
                settings.upload_base.clone(),
                settings.api_base.clone(),
            )),
            ProviderKind::Cloudinary => Arc::new(CloudinaryProvider::new(
                settings.credentials.clone(),
                client,
                settings.api_base.clone(),
            )),
        };

        if provider.is_configured() {
            info!(provider = %settings.provider, "Image host configured");
        } else {
            warn!(
                provider = %settings.provider,
                "Image host credentials missing; products will be saved without images"
            );
        }

        Ok(Self::new(provider, settings.folder.clone()))
    }

    /// Provider wired into this gateway.
    #[must_use]
    pub fn kind(&self) -> ProviderKind {
        self.provider.kind()
    }

    /// Folder product images go to.
    #[must_use]
    pub fn folder(&self) -> &str {
        &self.folder
    }

    /// True iff all provider credentials are present.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.provider.is_configured()
    }

    /// Redacted credentials for diagnostics.
    #[must_use]
    pub fn masked_config(&self) -> MaskedCredentials {
        self.provider.credentials().masked()
    }

    /// Uploads an image into `folder`.
    ///
    /// Unconfigured providers and empty files fail without any network traffic.
    pub async fn upload(
        &self,
        upload: ImageUpload,
        folder: &str,
    ) -> std::result::Result<UploadedImage, ImageHostError> {
        if !self.provider.is_configured() {
            warn!(provider = %self.kind(), "Image upload attempted but provider is not configured");
            return Err(ImageHostError::NotConfigured {
                provider: self.kind(),
            });
        }
        if upload.bytes.is_empty() {
            return Err(ImageHostError::EmptyFile);
        }

        let file_name = upload.file_name.clone();
        match self.provider.put(upload, folder).await {
            Ok(image) if image.url.trim().is_empty() => {
                warn!(provider = %self.kind(), file_name = %file_name, "Image host returned an empty URL");
                Err(ImageHostError::NoUrl)
            }
            Ok(image) => {
                info!(
                    provider = %self.kind(),
                    url = %image.url,
                    file_id = ?image.file_id,
                    "Uploaded image"
                );
                Ok(image)
            }
            Err(e) => {
                warn!(provider = %self.kind(), file_name = %file_name, code = e.code(), "Image upload failed: {e}");
                Err(e)
            }
        }
    }

    /// Best-effort deletion of a previously uploaded object.
    pub async fn delete(&self, file_id: &str) -> std::result::Result<(), ImageHostError> {
        let file_id = file_id.trim();
        if file_id.is_empty() {
            return Err(ImageHostError::InvalidFileId);
        }
        if !self.provider.is_configured() {
            return Err(ImageHostError::NotConfigured {
                provider: self.kind(),
            });
        }

        match self.provider.remove(file_id).await {
            Ok(()) => {
                info!(provider = %self.kind(), file_id = %file_id, "Deleted hosted image");
                Ok(())
            }
            Err(e) => {
                warn!(provider = %self.kind(), file_id = %file_id, code = e.code(), "Failed to delete hosted image: {e}");
                Err(e)
            }
        }
    }

    /// Runs the live round-trip check.
    pub async fn diagnose(&self) -> DiagnosticsReport {
        diagnostics::run(self).await
    }
}
