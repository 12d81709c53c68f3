//! Cloudinary provider.
//!
//! Uses signed requests: the signed parameters are sorted by name, joined as `k=v&k=v`,
//! suffixed with the API secret and hashed with SHA-256 (`signature_algorithm=sha256`).
//! The cloud name is carried in [`ProviderCredentials::endpoint`].

use super::{
    ImageHostError, ImageProvider, ImageUpload, ProviderCredentials, ProviderKind,
    UploadedImage, content_type_for, http_failure, sanitize_file_name, trim_base,
};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::debug;

/// Default API host.
pub const DEFAULT_API_BASE: &str = "https://api.cloudinary.com";

/// Cloudinary upload/destroy client.
#[derive(Debug, Clone)]
pub struct CloudinaryProvider {
    credentials: ProviderCredentials,
    client: reqwest::Client,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    url: Option<String>,
    public_id: Option<String>,
    original_filename: Option<String>,
    format: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: Option<String>,
}

struct SigningKeys<'a> {
    api_key: &'a str,
    api_secret: &'a str,
    cloud_name: &'a str,
}

/// Hex SHA-256 signature over the sorted parameters followed by the secret.
#[must_use]
pub fn sign_params(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted: Vec<&(&str, &str)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));
    let joined = sorted
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

impl CloudinaryProvider {
    /// Creates a provider. `None` selects the public Cloudinary API host.
    #[must_use]
    pub fn new(
        credentials: ProviderCredentials,
        client: reqwest::Client,
        api_base: Option<String>,
    ) -> Self {
        Self {
            credentials,
            client,
            api_base: trim_base(api_base, DEFAULT_API_BASE),
        }
    }

    fn keys(&self) -> Result<SigningKeys<'_>, ImageHostError> {
        let not_configured = || ImageHostError::NotConfigured {
            provider: ProviderKind::Cloudinary,
        };
        Ok(SigningKeys {
            api_key: self.credentials.public_key.as_deref().ok_or_else(not_configured)?,
            api_secret: self.credentials.private_key.as_deref().ok_or_else(not_configured)?,
            cloud_name: self.credentials.endpoint.as_deref().ok_or_else(not_configured)?,
        })
    }

    fn endpoint(&self, cloud_name: &str, action: &str) -> String {
        format!("{}/v1_1/{cloud_name}/image/{action}", self.api_base)
    }
}

#[async_trait]
impl ImageProvider for CloudinaryProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Cloudinary
    }

    fn credentials(&self) -> &ProviderCredentials {
        &self.credentials
    }

    async fn put(&self, upload: ImageUpload, folder: &str) -> Result<UploadedImage, ImageHostError> {
        let keys = self.keys()?;
        let file_name = sanitize_file_name(&upload.file_name);
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let folder = folder.trim_matches('/').to_string();
        let signature = sign_params(
            &[("folder", folder.as_str()), ("timestamp", timestamp.as_str())],
            keys.api_secret,
        );

        let part = Part::bytes(upload.bytes)
            .file_name(file_name.clone())
            .mime_str(content_type_for(&file_name))
            .map_err(ImageHostError::exception)?;
        let form = Form::new()
            .part("file", part)
            .text("api_key", keys.api_key.to_string())
            .text("timestamp", timestamp)
            .text("folder", folder)
            .text("signature", signature)
            .text("signature_algorithm", "sha256");

        let url = self.endpoint(keys.cloud_name, "upload");
        debug!(%url, %file_name, "Sending Cloudinary upload");
        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(ImageHostError::exception)?;

        if !response.status().is_success() {
            return Err(http_failure("Cloudinary upload", response).await);
        }

        let body: UploadResponse = response.json().await.map_err(ImageHostError::exception)?;
        let url = body
            .secure_url
            .or(body.url)
            .filter(|u| !u.trim().is_empty())
            .ok_or(ImageHostError::NoUrl)?;
        let name = match (body.original_filename, body.format) {
            (Some(stem), Some(format)) => format!("{stem}.{format}"),
            _ => file_name,
        };

        Ok(UploadedImage {
            url,
            file_id: body.public_id,
            name,
        })
    }

    async fn remove(&self, file_id: &str) -> Result<(), ImageHostError> {
        let keys = self.keys()?;
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign_params(
            &[("public_id", file_id), ("timestamp", timestamp.as_str())],
            keys.api_secret,
        );

        let response = self
            .client
            .post(self.endpoint(keys.cloud_name, "destroy"))
            .form(&[
                ("public_id", file_id),
                ("api_key", keys.api_key),
                ("timestamp", timestamp.as_str()),
                ("signature", signature.as_str()),
                ("signature_algorithm", "sha256"),
            ])
            .send()
            .await
            .map_err(ImageHostError::exception)?;

        if !response.status().is_success() {
            return Err(http_failure("Cloudinary destroy", response).await);
        }

        let body: DestroyResponse = response.json().await.map_err(ImageHostError::exception)?;
        match body.result.as_deref() {
            Some("ok") => Ok(()),
            other => Err(ImageHostError::Exception {
                message: format!(
                    "Cloudinary destroy returned '{}'",
                    other.unwrap_or("no result")
                ),
            }),
        }
    }
}
