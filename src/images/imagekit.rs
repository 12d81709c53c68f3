//! ImageKit provider.
//!
//! Uploads go to the multipart upload API with HTTP Basic auth (private key as user name,
//! empty password). Files are placed under `/<folder>` with unique file names enabled so
//! that two products with the same image name never collide.

use super::{
    ImageHostError, ImageProvider, ImageUpload, ProviderCredentials, ProviderKind,
    UploadedImage, content_type_for, http_failure, sanitize_file_name, trim_base,
};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::debug;

/// Default host for the upload API.
pub const DEFAULT_UPLOAD_BASE: &str = "https://upload.imagekit.io";
/// Default host for the media management API.
pub const DEFAULT_API_BASE: &str = "https://api.imagekit.io";

/// ImageKit upload/delete client.
#[derive(Debug, Clone)]
pub struct ImageKitProvider {
    credentials: ProviderCredentials,
    client: reqwest::Client,
    upload_base: String,
    api_base: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    file_id: Option<String>,
    name: Option<String>,
    url: Option<String>,
}

impl ImageKitProvider {
    /// Creates a provider. `None` bases select the public ImageKit hosts.
    #[must_use]
    pub fn new(
        credentials: ProviderCredentials,
        client: reqwest::Client,
        upload_base: Option<String>,
        api_base: Option<String>,
    ) -> Self {
        Self {
            credentials,
            client,
            upload_base: trim_base(upload_base, DEFAULT_UPLOAD_BASE),
            api_base: trim_base(api_base, DEFAULT_API_BASE),
        }
    }

    fn private_key(&self) -> Result<&str, ImageHostError> {
        self.credentials
            .private_key
            .as_deref()
            .ok_or(ImageHostError::NotConfigured {
                provider: ProviderKind::ImageKit,
            })
    }
}

#[async_trait]
impl ImageProvider for ImageKitProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::ImageKit
    }

    fn credentials(&self) -> &ProviderCredentials {
        &self.credentials
    }

    async fn put(&self, upload: ImageUpload, folder: &str) -> Result<UploadedImage, ImageHostError> {
        let private_key = self.private_key()?;
        let file_name = sanitize_file_name(&upload.file_name);

        let part = Part::bytes(upload.bytes)
            .file_name(file_name.clone())
            .mime_str(content_type_for(&file_name))
            .map_err(ImageHostError::exception)?;
        let form = Form::new()
            .part("file", part)
            .text("fileName", file_name.clone())
            .text("folder", format!("/{}", folder.trim_matches('/')))
            .text("useUniqueFileName", "true");

        let url = format!("{}/api/v1/files/upload", self.upload_base);
        debug!(%url, %file_name, "Sending ImageKit upload");
        let response = self
            .client
            .post(&url)
            .basic_auth(private_key, Some(""))
            .multipart(form)
            .send()
            .await
            .map_err(ImageHostError::exception)?;

        if !response.status().is_success() {
            return Err(http_failure("ImageKit upload", response).await);
        }

        let body: UploadResponse = response.json().await.map_err(ImageHostError::exception)?;
        let url = body
            .url
            .filter(|u| !u.trim().is_empty())
            .ok_or(ImageHostError::NoUrl)?;

        Ok(UploadedImage {
            url,
            file_id: body.file_id,
            name: body.name.unwrap_or(file_name),
        })
    }

    async fn remove(&self, file_id: &str) -> Result<(), ImageHostError> {
        let private_key = self.private_key()?;
        let url = format!("{}/v1/files/{file_id}", self.api_base);

        let response = self
            .client
            .delete(&url)
            .basic_auth(private_key, Some(""))
            .send()
            .await
            .map_err(ImageHostError::exception)?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(http_failure("ImageKit delete", response).await)
        }
    }
}
