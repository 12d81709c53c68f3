//! Shared test utilities for Plants Hub.
//!
//! This module provides an in-memory database setup, a recording fake image provider and
//! helpers for creating products with sensible defaults.

use crate::{
    core::product::{self, ProductForm},
    entities::{Category, product as product_entity},
    errors::Result,
    images::{
        ImageGateway, ImageHostError, ImageProvider, ImageUpload, ProviderCredentials,
        ProviderKind, UploadedImage,
    },
};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set, prelude::Decimal};
use std::{
    str::FromStr,
    sync::{Arc, Mutex},
};

/// Creates an in-memory `SQLite` database with all tables initialized.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    BlankUrl,
    FailingUploads,
    FailingDeletes,
}

/// Fake image host that records every request instead of touching the network.
///
/// Uploaded images get `https://images.test/<folder>/<file name>` URLs and sequential
/// `file_<n>` ids.
#[derive(Debug)]
pub struct RecordingProvider {
    credentials: ProviderCredentials,
    mode: Mode,
    uploads: Mutex<Vec<String>>,
    deletes: Mutex<Vec<String>>,
}

impl RecordingProvider {
    fn with(mode: Mode, credentials: ProviderCredentials) -> Self {
        Self {
            credentials,
            mode,
            uploads: Mutex::new(Vec::new()),
            deletes: Mutex::new(Vec::new()),
        }
    }

    /// Fully configured provider whose requests all succeed.
    #[must_use]
    pub fn configured() -> Self {
        Self::with(Mode::Normal, test_credentials())
    }

    /// Provider with no credentials.
    #[must_use]
    pub fn unconfigured() -> Self {
        Self::with(Mode::Normal, ProviderCredentials::default())
    }

    /// Provider that accepts uploads but answers with an empty URL.
    #[must_use]
    pub fn returning_blank_url() -> Self {
        Self::with(Mode::BlankUrl, test_credentials())
    }

    /// Provider whose uploads always fail.
    #[must_use]
    pub fn failing_uploads() -> Self {
        Self::with(Mode::FailingUploads, test_credentials())
    }

    /// Provider whose deletes always fail.
    #[must_use]
    pub fn failing_deletes() -> Self {
        Self::with(Mode::FailingDeletes, test_credentials())
    }

    /// Number of upload requests received.
    pub fn put_count(&self) -> usize {
        self.uploads.lock().map(|u| u.len()).unwrap_or_default()
    }

    /// Ids of every delete request received, in order.
    pub fn deleted_ids(&self) -> Vec<String> {
        self.deletes.lock().map(|d| d.clone()).unwrap_or_default()
    }
}

fn test_credentials() -> ProviderCredentials {
    ProviderCredentials {
        public_key: Some("public_key".to_string()),
        private_key: Some("private_key".to_string()),
        endpoint: Some("https://images.test".to_string()),
    }
}

#[async_trait]
impl ImageProvider for RecordingProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::ImageKit
    }

    fn credentials(&self) -> &ProviderCredentials {
        &self.credentials
    }

    async fn put(
        &self,
        upload: ImageUpload,
        folder: &str,
    ) -> std::result::Result<UploadedImage, ImageHostError> {
        let count = {
            let mut uploads = self
                .uploads
                .lock()
                .map_err(|e| ImageHostError::exception(e.to_string()))?;
            uploads.push(upload.file_name.clone());
            uploads.len()
        };
        match self.mode {
            Mode::FailingUploads => Err(ImageHostError::exception("connection reset")),
            Mode::BlankUrl => Ok(UploadedImage {
                url: String::new(),
                file_id: Some(format!("file_{count}")),
                name: upload.file_name,
            }),
            Mode::Normal | Mode::FailingDeletes => Ok(UploadedImage {
                url: format!("https://images.test/{folder}/{}", upload.file_name),
                file_id: Some(format!("file_{count}")),
                name: upload.file_name,
            }),
        }
    }

    async fn remove(&self, file_id: &str) -> std::result::Result<(), ImageHostError> {
        self.deletes
            .lock()
            .map_err(|e| ImageHostError::exception(e.to_string()))?
            .push(file_id.to_string());
        if self.mode == Mode::FailingDeletes {
            Err(ImageHostError::exception("host unreachable"))
        } else {
            Ok(())
        }
    }
}

/// Wraps a recording provider in a gateway, returning both.
pub fn gateway_with(provider: RecordingProvider) -> (ImageGateway, Arc<RecordingProvider>) {
    let provider = Arc::new(provider);
    let gateway = ImageGateway::new(Arc::clone(&provider) as Arc<dyn ImageProvider>, "plants_hub");
    (gateway, provider)
}

/// Gateway backed by a configured, always-succeeding provider.
pub fn configured_gateway() -> (ImageGateway, Arc<RecordingProvider>) {
    gateway_with(RecordingProvider::configured())
}

/// Gateway backed by a provider without credentials.
pub fn unconfigured_gateway() -> (ImageGateway, Arc<RecordingProvider>) {
    gateway_with(RecordingProvider::unconfigured())
}

/// Form with the required fields filled in.
#[must_use]
pub fn product_form(name: &str, price: &str) -> ProductForm {
    ProductForm {
        product_name: name.to_string(),
        price: price.to_string(),
        ..ProductForm::default()
    }
}

/// A small non-empty PNG upload.
#[must_use]
pub fn png_upload(file_name: &str) -> ImageUpload {
    ImageUpload::new(file_name.to_string(), vec![0x89, 0x50, 0x4E, 0x47])
}

/// Creates a product through the normal create flow, without an image.
pub async fn create_test_product(
    db: &DatabaseConnection,
    gateway: &ImageGateway,
    name: &str,
    price: &str,
) -> Result<product_entity::Model> {
    Ok(product::create_product(db, gateway, product_form(name, price))
        .await?
        .product)
}

/// Creates a product whose image is hosted under the given provider id.
pub async fn create_hosted_product(
    db: &DatabaseConnection,
    gateway: &ImageGateway,
    name: &str,
    file_id: &str,
) -> Result<product_entity::Model> {
    let form = ProductForm {
        uploaded_image_url: format!("https://images.test/plants_hub/{file_id}.png"),
        uploaded_image_id: file_id.to_string(),
        ..product_form(name, "10.00")
    };
    Ok(product::create_product(db, gateway, form).await?.product)
}

/// Inserts a product row directly, with full control over the timestamp.
pub async fn insert_product_at(
    db: &DatabaseConnection,
    name: &str,
    description: Option<&str>,
    category: Option<Category>,
    price: &str,
    created_at: &str,
) -> Result<product_entity::Model> {
    let created_at = NaiveDateTime::parse_from_str(created_at, "%Y-%m-%d %H:%M:%S")
        .map_err(|e| crate::errors::Error::Config {
            message: e.to_string(),
        })?;
    let price = Decimal::from_str(price).map_err(|_| crate::errors::Error::InvalidPrice {
        input: price.to_string(),
    })?;
    let model = product_entity::ActiveModel {
        name: Set(name.to_string()),
        description: Set(description.map(ToString::to_string)),
        category: Set(category),
        price: Set(price),
        quantity: Set(1),
        image_url: Set(None),
        image_file_id: Set(None),
        created_at: Set(created_at),
        updated_at: Set(created_at),
        ..Default::default()
    };
    Ok(model.insert(db).await?)
}
