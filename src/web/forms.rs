//! Multipart form decoding.

use super::error::ApiError;
use crate::{core::product::ProductForm, images::ImageUpload};
use axum::extract::{Multipart, multipart::Field};

/// Name of the file part in both the product forms and `/upload`.
pub const IMAGE_FIELD: &str = "image";

async fn text(field: Field<'_>) -> Result<String, ApiError> {
    Ok(field.text().await?)
}

/// Reads a file part. A part without a file name is treated as absent.
async fn file(field: Field<'_>) -> Result<Option<ImageUpload>, ApiError> {
    let file_name = field.file_name().unwrap_or_default().to_string();
    let bytes = field.bytes().await?;
    if file_name.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(ImageUpload::new(file_name, bytes.to_vec())))
}

/// Collects the add/edit form. Unknown parts are skipped.
pub async fn read_product_form(mut multipart: Multipart) -> Result<ProductForm, ApiError> {
    let mut form = ProductForm::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "product_name" => form.product_name = text(field).await?,
            "price" => form.price = text(field).await?,
            "description" => form.description = text(field).await?,
            "category" => form.category = text(field).await?,
            "quantity" => form.quantity = text(field).await?,
            "keep_image" => form.keep_image = text(field).await?,
            "uploaded_image_url" => form.uploaded_image_url = text(field).await?,
            "uploaded_image_id" => form.uploaded_image_id = text(field).await?,
            IMAGE_FIELD => form.image = file(field).await?,
            _ => {}
        }
    }
    Ok(form)
}

/// Extracts the single image of an `/upload` request.
pub async fn read_upload(mut multipart: Multipart) -> Result<ImageUpload, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        return file(field).await?.ok_or(ApiError::BadRequest {
            message: "Empty file".to_string(),
            code: "empty_file",
        });
    }
    Err(ApiError::BadRequest {
        message: format!("No image provided. Expected field name: \"{IMAGE_FIELD}\""),
        code: "missing_file",
    })
}
