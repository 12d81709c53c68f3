//! `POST /upload` - direct image upload used by browser scripts before the form is submitted.

use crate::{
    images::{ImageHostError, UploadedImage},
    web::{AppState, error::ApiError, forms::read_upload},
};
use axum::{
    Json,
    extract::{Multipart, State},
};
use tracing::info;

pub(crate) async fn upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadedImage>, ApiError> {
    let upload = read_upload(multipart).await?;
    if !upload.has_allowed_extension() {
        return Err(ImageHostError::DisallowedExtension {
            file_name: upload.file_name,
        }
        .into());
    }

    info!(file_name = %upload.file_name, size = upload.bytes.len(), "Direct upload received");
    let image = state
        .gateway
        .upload(upload, state.gateway.folder())
        .await?;
    Ok(Json(image))
}
