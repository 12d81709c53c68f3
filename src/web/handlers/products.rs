//! Add, edit and delete endpoints.

use crate::{
    core::{
        catalog::{self, CategoryOption},
        product,
    },
    errors::Error,
    web::{
        AppState,
        error::ApiError,
        forms::read_product_form,
        views::{self, Notice, ProductView},
    },
};
use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
};
use serde::Serialize;

/// Metadata for an empty product form.
#[derive(Debug, Serialize)]
pub struct FormMetadata {
    /// All categories
    pub categories: Vec<CategoryOption>,
}

/// A product together with the form metadata, for editing.
#[derive(Debug, Serialize)]
pub struct EditFormResponse {
    /// Current product values
    pub product: ProductView,
    /// All categories
    pub categories: Vec<CategoryOption>,
}

/// A stored product and feedback about the operation.
#[derive(Debug, Serialize)]
pub struct ProductResponse {
    /// The stored product
    pub product: ProductView,
    /// Feedback for the user
    pub notices: Vec<Notice>,
}

/// A deleted product and feedback about the operation.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    /// The product as it was before deletion
    pub deleted: ProductView,
    /// Feedback for the user
    pub notices: Vec<Notice>,
}

pub(crate) async fn add_form() -> Json<FormMetadata> {
    Json(FormMetadata {
        categories: catalog::category_options(),
    })
}

pub(crate) async fn add(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    let form = read_product_form(multipart).await?;
    let outcome = product::create_product(&state.db, &state.gateway, form).await?;
    let notices = views::create_notices(&outcome);

    Ok((
        StatusCode::CREATED,
        Json(ProductResponse {
            product: outcome.product.into(),
            notices,
        }),
    ))
}

pub(crate) async fn edit_form(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<EditFormResponse>, ApiError> {
    let product = product::get_product_by_id(&state.db, id)
        .await?
        .ok_or(Error::ProductNotFound { id })?;

    Ok(Json(EditFormResponse {
        product: product.into(),
        categories: catalog::category_options(),
    }))
}

pub(crate) async fn edit(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<Json<ProductResponse>, ApiError> {
    let form = read_product_form(multipart).await?;
    let outcome = product::update_product(&state.db, &state.gateway, id, form).await?;
    let notices = views::update_notices(&outcome);

    Ok(Json(ProductResponse {
        product: outcome.product.into(),
        notices,
    }))
}

pub(crate) async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let outcome = product::delete_product(&state.db, &state.gateway, id).await?;
    let notices = views::delete_notices(&outcome);

    Ok(Json(DeleteResponse {
        deleted: outcome.product.into(),
        notices,
    }))
}
