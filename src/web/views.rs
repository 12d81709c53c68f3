//! JSON shapes returned by the handlers, and user-facing notices.

use crate::{
    core::{
        image_policy::{ImageOutcome, Release},
        product::{CreateOutcome, DeleteOutcome, UpdateOutcome},
    },
    entities::{Category, ProductModel},
};
use chrono::NaiveDateTime;
use serde::Serialize;

/// A product as shown to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductView {
    /// Product id
    pub id: i64,
    /// Name
    pub name: String,
    /// Description
    pub description: Option<String>,
    /// Category value
    pub category: Option<Category>,
    /// Category display label
    pub category_label: Option<&'static str>,
    /// Price with exactly two decimals
    pub price: String,
    /// Units in stock
    pub quantity: i32,
    /// Stored image reference
    pub image_url: Option<String>,
    /// Provider id of a hosted image
    pub image_file_id: Option<String>,
    /// URL a browser can load the image from
    pub image_display_url: Option<String>,
    /// Creation time (UTC)
    pub created_at: NaiveDateTime,
    /// Last modification time (UTC)
    pub updated_at: NaiveDateTime,
}

impl From<ProductModel> for ProductView {
    fn from(model: ProductModel) -> Self {
        let image_display_url = model.image().map(|image| image.display_url());
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            category: model.category,
            category_label: model.category.map(Category::label),
            price: format!("{:.2}", model.price.round_dp(2)),
            quantity: model.quantity,
            image_url: model.image_url,
            image_file_id: model.image_file_id,
            image_display_url,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    /// The operation did what was asked
    Success,
    /// The operation succeeded with a side effect missing
    Warning,
    /// Part of the request was not carried out
    Danger,
}

/// Feedback about a completed operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    /// Severity
    pub level: NoticeLevel,
    /// Message for the user
    pub message: String,
}

impl Notice {
    fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

fn release_notice(release: Option<&Release>, what: &str) -> Option<Notice> {
    let error = release?.error.as_ref()?;
    Some(Notice::new(
        NoticeLevel::Warning,
        format!("{what} could not be removed from the image host ({})", error.code()),
    ))
}

/// Notices for a created product.
#[must_use]
pub fn create_notices(outcome: &CreateOutcome) -> Vec<Notice> {
    let mut notices = vec![Notice::new(
        NoticeLevel::Success,
        format!("Product \"{}\" added successfully", outcome.product.name),
    )];
    if let ImageOutcome::UploadFailed(e) = &outcome.image {
        notices.push(Notice::new(
            NoticeLevel::Warning,
            format!("Image upload failed ({}); product saved without image.", e.code()),
        ));
    }
    notices
}

/// Notices for an edited product.
#[must_use]
pub fn update_notices(outcome: &UpdateOutcome) -> Vec<Notice> {
    let mut notices = vec![Notice::new(
        NoticeLevel::Success,
        format!("Product \"{}\" updated successfully", outcome.product.name),
    )];
    if let ImageOutcome::UploadFailed(e) = &outcome.image {
        notices.push(Notice::new(
            NoticeLevel::Danger,
            format!("Image upload failed ({}). Image unchanged.", e.code()),
        ));
    }
    notices.extend(release_notice(outcome.released.as_ref(), "Previous image"));
    notices
}

/// Notices for a deleted product.
#[must_use]
pub fn delete_notices(outcome: &DeleteOutcome) -> Vec<Notice> {
    let mut notices = vec![Notice::new(
        NoticeLevel::Success,
        format!("Product \"{}\" deleted successfully!", outcome.product.name),
    )];
    notices.extend(release_notice(outcome.released.as_ref(), "Product image"));
    notices
}
