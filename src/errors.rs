//! Unified error types and result handling.
//!
//! Validation errors are raised before anything is persisted or uploaded. Image host
//! failures have their own type ([`crate::images::ImageHostError`]) because they are
//! non-fatal to product operations and never travel through this enum.

use sea_orm::DbErr;
use thiserror::Error;

/// Application error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {message}")]
    Config {
        /// Human readable description of the problem
        message: String,
    },

    /// Database query or transaction failure
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// I/O failure (config file, socket binding)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Product name missing or whitespace-only
    #[error("Product name is required")]
    EmptyName,

    /// Product name exceeds the column width
    #[error("Product name is too long (max {max} characters)")]
    NameTooLong {
        /// Maximum accepted length
        max: usize,
    },

    /// Price could not be parsed or is negative
    #[error("Invalid price format: '{input}'")]
    InvalidPrice {
        /// Raw form value
        input: String,
    },

    /// Category outside the fixed catalogue
    #[error("Unknown category: '{input}'")]
    InvalidCategory {
        /// Raw form value
        input: String,
    },

    /// Attached file does not have an allowed image extension
    #[error("Invalid file type '{file_name}'. Please upload PNG, JPG, JPEG, or GIF")]
    DisallowedImage {
        /// Original file name
        file_name: String,
    },

    /// No product with the given id
    #[error("Product not found: {id}")]
    ProductNotFound {
        /// Requested product id
        id: i64,
    },
}

impl Error {
    /// Whether the error comes from user input and can be fixed by resubmitting the form.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::EmptyName
                | Self::NameTooLong { .. }
                | Self::InvalidPrice { .. }
                | Self::InvalidCategory { .. }
                | Self::DisallowedImage { .. }
        )
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
