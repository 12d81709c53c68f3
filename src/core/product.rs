//! Product business logic - validation, creation, editing and deletion of catalog products.
//!
//! Form values arrive as raw strings and are validated by [`ProductInput::parse`] before any
//! upload or database work happens. Each mutation runs in a single database transaction.
//! Hosted images that a mutation makes obsolete are released only after that transaction
//! has committed, and a freshly uploaded image is discarded again if it never got committed.
//! Image host failures never fail the operation; they are reported in the outcome instead.

use crate::{
    config::SeedProduct,
    core::image_policy::{
        ImageIntent, ImageOutcome, ImagePlan, Release, plan_image_change, release,
    },
    entities::{Category, ImageRef, Product, product},
    errors::{Error, Result},
    images::{ImageGateway, ImageUpload},
};
use chrono::NaiveDateTime;
use rust_decimal::RoundingStrategy;
use sea_orm::{PaginatorTrait, Set, TransactionTrait, prelude::*};
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Longest accepted product name, matching the column width.
pub const MAX_NAME_LEN: usize = 200;

/// Largest price a `DECIMAL(10,2)` column can hold (99 999 999.99).
const MAX_PRICE: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

/// Raw product form fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductForm {
    /// Product name
    pub product_name: String,
    /// Decimal price
    pub price: String,
    /// Free-text description
    pub description: String,
    /// Category value
    pub category: String,
    /// Stock count
    pub quantity: String,
    /// `"yes"` to keep the current image on edit
    pub keep_image: String,
    /// URL of an image uploaded beforehand through `/upload`
    pub uploaded_image_url: String,
    /// Provider id belonging to `uploaded_image_url`
    pub uploaded_image_id: String,
    /// Attached image file
    pub image: Option<ImageUpload>,
}

/// Validated product fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductInput {
    /// Trimmed, non-empty name
    pub name: String,
    /// Description, `None` when blank
    pub description: Option<String>,
    /// Category, `None` when blank
    pub category: Option<Category>,
    /// Non-negative price rounded to two decimal places
    pub price: Decimal,
    /// Non-negative stock count
    pub quantity: i32,
}

/// A validated form split into its field values and its image signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// Validated fields
    pub input: ProductInput,
    /// Requested image change
    pub intent: ImageIntent,
    /// Whether the current hosted image must survive a replacement
    pub keep_image: bool,
}

/// Result of [`create_product`].
#[derive(Debug, Clone, PartialEq)]
pub struct CreateOutcome {
    /// The stored product
    pub product: product::Model,
    /// What happened to the image
    pub image: ImageOutcome,
}

/// Result of [`update_product`].
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutcome {
    /// The stored product
    pub product: product::Model,
    /// What happened to the image
    pub image: ImageOutcome,
    /// The replaced hosted image, if one was released
    pub released: Option<Release>,
}

/// Result of [`delete_product`].
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteOutcome {
    /// The product as it was before deletion
    pub product: product::Model,
    /// The product's hosted image, if one was released
    pub released: Option<Release>,
}

/// Parses a price, rounding half away from zero to two decimal places.
///
/// # Errors
/// Returns [`Error::InvalidPrice`] if the value is not a decimal number, is negative, or
/// does not fit the price column.
pub fn parse_price(raw: &str) -> Result<Decimal> {
    let invalid = || Error::InvalidPrice {
        input: raw.to_string(),
    };
    let price = Decimal::from_str(raw.trim())
        .map_err(|_| invalid())?
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    if price.is_sign_negative() && !price.is_zero() {
        return Err(invalid());
    }
    if price > MAX_PRICE {
        return Err(invalid());
    }
    Ok(price.abs())
}

/// Parses a stock count. Anything that is not a non-negative integer becomes 0.
#[must_use]
pub fn parse_quantity(raw: &str) -> i32 {
    raw.trim()
        .parse::<i32>()
        .ok()
        .filter(|quantity| *quantity >= 0)
        .unwrap_or(0)
}

fn blank_to_none(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

impl ProductInput {
    /// Validates the form fields, including the attached file's extension.
    ///
    /// # Errors
    /// Returns a validation error ([`Error::is_validation`]) describing the first invalid field.
    pub fn parse(form: &ProductForm) -> Result<Self> {
        let name = form.product_name.trim();
        if name.is_empty() {
            return Err(Error::EmptyName);
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(Error::NameTooLong { max: MAX_NAME_LEN });
        }

        let price = parse_price(&form.price)?;

        let category = match blank_to_none(&form.category) {
            Some(value) => Some(
                Category::from_str(&value).map_err(|input| Error::InvalidCategory { input })?,
            ),
            None => None,
        };

        if let Some(upload) = attached(form.image.as_ref()) {
            if !upload.has_allowed_extension() {
                return Err(Error::DisallowedImage {
                    file_name: upload.file_name.clone(),
                });
            }
        }

        Ok(Self {
            name: name.to_string(),
            description: blank_to_none(&form.description),
            category,
            price,
            quantity: parse_quantity(&form.quantity),
        })
    }
}

/// A file part without a file name counts as no file.
fn attached(image: Option<&ImageUpload>) -> Option<&ImageUpload> {
    image.filter(|upload| !upload.file_name.trim().is_empty())
}

impl ProductForm {
    /// Whether the form asks to keep the current image.
    #[must_use]
    pub fn keeps_image(&self) -> bool {
        self.keep_image.trim().eq_ignore_ascii_case("yes")
    }

    /// Validates the form and extracts its image signal.
    ///
    /// # Errors
    /// Returns a validation error if any field is invalid.
    pub fn into_submission(self) -> Result<Submission> {
        let input = ProductInput::parse(&self)?;
        let keep_image = self.keeps_image();
        let intent = if let Some(url) = blank_to_none(&self.uploaded_image_url) {
            ImageIntent::PreUploaded {
                url,
                file_id: blank_to_none(&self.uploaded_image_id),
            }
        } else if let Some(upload) = self
            .image
            .filter(|upload| !upload.file_name.trim().is_empty())
        {
            ImageIntent::NewFile(upload)
        } else if keep_image {
            ImageIntent::Keep
        } else {
            ImageIntent::Unspecified
        };
        Ok(Submission {
            input,
            intent,
            keep_image,
        })
    }
}

fn new_product(
    input: ProductInput,
    image: Option<ImageRef>,
    now: NaiveDateTime,
) -> product::ActiveModel {
    let (image_url, image_file_id) = ImageRef::into_columns(image);
    product::ActiveModel {
        name: Set(input.name),
        description: Set(input.description),
        category: Set(input.category),
        price: Set(input.price),
        quantity: Set(input.quantity),
        image_url: Set(image_url),
        image_file_id: Set(image_file_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
}

async fn insert_committed(
    db: &DatabaseConnection,
    model: product::ActiveModel,
) -> Result<product::Model> {
    let txn = db.begin().await?;
    let inserted = model.insert(&txn).await?;
    txn.commit().await?;
    Ok(inserted)
}

async fn update_committed(
    db: &DatabaseConnection,
    model: product::ActiveModel,
) -> Result<product::Model> {
    let txn = db.begin().await?;
    let updated = model.update(&txn).await?;
    txn.commit().await?;
    Ok(updated)
}

/// Deletes an object uploaded by a request whose database change did not go through.
async fn discard_upload(gateway: &ImageGateway, uploaded: Option<String>) {
    if let Some(file_id) = uploaded {
        warn!(file_id = %file_id, "Discarding image uploaded for a failed save");
        let _ = release(gateway, file_id).await;
    }
}

async fn release_after_commit(
    gateway: &ImageGateway,
    file_id: Option<String>,
) -> Option<Release> {
    match file_id {
        Some(file_id) => Some(release(gateway, file_id).await),
        None => None,
    }
}

/// Retrieves a product by id.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_product_by_id(
    db: &DatabaseConnection,
    product_id: i64,
) -> Result<Option<product::Model>> {
    Product::find_by_id(product_id)
        .one(db)
        .await
        .map_err(Into::into)
}

async fn require_product(db: &DatabaseConnection, product_id: i64) -> Result<product::Model> {
    get_product_by_id(db, product_id)
        .await?
        .ok_or(Error::ProductNotFound { id: product_id })
}

/// Creates a product from a submitted form.
///
/// A pre-uploaded URL is adopted as is; otherwise an attached file is uploaded into the
/// gateway's folder. A failed upload does not prevent the product from being saved.
///
/// # Errors
/// Returns a validation error for invalid input, or [`Error::Database`] if the insert fails.
pub async fn create_product(
    db: &DatabaseConnection,
    gateway: &ImageGateway,
    form: ProductForm,
) -> Result<CreateOutcome> {
    let Submission { input, intent, .. } = form.into_submission()?;

    let ImagePlan {
        image,
        uploaded,
        outcome,
        ..
    } = plan_image_change(gateway, None, intent, false).await;

    let now = chrono::Utc::now().naive_utc();
    let product = match insert_committed(db, new_product(input, image, now)).await {
        Ok(product) => product,
        Err(e) => {
            discard_upload(gateway, uploaded).await;
            return Err(e);
        }
    };

    info!(product_id = product.id, name = %product.name, "Created product");
    Ok(CreateOutcome {
        product,
        image: outcome,
    })
}

/// Replaces every field of an existing product with the submitted values.
///
/// Image handling follows [`plan_image_change`]: with no new image the current one is kept.
/// A replaced hosted image is released after the commit unless `keep_image` is `yes`.
///
/// # Errors
/// Returns a validation error for invalid input, [`Error::ProductNotFound`] if the product
/// does not exist, or [`Error::Database`] if the update fails.
pub async fn update_product(
    db: &DatabaseConnection,
    gateway: &ImageGateway,
    product_id: i64,
    form: ProductForm,
) -> Result<UpdateOutcome> {
    let Submission {
        input,
        intent,
        keep_image,
    } = form.into_submission()?;
    let existing = require_product(db, product_id).await?;

    let ImagePlan {
        image,
        release: to_release,
        uploaded,
        outcome,
    } = plan_image_change(gateway, existing.image(), intent, keep_image).await;

    let mut model: product::ActiveModel = existing.into();
    model.name = Set(input.name);
    model.description = Set(input.description);
    model.category = Set(input.category);
    model.price = Set(input.price);
    model.quantity = Set(input.quantity);
    // Untouched image columns stay exactly as stored.
    if matches!(outcome, ImageOutcome::Stored(_)) {
        let (image_url, image_file_id) = ImageRef::into_columns(image);
        model.image_url = Set(image_url);
        model.image_file_id = Set(image_file_id);
    }
    model.updated_at = Set(chrono::Utc::now().naive_utc());

    let product = match update_committed(db, model).await {
        Ok(product) => product,
        Err(e) => {
            discard_upload(gateway, uploaded).await;
            return Err(e);
        }
    };
    info!(product_id = product.id, name = %product.name, "Updated product");

    let released = release_after_commit(gateway, to_release).await;
    Ok(UpdateOutcome {
        product,
        image: outcome,
        released,
    })
}

/// Deletes a product, then releases its hosted image.
///
/// The record is removed even if the image host cannot delete the image.
///
/// # Errors
/// Returns [`Error::ProductNotFound`] if the product does not exist, or
/// [`Error::Database`] if the delete fails.
pub async fn delete_product(
    db: &DatabaseConnection,
    gateway: &ImageGateway,
    product_id: i64,
) -> Result<DeleteOutcome> {
    let existing = require_product(db, product_id).await?;

    let txn = db.begin().await?;
    Product::delete_by_id(product_id).exec(&txn).await?;
    txn.commit().await?;
    info!(product_id, name = %existing.name, "Deleted product");

    let hosted_id = existing
        .image()
        .as_ref()
        .and_then(ImageRef::hosted_file_id)
        .map(ToString::to_string);
    let released = release_after_commit(gateway, hosted_id).await;

    Ok(DeleteOutcome {
        product: existing,
        released,
    })
}

/// Inserts the configured sample products into an empty catalog.
///
/// Returns the number of products inserted; 0 when the catalog already has products.
///
/// # Errors
/// Returns a validation error if a seed entry is invalid (nothing is inserted), or
/// [`Error::Database`] if the inserts fail.
pub async fn seed_sample_products(
    db: &DatabaseConnection,
    seeds: &[SeedProduct],
) -> Result<usize> {
    if seeds.is_empty() {
        return Ok(0);
    }
    let existing = Product::find().count(db).await?;
    if existing > 0 {
        debug!(existing, "Catalog not empty; skipping sample products");
        return Ok(0);
    }

    let now = chrono::Utc::now().naive_utc();
    let txn = db.begin().await?;
    for seed in seeds {
        let form = ProductForm {
            product_name: seed.name.clone(),
            price: seed.price.clone(),
            description: seed.description.clone().unwrap_or_default(),
            category: seed.category.clone().unwrap_or_default(),
            quantity: seed.quantity.to_string(),
            ..ProductForm::default()
        };
        let input = ProductInput::parse(&form)?;
        let image = ImageRef::from_columns(seed.image.as_deref(), None);
        new_product(input, image, now).insert(&txn).await?;
    }
    txn.commit().await?;

    info!(count = seeds.len(), "Seeded sample products");
    Ok(seeds.len())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{
        images::ImageHostError,
        test_utils::{
            RecordingProvider, configured_gateway, create_hosted_product, create_test_product,
            gateway_with, png_upload, product_form, setup_test_db, unconfigured_gateway,
        },
    };
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn dec(raw: &str) -> Decimal {
        Decimal::from_str(raw).unwrap()
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("165").unwrap(), dec("165.00"));
        assert_eq!(parse_price(" 199.99 ").unwrap(), dec("199.99"));
        assert_eq!(parse_price("0.005").unwrap(), dec("0.01"));
        assert_eq!(parse_price("2.345").unwrap(), dec("2.35"));
        assert_eq!(parse_price("0").unwrap(), Decimal::ZERO);
        assert!(matches!(parse_price("-5"), Err(Error::InvalidPrice { .. })));
        assert!(matches!(parse_price("abc"), Err(Error::InvalidPrice { .. })));
        assert!(matches!(parse_price(""), Err(Error::InvalidPrice { .. })));
        assert!(matches!(parse_price("NaN"), Err(Error::InvalidPrice { .. })));
        assert!(matches!(parse_price("100000000"), Err(Error::InvalidPrice { .. })));
    }

    #[test]
    fn test_parse_quantity_defaults_to_zero() {
        assert_eq!(parse_quantity(" 7 "), 7);
        assert_eq!(parse_quantity(""), 0);
        assert_eq!(parse_quantity("abc"), 0);
        assert_eq!(parse_quantity("-3"), 0);
        assert_eq!(parse_quantity("3.5"), 0);
    }

    #[test]
    fn test_parse_normalises_optional_fields() {
        let form = ProductForm {
            description: "   ".to_string(),
            category: "terracotta_pot".to_string(),
            quantity: "4".to_string(),
            ..product_form("  Clay Pot  ", "45.5")
        };

        let input = ProductInput::parse(&form).unwrap();

        assert_eq!(input.name, "Clay Pot");
        assert_eq!(input.description, None);
        assert_eq!(input.category, Some(Category::TerracottaPot));
        assert_eq!(input.price, dec("45.50"));
        assert_eq!(input.quantity, 4);
    }

    #[test]
    fn test_parse_rejects_invalid_fields() {
        let empty = ProductInput::parse(&product_form("   ", "10"));
        assert!(matches!(empty, Err(Error::EmptyName)));

        let long = ProductInput::parse(&product_form(&"x".repeat(201), "10"));
        assert!(matches!(long, Err(Error::NameTooLong { max: 200 })));

        let category = ProductInput::parse(&ProductForm {
            category: "hanging_basket".to_string(),
            ..product_form("Basket", "10")
        });
        assert!(matches!(category, Err(Error::InvalidCategory { input }) if input == "hanging_basket"));

        let image = ProductInput::parse(&ProductForm {
            image: Some(png_upload("notes.txt")),
            ..product_form("Basket", "10")
        });
        assert!(matches!(image, Err(Error::DisallowedImage { file_name }) if file_name == "notes.txt"));
    }

    #[test]
    fn test_submission_signal_precedence() {
        let pre_uploaded = ProductForm {
            uploaded_image_url: "https://cdn.test/a.png".to_string(),
            image: Some(png_upload("b.png")),
            keep_image: "yes".to_string(),
            ..product_form("A", "1")
        }
        .into_submission()
        .unwrap();
        assert_eq!(
            pre_uploaded.intent,
            ImageIntent::PreUploaded {
                url: "https://cdn.test/a.png".to_string(),
                file_id: None,
            }
        );
        assert!(pre_uploaded.keep_image);

        let nameless_file = ProductForm {
            image: Some(ImageUpload::new(String::new(), Vec::new())),
            ..product_form("A", "1")
        }
        .into_submission()
        .unwrap();
        assert_eq!(nameless_file.intent, ImageIntent::Unspecified);

        let keep = ProductForm {
            keep_image: "yes".to_string(),
            ..product_form("A", "1")
        }
        .into_submission()
        .unwrap();
        assert_eq!(keep.intent, ImageIntent::Keep);
    }

    #[tokio::test]
    async fn test_validation_happens_before_any_io() {
        // No query results are queued: any database access would fail the test.
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let (gateway, provider) = configured_gateway();

        let form = ProductForm {
            image: Some(png_upload("aloe.png")),
            ..product_form("Aloe", "-5")
        };
        let result = create_product(&db, &gateway, form.clone()).await;
        assert!(matches!(result, Err(Error::InvalidPrice { .. })));

        let result = update_product(&db, &gateway, 1, form).await;
        assert!(matches!(result, Err(Error::InvalidPrice { .. })));

        assert_eq!(provider.put_count(), 0);
    }

    #[tokio::test]
    async fn test_create_round_trips_values() -> Result<()> {
        let db = setup_test_db().await?;
        let (gateway, _) = configured_gateway();

        let form = ProductForm {
            category: "ceramic_pot".to_string(),
            quantity: "10".to_string(),
            description: "Glazed, 20cm".to_string(),
            ..product_form("Ceramic Pot", "165.00")
        };
        let outcome = create_product(&db, &gateway, form).await?;

        let stored = get_product_by_id(&db, outcome.product.id).await?.unwrap();
        assert_eq!(stored.price.round_dp(2), dec("165.00"));
        assert_eq!(format!("{:.2}", stored.price), "165.00");
        assert_eq!(stored.quantity, 10);
        assert_eq!(stored.category, Some(Category::CeramicPot));
        assert_eq!(stored.description.as_deref(), Some("Glazed, 20cm"));
        assert_eq!(stored.created_at, stored.updated_at);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_without_image() -> Result<()> {
        let db = setup_test_db().await?;
        let (gateway, provider) = configured_gateway();

        let form = ProductForm {
            category: "indoor_plant".to_string(),
            quantity: "5".to_string(),
            ..product_form("Aloe", "199.99")
        };
        let outcome = create_product(&db, &gateway, form).await?;

        assert_eq!(outcome.image, ImageOutcome::NoImage);
        assert_eq!(outcome.product.name, "Aloe");
        assert_eq!(outcome.product.price.round_dp(2), dec("199.99"));
        assert_eq!(outcome.product.quantity, 5);
        assert_eq!(outcome.product.image_url, None);
        assert_eq!(outcome.product.image_file_id, None);
        assert_eq!(provider.put_count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_rejected_create_stores_nothing() -> Result<()> {
        let db = setup_test_db().await?;
        let (gateway, _) = configured_gateway();

        let result = create_product(&db, &gateway, product_form("Aloe", "-5")).await;

        assert!(result.unwrap_err().is_validation());
        assert_eq!(Product::find().count(&db).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_uploads_attached_file() -> Result<()> {
        let db = setup_test_db().await?;
        let (gateway, provider) = configured_gateway();

        let form = ProductForm {
            image: Some(png_upload("fern.png")),
            ..product_form("Fern", "59.00")
        };
        let outcome = create_product(&db, &gateway, form).await?;

        assert!(matches!(outcome.image, ImageOutcome::Stored(ImageRef::Hosted { .. })));
        assert_eq!(
            outcome.product.image_url.as_deref(),
            Some("https://images.test/plants_hub/fern.png")
        );
        assert_eq!(outcome.product.image_file_id.as_deref(), Some("file_1"));
        assert_eq!(provider.put_count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_survives_unconfigured_host() -> Result<()> {
        let db = setup_test_db().await?;
        let (gateway, provider) = unconfigured_gateway();

        let form = ProductForm {
            image: Some(png_upload("fern.png")),
            ..product_form("Fern", "59.00")
        };
        let outcome = create_product(&db, &gateway, form).await?;

        assert!(matches!(
            outcome.image,
            ImageOutcome::UploadFailed(ImageHostError::NotConfigured { .. })
        ));
        assert_eq!(outcome.product.image_url, None);
        assert_eq!(provider.put_count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_insert_discards_fresh_upload() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_exec_errors([DbErr::Custom("disk I/O error".to_string())])
            .into_connection();
        let (gateway, provider) = configured_gateway();

        let form = ProductForm {
            image: Some(png_upload("fern.png")),
            ..product_form("Fern", "59.00")
        };
        let result = create_product(&db, &gateway, form).await;

        assert!(matches!(result, Err(Error::Database(_))));
        assert_eq!(provider.deleted_ids(), vec!["file_1".to_string()]);
    }

    #[tokio::test]
    async fn test_update_with_keep_leaves_image_untouched() -> Result<()> {
        let db = setup_test_db().await?;
        let (gateway, provider) = configured_gateway();
        let product = create_hosted_product(&db, &gateway, "Snake Plant", "old").await?;

        let form = ProductForm {
            keep_image: "yes".to_string(),
            quantity: "3".to_string(),
            ..product_form("Snake Plant XL", "420")
        };
        let outcome = update_product(&db, &gateway, product.id, form).await?;

        assert_eq!(outcome.image, ImageOutcome::Kept);
        assert_eq!(outcome.released, None);
        let stored = get_product_by_id(&db, product.id).await?.unwrap();
        assert_eq!(stored.image_url, product.image_url);
        assert_eq!(stored.image_file_id, product.image_file_id);
        assert_eq!(stored.name, "Snake Plant XL");
        assert_eq!(stored.quantity, 3);
        assert_eq!(stored.created_at, product.created_at);
        assert!(stored.updated_at >= product.updated_at);
        assert!(provider.deleted_ids().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_update_without_signal_keeps_image() -> Result<()> {
        let db = setup_test_db().await?;
        let (gateway, provider) = configured_gateway();
        let product = create_hosted_product(&db, &gateway, "Snake Plant", "old").await?;

        let outcome =
            update_product(&db, &gateway, product.id, product_form("Snake Plant", "10")).await?;

        assert_eq!(outcome.product.image_file_id.as_deref(), Some("old"));
        assert!(provider.deleted_ids().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_update_replaces_and_releases_old_image() -> Result<()> {
        let db = setup_test_db().await?;
        let (gateway, provider) = configured_gateway();
        let product = create_hosted_product(&db, &gateway, "Snake Plant", "old").await?;

        let form = ProductForm {
            image: Some(png_upload("new.jpg")),
            ..product_form("Snake Plant", "10")
        };
        let outcome = update_product(&db, &gateway, product.id, form).await?;

        assert_eq!(
            outcome.product.image_url.as_deref(),
            Some("https://images.test/plants_hub/new.jpg")
        );
        assert_eq!(outcome.product.image_file_id.as_deref(), Some("file_1"));
        assert_eq!(
            outcome.released,
            Some(Release {
                file_id: "old".to_string(),
                error: None,
            })
        );
        assert_eq!(provider.deleted_ids(), vec!["old".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_keep_with_new_image_does_not_release() -> Result<()> {
        let db = setup_test_db().await?;
        let (gateway, provider) = configured_gateway();
        let product = create_hosted_product(&db, &gateway, "Snake Plant", "old").await?;

        let form = ProductForm {
            uploaded_image_url: "https://cdn.test/snake.png".to_string(),
            uploaded_image_id: "cdn_1".to_string(),
            keep_image: "yes".to_string(),
            ..product_form("Snake Plant", "10")
        };
        let outcome = update_product(&db, &gateway, product.id, form).await?;

        assert_eq!(outcome.product.image_file_id.as_deref(), Some("cdn_1"));
        assert_eq!(outcome.released, None);
        assert!(provider.deleted_ids().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_upload_keeps_previous_image() -> Result<()> {
        let db = setup_test_db().await?;
        let (seeding_gateway, _) = configured_gateway();
        let product = create_hosted_product(&db, &seeding_gateway, "Snake Plant", "old").await?;
        let (gateway, provider) = gateway_with(RecordingProvider::failing_uploads());

        let form = ProductForm {
            image: Some(png_upload("new.jpg")),
            ..product_form("Snake Plant", "12")
        };
        let outcome = update_product(&db, &gateway, product.id, form).await?;

        assert!(matches!(outcome.image, ImageOutcome::UploadFailed(_)));
        assert_eq!(outcome.product.image_url, product.image_url);
        assert_eq!(outcome.product.image_file_id.as_deref(), Some("old"));
        assert_eq!(outcome.product.price.round_dp(2), dec("12.00"));
        assert!(provider.deleted_ids().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_update_missing_product() -> Result<()> {
        let db = setup_test_db().await?;
        let (gateway, provider) = configured_gateway();

        let form = ProductForm {
            image: Some(png_upload("new.jpg")),
            ..product_form("Ghost", "1")
        };
        let result = update_product(&db, &gateway, 999, form).await;

        assert!(matches!(result, Err(Error::ProductNotFound { id: 999 })));
        assert_eq!(provider.put_count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_releases_hosted_image_once() -> Result<()> {
        let db = setup_test_db().await?;
        let (gateway, provider) = configured_gateway();
        let product = create_hosted_product(&db, &gateway, "Snake Plant", "img_42").await?;

        let outcome = delete_product(&db, &gateway, product.id).await?;

        assert_eq!(outcome.product.id, product.id);
        assert_eq!(provider.deleted_ids(), vec!["img_42".to_string()]);
        assert!(get_product_by_id(&db, product.id).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_succeeds_when_host_refuses() -> Result<()> {
        let db = setup_test_db().await?;
        let (seeding_gateway, _) = configured_gateway();
        let product = create_hosted_product(&db, &seeding_gateway, "Snake Plant", "img_42").await?;
        let (gateway, provider) = gateway_with(RecordingProvider::failing_deletes());

        let outcome = delete_product(&db, &gateway, product.id).await?;

        assert_eq!(provider.deleted_ids(), vec!["img_42".to_string()]);
        let released = outcome.released.unwrap();
        assert_eq!(released.file_id, "img_42");
        assert!(released.error.is_some());
        assert!(get_product_by_id(&db, product.id).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_without_hosted_image_makes_no_call() -> Result<()> {
        let db = setup_test_db().await?;
        let (gateway, provider) = configured_gateway();
        let product = create_test_product(&db, &gateway, "Cactus", "25").await?;

        let outcome = delete_product(&db, &gateway, product.id).await?;

        assert_eq!(outcome.released, None);
        assert!(provider.deleted_ids().is_empty());

        let missing = delete_product(&db, &gateway, product.id).await;
        assert!(matches!(missing, Err(Error::ProductNotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_seed_only_fills_empty_catalog() -> Result<()> {
        let db = setup_test_db().await?;
        let seeds = vec![
            SeedProduct {
                name: "Ceramic Pot".to_string(),
                price: "165.00".to_string(),
                category: Some("ceramic_pot".to_string()),
                quantity: 10,
                ..SeedProduct::default()
            },
            SeedProduct {
                name: "Snake Plant".to_string(),
                price: "349.50".to_string(),
                image: Some("snake_plant.jpg".to_string()),
                ..SeedProduct::default()
            },
        ];

        assert_eq!(seed_sample_products(&db, &seeds).await?, 2);
        assert_eq!(seed_sample_products(&db, &seeds).await?, 0);

        let snake = Product::find()
            .filter(product::Column::Name.eq("Snake Plant"))
            .one(&db)
            .await?
            .unwrap();
        assert_eq!(
            snake.image(),
            Some(ImageRef::Local {
                file_name: "snake_plant.jpg".to_string()
            })
        );
        assert_eq!(Product::find().count(&db).await?, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_seed_inserts_nothing() -> Result<()> {
        let db = setup_test_db().await?;
        let seeds = vec![
            SeedProduct {
                name: "Fine".to_string(),
                price: "1".to_string(),
                ..SeedProduct::default()
            },
            SeedProduct {
                name: "Broken".to_string(),
                price: "free".to_string(),
                ..SeedProduct::default()
            },
        ];

        let result = seed_sample_products(&db, &seeds).await;

        assert!(matches!(result, Err(Error::InvalidPrice { .. })));
        assert_eq!(Product::find().count(&db).await?, 0);
        Ok(())
    }
}
