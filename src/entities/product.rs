//! Product entity - Represents a plant or pot in the catalog.
//!
//! Products carry a fixed-point price, a stock quantity, an optional category from a fixed
//! catalogue and an optional image. The image is stored in two nullable columns
//! (`image_url`, `image_file_id`) and exposed to the rest of the crate as an [`ImageRef`].

use sea_orm::entity::prelude::*;
use sea_orm::{ActiveEnum, Iterable};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Product database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Unique identifier for the product
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name (e.g., "Snake Plant", "Glazed Ceramic Pot")
    pub name: String,
    /// Optional free-text description
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    /// Catalog category, unset for uncategorised products
    pub category: Option<Category>,
    /// Unit price with two fractional digits
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    /// Units in stock
    pub quantity: i32,
    /// Hosted image URL or bare local filename
    pub image_url: Option<String>,
    /// Provider-assigned id of the hosted image, used only for deletion
    pub image_file_id: Option<String>,
    /// When the product was created
    pub created_at: DateTime,
    /// When the product was last modified
    pub updated_at: DateTime,
}

/// Products stand alone; there are no relations.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Typed view over the image columns.
    #[must_use]
    pub fn image(&self) -> Option<ImageRef> {
        ImageRef::from_columns(self.image_url.as_deref(), self.image_file_id.as_deref())
    }
}

/// Fixed catalogue of product categories.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(50))")]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Glazed or unglazed ceramic pots
    #[sea_orm(string_value = "ceramic_pot")]
    CeramicPot,
    /// Plastic pots
    #[sea_orm(string_value = "plastic_pot")]
    PlasticPot,
    /// Terracotta and soil pots
    #[sea_orm(string_value = "terracotta_pot")]
    TerracottaPot,
    /// Fiber pots
    #[sea_orm(string_value = "fiber_pot")]
    FiberPot,
    /// Plants kept indoors
    #[sea_orm(string_value = "indoor_plant")]
    IndoorPlant,
    /// Plants kept outdoors
    #[sea_orm(string_value = "outdoor_plant")]
    OutdoorPlant,
    /// Painted or coloured pots
    #[sea_orm(string_value = "colorful_pot")]
    ColorfulPot,
    /// Anything else
    #[sea_orm(string_value = "other")]
    Other,
}

impl Category {
    /// Stored value, e.g. `terracotta_pot`.
    #[must_use]
    pub fn as_value(self) -> String {
        self.to_value()
    }

    /// Human readable label used by forms and listings.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::CeramicPot => "Ceramic Pot",
            Self::PlasticPot => "Plastic Pot",
            Self::TerracottaPot => "Terracotta/Soil Pot",
            Self::FiberPot => "Fiber Pot",
            Self::IndoorPlant => "Indoor Plant",
            Self::OutdoorPlant => "Outdoor Plant",
            Self::ColorfulPot => "Colorful Pot",
            Self::Other => "Other",
        }
    }

    /// All categories in display order.
    pub fn all() -> impl Iterator<Item = Self> {
        Self::iter()
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::iter()
            .find(|category| category.to_value() == s)
            .ok_or_else(|| s.to_string())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Where a product image lives.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImageRef {
    /// A file served from the local static directory
    Local {
        /// Bare filename or `/static/...` path
        file_name: String,
    },
    /// An object stored with the external image host
    Hosted {
        /// Public fetch URL returned by the provider
        url: String,
        /// Provider id; absent when the URL was supplied without one
        file_id: Option<String>,
    },
}

impl ImageRef {
    /// Decodes the stored column pair. Empty URLs mean "no image".
    #[must_use]
    pub fn from_columns(image_url: Option<&str>, image_file_id: Option<&str>) -> Option<Self> {
        let url = image_url.map(str::trim).filter(|u| !u.is_empty())?;
        if url.starts_with("http://") || url.starts_with("https://") {
            Some(Self::Hosted {
                url: url.to_string(),
                file_id: image_file_id
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(ToString::to_string),
            })
        } else {
            Some(Self::Local {
                file_name: url.to_string(),
            })
        }
    }

    /// Encodes into `(image_url, image_file_id)`. Local images never carry an id.
    #[must_use]
    pub fn into_columns(image: Option<Self>) -> (Option<String>, Option<String>) {
        match image {
            None => (None, None),
            Some(Self::Local { file_name }) => (Some(file_name), None),
            Some(Self::Hosted { url, file_id }) => (Some(url), file_id),
        }
    }

    /// URL a browser can fetch the image from.
    #[must_use]
    pub fn display_url(&self) -> String {
        match self {
            Self::Hosted { url, .. } => url.clone(),
            Self::Local { file_name } if file_name.starts_with("/static/") => file_name.clone(),
            Self::Local { file_name } => format!("/static/images/{file_name}"),
        }
    }

    /// Provider id to release when this image is replaced or its product deleted.
    #[must_use]
    pub fn hosted_file_id(&self) -> Option<&str> {
        match self {
            Self::Hosted {
                file_id: Some(id), ..
            } => Some(id),
            _ => None,
        }
    }
}
