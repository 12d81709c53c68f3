//! Catalog listing - search, filter and autocomplete over the product table.
//!
//! Every filter is optional and they combine with AND. A filter that is absent or that
//! fails to parse contributes no predicate at all, so `CatalogQuery::default()` lists the
//! whole catalog. Results are newest first; products created in the same instant keep
//! their insertion order.

use crate::{
    entities::{Category, Product, product},
    errors::{Error, Result},
};
use sea_orm::{
    Condition, QueryOrder, QuerySelect,
    prelude::*,
    sea_query::{BinOper, Func, SimpleExpr},
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{debug, error};

/// Raw listing parameters exactly as received in the query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogQuery {
    /// Free-text search over name and description
    pub search: Option<String>,
    /// Category value, `all` or empty for no filter
    pub category: Option<String>,
    /// Inclusive lower price bound
    pub min_price: Option<String>,
    /// Inclusive upper price bound
    pub max_price: Option<String>,
}

/// Normalised filters. Constructed from a [`CatalogQuery`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogFilter {
    /// Trimmed search text
    pub search: Option<String>,
    /// Exact category value; may name no known category
    pub category: Option<String>,
    /// Inclusive lower price bound
    pub min_price: Option<Decimal>,
    /// Inclusive upper price bound
    pub max_price: Option<Decimal>,
}

/// A category as offered by listing and form views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryOption {
    /// Stored value
    pub value: String,
    /// Display label
    pub label: &'static str,
}

/// Everything the listing view needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CatalogPage {
    /// Matching products, newest first
    pub products: Vec<product::Model>,
    /// Distinct product names for autocomplete
    pub suggestions: Vec<String>,
    /// Set when the catalog could not be loaded
    pub error: Option<String>,
}

fn trimmed(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_bound(value: Option<&String>) -> Option<Decimal> {
    let raw = trimmed(value)?;
    match Decimal::from_str(&raw) {
        Ok(bound) => Some(bound),
        Err(_) => {
            debug!(input = %raw, "Ignoring malformed price bound");
            None
        }
    }
}

/// Escape character used in LIKE patterns.
const LIKE_ESCAPE: char = '\\';

/// Escapes LIKE wildcards so user input matches literally, and wraps it for substring search.
///
/// Case is left alone; folding happens in SQL so both sides use the backend's `LOWER`.
fn like_pattern(search: &str) -> String {
    let mut escaped = String::with_capacity(search.len() + 2);
    escaped.push('%');
    for c in search.chars() {
        if matches!(c, LIKE_ESCAPE | '%' | '_') {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

impl CatalogFilter {
    /// Normalises raw query parameters. Malformed price bounds are dropped.
    #[must_use]
    pub fn from_query(query: &CatalogQuery) -> Self {
        Self {
            search: trimmed(query.search.as_ref()),
            category: trimmed(query.category.as_ref()).filter(|c| c != "all"),
            min_price: parse_bound(query.min_price.as_ref()),
            max_price: parse_bound(query.max_price.as_ref()),
        }
    }

    /// The conjunction of all active filters.
    #[must_use]
    pub fn condition(&self) -> Condition {
        let mut condition = Condition::all();

        if let Some(search) = &self.search {
            // LOWER(col) LIKE LOWER(pattern) ESCAPE '\'
            let pattern = like_pattern(search);
            let lowered = |column: product::Column| {
                let escaped_pattern = SimpleExpr::Binary(
                    Box::new(Func::lower(Expr::val(pattern.clone())).into()),
                    BinOper::Escape,
                    Box::new(SimpleExpr::Constant(LIKE_ESCAPE.into())),
                );
                Expr::expr(Func::lower(Expr::col((Product, column))))
                    .binary(BinOper::Like, escaped_pattern)
            };
            condition = condition.add(
                Condition::any()
                    .add(lowered(product::Column::Name))
                    .add(lowered(product::Column::Description)),
            );
        }

        if let Some(category) = &self.category {
            condition = condition.add(product::Column::Category.eq(category.clone()));
        }

        if let Some(min_price) = self.min_price {
            condition = condition.add(product::Column::Price.gte(min_price));
        }

        if let Some(max_price) = self.max_price {
            condition = condition.add(product::Column::Price.lte(max_price));
        }

        condition
    }
}

/// The fixed category catalogue in display order.
#[must_use]
pub fn category_options() -> Vec<CategoryOption> {
    Category::all()
        .map(|category| CategoryOption {
            value: category.as_value(),
            label: category.label(),
        })
        .collect()
}

/// Returns the products matching `filter`, newest first.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn search_products(
    db: &DatabaseConnection,
    filter: &CatalogFilter,
) -> Result<Vec<product::Model>> {
    Product::find()
        .filter(filter.condition())
        .order_by_desc(product::Column::CreatedAt)
        .order_by_asc(product::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Distinct names of every product, sorted case-insensitively.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn product_name_suggestions(db: &DatabaseConnection) -> Result<Vec<String>> {
    let mut names: Vec<String> = Product::find()
        .select_only()
        .column(product::Column::Name)
        .distinct()
        .into_tuple()
        .all(db)
        .await?;

    names.sort_by(|a, b| {
        a.to_lowercase()
            .cmp(&b.to_lowercase())
            .then_with(|| a.cmp(b))
    });
    names.dedup();
    Ok(names)
}

/// Loads the listing and the autocomplete names.
///
/// A failing query never propagates: the page comes back empty with `error` set.
pub async fn load_catalog(db: &DatabaseConnection, filter: &CatalogFilter) -> CatalogPage {
    let loaded = async {
        let products = search_products(db, filter).await?;
        let suggestions = product_name_suggestions(db).await?;
        Ok::<_, Error>((products, suggestions))
    }
    .await;

    match loaded {
        Ok((products, suggestions)) => {
            debug!(count = products.len(), ?filter, "Loaded catalog");
            CatalogPage {
                products,
                suggestions,
                error: None,
            }
        }
        Err(e) => {
            error!("Failed to load catalog: {e}");
            CatalogPage {
                error: Some(format!("Error loading products: {e}")),
                ..CatalogPage::default()
            }
        }
    }
}
