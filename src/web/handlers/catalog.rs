//! `GET /` - the catalog listing.

use crate::{
    core::catalog::{self, CatalogFilter, CatalogQuery, CategoryOption},
    web::{AppState, views::ProductView},
};
use axum::{
    Json,
    extract::{Query, State},
};
use serde::Serialize;

/// Listing response.
#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    /// Matching products, newest first
    pub products: Vec<ProductView>,
    /// Distinct product names for autocomplete
    pub suggestions: Vec<String>,
    /// All categories
    pub categories: Vec<CategoryOption>,
    /// Filters as applied
    pub filters: CatalogFilter,
    /// Number of matching products
    pub total_count: usize,
    /// Set when the catalog could not be loaded
    pub error: Option<String>,
}

pub(crate) async fn index(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Json<CatalogResponse> {
    let filters = CatalogFilter::from_query(&query);
    let page = catalog::load_catalog(&state.db, &filters).await;

    Json(CatalogResponse {
        total_count: page.products.len(),
        products: page.products.into_iter().map(ProductView::from).collect(),
        suggestions: page.suggestions,
        categories: catalog::category_options(),
        filters,
        error: page.error,
    })
}
