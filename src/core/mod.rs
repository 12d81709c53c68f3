/// Catalog search, filtering and autocomplete
pub mod catalog;
/// Replace-vs-keep image decisions for product edits
pub mod image_policy;
/// Product validation and create/update/delete operations
pub mod product;
