//! Database configuration module for Plants Hub.
//!
//! This module resolves the connection string, connects, and creates the `products` table
//! using `SeaORM`'s `Schema::create_table_from_entity`, so the schema always matches the
//! entity definition. SQLite is used when no `DATABASE_URL` is configured; Postgres URLs
//! copied from hosting dashboards are normalised to a scheme the sqlx driver accepts.

use crate::entities::Product;
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, Schema};
use tracing::{debug, info};

/// Local file-backed store used when no connection string is configured.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://plants.db?mode=rwc";

/// Resolves the connection string to use.
///
/// An absent or blank value falls back to [`DEFAULT_DATABASE_URL`]. The legacy `postgres://`
/// scheme and SQLAlchemy driver-qualified schemes (`postgresql+psycopg2://`) are rewritten
/// to `postgresql://`.
#[must_use]
pub fn normalize_database_url(raw: Option<&str>) -> String {
    let Some(url) = raw.map(str::trim).filter(|u| !u.is_empty()) else {
        return DEFAULT_DATABASE_URL.to_string();
    };

    if let Some(rest) = url.strip_prefix("postgres://") {
        return format!("postgresql://{rest}");
    }

    if let Some((scheme, rest)) = url.split_once("://") {
        if let Some(("postgresql", _driver)) = scheme.split_once('+') {
            return format!("postgresql://{rest}");
        }
    }

    url.to_string()
}

/// Establishes a connection to the database.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    debug!("Connecting to database backend");
    Database::connect(database_url).await.map_err(Into::into)
}

/// Creates the `products` table from the entity definition if it does not exist yet.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut product_table = schema.create_table_from_entity(Product);
    product_table.if_not_exists();

    db.execute(builder.build(&product_table)).await?;

    Ok(())
}

/// Adds the `image_file_id` column to databases created before hosted images existed.
///
/// Idempotent: Postgres uses `ADD COLUMN IF NOT EXISTS`, SQLite reports a duplicate
/// column which is ignored.
pub async fn migrate_legacy_schema(db: &DatabaseConnection) -> Result<()> {
    let backend = db.get_database_backend();
    let sql = match backend {
        DatabaseBackend::Postgres => {
            "ALTER TABLE products ADD COLUMN IF NOT EXISTS image_file_id VARCHAR(200)"
        }
        _ => {
            "ALTER TABLE products ADD COLUMN image_file_id VARCHAR(200)"
        }
    };

    match db.execute_unprepared(sql).await {
        Ok(_) => info!("Added image_file_id column to products table"),
        Err(e) if e.to_string().to_lowercase().contains("duplicate column") => {
            debug!("image_file_id column already present");
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}

/// Connects, creates the schema and applies legacy migrations.
pub async fn init_db(database_url: &str) -> Result<DatabaseConnection> {
    let db = create_connection(database_url).await?;
    create_tables(&db).await?;
    migrate_legacy_schema(&db).await?;
    Ok(db)
}
