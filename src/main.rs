use dotenvy::dotenv;
use plants_hub::{
    config::{self, database},
    core::product,
    errors::Result,
    images::ImageGateway,
    web::{self, AppState},
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; variables may also be set externally
    dotenv().ok();

    // 3. Load configuration (plants_hub.toml + environment)
    let app_config = config::load_app_config()
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;

    // 4. Initialize database and schema
    let db = database::init_db(&app_config.database_url)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    // 5. Seed sample products into an empty catalog
    product::seed_sample_products(&db, &app_config.seed_products)
        .await
        .inspect_err(|e| error!("Failed to seed sample products: {}", e))?;

    // 6. Wire the image host
    let gateway = ImageGateway::from_settings(&app_config.images)?;

    // 7. Serve
    let bind_addr = app_config.bind_addr;
    let app = web::build_router(AppState {
        db: Arc::new(db),
        gateway,
        config: Arc::new(app_config),
    });

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .inspect_err(|e| error!("Failed to bind {}: {}", bind_addr, e))?;
    info!("Plants Hub listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
