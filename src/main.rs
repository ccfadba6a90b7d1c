use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use opk_controlling::{api, create_pool, AppConfig, ImportService};
use std::sync::Arc;
use tower::ServiceBuilder;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;

/// Limit rozmiaru wgrywanego pliku (multipart)
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logi z czasem lokalnym
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    // Konfiguracja (Debug ukrywa URL bazy)
    let config = AppConfig::from_env();
    info!("Starting server with config: {:?}", config);

    let pool = create_pool(&config.database.url).await?;
    info!("Database pool created");

    let import_service = Arc::new(ImportService::new(pool));

    let app = Router::new()
        .route("/", get(api::index))
        .route("/health", get(api::health_check))
        .route("/api/import", post(api::import_file))
        .with_state(import_service)
        .layer(ServiceBuilder::new().layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("Endpoints:");
    info!("  GET  /            - formularz importu");
    info!("  POST /api/import  - import pliku XLSX/CSV");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
