use axum::routing::get;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use product_image_pipeline::{
    app_state::AppState,
    config::AppConfig,
    db::{self, MemoryRequestStore, PgRequestStore, RequestStore},
    routes,
    services::{
        compression::Compressor,
        credentials::{CredentialProvider, ServiceAccountCredentials, ServiceAccountKey, StaticToken},
        fetch::ImageFetcher,
        pipeline::ImagePipeline,
        storage::DriveClient,
    },
};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing product-image-pipeline server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");

    metrics::describe_counter!("upload_requests_total", "Total CSV uploads accepted");
    metrics::describe_counter!(
        "images_processed_total",
        "Images fetched, compressed and uploaded"
    );
    metrics::describe_counter!(
        "images_failed_total",
        "Images skipped after a fetch, compression or upload failure"
    );
    metrics::describe_counter!(
        "pipeline_runs_completed",
        "Pipeline runs that reached the completed state"
    );
    metrics::describe_counter!(
        "pipeline_runs_failed",
        "Pipeline runs aborted by a systemic error"
    );
    metrics::describe_histogram!(
        "pipeline_duration_seconds",
        "Time to process every image of one request"
    );

    // Initialize the request store
    let store: Arc<dyn RequestStore> = match &config.database_url {
        Some(database_url) => {
            tracing::info!("Connecting to PostgreSQL database");
            let db_pool = db::init_pool(database_url)
                .await
                .expect("Failed to connect to database");

            tracing::info!("Running database migrations");
            db::run_migrations(&db_pool)
                .await
                .expect("Failed to run database migrations");

            Arc::new(PgRequestStore::new(db_pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, requests will be kept in memory");
            Arc::new(MemoryRequestStore::new())
        }
    };

    let http = reqwest::Client::new();

    // Initialize Google credentials
    let credentials: Arc<dyn CredentialProvider> = match &config.google_application_credentials {
        Some(path) => {
            tracing::info!(path = %path, "Loading service account key");
            let key = ServiceAccountKey::from_file(path).expect("Failed to load service account key");
            Arc::new(ServiceAccountCredentials::new(http.clone(), key))
        }
        None => {
            tracing::info!("Using pre-issued Google access token");
            let token = config
                .google_access_token
                .clone()
                .expect("Google credentials are checked by config validation");
            Arc::new(StaticToken::new(token))
        }
    };

    // Initialize Drive storage client
    tracing::info!(folder_id = %config.drive_folder_id, "Initializing Google Drive client");
    let drive = DriveClient::new(http.clone(), &config.drive_api_base, &config.drive_folder_id);

    let pipeline = ImagePipeline::new(
        Arc::clone(&store),
        credentials,
        Arc::new(drive),
        ImageFetcher::new(http),
        Compressor::new(config.jpeg_quality),
    );

    // Create shared application state
    let state = AppState::new(store, pipeline, &config.upload_dir, config.max_upload_bytes);

    // Build API routes
    let app = routes::api_router(state)
        // Prometheus metrics endpoint
        .route(
            "/metrics",
            get(move || {
                let handle = prometheus_handle.clone();
                async move { handle.render() }
            }),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(routes::body_limit(
            config.max_upload_bytes,
        )));

    tracing::info!("Starting product-image-pipeline on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}
