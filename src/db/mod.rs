use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

use crate::models::request::{ImageRequest, Product, RequestStatus};

pub mod memory;
pub mod queries;

pub use memory::MemoryRequestStore;

/// Initialize PostgreSQL connection pool
pub async fn init_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(database_url)
        .await
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| sqlx::Error::Migrate(Box::new(e)))
}

/// Persistence for image requests.
///
/// `save` overwrites the whole document; there is no partial update.
#[async_trait]
pub trait RequestStore: Send + Sync {
    async fn create(
        &self,
        request_id: &str,
        products: Vec<Product>,
        status: RequestStatus,
    ) -> Result<ImageRequest, StoreError>;

    async fn find_by_id(&self, request_id: &str) -> Result<Option<ImageRequest>, StoreError>;

    async fn save(&self, request: &ImageRequest) -> Result<(), StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

/// Postgres-backed request store.
#[derive(Clone)]
pub struct PgRequestStore {
    pool: PgPool,
}

impl PgRequestStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RequestStore for PgRequestStore {
    async fn create(
        &self,
        request_id: &str,
        products: Vec<Product>,
        status: RequestStatus,
    ) -> Result<ImageRequest, StoreError> {
        queries::create_request(&self.pool, request_id, products, status).await
    }

    async fn find_by_id(&self, request_id: &str) -> Result<Option<ImageRequest>, StoreError> {
        queries::get_request(&self.pool, request_id).await
    }

    async fn save(&self, request: &ImageRequest) -> Result<(), StoreError> {
        queries::save_request(&self.pool, request).await
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Request {0} already exists")]
    Duplicate(String),

    #[error("Request {0} not found")]
    NotFound(String),

    #[error("Stored status is not recognized: {0}")]
    UnknownStatus(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}
