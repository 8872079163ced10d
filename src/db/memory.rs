use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::db::{RequestStore, StoreError};
use crate::models::request::{ImageRequest, Product, RequestStatus};

/// In-process request store for runs without Postgres. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryRequestStore {
    requests: RwLock<HashMap<String, ImageRequest>>,
}

impl MemoryRequestStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RequestStore for MemoryRequestStore {
    async fn create(
        &self,
        request_id: &str,
        products: Vec<Product>,
        status: RequestStatus,
    ) -> Result<ImageRequest, StoreError> {
        let mut requests = self.requests.write().await;
        if requests.contains_key(request_id) {
            return Err(StoreError::Duplicate(request_id.to_string()));
        }
        let request = ImageRequest::new(request_id, products, status);
        requests.insert(request_id.to_string(), request.clone());
        Ok(request)
    }

    async fn find_by_id(&self, request_id: &str) -> Result<Option<ImageRequest>, StoreError> {
        Ok(self.requests.read().await.get(request_id).cloned())
    }

    async fn save(&self, request: &ImageRequest) -> Result<(), StoreError> {
        let mut requests = self.requests.write().await;
        let stored = requests
            .get_mut(&request.request_id)
            .ok_or_else(|| StoreError::NotFound(request.request_id.clone()))?;
        stored.products = request.products.clone();
        stored.status = request.status;
        stored.error = request.error.clone();
        stored.updated_at = Utc::now();
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
