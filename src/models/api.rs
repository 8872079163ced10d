use serde::{Deserialize, Serialize};

use crate::models::request::{ImageRequest, Outcome, Product, RequestStatus};

/// Response after accepting a CSV upload.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub request_id: String,
}

/// Response for querying request status.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: RequestStatus,
    pub products: Vec<Product>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub outcome: Option<Outcome>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl From<ImageRequest> for StatusResponse {
    fn from(request: ImageRequest) -> Self {
        Self {
            outcome: request.outcome(),
            status: request.status,
            products: request.products,
            error: request.error,
        }
    }
}
