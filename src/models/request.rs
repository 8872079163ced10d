use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Lifecycle of an image compression request.
///
/// Ordering follows the lifecycle: a request only ever moves to a later
/// variant, and `Completed`/`Failed` are terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl RequestStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Failed)
    }
}

/// How many products of a completed request got all their images through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Succeeded,
    Partial,
    #[serde(rename = "none")]
    NoneSucceeded,
}

/// One row of an uploaded CSV.
///
/// Fields are optional because short rows are accepted as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub serial_number: Option<i64>,
    pub product_name: Option<String>,
    #[serde(default)]
    pub input_urls: Vec<String>,
    #[serde(default)]
    pub output_urls: Vec<String>,
    #[serde(default)]
    pub succeeded: bool,
}

impl Product {
    /// Recompute `succeeded` from the URLs collected so far.
    pub fn settle(&mut self) {
        self.succeeded =
            !self.input_urls.is_empty() && self.output_urls.len() == self.input_urls.len();
    }
}

/// A CSV upload tracked by its request id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRequest {
    pub request_id: String,
    pub products: Vec<Product>,
    pub status: RequestStatus,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ImageRequest {
    pub fn new(request_id: impl Into<String>, products: Vec<Product>, status: RequestStatus) -> Self {
        let now = Utc::now();
        Self {
            request_id: request_id.into(),
            products,
            status,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move the request to `next`, refusing to go backwards or leave a terminal state.
    pub fn transition(&mut self, next: RequestStatus) -> Result<(), InvalidTransition> {
        if self.status.is_terminal() || next < self.status {
            return Err(InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Mark the run finished. Per-image failures do not prevent completion.
    pub fn complete(&mut self) -> Result<(), InvalidTransition> {
        for product in &mut self.products {
            product.settle();
        }
        self.transition(RequestStatus::Completed)
    }

    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), InvalidTransition> {
        self.transition(RequestStatus::Failed)?;
        self.error = Some(reason.into());
        Ok(())
    }

    /// Only meaningful once the request is completed.
    pub fn outcome(&self) -> Option<Outcome> {
        if self.status != RequestStatus::Completed {
            return None;
        }
        let succeeded = self.products.iter().filter(|p| p.succeeded).count();
        Some(if succeeded == 0 {
            Outcome::NoneSucceeded
        } else if succeeded == self.products.len() {
            Outcome::Succeeded
        } else {
            Outcome::Partial
        })
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Invalid status transition from {from} to {to}")]
pub struct InvalidTransition {
    pub from: RequestStatus,
    pub to: RequestStatus,
}
