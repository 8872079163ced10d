//! Test helper utilities: mock Google/image backends and router plumbing.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::sleep;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use product_image_pipeline::app_state::AppState;
use product_image_pipeline::db::{MemoryRequestStore, RequestStore};
use product_image_pipeline::routes;
use product_image_pipeline::services::compression::Compressor;
use product_image_pipeline::services::credentials::{CredentialProvider, StaticToken};
use product_image_pipeline::services::csv_rewrite::OUTPUT_COLUMN;
use product_image_pipeline::services::fetch::ImageFetcher;
use product_image_pipeline::services::pipeline::ImagePipeline;
use product_image_pipeline::services::storage::DriveClient;

use crate::fixtures;

pub const TEST_TOKEN: &str = "ya29.test-token";
pub const BOUNDARY: &str = "product-image-pipeline-test";
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Serve `png_bytes()` at `route`, optionally after a delay.
pub async fn mount_image(server: &MockServer, route: &str, delay: Duration) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(fixtures::png_bytes())
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

/// Mock Drive upload endpoint handing out ids `file-1`, `file-2`, ...
pub async fn mount_drive(server: &MockServer) {
    let counter = Arc::new(AtomicUsize::new(0));
    Mock::given(method("POST"))
        .and(path("/upload/drive/v3/files"))
        .respond_with(move |_: &wiremock::Request| {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": format!("file-{n}") }))
        })
        .mount(server)
        .await;
}

pub fn pipeline(
    store: Arc<dyn RequestStore>,
    credentials: Arc<dyn CredentialProvider>,
    drive_uri: &str,
) -> ImagePipeline {
    ImagePipeline::new(
        store,
        credentials,
        Arc::new(DriveClient::new(reqwest::Client::new(), drive_uri, "test-folder")),
        ImageFetcher::default(),
        Compressor::default(),
    )
}

/// A router wired to an in-memory store and a mock Drive.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub upload_dir: TempDir,
}

impl TestApp {
    pub fn new(drive_uri: &str) -> Self {
        Self::with_credentials(drive_uri, Arc::new(StaticToken::new(TEST_TOKEN)))
    }

    pub fn with_credentials(drive_uri: &str, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self::build(drive_uri, credentials, MAX_UPLOAD_BYTES)
    }

    pub fn with_upload_limit(drive_uri: &str, max_upload_bytes: usize) -> Self {
        Self::build(
            drive_uri,
            Arc::new(StaticToken::new(TEST_TOKEN)),
            max_upload_bytes,
        )
    }

    fn build(
        drive_uri: &str,
        credentials: Arc<dyn CredentialProvider>,
        max_upload_bytes: usize,
    ) -> Self {
        let upload_dir = tempfile::tempdir().expect("tempdir");
        let store: Arc<dyn RequestStore> = Arc::new(MemoryRequestStore::new());
        let state = AppState::new(
            Arc::clone(&store),
            pipeline(store, credentials, drive_uri),
            upload_dir.path(),
            max_upload_bytes,
        );
        let router = routes::api_router(state.clone());
        Self {
            router,
            state,
            upload_dir,
        }
    }

    pub async fn upload(&self, csv: &str) -> (StatusCode, Value) {
        let body = multipart_body("file", "products.csv", csv);
        let request = Request::post("/api/upload")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("request");
        send(&self.router, request).await
    }

    pub async fn status(&self, request_id: &str) -> (StatusCode, Value) {
        let request = Request::get(format!("/api/status/{request_id}"))
            .body(Body::empty())
            .expect("request");
        send(&self.router, request).await
    }

    /// Poll the status endpoint until the request leaves `processing`.
    pub async fn wait_for_terminal(&self, request_id: &str) -> Value {
        for _ in 0..100 {
            let (code, body) = self.status(request_id).await;
            assert_eq!(code, StatusCode::OK);
            match body["status"].as_str() {
                Some("completed") | Some("failed") => return body,
                _ => sleep(Duration::from_millis(50)).await,
            }
        }
        panic!("request {request_id} did not finish within 5 seconds");
    }

    pub fn csv_path(&self, request_id: &str) -> std::path::PathBuf {
        self.upload_dir.path().join(format!("{request_id}.csv"))
    }

    /// Poll the job's CSV until the output column has been written.
    ///
    /// The rewrite happens after the request is saved as completed, so a
    /// terminal status alone does not mean the file is up to date.
    pub async fn wait_for_rewritten_csv(&self, request_id: &str) -> String {
        let path = self.csv_path(request_id);
        for _ in 0..100 {
            if let Ok(contents) = tokio::fs::read_to_string(&path).await {
                let rewritten = contents
                    .lines()
                    .next()
                    .is_some_and(|header| header.ends_with(OUTPUT_COLUMN));
                if rewritten {
                    return contents;
                }
            }
            sleep(Duration::from_millis(50)).await;
        }
        panic!("CSV for {request_id} was not rewritten within 5 seconds");
    }
}

pub fn multipart_body(field: &str, file_name: &str, contents: &str) -> String {
    format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
         Content-Type: text/csv\r\n\r\n\
         {contents}\r\n\
         --{BOUNDARY}--\r\n"
    )
}

pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.expect("router response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body");
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}
