use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::services::credentials::AccessToken;

/// Destination for compressed images.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Store `data` under `file_name` and return a public URL for it.
    async fn upload(
        &self,
        token: &AccessToken,
        file_name: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError>;
}

/// Public view URL for a Drive file id.
pub fn view_url(file_id: &str) -> String {
    format!("https://drive.google.com/uc?id={file_id}&export=view")
}

/// Client for Google Drive v3 multipart uploads.
pub struct DriveClient {
    http: Client,
    api_base: String,
    folder_id: String,
}

#[derive(Deserialize)]
struct DriveFile {
    id: String,
}

impl DriveClient {
    pub fn new(http: Client, api_base: &str, folder_id: &str) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            folder_id: folder_id.to_string(),
        }
    }

    fn upload_url(&self) -> String {
        format!(
            "{}/upload/drive/v3/files?uploadType=multipart&fields=id",
            self.api_base
        )
    }
}

/// Build a `multipart/related` body: JSON metadata followed by the media part.
fn related_body(boundary: &str, metadata: &serde_json::Value, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(data.len() + 512);
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("--{boundary}\r\nContent-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

#[async_trait]
impl ImageStore for DriveClient {
    async fn upload(
        &self,
        token: &AccessToken,
        file_name: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let boundary = format!("drive-{}", uuid::Uuid::new_v4().simple());
        let metadata = serde_json::json!({
            "name": file_name,
            "parents": [self.folder_id],
        });
        let body = related_body(&boundary, &metadata, content_type, &data);

        let response = self
            .http
            .post(self.upload_url())
            .bearer_auth(&token.token)
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={boundary}"),
            )
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let file: DriveFile = response.json().await?;
        tracing::debug!(file_id = %file.id, file_name, "Uploaded image to Drive");
        Ok(view_url(&file.id))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Drive request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Drive rejected upload ({status}): {body}")]
    Rejected { status: u16, body: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use wiremock::matchers::{header, header_regex, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn token() -> AccessToken {
        AccessToken {
            token: "test-token".to_string(),
            expires_at: Utc::now(),
        }
    }

    #[test]
    fn test_related_body_layout() {
        let metadata = serde_json::json!({"name": "x.jpg", "parents": ["folder"]});
        let body = related_body("b", &metadata, "image/jpeg", b"JPEG");
        let text = String::from_utf8(body).unwrap();

        assert!(text.starts_with("--b\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{"));
        assert!(text.contains("\"parents\":[\"folder\"]"));
        assert!(text.contains("--b\r\nContent-Type: image/jpeg\r\n\r\nJPEG\r\n--b--\r\n"));
    }

    #[test]
    fn test_view_url_format() {
        assert_eq!(
            view_url("abc123"),
            "https://drive.google.com/uc?id=abc123&export=view"
        );
    }

    #[tokio::test]
    async fn test_upload_returns_view_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload/drive/v3/files"))
            .and(query_param("uploadType", "multipart"))
            .and(header("authorization", "Bearer test-token"))
            .and(header_regex("content-type", "^multipart/related; boundary=drive-"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "file-9"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = DriveClient::new(Client::new(), &server.uri(), "folder");
        let url = client
            .upload(&token(), "x.jpg", b"JPEG".to_vec(), "image/jpeg")
            .await
            .unwrap();
        assert_eq!(url, view_url("file-9"));
    }

    #[tokio::test]
    async fn test_upload_rejection_carries_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("insufficient permissions"))
            .mount(&server)
            .await;

        let client = DriveClient::new(Client::new(), &server.uri(), "folder");
        let err = client
            .upload(&token(), "x.jpg", vec![], "image/jpeg")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Rejected { status: 403, .. }));
    }
}
