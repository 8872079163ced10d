use reqwest::Client;

/// Downloads source images over HTTP.
///
/// No timeout and no content-type check are applied; anything that fails to
/// decode is rejected later by the compressor.
#[derive(Debug, Clone, Default)]
pub struct ImageFetcher {
    http: Client,
}

impl ImageFetcher {
    pub fn new(http: Client) -> Self {
        Self { http }
    }

    /// Fetch `url` as raw bytes. Non-2xx responses are errors.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?;

        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Image download failed: {0}")]
    Http(#[from] reqwest::Error),
}
