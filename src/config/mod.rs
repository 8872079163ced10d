use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000").
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// PostgreSQL connection string. Requests are kept in memory when unset.
    pub database_url: Option<String>,

    /// Directory where uploaded CSVs are written, one file per request.
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,

    /// Maximum accepted request body in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// JPEG quality used when recompressing images (1-100)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    /// Google Drive folder that receives compressed images
    pub drive_folder_id: String,

    /// Google API origin, overridable for local testing
    #[serde(default = "default_drive_api_base")]
    pub drive_api_base: String,

    /// Path to a service-account JSON key
    pub google_application_credentials: Option<String>,

    /// Pre-issued OAuth2 bearer token, used when no key path is set
    pub google_access_token: Option<String>,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_upload_dir() -> String {
    "uploads".to_string()
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_jpeg_quality() -> u8 {
    50
}

fn default_drive_api_base() -> String {
    "https://www.googleapis.com".to_string()
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let config: Self = envy::from_env()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(ConfigError::Invalid(format!(
                "JPEG_QUALITY must be between 1 and 100, got {}",
                self.jpeg_quality
            )));
        }
        if self.google_application_credentials.is_none() && self.google_access_token.is_none() {
            return Err(ConfigError::Invalid(
                "either GOOGLE_APPLICATION_CREDENTIALS or GOOGLE_ACCESS_TOKEN must be set"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read environment: {0}")]
    Env(#[from] envy::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
