//! Google OAuth2 credentials for the Drive API.
//!
//! A pipeline run authorizes once through a [`CredentialProvider`] and reuses
//! the resulting bearer token for every upload in that run.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// OAuth2 scope granting full Drive access.
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Bearer token with its expiry.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn authorize(&self) -> Result<AccessToken, AuthError>;
}

/// The fields of a service-account JSON key that the token exchange needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn from_json(json: &str) -> Result<Self, AuthError> {
        serde_json::from_str(json).map_err(AuthError::KeyFormat)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AuthError> {
        let json = std::fs::read_to_string(path.as_ref()).map_err(AuthError::KeyFile)?;
        Self::from_json(&json)
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    exp: i64,
    iat: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

/// Exchanges a signed JWT assertion for a Drive access token.
pub struct ServiceAccountCredentials {
    http: Client,
    key: ServiceAccountKey,
    scope: String,
}

impl ServiceAccountCredentials {
    pub fn new(http: Client, key: ServiceAccountKey) -> Self {
        Self {
            http,
            key,
            scope: DRIVE_SCOPE.to_string(),
        }
    }

    fn signed_assertion(&self, now: DateTime<Utc>) -> Result<String, AuthError> {
        let iat = now.timestamp();
        let claims = Claims {
            iss: &self.key.client_email,
            scope: &self.scope,
            aud: &self.key.token_uri,
            exp: iat + ASSERTION_LIFETIME_SECS,
            iat,
        };
        let key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())?;
        Ok(encode(&Header::new(Algorithm::RS256), &claims, &key)?)
    }
}

#[async_trait]
impl CredentialProvider for ServiceAccountCredentials {
    async fn authorize(&self) -> Result<AccessToken, AuthError> {
        let now = Utc::now();
        let assertion = self.signed_assertion(now)?;

        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = response.json().await?;
        tracing::debug!(
            client_email = %self.key.client_email,
            expires_in = token.expires_in,
            "Obtained Drive access token"
        );

        Ok(AccessToken {
            token: token.access_token,
            expires_at: now + Duration::seconds(token.expires_in),
        })
    }
}

/// A bearer token issued out of band.
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl CredentialProvider for StaticToken {
    async fn authorize(&self) -> Result<AccessToken, AuthError> {
        Ok(AccessToken {
            token: self.token.clone(),
            expires_at: Utc::now() + Duration::seconds(ASSERTION_LIFETIME_SECS),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Failed to read service account key: {0}")]
    KeyFile(std::io::Error),

    #[error("Malformed service account key: {0}")]
    KeyFormat(serde_json::Error),

    #[error("Failed to sign JWT assertion: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Token request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Token endpoint rejected credentials ({status}): {body}")]
    Rejected { status: u16, body: String },
}
