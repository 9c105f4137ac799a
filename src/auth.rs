use async_trait::async_trait;
use gcloud_sdk::{GoogleAuthTokenGenerator, TokenSourceType};

use crate::{with_cancellation, CancellationToken, ConfigError, FCMError, ServiceAccountInfo};

/// OAuth2 scope required to call `messages:send`.
pub const FIREBASE_MESSAGING_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";

/// [AccessTokenProvider] hands out bearer tokens for the v1 API.
///
/// Implementations are called once per send and may cache internally.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// Returns the whole `Authorization` header value, e.g. `Bearer ya29.c.b0A...`.
    ///
    /// The client sends it as is. An empty value aborts the send.
    async fn header_token(&self, cancel: &CancellationToken) -> Result<String, FCMError>;
}

/// [GoogleTokenProvider] exchanges a service account key for access tokens through `gcloud-sdk`.
pub struct GoogleTokenProvider {
    token_gen: GoogleAuthTokenGenerator,
}

impl GoogleTokenProvider {
    pub async fn from_service_account(account: &ServiceAccountInfo) -> Result<Self, ConfigError> {
        let token_gen = GoogleAuthTokenGenerator::new(
            TokenSourceType::Json(account.json.clone()),
            vec![FIREBASE_MESSAGING_SCOPE.to_string()],
        )
        .await
        .map_err(|e| ConfigError::TokenProvider(format!("{e:?}")))?;
        Ok(Self { token_gen })
    }
}

#[async_trait]
impl AccessTokenProvider for GoogleTokenProvider {
    async fn header_token(&self, cancel: &CancellationToken) -> Result<String, FCMError> {
        let token = with_cancellation(cancel, async {
            self.token_gen
                .create_token()
                .await
                .map_err(|e| FCMError::AccessToken(format!("{e:?}")))
        })
        .await?;
        Ok(token.header_value())
    }
}

/// Always returns the same token. Handy for emulators and short-lived scripts.
#[derive(Clone)]
pub struct StaticTokenProvider(String);

impl StaticTokenProvider {
    /// `token` is the bare access token; the `Bearer ` scheme is added on use.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl AccessTokenProvider for StaticTokenProvider {
    async fn header_token(&self, _cancel: &CancellationToken) -> Result<String, FCMError> {
        if self.0.is_empty() {
            return Ok(String::new());
        }
        Ok(format!("Bearer {}", self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_provider_renders_bearer_header() {
        let provider = StaticTokenProvider::new("ya29.token");
        let header = provider
            .header_token(&CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(header, "Bearer ya29.token");
    }

    #[tokio::test]
    async fn empty_static_token_renders_empty_header() {
        let header = StaticTokenProvider::new("")
            .header_token(&CancellationToken::new())
            .await
            .unwrap();
        assert!(header.is_empty());
    }
}
