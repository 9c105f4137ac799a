#[cfg(not(any(feature = "hyper-tls", feature = "hyper-rustls")))]
compile_error!("either the `native-tls` or the `rustls` feature must be enabled");

pub use serde_json;
pub use tokio_util::sync::CancellationToken;

/// Access token acquisition for the v1 API.
pub mod auth;
/// Client settings and service account credentials.
pub mod config;
mod error;
/// FCM HTTP v1 API.
pub mod fcm;
/// FCM legacy HTTP API.
pub mod legacy;
/// Per-recipient delivery results shared by both APIs.
pub mod response;

pub use auth::{AccessTokenProvider, GoogleTokenProvider, StaticTokenProvider};
pub use config::{CredentialSource, LegacySettings, ServiceAccountInfo, V1Settings};
pub use error::{ConfigError, FCMError};
pub use fcm::{FCMClient, Message, MessageRequest, MessageResponse};
pub use legacy::{FCMLegacyClient, LegacyResponse, NotificationRequest};
pub use response::{DeliveryReport, SendResult};

use async_trait::async_trait;
use http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE},
    HeaderValue, Request, StatusCode,
};
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
#[cfg(all(feature = "hyper-rustls", not(feature = "hyper-tls")))]
use hyper_rustls::HttpsConnector;
#[cfg(feature = "hyper-tls")]
use hyper_tls::HttpsConnector;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;

/// Connection pool shared by every clone of a client.
pub type HttpsClient = Client<HttpsConnector<HttpConnector>, Full<Bytes>>;

pub(crate) fn https_client() -> Result<HttpsClient, ConfigError> {
    #[cfg(feature = "hyper-tls")]
    let connector = HttpsConnector::new();

    #[cfg(all(feature = "hyper-rustls", not(feature = "hyper-tls")))]
    let connector = hyper_rustls::HttpsConnectorBuilder::new()
        .with_native_roots()
        .map_err(|e| ConfigError::Tls(format!("unable to load native roots: {e}")))?
        .https_or_http()
        .enable_http1()
        .build();

    Ok(Client::builder(TokioExecutor::new()).build(connector))
}

/// Races `fut` against `cancel`. Nothing produced by `fut` escapes once the token fires.
pub(crate) async fn with_cancellation<T, F>(cancel: &CancellationToken, fut: F) -> Result<T, FCMError>
where
    F: Future<Output = Result<T, FCMError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(FCMError::Cancelled),
        res = fut => res,
    }
}

/// Status and fully read body of an HTTP response.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl RawResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub(crate) fn parse<R: DeserializeOwned>(&self) -> Result<R, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    pub(crate) fn deserialize_failure(&self, e: serde_json::Error) -> FCMError {
        FCMError::DeserializeFailure {
            status: self.status.as_u16(),
            reason: format!("{e}"),
            body: self.text(),
        }
    }
}

/// [RestApiSupport] posts JSON payloads to FCM endpoints and hands back whatever the server answered.
///
/// Status codes are not interpreted here; each API decides what a non-2xx answer means.
#[async_trait]
pub trait RestApiSupport: Send + Sync {
    fn http_client(&self) -> &HttpsClient;

    async fn post_request<P: Serialize + Send + Sync + ?Sized>(
        &self,
        endpoint: &str,
        authorization: HeaderValue,
        payloadable: &P,
        cancel: &CancellationToken,
    ) -> Result<RawResponse, FCMError> {
        let payload = serde_json::to_vec(payloadable)
            .map_err(|e| FCMError::BuildRequestFailure(format!("{e:?}")))?;
        let req = Request::builder()
            .uri(endpoint)
            .method("POST")
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .header(AUTHORIZATION, authorization)
            .header(CONTENT_LENGTH, format!("{}", payload.len() as u64))
            .body(Full::new(Bytes::from(payload)))
            .map_err(|e| FCMError::BuildRequestFailure(format!("{e:?}")))?;
        log::debug!("POST {endpoint}");
        with_cancellation(cancel, async {
            let res = self
                .http_client()
                .request(req)
                .await
                .map_err(FCMError::HttpRequestFailure)?;
            let status = res.status();
            let body = res
                .into_body()
                .collect()
                .await
                .map_err(FCMError::DecodeFailure)?
                .to_bytes();
            Ok(RawResponse { status, body })
        })
        .await
    }
}
