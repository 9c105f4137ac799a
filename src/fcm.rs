use std::{collections::HashMap, sync::Arc};

use http::{HeaderValue, StatusCode};
use serde::{Deserialize, Serialize};

/// Android specific options for messages sent through FCM connection server.
pub mod android;
/// Apple Push Notification Service specific options.
pub mod ios;
/// Webpush protocol options.
pub mod webpush;

use crate::{
    auth::{AccessTokenProvider, GoogleTokenProvider},
    config::{validate_endpoint, V1Settings},
    https_client,
    response::DeliveryReport,
    with_cancellation, CancellationToken, ConfigError, FCMError, HttpsClient, RawResponse,
    RestApiSupport, SendResult, ServiceAccountInfo,
};

use android::AndroidConfig;
use ios::ApnsConfig;
use webpush::WebPushConfig;

fn post_endpoint(base_url: &str, project_id: &str) -> String {
    format!(
        "{}/v1/projects/{project_id}/messages:send",
        base_url.trim_end_matches('/')
    )
}

/// [FCMClient] sends messages through the HTTP v1 API (<https://firebase.google.com/docs/reference/fcm/rest>).
///
/// The project id is read from the service account key, and every send is authorized
/// with a fresh bearer token from the configured [AccessTokenProvider].
///
/// ```no_run
/// use fcm_send_rs::fcm::*;
/// use fcm_send_rs::{CancellationToken, V1Settings};
///
/// #[tokio::main]
/// async fn main() {
///   let client = FCMClient::new(V1Settings::from_file("service-account.json")).await.unwrap();
///   let message = Message::to_token("device_token")
///     .with_notification(Notification::new("title", "body"));
///   let res = client.send(&message.into(), &CancellationToken::new()).await.unwrap();
///   // => MessageResponse { status: 200, name: Some("projects/<project>/messages/<id>"), .. }
/// }
/// ```
#[derive(Clone)]
pub struct FCMClient {
    http_client: HttpsClient,
    token_provider: Arc<dyn AccessTokenProvider>,
    project_id: String,
    endpoint: String,
}

impl FCMClient {
    pub async fn new(settings: V1Settings) -> Result<Self, ConfigError> {
        let source = settings.validate()?;
        let account = ServiceAccountInfo::load(&source)?;
        validate_endpoint(&post_endpoint(&settings.base_url, &account.project_id))?;
        let token_provider = GoogleTokenProvider::from_service_account(&account).await?;
        log::debug!(
            "loaded service account {} for project {}",
            account.client_email.as_deref().unwrap_or("<unknown>"),
            account.project_id
        );
        Self::with_token_provider(
            &account.project_id,
            Arc::new(token_provider),
            &settings.base_url,
        )
    }

    /// Builds a client from the key `GOOGLE_APPLICATION_CREDENTIALS` points to.
    pub async fn from_env() -> Result<Self, ConfigError> {
        Self::new(V1Settings::from_env()).await
    }

    pub fn with_token_provider(
        project_id: &str,
        token_provider: Arc<dyn AccessTokenProvider>,
        base_url: &str,
    ) -> Result<Self, ConfigError> {
        if project_id.trim().is_empty() {
            return Err(ConfigError::MissingProjectId);
        }
        let endpoint = post_endpoint(base_url, project_id);
        validate_endpoint(&endpoint)?;
        Ok(Self {
            http_client: https_client()?,
            token_provider,
            project_id: project_id.to_string(),
            endpoint,
        })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Send the message to firebase messaging API.
    ///
    /// Non-200 answers are logged and returned as a [MessageResponse] carrying the error.
    pub async fn send(
        &self,
        request: &MessageRequest,
        cancel: &CancellationToken,
    ) -> Result<MessageResponse, FCMError> {
        let message = request.message.as_ref().ok_or(FCMError::MissingMessage)?;
        self.dispatch(message, request.validate_only, cancel).await
    }

    /// Send the message to firebase messaging API with dry run option.
    pub async fn validate(
        &self,
        message: &Message,
        cancel: &CancellationToken,
    ) -> Result<MessageResponse, FCMError> {
        self.dispatch(message, true, cancel).await
    }

    async fn dispatch(
        &self,
        message: &Message,
        validate_only: bool,
        cancel: &CancellationToken,
    ) -> Result<MessageResponse, FCMError> {
        let header = with_cancellation(cancel, self.token_provider.header_token(cancel)).await?;
        if header.trim().is_empty() {
            return Err(FCMError::MissingAccessToken);
        }
        let mut authorization = HeaderValue::from_str(&header)
            .map_err(|e| FCMError::BuildRequestFailure(format!("{e:?}")))?;
        authorization.set_sensitive(true);

        let payload = MessagePayload {
            validate_only,
            message,
        };
        let raw = self
            .post_request(&self.endpoint, authorization, &payload, cancel)
            .await?;
        let response = MessageResponse::from_raw(&raw, message.token())?;
        if response.status == StatusCode::OK {
            log::info!(
                "FCM message sent: {}",
                response.name.as_deref().unwrap_or("<unnamed>")
            );
        } else {
            log::error!(
                "FCM message failed with status code {}: {}",
                response.status.as_u16(),
                response.result().error.as_deref().unwrap_or_default()
            );
        }
        Ok(response)
    }
}

impl RestApiSupport for FCMClient {
    fn http_client(&self) -> &HttpsClient {
        &self.http_client
    }
}

#[derive(Debug, Serialize)]
/// Message payload sent to firebase messaging API.
struct MessagePayload<'a> {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    validate_only: bool,
    message: &'a Message,
}

/// A send request for the v1 API. A request without a message is rejected before any I/O.
#[derive(Debug, Clone, Default)]
pub struct MessageRequest {
    pub message: Option<Message>,
    /// Validate the message without delivering it.
    pub validate_only: bool,
}

impl MessageRequest {
    pub fn new(message: Message) -> Self {
        Self {
            message: Some(message),
            validate_only: false,
        }
    }
}

impl From<Message> for MessageRequest {
    fn from(message: Message) -> Self {
        Self::new(message)
    }
}

/// Recipient of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// Registration token to send a message to.
    Token(String),
    /// Topic name to send a message to, e.g. "weather". Note: "/topics/" prefix should not be provided.
    Topic(String),
    /// Condition to send a message to, e.g. "'foo' in topics && 'bar' in topics".
    Condition(String),
}

/// Low-level type representing FCM Message type.
/// See <https://fcm.googleapis.com/$discovery/rest?version=v1> for details.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    #[serde(flatten)]
    pub target: Target,
    /// Arbitrary key/value payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<HashMap<String, String>>,
    /// Basic notification template to use across all platforms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<Notification>,
    /// Template for FCM SDK feature options to use across all platforms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fcm_options: Option<FcmOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub android: Option<AndroidConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webpush: Option<WebPushConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apns: Option<ApnsConfig>,
}

impl Message {
    pub fn new(target: Target) -> Self {
        Self {
            target,
            data: None,
            notification: None,
            fcm_options: None,
            android: None,
            webpush: None,
            apns: None,
        }
    }

    pub fn to_token(token: impl Into<String>) -> Self {
        Self::new(Target::Token(token.into()))
    }

    pub fn to_topic(topic: impl Into<String>) -> Self {
        Self::new(Target::Topic(topic.into()))
    }

    pub fn to_condition(condition: impl Into<String>) -> Self {
        Self::new(Target::Condition(condition.into()))
    }

    pub fn with_notification(mut self, notification: Notification) -> Self {
        self.notification = Some(notification);
        self
    }

    pub fn with_data(mut self, data: HashMap<String, String>) -> Self {
        self.data = Some(data);
        self
    }

    /// Registration token, if this message targets a single device.
    pub fn token(&self) -> Option<&str> {
        match &self.target {
            Target::Token(token) => Some(token),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Default)]
/// Platform independent options for features provided by the FCM SDKs.
pub struct FcmOptions {
    /// Label associated with the message's analytics data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analytics_label: Option<String>,
}

impl FcmOptions {
    pub fn new(analytics_label: &str) -> Self {
        Self {
            analytics_label: Some(analytics_label.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Default)]
///  Basic notification template to use across all platforms.
pub struct Notification {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// URL of an image downloaded on the device and displayed in the notification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Notification {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            body: Some(body.into()),
            image: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireMessageResponse {
    name: Option<String>,
    error: Option<ErrorStatus>,
}

/// `google.rpc.Status` returned by the v1 API on failure.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ErrorStatus {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
    /// Canonical status name, e.g. `NOT_FOUND`.
    pub status: Option<String>,
    #[serde(default)]
    pub details: Vec<serde_json::Value>,
}

impl ErrorStatus {
    fn from_status(status: StatusCode, body: String) -> Self {
        Self {
            code: status.as_u16(),
            message: body,
            status: None,
            details: vec![],
        }
    }

    /// FCM specific error code found in `details`, e.g. `UNREGISTERED`.
    /// See <https://firebase.google.com/docs/reference/fcm/rest/v1/ErrorCode>
    pub fn fcm_error_code(&self) -> Option<&str> {
        self.details
            .iter()
            .find(|detail| {
                detail
                    .get("@type")
                    .and_then(serde_json::Value::as_str)
                    .map_or(false, |t| t.ends_with("google.firebase.fcm.v1.FcmError"))
            })
            .and_then(|detail| detail.get("errorCode"))
            .and_then(serde_json::Value::as_str)
    }

    fn reason(&self) -> String {
        self.fcm_error_code()
            .or(self.status.as_deref())
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP {}", self.code))
    }
}

/// Answer of the v1 send endpoint.
#[derive(Debug, Clone)]
pub struct MessageResponse {
    token: Option<String>,
    status: StatusCode,
    name: Option<String>,
    error: Option<ErrorStatus>,
}

impl MessageResponse {
    fn from_raw(raw: &RawResponse, token: Option<&str>) -> Result<Self, FCMError> {
        let (name, error) = match raw.parse::<WireMessageResponse>() {
            Ok(wire) => (wire.name, wire.error),
            Err(e) if raw.status == StatusCode::OK => return Err(raw.deserialize_failure(e)),
            Err(_) => (None, None),
        };
        let error = match error {
            None if raw.status != StatusCode::OK => {
                Some(ErrorStatus::from_status(raw.status, raw.text()))
            }
            error => error,
        };
        Ok(Self {
            token: token.map(str::to_string),
            status: raw.status,
            name,
            error,
        })
    }

    /// Token of the message this response answers. Absent for topic and condition messages.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// "The identifier of the message sent, in the format of `projects/*/messages/{message_id}`."
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn error(&self) -> Option<&ErrorStatus> {
        self.error.as_ref()
    }

    pub fn is_success(&self) -> bool {
        self.status == StatusCode::OK
    }

    pub fn result(&self) -> SendResult {
        SendResult {
            registration_id: self.token.clone().unwrap_or_default(),
            message_id: self.name.clone(),
            canonical_registration_id: None,
            error: if self.is_success() {
                None
            } else {
                Some(
                    self.error
                        .as_ref()
                        .map(ErrorStatus::reason)
                        .unwrap_or_else(|| format!("HTTP {}", self.status.as_u16())),
                )
            },
        }
    }
}

impl DeliveryReport for MessageResponse {
    fn number_of_successes(&self) -> usize {
        usize::from(self.is_success())
    }

    fn number_of_failures(&self) -> usize {
        usize::from(!self.is_success())
    }
}
