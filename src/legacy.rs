use std::collections::HashMap;

use http::{HeaderValue, StatusCode};
use serde::{Deserialize, Serialize};

use crate::{
    config::LegacySettings, https_client, response::DeliveryReport, CancellationToken,
    ConfigError, FCMError, HttpsClient, RawResponse, RestApiSupport, SendResult,
};

/// Error reported for a registration id the server answered no result for.
pub const MISSING_RESULT: &str = "MissingResult";

/// [FCMLegacyClient] sends messages through the legacy HTTP API, authorized by a server key.
///
/// ```no_run
/// use fcm_send_rs::legacy::*;
/// use fcm_send_rs::{DeliveryReport, LegacySettings};
///
/// #[tokio::main]
/// async fn main() {
///   let client = FCMLegacyClient::new(LegacySettings::from_env()).unwrap();
///   let request = NotificationRequest::new(["registration_id_0", "registration_id_1"])
///     .with_notification(LegacyNotification::new("title", "body"));
///   let res = client.send(&request).await.unwrap();
///   println!("{} delivered, {} failed", res.number_of_successes(), res.number_of_failures());
/// }
/// ```
#[derive(Clone)]
pub struct FCMLegacyClient {
    http_client: HttpsClient,
    endpoint: String,
    authorization: HeaderValue,
}

impl FCMLegacyClient {
    pub fn new(settings: LegacySettings) -> Result<Self, ConfigError> {
        let valid = settings.validate()?;
        Ok(Self {
            http_client: https_client()?,
            endpoint: valid.endpoint,
            authorization: valid.authorization,
        })
    }

    /// Builds a client from `FCM_SERVER_KEY`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(LegacySettings::from_env())
    }

    /// Send the notification to every registration id in `request`.
    ///
    /// A response is returned whatever status FCM answers with.
    /// Inspect [LegacyResponse::results] for per-recipient outcomes.
    pub async fn send(&self, request: &NotificationRequest) -> Result<LegacyResponse, FCMError> {
        self.send_with_cancellation(request, &CancellationToken::new())
            .await
    }

    pub async fn send_with_cancellation(
        &self,
        request: &NotificationRequest,
        cancel: &CancellationToken,
    ) -> Result<LegacyResponse, FCMError> {
        request.validate()?;
        let raw = self
            .post_request(&self.endpoint, self.authorization.clone(), request, cancel)
            .await?;
        let response = LegacyResponse::from_raw(&raw, &request.registration_ids)?;
        log::debug!(
            "legacy send answered {}: {} succeeded, {} failed",
            response.status,
            response.number_of_successes,
            response.number_of_failures
        );
        Ok(response)
    }
}

impl RestApiSupport for FCMLegacyClient {
    fn http_client(&self) -> &HttpsClient {
        &self.http_client
    }
}

/// Request body of the legacy send endpoint.
#[derive(Debug, Clone, Serialize, Default)]
pub struct NotificationRequest {
    /// Recipients. Between 1 and 1000 registration ids.
    pub registration_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<LegacyNotification>,
    /// Custom key-value pairs delivered to the app.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<HashMap<String, String>>,
    /// Messages sharing a collapse key replace each other while the device is offline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collapse_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<LegacyPriority>,
    /// On iOS, wakes a suspended app when the message arrives.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_available: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mutable_content: Option<bool>,
    /// Seconds FCM keeps the message while the device is offline. Maximum is 4 weeks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_to_live: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restricted_package_name: Option<String>,
    /// Test the request without delivering anything.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<bool>,
}

impl NotificationRequest {
    pub fn new<I, S>(registration_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            registration_ids: registration_ids.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_notification(mut self, notification: LegacyNotification) -> Self {
        self.notification = Some(notification);
        self
    }

    pub fn with_data(mut self, data: HashMap<String, String>) -> Self {
        self.data = Some(data);
        self
    }

    fn validate(&self) -> Result<(), FCMError> {
        if self.registration_ids.is_empty() {
            return Err(FCMError::EmptyRegistrationIds);
        }
        match self
            .registration_ids
            .iter()
            .position(|id| id.trim().is_empty())
        {
            Some(index) => Err(FCMError::BlankRegistrationId { index }),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LegacyPriority {
    Normal,
    High,
}

/// Display fields of a legacy notification message.
#[derive(Debug, Clone, Serialize, Default)]
pub struct LegacyNotification {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Android only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub android_channel_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound: Option<String>,
    /// iOS only. Badge count on the app icon.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// `#rrggbb`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub click_action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_loc_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_loc_args: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_loc_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_loc_args: Option<Vec<String>>,
}

impl LegacyNotification {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            body: Some(body.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct WireResponse {
    multicast_id: Option<i64>,
    canonical_ids: Option<u32>,
    #[serde(default)]
    results: Vec<WireResult>,
}

#[derive(Debug, Deserialize)]
struct WireResult {
    message_id: Option<String>,
    /// Canonical id, not the id the message was sent to.
    registration_id: Option<String>,
    error: Option<String>,
}

/// Answer of the legacy send endpoint.
///
/// `results` holds one entry per requested registration id, in request order.
#[derive(Debug, Clone)]
pub struct LegacyResponse {
    status: StatusCode,
    multicast_id: Option<i64>,
    canonical_ids: Option<u32>,
    results: Vec<SendResult>,
    number_of_successes: usize,
    number_of_failures: usize,
}

impl LegacyResponse {
    fn from_raw(raw: &RawResponse, registration_ids: &[String]) -> Result<Self, FCMError> {
        let wire = match raw.parse::<WireResponse>() {
            Ok(wire) => wire,
            Err(e) if raw.status.is_success() => return Err(raw.deserialize_failure(e)),
            Err(e) => {
                log::debug!("legacy error body is not json ({e}): {}", raw.text());
                WireResponse::default()
            }
        };
        if wire.results.len() != registration_ids.len() && !wire.results.is_empty() {
            log::warn!(
                "legacy response has {} results for {} registration ids",
                wire.results.len(),
                registration_ids.len()
            );
        }
        let missing = if raw.status.is_success() {
            MISSING_RESULT.to_string()
        } else {
            format!("HTTP {}", raw.status.as_u16())
        };
        let mut wire_results = wire.results.into_iter();
        let results: Vec<SendResult> = registration_ids
            .iter()
            .map(|id| match wire_results.next() {
                Some(result) => SendResult {
                    registration_id: id.clone(),
                    message_id: result.message_id,
                    canonical_registration_id: result.registration_id,
                    error: result.error,
                },
                None => SendResult::failed(id, missing.as_str()),
            })
            .collect();
        let number_of_successes = results.iter().filter(|r| r.is_success()).count();
        Ok(Self {
            status: raw.status,
            multicast_id: wire.multicast_id,
            canonical_ids: wire.canonical_ids,
            number_of_failures: results.len() - number_of_successes,
            number_of_successes,
            results,
        })
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn multicast_id(&self) -> Option<i64> {
        self.multicast_id
    }

    pub fn canonical_ids(&self) -> Option<u32> {
        self.canonical_ids
    }

    pub fn results(&self) -> &[SendResult] {
        &self.results
    }
}

impl DeliveryReport for LegacyResponse {
    fn number_of_successes(&self) -> usize {
        self.number_of_successes
    }

    fn number_of_failures(&self) -> usize {
        self.number_of_failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::time::Duration;

    const SERVER_KEY: &str = "AAAA-test-server-key";

    fn client_with_server(server: &MockServer) -> FCMLegacyClient {
        let settings = LegacySettings::new(SERVER_KEY).with_endpoint(server.url("/fcm/send"));
        FCMLegacyClient::new(settings).expect("client")
    }

    fn uppercase_registration_id(len: usize) -> String {
        (0..len).map(|i| (b'A' + (i % 26) as u8) as char).collect()
    }

    #[tokio::test]
    async fn single_registration_id_is_delivered() {
        let server = MockServer::start_async().await;
        let client = client_with_server(&server);
        let registration_id = uppercase_registration_id(152);
        assert_eq!(registration_id.len(), 152);

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/fcm/send")
                    .header("authorization", format!("key={SERVER_KEY}"))
                    .header("content-type", "application/json")
                    .json_body(json!({
                        "registration_ids": [registration_id.clone()],
                        "notification": {"title": "title", "body": "body"},
                        "data": {"key": "value"}
                    }));
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({
                        "multicast_id": 108,
                        "success": 1,
                        "failure": 0,
                        "canonical_ids": 0,
                        "results": [{"message_id": "1:08"}]
                    }));
            })
            .await;

        let request = NotificationRequest::new([registration_id.clone()])
            .with_notification(LegacyNotification::new("title", "body"))
            .with_data(HashMap::from_iter([(
                "key".to_string(),
                "value".to_string(),
            )]));
        let res = client.send(&request).await.unwrap();

        mock.assert_async().await;
        assert_eq!(res.number_of_successes(), 1);
        assert_eq!(res.number_of_failures(), 0);
        assert!(res.all_succeeded());
        assert_eq!(res.multicast_id(), Some(108));
        assert_eq!(res.results().len(), 1);
        assert_eq!(res.results()[0].registration_id, registration_id);
        assert_eq!(res.results()[0].message_id.as_deref(), Some("1:08"));
    }

    #[tokio::test]
    async fn ok_status_with_inner_failure_is_reported_per_recipient() {
        let server = MockServer::start_async().await;
        let client = client_with_server(&server);
        server
            .mock_async(|when, then| {
                when.method(POST).path("/fcm/send");
                then.status(200).json_body(json!({
                    "multicast_id": 216,
                    "success": 2,
                    "failure": 1,
                    "canonical_ids": 1,
                    "results": [
                        {"message_id": "1:0408"},
                        {"error": "NotRegistered"},
                        {"message_id": "1:2342", "registration_id": "canonical-c"}
                    ]
                }));
            })
            .await;

        let request = NotificationRequest::new(["a", "b", "c"]);
        let res = client.send(&request).await.unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.number_of_successes(), 2);
        assert_eq!(res.number_of_failures(), 1);
        assert!(!res.all_succeeded());
        let ids: Vec<&str> = res
            .results()
            .iter()
            .map(|r| r.registration_id.as_str())
            .collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert_eq!(res.results()[1].error.as_deref(), Some("NotRegistered"));
        assert_eq!(
            res.results()[2].canonical_registration_id.as_deref(),
            Some("canonical-c")
        );
        assert_eq!(res.canonical_ids(), Some(1));
    }

    #[tokio::test]
    async fn error_status_body_is_still_parsed() {
        let server = MockServer::start_async().await;
        let client = client_with_server(&server);
        server
            .mock_async(|when, then| {
                when.method(POST).path("/fcm/send");
                then.status(500).json_body(json!({
                    "results": [{"error": "Unavailable"}, {"message_id": "1:77"}]
                }));
            })
            .await;

        let res = client
            .send(&NotificationRequest::new(["a", "b"]))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(res.results()[0].error.as_deref(), Some("Unavailable"));
        assert!(res.results()[1].is_success());
        assert_eq!(res.number_of_successes() + res.number_of_failures(), 2);
    }

    #[tokio::test]
    async fn plain_text_error_body_fails_every_recipient() {
        let server = MockServer::start_async().await;
        let client = client_with_server(&server);
        server
            .mock_async(|when, then| {
                when.method(POST).path("/fcm/send");
                then.status(401).body("<HTML><TITLE>Unauthorized</TITLE></HTML>");
            })
            .await;

        let res = client
            .send(&NotificationRequest::new(["a", "b", "c"]))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(res.results().len(), 3);
        assert_eq!(res.number_of_failures(), 3);
        assert!(res
            .results()
            .iter()
            .all(|r| r.error.as_deref() == Some("HTTP 401")));
    }

    #[tokio::test]
    async fn unparseable_success_body_is_an_error() {
        let server = MockServer::start_async().await;
        let client = client_with_server(&server);
        server
            .mock_async(|when, then| {
                when.method(POST).path("/fcm/send");
                then.status(200).body("surprise");
            })
            .await;

        let res = client.send(&NotificationRequest::new(["a"])).await;
        assert!(matches!(
            res,
            Err(FCMError::DeserializeFailure { status: 200, .. })
        ));
    }

    #[tokio::test]
    async fn missing_results_are_padded_to_request_length() {
        let server = MockServer::start_async().await;
        let client = client_with_server(&server);
        server
            .mock_async(|when, then| {
                when.method(POST).path("/fcm/send");
                then.status(200)
                    .json_body(json!({"results": [{"message_id": "1:1"}]}));
            })
            .await;

        let res = client
            .send(&NotificationRequest::new(["a", "b"]))
            .await
            .unwrap();

        assert_eq!(res.results().len(), 2);
        assert_eq!(res.results()[1].registration_id, "b");
        assert_eq!(res.results()[1].error.as_deref(), Some(MISSING_RESULT));
    }

    #[tokio::test]
    async fn entry_without_message_id_counts_as_failure() {
        let server = MockServer::start_async().await;
        let client = client_with_server(&server);
        server
            .mock_async(|when, then| {
                when.method(POST).path("/fcm/send");
                then.status(200).json_body(json!({"results": [{}]}));
            })
            .await;

        let res = client.send(&NotificationRequest::new(["a"])).await.unwrap();

        assert_eq!(res.number_of_successes(), 0);
        assert_eq!(res.number_of_failures(), 1);
        assert!(!res.results()[0].is_success());
        assert_eq!(res.results()[0].registration_id, "a");
    }

    #[tokio::test]
    async fn invalid_requests_never_reach_the_network() {
        let server = MockServer::start_async().await;
        let client = client_with_server(&server);
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/fcm/send");
                then.status(200).json_body(json!({"results": []}));
            })
            .await;

        let empty = NotificationRequest::new(Vec::<String>::new());
        assert!(matches!(
            client.send(&empty).await,
            Err(FCMError::EmptyRegistrationIds)
        ));
        let blank = NotificationRequest::new(["a", " ", "c"]);
        assert!(matches!(
            client.send(&blank).await,
            Err(FCMError::BlankRegistrationId { index: 1 })
        ));
        assert_eq!(mock.hits_async().await, 0);
    }

    #[tokio::test]
    async fn sending_twice_issues_two_requests() {
        let server = MockServer::start_async().await;
        let client = client_with_server(&server);
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/fcm/send");
                then.status(200)
                    .json_body(json!({"results": [{"message_id": "1:1"}]}));
            })
            .await;

        let request = NotificationRequest::new(["a"]);
        let first = client.send(&request).await.unwrap();
        let second = client.send(&request).await.unwrap();

        mock.assert_hits_async(2).await;
        assert_eq!(first.results(), second.results());
    }

    #[tokio::test]
    async fn cancelled_before_sending_returns_no_response() {
        let server = MockServer::start_async().await;
        let client = client_with_server(&server);
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/fcm/send");
                then.status(200)
                    .json_body(json!({"results": [{"message_id": "1:1"}]}));
            })
            .await;

        let cancel = CancellationToken::new();
        cancel.cancel();
        let res = client
            .send_with_cancellation(&NotificationRequest::new(["a"]), &cancel)
            .await;

        assert!(matches!(res, Err(FCMError::Cancelled)));
        assert_eq!(mock.hits_async().await, 0);
    }

    #[tokio::test]
    async fn cancelled_while_waiting_for_response_returns_no_response() {
        let server = MockServer::start_async().await;
        let client = client_with_server(&server);
        server
            .mock_async(|when, then| {
                when.method(POST).path("/fcm/send");
                then.status(200)
                    .delay(Duration::from_secs(30))
                    .json_body(json!({"results": [{"message_id": "1:1"}]}));
            })
            .await;

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });
        let res = client
            .send_with_cancellation(&NotificationRequest::new(["a"]), &cancel)
            .await;

        assert!(matches!(res, Err(FCMError::Cancelled)));
    }

    #[test]
    fn absent_fields_are_not_serialized() {
        let request = NotificationRequest {
            priority: Some(LegacyPriority::High),
            time_to_live: Some(3600),
            ..NotificationRequest::new(["a"])
        };
        let result = serde_json::to_value(&request).expect("should always succeed");
        let expected = json!({
            "registration_ids": ["a"],
            "priority": "high",
            "time_to_live": 3600
        });
        assert_eq!(result, expected)
    }
}
