use std::collections::HashMap;

use serde::Serialize;

/// [Webpush protocol](https://tools.ietf.org/html/rfc8030) options.
#[derive(Debug, Clone, Serialize, Default)]
pub struct WebPushConfig {
    /// Webpush HTTP headers, e.g. `"TTL": "15"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<HashMap<String, String>>,
    /// [Web Notification](https://developer.mozilla.org/en-US/docs/Web/API/Notification) options as a JSON object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fcm_options: Option<WebPushFcmOptions>,
}

impl WebPushConfig {
    /// Seconds the push service keeps the message while the browser is offline.
    pub fn with_ttl(self, seconds: u64) -> Self {
        self.with_header("TTL", seconds.to_string())
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), value.into());
        self
    }

    /// Opens `link` on click. FCM rejects links that are not HTTPS.
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.fcm_options.get_or_insert_with(Default::default).link = Some(link.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct WebPushFcmOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analytics_label: Option<String>,
}
