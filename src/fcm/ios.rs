use std::collections::HashMap;

use serde::Serialize;

/// APNs overrides. `headers` are passed to APNs as HTTP headers, `payload` as the notification body.
/// See <https://developer.apple.com/documentation/usernotifications/sending-notification-requests-to-apns>
#[derive(Debug, Clone, Serialize, Default)]
pub struct ApnsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fcm_options: Option<ApnsFcmOptions>,
}

impl ApnsConfig {
    /// Payload made of `aps` plus custom top level keys.
    pub fn new(aps: &Aps, data: &HashMap<String, String>) -> Self {
        let mut payload = serde_json::Map::new();
        payload.insert("aps".to_string(), serde_json::json!(aps));
        for (key, value) in data {
            payload.insert(key.clone(), serde_json::Value::String(value.clone()));
        }
        Self {
            payload: Some(serde_json::Value::Object(payload)),
            ..Default::default()
        }
    }

    /// Silent notification that wakes the app in the background.
    pub fn background(data: HashMap<String, String>) -> Self {
        let aps = Aps {
            content_available: Some(1),
            ..Default::default()
        };
        Self::new(&aps, &data)
            .with_header("apns-push-type", "background")
            .with_header("apns-priority", "5")
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), value.into());
        self
    }
}

/// The `aps` dictionary.
#[derive(Debug, Clone, Serialize, Default)]
pub struct Aps {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert: Option<Alert>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound: Option<String>,
    #[serde(rename = "thread-id", skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// 1 for a background update.
    #[serde(rename = "content-available", skip_serializing_if = "Option::is_none")]
    pub content_available: Option<u8>,
    /// 1 lets a notification service extension modify the content.
    #[serde(rename = "mutable-content", skip_serializing_if = "Option::is_none")]
    pub mutable_content: Option<u8>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Alert {
    Plain(String),
    Rich {
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        subtitle: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        body: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct ApnsFcmOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analytics_label: Option<String>,
    /// Overrides `Notification::image` on Apple devices.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn custom_keys_sit_next_to_aps() {
        let aps = Aps {
            alert: Some(Alert::Rich {
                title: Some("title".to_string()),
                subtitle: None,
                body: Some("body".to_string()),
            }),
            badge: Some(3),
            ..Default::default()
        };
        let config = ApnsConfig::new(
            &aps,
            &HashMap::from_iter([("room".to_string(), "42".to_string())]),
        );
        assert_eq!(
            serde_json::to_value(&config).unwrap(),
            json!({
                "payload": {
                    "aps": {"alert": {"title": "title", "body": "body"}, "badge": 3},
                    "room": "42"
                }
            })
        );
    }

    #[test]
    fn plain_alert_is_a_string() {
        let aps = Aps {
            alert: Some(Alert::Plain("hello".to_string())),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&aps).unwrap(), json!({"alert": "hello"}));
    }
}
