use std::collections::HashMap;

use serde::Serialize;

/// `google.protobuf.Duration`, encoded as seconds with an `s` suffix, e.g. `"3.5s"`.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct Ttl(std::time::Duration);

impl Ttl {
    pub fn from_secs(secs: u64) -> Self {
        Self(std::time::Duration::from_secs(secs))
    }
}

impl From<std::time::Duration> for Ttl {
    fn from(value: std::time::Duration) -> Self {
        Self(value)
    }
}

impl Serialize for Ttl {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&format!("{}s", self.0.as_secs_f64()))
    }
}

/// Android overrides applied on top of the platform independent message.
#[derive(Debug, Clone, Serialize, Default)]
pub struct AndroidConfig {
    /// Only the last message per collapse key is delivered once the device comes back online.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collapse_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<AndroidMessagePriority>,
    /// How long FCM stores the message while the device is offline. Defaults to 4 weeks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<Ttl>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restricted_package_name: Option<String>,
    /// Replaces `Message::data` on Android.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<AndroidNotification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fcm_options: Option<AndroidFcmOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direct_boot_ok: Option<bool>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AndroidMessagePriority {
    Normal,
    /// Delivered immediately, waking a sleeping device if needed.
    High,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct AndroidNotification {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Drawable resource name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// `#rrggbb`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound: Option<String>,
    /// Notifications sharing a tag replace each other in the drawer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub click_action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Visibility {
    Private,
    Public,
    Secret,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct AndroidFcmOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analytics_label: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn android_overrides_serialize_in_proto_json_form() {
        let config = AndroidConfig {
            priority: Some(AndroidMessagePriority::High),
            ttl: Some(std::time::Duration::from_millis(3500).into()),
            notification: Some(AndroidNotification {
                channel_id: Some("alerts".to_string()),
                visibility: Some(Visibility::Public),
                ..Default::default()
            }),
            ..Default::default()
        };
        let result = serde_json::to_value(&config).expect("should always succeed");
        assert_eq!(
            result,
            json!({
                "priority": "HIGH",
                "ttl": "3.5s",
                "notification": {"channel_id": "alerts", "visibility": "PUBLIC"}
            })
        );
    }

    #[test]
    fn whole_second_ttl_has_no_fraction() {
        assert_eq!(serde_json::to_value(Ttl::from_secs(3600)).unwrap(), json!("3600s"));
    }
}
