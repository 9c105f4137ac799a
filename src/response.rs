/// Outcome of a delivery to one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendResult {
    /// Registration id (or token) the message was addressed to.
    ///
    /// FCM does not echo it; the client fills it in from the request.
    pub registration_id: String,
    /// Identifier FCM assigned to the delivered message.
    pub message_id: Option<String>,
    /// Legacy API only. The id the app should use from now on in place of `registration_id`.
    pub canonical_registration_id: Option<String>,
    /// Reason FCM gave for rejecting the delivery, e.g. `NotRegistered`.
    pub error: Option<String>,
}

impl SendResult {
    pub(crate) fn failed(registration_id: &str, reason: impl Into<String>) -> Self {
        Self {
            registration_id: registration_id.to_string(),
            message_id: None,
            canonical_registration_id: None,
            error: Some(reason.into()),
        }
    }

    /// Delivered: FCM assigned a message id and reported no error.
    pub fn is_success(&self) -> bool {
        self.message_id.is_some() && self.error.is_none()
    }
}

/// Aggregate view over the results of one send call.
pub trait DeliveryReport {
    fn number_of_successes(&self) -> usize;

    fn number_of_failures(&self) -> usize;

    /// True when every recipient accepted the message.
    fn all_succeeded(&self) -> bool {
        self.number_of_failures() == 0 && self.number_of_successes() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::SendResult;

    #[test]
    fn result_without_error_is_success() {
        let result = SendResult {
            registration_id: "token".to_string(),
            message_id: Some("0:1500415314455276%31bd1c9631bd1c96".to_string()),
            canonical_registration_id: None,
            error: None,
        };
        assert!(result.is_success());
    }

    #[test]
    fn failed_result_keeps_reason() {
        let result = SendResult::failed("token", "NotRegistered");
        assert!(!result.is_success());
        assert_eq!(result.registration_id, "token");
        assert_eq!(result.error.as_deref(), Some("NotRegistered"));
    }

    #[test]
    fn result_without_message_id_is_not_delivered() {
        let result = SendResult {
            registration_id: "token".to_string(),
            message_id: None,
            canonical_registration_id: None,
            error: None,
        };
        assert!(!result.is_success());
    }
}
