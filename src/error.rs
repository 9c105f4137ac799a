use std::{io, path::PathBuf};

/// Raised while building a client. A client that failed to build never touches the network.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no FCM server key configured")]
    MissingServerKey,
    #[error("FCM server key cannot be used as a header value")]
    InvalidServerKey,
    #[error("no service account credentials configured, provide either a credentials file or inline credentials")]
    MissingCredentials,
    #[error("both a credentials file and inline credentials were configured")]
    AmbiguousCredentials,
    #[error("unable to read credentials file {path:?}: {source}")]
    UnreadableCredentials {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("credentials are not valid json: {0}")]
    InvalidCredentials(#[source] serde_json::Error),
    #[error("credentials do not contain a project_id")]
    MissingProjectId,
    #[error("invalid endpoint `{endpoint}`: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
    #[error("unable to initialize token provider: {0}")]
    TokenProvider(String),
    #[error("unable to initialize https connector: {0}")]
    Tls(String),
}

/// Raised by a send call.
///
/// Answers from FCM, including rejected deliveries and non-2xx statuses, are not errors.
/// They come back as response values.
#[derive(Debug, thiserror::Error)]
pub enum FCMError {
    #[error("request has no registration ids")]
    EmptyRegistrationIds,
    #[error("registration id at index {index} is blank")]
    BlankRegistrationId { index: usize },
    #[error("request has no message")]
    MissingMessage,
    #[error("unable to get access token: {0}")]
    AccessToken(String),
    #[error("token provider returned an empty access token")]
    MissingAccessToken,
    #[error("unable to build request: {0}")]
    BuildRequestFailure(String),
    #[error("http request failed: {0}")]
    HttpRequestFailure(#[source] hyper_util::client::legacy::Error),
    #[error("unable to read response body: {0}")]
    DecodeFailure(#[source] hyper::Error),
    #[error("unable to deserialize response body (status {status}): {reason}: {body}")]
    DeserializeFailure {
        status: u16,
        reason: String,
        body: String,
    },
    #[error("operation cancelled")]
    Cancelled,
}
