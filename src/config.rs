use std::{
    env, fmt,
    path::{Path, PathBuf},
};

use http::{HeaderValue, Uri};
use serde::Deserialize;

use crate::ConfigError;

/// Send endpoint of the legacy HTTP API.
pub const LEGACY_ENDPOINT: &str = "https://fcm.googleapis.com/fcm/send";
/// Host of the HTTP v1 API.
pub const FCM_BASE_URL: &str = "https://fcm.googleapis.com";

const SERVER_KEY_ENV: &str = "FCM_SERVER_KEY";
const CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";

pub(crate) fn validate_endpoint(endpoint: &str) -> Result<(), ConfigError> {
    let uri = endpoint
        .parse::<Uri>()
        .map_err(|e| ConfigError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: format!("{e}"),
        })?;
    if uri.scheme().is_none() || uri.host().is_none() {
        return Err(ConfigError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: "endpoint must be an absolute url".to_string(),
        });
    }
    Ok(())
}

/// Settings for [crate::FCMLegacyClient].
#[derive(Clone)]
pub struct LegacySettings {
    /// Server key from the Firebase console, sent as `Authorization: key=<server_key>`.
    pub server_key: Option<String>,
    pub endpoint: String,
}

impl LegacySettings {
    pub fn new(server_key: impl Into<String>) -> Self {
        Self {
            server_key: Some(server_key.into()),
            endpoint: LEGACY_ENDPOINT.to_string(),
        }
    }

    /// Reads the server key from `FCM_SERVER_KEY`.
    pub fn from_env() -> Self {
        Self {
            server_key: env::var(SERVER_KEY_ENV).ok(),
            endpoint: LEGACY_ENDPOINT.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub(crate) fn validate(&self) -> Result<ValidLegacySettings, ConfigError> {
        let server_key = self
            .server_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingServerKey)?;
        let mut authorization = HeaderValue::from_str(&format!("key={server_key}"))
            .map_err(|_| ConfigError::InvalidServerKey)?;
        authorization.set_sensitive(true);
        validate_endpoint(&self.endpoint)?;
        Ok(ValidLegacySettings {
            authorization,
            endpoint: self.endpoint.clone(),
        })
    }
}

impl fmt::Debug for LegacySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LegacySettings")
            .field("server_key", &self.server_key.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

pub(crate) struct ValidLegacySettings {
    pub(crate) authorization: HeaderValue,
    pub(crate) endpoint: String,
}

/// Settings for [crate::FCMClient].
///
/// Exactly one of `credentials_file` and `credentials_json` must be set.
#[derive(Clone)]
pub struct V1Settings {
    /// Path to a service account json key.
    pub credentials_file: Option<PathBuf>,
    /// Content of a service account json key.
    pub credentials_json: Option<String>,
    pub base_url: String,
}

impl V1Settings {
    pub fn from_file(path: impl AsRef<Path>) -> Self {
        Self {
            credentials_file: Some(path.as_ref().to_path_buf()),
            credentials_json: None,
            base_url: FCM_BASE_URL.to_string(),
        }
    }

    pub fn from_json(json: impl Into<String>) -> Self {
        Self {
            credentials_file: None,
            credentials_json: Some(json.into()),
            base_url: FCM_BASE_URL.to_string(),
        }
    }

    /// Uses the service account key `GOOGLE_APPLICATION_CREDENTIALS` points to.
    ///
    /// For details, see https://google.aip.dev/auth/4110
    pub fn from_env() -> Self {
        Self {
            credentials_file: env::var_os(CREDENTIALS_ENV).map(PathBuf::from),
            credentials_json: None,
            base_url: FCM_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Decides which credential source this configuration refers to.
    pub fn validate(&self) -> Result<CredentialSource, ConfigError> {
        let file = self
            .credentials_file
            .as_ref()
            .filter(|path| !path.as_os_str().is_empty());
        let json = self
            .credentials_json
            .as_ref()
            .filter(|json| !json.trim().is_empty());
        match (file, json) {
            (Some(_), Some(_)) => Err(ConfigError::AmbiguousCredentials),
            (None, None) => Err(ConfigError::MissingCredentials),
            (Some(path), None) => Ok(CredentialSource::File(path.clone())),
            (None, Some(json)) => Ok(CredentialSource::Json(json.clone())),
        }
    }
}

impl fmt::Debug for V1Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("V1Settings")
            .field("credentials_file", &self.credentials_file)
            .field(
                "credentials_json",
                &self.credentials_json.as_ref().map(|_| "<redacted>"),
            )
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Where service account credentials come from.
#[derive(Clone, PartialEq, Eq)]
pub enum CredentialSource {
    File(PathBuf),
    Json(String),
}

impl fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => f.debug_tuple("File").field(path).finish(),
            Self::Json(_) => f.write_str("Json(<redacted>)"),
        }
    }
}

/// A service account key with the fields this crate relies on pulled out.
#[derive(Clone)]
pub struct ServiceAccountInfo {
    pub project_id: String,
    pub client_email: Option<String>,
    pub(crate) json: String,
}

#[derive(Deserialize)]
struct ServiceAccountFields {
    project_id: Option<String>,
    client_email: Option<String>,
}

impl ServiceAccountInfo {
    pub fn load(source: &CredentialSource) -> Result<Self, ConfigError> {
        let json = match source {
            CredentialSource::File(path) => std::fs::read_to_string(path).map_err(|source| {
                ConfigError::UnreadableCredentials {
                    path: path.clone(),
                    source,
                }
            })?,
            CredentialSource::Json(json) => json.clone(),
        };
        Self::parse(json)
    }

    pub fn parse(json: String) -> Result<Self, ConfigError> {
        let fields: ServiceAccountFields =
            serde_json::from_str(&json).map_err(ConfigError::InvalidCredentials)?;
        let project_id = fields
            .project_id
            .filter(|id| !id.trim().is_empty())
            .ok_or(ConfigError::MissingProjectId)?;
        Ok(Self {
            project_id,
            client_email: fields.client_email,
            json,
        })
    }
}

impl fmt::Debug for ServiceAccountInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountInfo")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .finish_non_exhaustive()
    }
}
