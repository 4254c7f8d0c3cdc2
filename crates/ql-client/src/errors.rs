use thiserror::Error;

use crate::responses::ResponseKind;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Authentication failed at {endpoint}")]
    AuthenticationFailed { endpoint: String },

    #[error("HTTP error {status} from {endpoint}")]
    Status {
        status: reqwest::StatusCode,
        endpoint: String,
    },

    #[error("Could not decode {kind} response: {source}")]
    Decode {
        kind: ResponseKind,
        #[source]
        source: serde_json::Error,
    },

    #[error("{kind} response failed validation: {reason}")]
    Validation { kind: ResponseKind, reason: String },

    #[error("Expected a {expected} response but dispatch produced {actual}")]
    UnexpectedResponse {
        expected: ResponseKind,
        actual: ResponseKind,
    },

    #[error("Stored auth token was rejected and has been cleared - try launching again")]
    StaleToken,

    #[error("Credentials were rejected - they must match your Bethesda.net account")]
    CredentialMismatch,

    #[error("Store error: {0}")]
    Store(#[from] ql_store::StoreError),

    #[error("Invalid header value for {name}")]
    InvalidHeader { name: &'static str },

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("JSON serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl ClientError {
    /// HTTP, decode and validation failures: "the request failed" to callers
    pub fn is_request_failure(&self) -> bool {
        matches!(
            self,
            Self::Transport(_)
                | Self::AuthenticationFailed { .. }
                | Self::Status { .. }
                | Self::Decode { .. }
                | Self::Validation { .. }
        )
    }

    /// Failures that trace back to a 401 from the identity service
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::AuthenticationFailed { .. } | Self::StaleToken | Self::CredentialMismatch
        )
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
