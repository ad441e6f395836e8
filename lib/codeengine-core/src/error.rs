use codeengine_api::ValidationError;
use serde_json::Value;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Header carrying the identifier the service assigns to each transaction
pub const TRANSACTION_ID_HEADER: &str = "X-Global-Transaction-Id";

#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Service URL is missing")]
    ServiceUrlMissing,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("Authentication error: {0}")]
    Auth(#[source] AuthError),

    #[error("Transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Deadline exceeded before the call completed")]
    DeadlineExceeded,

    #[error("HTTP {status}: {message}")]
    Status {
        status: u16,
        transaction_id: Option<String>,
        message: String,
    },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Classify a transport failure, keeping client-side timeouts apart
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::DeadlineExceeded
        } else {
            Error::Transport(err)
        }
    }

    /// HTTP status of a protocol error
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Status { status, .. } => Some(*status),
            Error::Auth(AuthError::Status { status, .. }) => Some(*status),
            _ => None,
        }
    }

    pub fn transaction_id(&self) -> Option<&str> {
        match self {
            Error::Status { transaction_id, .. } => transaction_id.as_deref(),
            _ => None,
        }
    }
}

/// A token request that ran out of time surfaces as the call's deadline
impl From<AuthError> for Error {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Timeout => Error::DeadlineExceeded,
            other => Error::Auth(other),
        }
    }
}

/// Errors raised while obtaining or applying credentials
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid authenticator configuration: {0}")]
    InvalidConfig(String),

    #[error("Token request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Token request timed out")]
    Timeout,

    #[error("Token request rejected with HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Malformed token response: {0}")]
    MalformedToken(String),
}

impl AuthError {
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AuthError::Timeout
        } else {
            AuthError::Transport(err)
        }
    }
}

/// Pull a human readable message out of an error response body.
///
/// Looks at `errors[0].message`, `error`, `message` and `errorMessage` in that
/// order; returns `None` for non-JSON bodies or when none of them is a string.
pub fn extract_error_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;

    if let Some(message) = value
        .get("errors")
        .and_then(|errors| errors.get(0))
        .and_then(|first| first.get("message"))
        .and_then(Value::as_str)
    {
        return Some(message.to_string());
    }

    ["error", "message", "errorMessage"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}
