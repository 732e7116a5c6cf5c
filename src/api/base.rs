use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQlRequest<'a> {
    pub operation_name: &'a str,
    pub query: &'a str,
    pub variables: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<ApiError>,
}

impl<T> GraphQlResponse<T> {
    /// Yields `data`, or the first reported error when the server sent any.
    pub fn into_result(self) -> Result<T> {
        if let Some(error) = self.errors.into_iter().next() {
            if error.is_auth_failure() {
                return Err(MonarchError::Unauthorized(error.message));
            }
            return Err(error.into());
        }

        self.data.ok_or_else(|| MonarchError::UnexpectedResponse {
            status: 200,
            body: "GraphQL response carried neither data nor errors".to_string(),
        })
    }
}

#[derive(thiserror::Error, Debug, Deserialize)]
pub struct ApiError {
    pub message: String,
    pub path: Option<Vec<serde_json::Value>>,
    pub extensions: Option<serde_json::Value>,
}

impl ApiError {
    pub fn code(&self) -> Option<&str> {
        self.extensions.as_ref()?.get("code")?.as_str()
    }

    fn is_auth_failure(&self) -> bool {
        let message = self.message.to_lowercase();
        message.contains("unauthorized")
            || message.contains("authentication")
            || message.contains("token")
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.code() {
            Some(code) => write!(f, "Error {code}: {}", self.message),
            None => write!(f, "Error: {}", self.message),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum MonarchError {
    #[error("Multi-factor authentication required")]
    MfaRequired,
    #[error("Login failed (HTTP {status}): {message}")]
    LoginFailed { status: u16, message: String },
    #[error("Authentication failed: {0}")]
    Unauthorized(String),
    #[error("Rate limited by Monarch Money{}", retry_hint(*.retry_after))]
    RateLimited { retry_after: Option<u64> },
    #[error("Not logged in")]
    NotLoggedIn,
    #[error("Session already closed")]
    SessionClosed,
    #[error("Invalid MFA secret: {0}")]
    InvalidMfaSecret(String),
    #[error("System clock error")]
    Clock(#[from] std::time::SystemTimeError),
    #[error("Monarch Money API error")]
    Api(#[from] ApiError),
    #[error("HTTP Error")]
    Http(#[from] reqwest::Error),
    #[error("JSON Error")]
    Json(#[from] serde_json::Error),
    #[error("I/O Error")]
    Io(#[from] std::io::Error),
    #[error("Unexpected response (status {status}): {body}")]
    UnexpectedResponse { status: u16, body: String },
    #[error("Configuration error: {0}")]
    Config(String),
}

fn retry_hint(retry_after: Option<u64>) -> String {
    retry_after
        .map(|secs| format!(" (retry after {secs}s)"))
        .unwrap_or_default()
}

impl MonarchError {
    /// Stable category name, printed next to the failure message.
    pub fn kind(&self) -> &'static str {
        match self {
            MonarchError::MfaRequired => "MfaRequired",
            MonarchError::LoginFailed { .. } => "LoginFailed",
            MonarchError::Unauthorized(_) => "Unauthorized",
            MonarchError::RateLimited { .. } => "RateLimited",
            MonarchError::NotLoggedIn => "NotLoggedIn",
            MonarchError::SessionClosed => "SessionClosed",
            MonarchError::InvalidMfaSecret(_) => "InvalidMfaSecret",
            MonarchError::Clock(_) => "Clock",
            MonarchError::Api(_) => "Api",
            MonarchError::Http(_) => "Http",
            MonarchError::Json(_) => "Json",
            MonarchError::Io(_) => "Io",
            MonarchError::UnexpectedResponse { .. } => "UnexpectedResponse",
            MonarchError::Config(_) => "Config",
        }
    }
}

pub type Result<T> = std::result::Result<T, MonarchError>;
