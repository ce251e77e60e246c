use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::utils::constants::TOKEN_EXCHANGE_FAILURE_MSG;

/// The token endpoint could not be reached, rejected the grant, or answered
/// with a body that carries no access token. Nothing is cached.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct CredentialExchangeFailure {
    pub message: String,
    /// Upstream status when a response was received.
    pub status: Option<u16>,
    /// Upstream body (JSON when parsable, raw text otherwise) or the
    /// transport error message.
    pub upstream_details: Value,
}

impl CredentialExchangeFailure {
    pub fn transport(err: &reqwest::Error) -> Self {
        Self {
            message: TOKEN_EXCHANGE_FAILURE_MSG.to_owned(),
            status: None,
            upstream_details: Value::String(err.to_string()),
        }
    }

    pub fn rejected(status: u16, body: &str) -> Self {
        Self {
            message: TOKEN_EXCHANGE_FAILURE_MSG.to_owned(),
            status: Some(status),
            upstream_details: body_to_value(body),
        }
    }

    pub fn malformed(status: u16, body: &str) -> Self {
        Self {
            message: TOKEN_EXCHANGE_FAILURE_MSG.to_owned(),
            status: Some(status),
            upstream_details: json!({
                "error": "access_token missing from token endpoint response",
                "body": body_to_value(body),
            }),
        }
    }

    pub fn reason(&self) -> &'static str {
        match self.status {
            None => "transport",
            Some(status) if (200..300).contains(&status) => "malformed",
            Some(_) => "rejected",
        }
    }
}

/// Failure of a proxied console request.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Credential(#[from] CredentialExchangeFailure),
    #[error("{message}")]
    Upstream {
        message: String,
        status: Option<u16>,
        details: Value,
    },
}

impl ProxyError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn upstream_transport(err: &reqwest::Error) -> Self {
        Self::Upstream {
            message: err.to_string(),
            status: None,
            details: Value::Null,
        }
    }

    pub fn upstream_status(status: u16, body: &str) -> Self {
        Self::Upstream {
            message: format!("Request failed with status code {}", status),
            status: Some(status),
            details: body_to_value(body),
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            ProxyError::BadRequest(_) => "bad_request",
            ProxyError::Credential(_) => "credential",
            ProxyError::Upstream { .. } => "upstream",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            ProxyError::BadRequest(message) => json!({ "error": message }),
            ProxyError::Credential(failure) => json!({
                "error": failure.message,
                "details": failure.upstream_details,
            }),
            ProxyError::Upstream {
                message, details, ..
            } => json!({ "error": message, "details": details }),
        };
        (status, Json(body)).into_response()
    }
}

/// Parse as JSON, fall back to the raw text, `null` when empty.
pub fn body_to_value(body: &str) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_owned()))
}
