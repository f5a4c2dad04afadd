//! Gateway error taxonomy and its HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while handling one proxied request.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The target host directive was not supplied.
    #[error("x-gateway-service-host header is required.")]
    MissingTarget,

    /// A directive is present but unusable (bad host, header name or value).
    #[error("{0}")]
    InvalidDirective(String),

    /// No credential in the request and none in the secret mapping.
    #[error("Cannot find API key for proxied service! Either provide it in the request headers or set it as an environment variable.")]
    MissingCredential,

    /// Transport failure talking to the upstream.
    #[error("Upstream request failed")]
    UpstreamUnreachable(String),

    /// Upstream declared an event stream but sent no body.
    #[error("No body to stream!")]
    EmptyStreamBody,
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::MissingTarget
            | GatewayError::InvalidDirective(_)
            | GatewayError::MissingCredential => StatusCode::BAD_REQUEST,
            GatewayError::UpstreamUnreachable(_) => StatusCode::BAD_GATEWAY,
            GatewayError::EmptyStreamBody => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The JSON body returned to the caller.
    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error: self.to_string(),
        }
    }
}

/// Structured error body: `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{{\"error\":{:?}}}", self.error))
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}
