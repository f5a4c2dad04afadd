//! Gateway directive parsing.
//!
//! # Responsibilities
//! - Read the reserved `x-gateway-service-*` headers
//! - Decode auth placement once into a closed enum
//!
//! # Design Decisions
//! - Pure function over the header map; no I/O
//! - Empty header values are treated as absent
//! - A placement without a key, or an unknown placement, means no injection

use axum::http::HeaderMap;

use crate::gateway::error::GatewayError;

pub const SERVICE_HOST: &str = "x-gateway-service-host";
pub const SERVICE_TOKEN: &str = crate::gateway::headers::SERVICE_TOKEN;
pub const SERVICE_AUTH_KEY: &str = "x-gateway-service-auth-key";
pub const SERVICE_AUTH_TYPE: &str = "x-gateway-service-auth-type";
pub const SERVICE_AUTH_PREFIX: &str = "x-gateway-service-auth-prefix";

/// Where the resolved credential is placed on the outbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthPlacement {
    /// Set the named header.
    Header { key: String },
    /// Append the named query parameter.
    Query { key: String },
    /// Forward without injecting anything.
    None,
}

impl AuthPlacement {
    fn decode(kind: Option<&str>, key: Option<&str>) -> Self {
        match (kind, key) {
            (Some("HEADER"), Some(key)) => AuthPlacement::Header { key: key.to_string() },
            (Some("QUERY"), Some(key)) => AuthPlacement::Query { key: key.to_string() },
            _ => AuthPlacement::None,
        }
    }
}

/// Routing and authentication instructions carried by one inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayDirective {
    pub target_host: String,
    pub explicit_credential: Option<String>,
    pub auth: AuthPlacement,
    pub auth_prefix: Option<String>,
}

impl GatewayDirective {
    /// Parse directives from inbound headers.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, GatewayError> {
        let target_host = header_str(headers, SERVICE_HOST)
            .ok_or(GatewayError::MissingTarget)?
            .to_string();

        let auth = AuthPlacement::decode(
            header_str(headers, SERVICE_AUTH_TYPE),
            header_str(headers, SERVICE_AUTH_KEY),
        );

        Ok(Self {
            target_host,
            explicit_credential: header_str(headers, SERVICE_TOKEN).map(str::to_string),
            auth,
            auth_prefix: header_str(headers, SERVICE_AUTH_PREFIX).map(str::to_string),
        })
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
