//! The persisted shape of one finished exchange.

use std::net::SocketAddr;

use axum::http::{HeaderMap, Method, Uri};
use serde::{Deserialize, Serialize};

use crate::gateway::headers;

pub const SERVICE_ID: &str = "x-gateway-service-id";
pub const SERVICE_NAME: &str = "x-gateway-service-name";
pub const IDENTIFIER_FOR_VENDOR: &str = "x-gateway-identifier-for-vendor";
pub const BUNDLE_IDENTIFIER: &str = "x-gateway-bundle-identifier";
pub const BUNDLE_VERSION: &str = "x-gateway-bundle-version";

/// One request/response pair as seen by analytics.
///
/// Built from the inbound request before it is consumed; the status and
/// error are filled in once the response is known.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRecord {
    pub request_id: Option<String>,
    pub method: String,
    pub url: String,
    /// JSON object of inbound headers with credentials removed.
    pub headers: String,
    pub status_code: u16,
    /// Body text of a failed exchange: the gateway's JSON error, or the
    /// upstream's 4xx/5xx body (capped).
    pub error: Option<String>,
    pub user_agent: Option<String>,
    pub client_ip: Option<String>,
    pub client_country: Option<String>,
    pub service_id: Option<String>,
    pub service_name: Option<String>,
    pub identifier_for_vendor: Option<String>,
    pub bundle_identifier: Option<String>,
    pub bundle_version: Option<String>,
}

impl ExchangeRecord {
    /// Snapshot the parts of an inbound request analytics cares about.
    pub fn capture(method: &Method, uri: &Uri, inbound: &HeaderMap, peer: Option<SocketAddr>) -> Self {
        let get = |name: &str| {
            inbound
                .get(name)
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let client_ip = get("cf-connecting-ip")
            .or_else(|| {
                get("x-forwarded-for")
                    .and_then(|v| v.split(',').next().map(|ip| ip.trim().to_string()))
            })
            .or_else(|| peer.map(|addr| addr.ip().to_string()));

        Self {
            request_id: get("x-request-id"),
            method: method.to_string(),
            url: absolute_url(uri, inbound),
            headers: headers::to_json_string(&headers::remove_sensitive(inbound)),
            status_code: 0,
            error: None,
            user_agent: get("user-agent"),
            client_ip,
            client_country: get("cf-ipcountry"),
            service_id: get(SERVICE_ID),
            service_name: get(SERVICE_NAME),
            identifier_for_vendor: get(IDENTIFIER_FOR_VENDOR),
            bundle_identifier: get(BUNDLE_IDENTIFIER),
            bundle_version: get(BUNDLE_VERSION),
        }
    }

    /// Attach the outcome of the exchange.
    pub fn finish(mut self, status_code: u16, error: Option<String>) -> Self {
        self.status_code = status_code;
        self.error = error;
        self
    }
}

fn absolute_url(uri: &Uri, inbound: &HeaderMap) -> String {
    if uri.authority().is_some() {
        return uri.to_string();
    }
    match inbound.get("host").and_then(|v| v.to_str().ok()) {
        Some(host) => format!("http://{}{}", host, uri),
        None => uri.to_string(),
    }
}
