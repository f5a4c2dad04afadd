//! Header sanitization.
//!
//! # Responsibilities
//! - Strip credential-bearing headers before forwarding or persisting
//! - Strip `x-gateway-*` control headers before forwarding
//! - Strip hop-by-hop headers that must not cross the proxy
//!
//! # Design Decisions
//! - Every operation returns a fresh copy; the inbound map is never mutated
//! - Operations are idempotent and can be applied in any order

use axum::http::{header, HeaderMap, HeaderName};

/// Prefix shared by every gateway control header.
pub const CONTROL_PREFIX: &str = "x-gateway-";

/// Header carrying the explicit service credential.
pub const SERVICE_TOKEN: &str = "x-gateway-service-token";

/// Headers that carry secrets and never leave the gateway.
pub const SENSITIVE_HEADERS: [&str; 2] = ["authorization", SERVICE_TOKEN];

/// Connection-scoped headers (RFC 9110 §7.6.1).
const HOP_BY_HOP: [HeaderName; 7] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Return a copy of `headers` without the sensitive deny-list.
pub fn remove_sensitive(headers: &HeaderMap) -> HeaderMap {
    let mut out = headers.clone();
    for name in SENSITIVE_HEADERS {
        out.remove(name);
    }
    out
}

/// Return a copy of `headers` without any `x-gateway-*` header.
pub fn remove_control(headers: &HeaderMap) -> HeaderMap {
    headers
        .iter()
        .filter(|(name, _)| !is_control(name))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

/// Headers safe to send upstream: no secrets, no directives.
pub fn for_upstream(headers: &HeaderMap) -> HeaderMap {
    let mut out = remove_control(&remove_sensitive(headers));
    strip_hop_by_hop(&mut out);
    out.remove(header::HOST);
    out
}

/// Remove hop-by-hop headers in place, including any listed in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
    headers.remove("keep-alive");
    headers.remove("proxy-connection");
}

/// Serialize headers to a JSON object string for persistence.
///
/// Repeated headers are joined with `", "`; non-UTF-8 values are dropped.
pub fn to_json_string(headers: &HeaderMap) -> String {
    let mut map = serde_json::Map::new();
    for name in headers.keys() {
        let joined = headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect::<Vec<_>>()
            .join(", ");
        map.insert(name.as_str().to_string(), serde_json::Value::String(joined));
    }
    serde_json::Value::Object(map).to_string()
}

fn is_control(name: &HeaderName) -> bool {
    // HeaderName is always lowercase.
    name.as_str().starts_with(CONTROL_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn sample() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer caller"));
        headers.insert("x-gateway-service-token", HeaderValue::from_static("sk-secret"));
        headers.insert("x-gateway-service-host", HeaderValue::from_static("api.example.com"));
        headers.insert("x-gateway-bundle-version", HeaderValue::from_static("1.0.0"));
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        headers.insert("user-agent", HeaderValue::from_static("test-agent"));
        headers
    }

    #[test]
    fn test_remove_sensitive_keeps_control_headers() {
        let out = remove_sensitive(&sample());
        assert!(out.get("authorization").is_none());
        assert!(out.get(SERVICE_TOKEN).is_none());
        assert_eq!(out.get("x-gateway-service-host").unwrap(), "api.example.com");
        assert_eq!(out.get("content-type").unwrap(), "application/json");
    }

    #[test]
    fn test_remove_control_drops_every_prefixed_header() {
        let out = remove_control(&sample());
        assert!(out.keys().all(|k| !k.as_str().starts_with(CONTROL_PREFIX)));
        assert_eq!(out.get("authorization").unwrap(), "Bearer caller");
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_sanitizers_are_idempotent() {
        let once = remove_control(&sample());
        assert_eq!(remove_control(&once), once);

        let once = remove_sensitive(&sample());
        assert_eq!(remove_sensitive(&once), once);
    }

    #[test]
    fn test_sanitizers_commute() {
        let a = remove_control(&remove_sensitive(&sample()));
        let b = remove_sensitive(&remove_control(&sample()));
        assert_eq!(a, b);
    }

    #[test]
    fn test_for_upstream_strips_host_and_hop_by_hop() {
        let mut headers = sample();
        headers.insert("host", HeaderValue::from_static("gateway.local"));
        headers.insert("connection", HeaderValue::from_static("keep-alive, x-custom-hop"));
        headers.insert("x-custom-hop", HeaderValue::from_static("1"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert("transfer-encoding", HeaderValue::from_static("chunked"));

        let out = for_upstream(&headers);
        let names: Vec<&str> = out.keys().map(|k| k.as_str()).collect();
        assert_eq!(names.len(), 2, "unexpected headers: {:?}", names);
        assert!(out.contains_key("content-type"));
        assert!(out.contains_key("user-agent"));
    }

    #[test]
    fn test_to_json_string_joins_repeated_values() {
        let mut headers = HeaderMap::new();
        headers.append("accept", HeaderValue::from_static("text/html"));
        headers.append("accept", HeaderValue::from_static("application/json"));
        let json: serde_json::Value = serde_json::from_str(&to_json_string(&headers)).unwrap();
        assert_eq!(json["accept"], "text/html, application/json");
    }
}
