//! Credential injection into the outbound request.

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

use crate::gateway::directive::{AuthPlacement, GatewayDirective, SERVICE_AUTH_KEY};
use crate::gateway::error::GatewayError;

/// Apply `credential` according to the directive's placement.
///
/// Header placement honours the prefix verbatim (`"{prefix} {credential}"`);
/// query placement always carries the bare credential.
pub fn inject(
    directive: &GatewayDirective,
    credential: &str,
    headers: &mut HeaderMap,
    url: &mut Url,
) -> Result<(), GatewayError> {
    match &directive.auth {
        AuthPlacement::Header { key } => {
            let name = HeaderName::from_bytes(key.as_bytes()).map_err(|_| {
                GatewayError::InvalidDirective(format!("{} header is invalid.", SERVICE_AUTH_KEY))
            })?;
            let value = match &directive.auth_prefix {
                Some(prefix) => format!("{} {}", prefix, credential),
                None => credential.to_string(),
            };
            let mut value = HeaderValue::from_str(&value).map_err(|_| {
                GatewayError::InvalidDirective("Credential is not a valid header value.".to_string())
            })?;
            value.set_sensitive(true);
            headers.insert(name, value);
        }
        AuthPlacement::Query { key } => {
            url.query_pairs_mut().append_pair(key, credential);
        }
        AuthPlacement::None => {}
    }
    Ok(())
}
