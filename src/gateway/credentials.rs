//! Credential resolution.
//!
//! # Responsibilities
//! - Hold the operator-provisioned secret mapping (read-only)
//! - Derive the secret key for a target host
//! - Pick the explicit credential or fall back to the mapping
//!
//! # Design Decisions
//! - The mapping is built once at startup and shared behind `Arc`
//! - Key derivation: non-alphanumerics become `_`, uppercase, `_API_KEY` suffix

use std::collections::HashMap;

use crate::gateway::directive::GatewayDirective;
use crate::gateway::error::GatewayError;

/// Suffix appended to every derived secret key.
pub const SECRET_KEY_SUFFIX: &str = "_API_KEY";

/// Immutable key→credential store.
#[derive(Debug, Clone, Default)]
pub struct SecretMap {
    entries: HashMap<String, String>,
}

impl SecretMap {
    pub fn new(entries: HashMap<String, String>) -> Self {
        Self { entries }
    }

    /// Build from static entries overlaid with matching process env vars.
    ///
    /// Only variables whose name ends in `_API_KEY` are picked up; env wins
    /// over static entries.
    pub fn from_env_with(static_entries: &HashMap<String, String>) -> Self {
        Self::merged(static_entries, std::env::vars())
    }

    fn merged(
        static_entries: &HashMap<String, String>,
        env: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        let mut entries = static_entries.clone();
        entries.extend(env.into_iter().filter(|(k, _)| k.ends_with(SECRET_KEY_SUFFIX)));
        Self { entries }
    }

    /// Look up a non-empty value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SecretMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Derive the secret-mapping key for a host, e.g. `api.example.com` → `API_EXAMPLE_COM_API_KEY`.
pub fn secret_key_for_host(host: &str) -> String {
    let mut key: String = host
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    key.push_str(SECRET_KEY_SUFFIX);
    key
}

/// Resolve the credential to inject for this request.
pub fn resolve(directive: &GatewayDirective, secrets: &SecretMap) -> Result<String, GatewayError> {
    if let Some(explicit) = &directive.explicit_credential {
        return Ok(explicit.clone());
    }

    let key = secret_key_for_host(&directive.target_host);
    match secrets.get(&key) {
        Some(value) => Ok(value.to_string()),
        None => {
            tracing::debug!(secret_key = %key, "No credential in request or secret mapping");
            Err(GatewayError::MissingCredential)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::directive::AuthPlacement;

    fn directive(host: &str, explicit: Option<&str>) -> GatewayDirective {
        GatewayDirective {
            target_host: host.to_string(),
            explicit_credential: explicit.map(str::to_string),
            auth: AuthPlacement::None,
            auth_prefix: None,
        }
    }

    #[test]
    fn test_secret_key_derivation() {
        assert_eq!(secret_key_for_host("api.example.com"), "API_EXAMPLE_COM_API_KEY");
        assert_eq!(secret_key_for_host("api.openai.com"), "API_OPENAI_COM_API_KEY");
        assert_eq!(secret_key_for_host("my-svc.io:8443"), "MY_SVC_IO_8443_API_KEY");
    }

    #[test]
    fn test_non_ascii_becomes_separator() {
        assert_eq!(secret_key_for_host("bücher.de"), "B_CHER_DE_API_KEY");
    }

    #[test]
    fn test_explicit_credential_wins() {
        let secrets: SecretMap = [("API_EXAMPLE_COM_API_KEY", "from-map")].into_iter().collect();
        let cred = resolve(&directive("api.example.com", Some("explicit")), &secrets).unwrap();
        assert_eq!(cred, "explicit");
    }

    #[test]
    fn test_falls_back_to_mapping() {
        let secrets: SecretMap = [("API_EXAMPLE_COM_API_KEY", "from-map")].into_iter().collect();
        let cred = resolve(&directive("api.example.com", None), &secrets).unwrap();
        assert_eq!(cred, "from-map");
    }

    #[test]
    fn test_missing_credential() {
        let secrets: SecretMap = [("API_OTHER_COM_API_KEY", "x")].into_iter().collect();
        let err = resolve(&directive("api.monapi.io", None), &secrets).unwrap_err();
        assert!(matches!(err, GatewayError::MissingCredential));
    }

    #[test]
    fn test_empty_mapping_value_is_missing() {
        let secrets: SecretMap = [("API_EXAMPLE_COM_API_KEY", "")].into_iter().collect();
        assert!(resolve(&directive("api.example.com", None), &secrets).is_err());
    }

    #[test]
    fn test_env_overrides_static_and_filters_suffix() {
        let static_entries: HashMap<String, String> = [
            ("API_A_COM_API_KEY".to_string(), "static".to_string()),
            ("API_B_COM_API_KEY".to_string(), "static-b".to_string()),
        ]
        .into_iter()
        .collect();
        let env = vec![
            ("API_A_COM_API_KEY".to_string(), "env".to_string()),
            ("PATH".to_string(), "/usr/bin".to_string()),
        ];

        let secrets = SecretMap::merged(&static_entries, env);
        assert_eq!(secrets.get("API_A_COM_API_KEY"), Some("env"));
        assert_eq!(secrets.get("API_B_COM_API_KEY"), Some("static-b"));
        assert_eq!(secrets.get("PATH"), None);
        assert_eq!(secrets.len(), 2);
    }
}
