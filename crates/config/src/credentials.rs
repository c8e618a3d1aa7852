// Directory credentials
//
// Bearer tokens are resolved from, in order:
// 1. The --token command-line flag
// 2. System keychain (feature "keychain")
// 3. The endpoint's token_env environment variable
//
// Tokens are NEVER stored in migrate.toml

use std::env;

use crate::error::ConfigError;
use crate::migrate::EndpointConfig;

/// Service name for keychain storage
const KEYCHAIN_SERVICE: &str = "contact-migrate";

/// Where a token came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Flag,
    Keychain,
    Environment,
}

impl TokenSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenSource::Flag => "flag",
            TokenSource::Keychain => "keychain",
            TokenSource::Environment => "environment",
        }
    }
}

#[derive(Clone)]
pub struct Credential {
    pub token: String,
    pub source: TokenSource,
}

// Keep tokens out of debug logs.
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

/// Keychain account for an endpoint: its system label.
pub fn keychain_account(endpoint: &EndpointConfig) -> String {
    format!("directory/{}", endpoint.system_label().to_lowercase())
}

/// Resolve the bearer token for `endpoint`. `role` names the endpoint in
/// errors ("source" or "destination").
pub fn resolve_token(
    role: &str,
    endpoint: &EndpointConfig,
    explicit: Option<&str>,
) -> Result<Credential, ConfigError> {
    if let Some(token) = explicit.map(str::trim).filter(|t| !t.is_empty()) {
        return Ok(Credential {
            token: token.to_string(),
            source: TokenSource::Flag,
        });
    }

    if let Some(token) = keychain_token(&keychain_account(endpoint)) {
        return Ok(Credential {
            token,
            source: TokenSource::Keychain,
        });
    }

    if let Some(name) = endpoint.token_env.as_deref() {
        if let Ok(token) = env::var(name) {
            if !token.trim().is_empty() {
                return Ok(Credential {
                    token: token.trim().to_string(),
                    source: TokenSource::Environment,
                });
            }
        }
    }

    Err(ConfigError::MissingCredentials {
        endpoint: format!("{role} ({})", endpoint.system_label()),
        env_var: endpoint.token_env.clone(),
    })
}

#[cfg(feature = "keychain")]
fn keychain_token(account: &str) -> Option<String> {
    let entry = keyring::Entry::new(KEYCHAIN_SERVICE, account).ok()?;
    match entry.get_password() {
        Ok(token) if !token.trim().is_empty() => Some(token),
        Ok(_) => None,
        Err(keyring::Error::NoEntry) => None,
        Err(e) => {
            tracing::debug!(account, "keychain lookup failed: {e}");
            None
        }
    }
}

#[cfg(not(feature = "keychain"))]
fn keychain_token(_account: &str) -> Option<String> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate::EndpointKind;

    fn endpoint(token_env: Option<&str>, system_id: &str) -> EndpointConfig {
        EndpointConfig {
            kind: EndpointKind::Http,
            base_url: Some("https://dir.example.com".into()),
            token_env: token_env.map(str::to_string),
            system_id: Some(system_id.into()),
            page_size: 100,
            path: None,
        }
    }

    #[test]
    fn flag_wins() {
        let ep = endpoint(Some("CMIG_TEST_FLAG_WINS"), "cmig-test-flag-wins");
        env::set_var("CMIG_TEST_FLAG_WINS", "from-env");
        let cred = resolve_token("source", &ep, Some(" from-flag ")).unwrap();
        assert_eq!(cred.token, "from-flag");
        assert_eq!(cred.source, TokenSource::Flag);
    }

    #[test]
    fn environment_fallback() {
        let ep = endpoint(Some("CMIG_TEST_ENV_FALLBACK"), "cmig-test-env-fallback");
        env::set_var("CMIG_TEST_ENV_FALLBACK", "tok-123");
        let cred = resolve_token("source", &ep, None).unwrap();
        assert_eq!(cred.token, "tok-123");
        assert_eq!(cred.source, TokenSource::Environment);
    }

    #[test]
    fn missing_everywhere() {
        let ep = endpoint(Some("CMIG_TEST_UNSET_TOKEN"), "cmig-test-missing");
        env::remove_var("CMIG_TEST_UNSET_TOKEN");
        let err = resolve_token("destination", &ep, Some("   ")).unwrap_err();
        match err {
            ConfigError::MissingCredentials { endpoint, env_var } => {
                assert!(endpoint.starts_with("destination"));
                assert_eq!(env_var.as_deref(), Some("CMIG_TEST_UNSET_TOKEN"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn debug_redacts_token() {
        let cred = Credential {
            token: "secret".into(),
            source: TokenSource::Flag,
        };
        assert!(!format!("{cred:?}").contains("secret"));
    }

    #[test]
    fn account_uses_system_label() {
        let ep = endpoint(None, "OnPrem-Exchange");
        assert_eq!(keychain_account(&ep), "directory/onprem-exchange");
    }
}
