//! Application configuration.
//!
//! Built once at startup from `REFMATCH_*` environment variables and passed
//! by injection; nothing reads the environment after this point.

use std::time::Duration;

const CATALOG_BASE_ENV: &str = "REFMATCH_CATALOG_BASE";
const ORGANIZATION_ENV: &str = "REFMATCH_ORG";
const REGION_ENV: &str = "REFMATCH_REGION";
const SEARCH_TIMEOUT_ENV: &str = "REFMATCH_SEARCH_TIMEOUT_MS";
const BATCH_TIMEOUT_ENV: &str = "REFMATCH_BATCH_TIMEOUT_MS";
const OAUTH_ENABLED_ENV: &str = "REFMATCH_OAUTH_ENABLED";
const OAUTH_TOKEN_URL_ENV: &str = "REFMATCH_OAUTH_TOKEN_URL";
const OAUTH_CLIENT_ID_ENV: &str = "REFMATCH_OAUTH_CLIENT_ID";
const OAUTH_CLIENT_SECRET_ENV: &str = "REFMATCH_OAUTH_CLIENT_SECRET";
const OAUTH_SCOPES_ENV: &str = "REFMATCH_OAUTH_SCOPES";

const DEFAULT_CATALOG_BASE: &str = "http://localhost:8003";
const DEFAULT_ORGANIZATION: &str = "dev-org";
const DEFAULT_REGION: &str = "AU";
const DEFAULT_TOKEN_URL: &str = "http://pathlab-assist-auth:8080/v1/oauth/token";
const DEFAULT_CLIENT_ID: &str = "refmatch";
const DEFAULT_SCOPES: &str = "system:catalog:read system/Test.read";

/// Single-item catalog search deadline.
const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_secs(5);
/// Batch catalog match deadline.
const DEFAULT_BATCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub catalog_base: String,
    /// Tenant code sent as `X-Organization-Code` on every catalog call.
    pub organization: String,
    /// Region sent with batch match requests.
    pub region: String,
    pub search_timeout: Duration,
    pub batch_timeout: Duration,
    pub oauth: OAuthConfig,
}

#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub enabled: bool,
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub scopes: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            catalog_base: DEFAULT_CATALOG_BASE.to_string(),
            organization: DEFAULT_ORGANIZATION.to_string(),
            region: DEFAULT_REGION.to_string(),
            search_timeout: DEFAULT_SEARCH_TIMEOUT,
            batch_timeout: DEFAULT_BATCH_TIMEOUT,
            oauth: OAuthConfig::default(),
        }
    }
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            token_url: DEFAULT_TOKEN_URL.to_string(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            client_secret: String::new(),
            scopes: DEFAULT_SCOPES.to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            catalog_base: env_string(CATALOG_BASE_ENV, &defaults.catalog_base),
            organization: env_string(ORGANIZATION_ENV, &defaults.organization),
            region: env_string(REGION_ENV, &defaults.region),
            search_timeout: env_duration_ms(SEARCH_TIMEOUT_ENV, defaults.search_timeout),
            batch_timeout: env_duration_ms(BATCH_TIMEOUT_ENV, defaults.batch_timeout),
            oauth: OAuthConfig {
                enabled: env_var(OAUTH_ENABLED_ENV)
                    .as_deref()
                    .map_or(true, parse_bool),
                token_url: env_string(OAUTH_TOKEN_URL_ENV, DEFAULT_TOKEN_URL),
                client_id: env_string(OAUTH_CLIENT_ID_ENV, DEFAULT_CLIENT_ID),
                client_secret: env_string(OAUTH_CLIENT_SECRET_ENV, ""),
                scopes: env_string(OAUTH_SCOPES_ENV, DEFAULT_SCOPES),
            },
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_string(name: &str, default: &str) -> String {
    env_var(name).unwrap_or_else(|| default.to_string())
}

fn env_duration_ms(name: &str, default: Duration) -> Duration {
    env_var(name)
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.catalog_base, "http://localhost:8003");
        assert_eq!(config.organization, "dev-org");
        assert_eq!(config.region, "AU");
        assert_eq!(config.search_timeout, Duration::from_secs(5));
        assert_eq!(config.batch_timeout, Duration::from_secs(10));
        assert!(config.oauth.enabled);
        assert_eq!(config.oauth.scopes, "system:catalog:read system/Test.read");
    }

    #[test]
    fn parse_bool_accepts_common_spellings() {
        for value in ["1", "true", "TRUE", "yes", "on"] {
            assert!(parse_bool(value), "{value} should parse as true");
        }
        for value in ["0", "false", "no", "off", "banana"] {
            assert!(!parse_bool(value), "{value} should parse as false");
        }
    }
}
