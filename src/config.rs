//! Client configuration resolved from the environment (and `.env`).
//!
//! Every setting has a default pointing at the public datos.gob.cl resource,
//! so the tool works without any `.env`. CLI flags are applied on top by
//! `app::client_config_from_args`.

use std::time::Duration;

use crate::error::AppError;

pub const DEFAULT_API_URL: &str = "https://datos.gob.cl/api/3/action/datastore_search";
pub const DEFAULT_RESOURCE_ID: &str = "657cc933-eac8-4bfc-b004-c4d6dcd988a8";
pub const DEFAULT_PAGE_SIZE: usize = 50_000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_USER_AGENT: &str = "HospitHealth-REM20/1.0";
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

const ENV_API_URL: &str = "REM20_API_URL";
const ENV_RESOURCE_ID: &str = "REM20_RESOURCE_ID";
const ENV_PAGE_SIZE: &str = "REM20_PAGE_SIZE";
const ENV_TIMEOUT_SECS: &str = "REM20_TIMEOUT_SECS";
const ENV_USER_AGENT: &str = "REM20_USER_AGENT";
const ENV_CACHE_TTL_SECS: &str = "REM20_CACHE_TTL_SECS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_url: String,
    pub resource_id: String,
    /// Records requested per page (`limit`).
    pub page_size: usize,
    /// Per-request timeout.
    pub timeout: Duration,
    pub user_agent: String,
    /// How long a fetched year set stays in the session cache.
    pub cache_ttl: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            resource_id: DEFAULT_RESOURCE_ID.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
        }
    }
}

impl ClientConfig {
    /// Load `.env` (if any) and read `REM20_*` variables.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup; missing keys keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(url) = get(ENV_API_URL) {
            config.api_url = url;
        }
        if let Some(id) = get(ENV_RESOURCE_ID) {
            config.resource_id = id;
        }
        if let Some(ua) = get(ENV_USER_AGENT) {
            config.user_agent = ua;
        }
        if let Some(raw) = get(ENV_PAGE_SIZE) {
            config.page_size = parse_positive(ENV_PAGE_SIZE, &raw)? as usize;
        }
        if let Some(raw) = get(ENV_TIMEOUT_SECS) {
            config.timeout = Duration::from_secs(parse_positive(ENV_TIMEOUT_SECS, &raw)?);
        }
        if let Some(raw) = get(ENV_CACHE_TTL_SECS) {
            // Zero is allowed here: it disables caching.
            let secs = raw
                .parse::<u64>()
                .map_err(|_| AppError::usage(format!("Invalid {ENV_CACHE_TTL_SECS} '{raw}': expected seconds.")))?;
            config.cache_ttl = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

fn parse_positive(key: &str, raw: &str) -> Result<u64, AppError> {
    match raw.parse::<u64>() {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(AppError::usage(format!(
            "Invalid {key} '{raw}': expected a positive integer."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.page_size, 50_000);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn overrides_are_applied() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("REM20_PAGE_SIZE", "100"),
            ("REM20_TIMEOUT_SECS", " 5 "),
            ("REM20_CACHE_TTL_SECS", "0"),
            ("REM20_API_URL", "http://localhost:5000/api"),
        ]))
        .unwrap();
        assert_eq!(config.page_size, 100);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.cache_ttl, Duration::ZERO);
        assert_eq!(config.api_url, "http://localhost:5000/api");
        assert_eq!(config.resource_id, DEFAULT_RESOURCE_ID);
    }

    #[test]
    fn rejects_zero_page_size() {
        let err = ClientConfig::from_lookup(lookup(&[("REM20_PAGE_SIZE", "0")])).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_USAGE);
        assert!(err.to_string().contains("REM20_PAGE_SIZE"));
    }
}
