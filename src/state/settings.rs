use fixtures_api::client::{DEFAULT_ORACLE_URL, OracleClient};
use log::LevelFilter;
use std::time::Duration;

const DEFAULT_MATCH_MINUTES: u32 = 60;
const DEFAULT_REST_MINUTES: u32 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerSettings {
    pub oracle_url: String,
    pub oracle_api_key: Option<String>,
    /// None leaves oracle calls unbounded; cancellation is the caller's call.
    pub oracle_timeout: Option<Duration>,
    /// Used when a sport has no configured duration.
    pub default_match_minutes: u32,
    pub rest_minutes: u32,
    /// Reject oracle results that overlap or leave operating hours instead of
    /// only logging them.
    pub strict_oracle_validation: bool,
    pub log_level: Option<LevelFilter>,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            oracle_url: DEFAULT_ORACLE_URL.to_string(),
            oracle_api_key: None,
            oracle_timeout: None,
            default_match_minutes: DEFAULT_MATCH_MINUTES,
            rest_minutes: DEFAULT_REST_MINUTES,
            strict_oracle_validation: false,
            log_level: None,
        }
    }
}

impl SchedulerSettings {
    /// Defaults overridden by `FIXTURES_*` environment variables.
    pub fn load() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        Self {
            oracle_url: get("FIXTURES_ORACLE_URL").unwrap_or(defaults.oracle_url),
            oracle_api_key: get("FIXTURES_ORACLE_API_KEY"),
            oracle_timeout: get("FIXTURES_ORACLE_TIMEOUT_SECS")
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            default_match_minutes: get("FIXTURES_DEFAULT_MATCH_MINUTES")
                .and_then(|v| v.parse().ok())
                .filter(|m| *m > 0)
                .unwrap_or(defaults.default_match_minutes),
            rest_minutes: get("FIXTURES_REST_MINUTES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.rest_minutes),
            strict_oracle_validation: get("FIXTURES_STRICT_ORACLE")
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
                .unwrap_or(defaults.strict_oracle_validation),
            log_level: get("FIXTURES_LOG").and_then(|v| v.parse().ok()),
        }
    }

    pub fn oracle_client(&self) -> OracleClient {
        let client = OracleClient::new(&self.oracle_url).with_timeout(self.oracle_timeout);
        match &self.oracle_api_key {
            Some(key) => client.with_api_key(key),
            None => client,
        }
    }
}
