use std::time::Duration;

use sudoku_coop_core::{Identity, Session};

const DEFAULT_SERVER_URL: &str = "http://localhost:5000";
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_LOG_FILE: &str = "sudoku-coop.log";

/// Exponential backoff used by the channel reconnect loop and by retried GETs.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    pub initial: Duration,
    pub max: Duration,
    /// Fraction of the delay added as random jitter, 0.0..=1.0.
    pub jitter: f64,
    /// `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(250),
            max: Duration::from_secs(8),
            jitter: 0.25,
            max_attempts: None,
        }
    }
}

impl ReconnectPolicy {
    /// Policy for idempotent HTTP reads.
    pub fn for_requests() -> Self {
        Self {
            max_attempts: Some(3),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_url: String,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub log_file: String,
    pub reconnect: ReconnectPolicy,
    /// Credentials to prefill the login screen with.
    pub prefill: LoginPrefill,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginPrefill {
    pub access_token: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
}

impl LoginPrefill {
    /// A complete session when all three values were provided.
    pub fn session(&self) -> Option<Session> {
        let token = self.access_token.as_deref()?;
        let name = self.name.as_deref()?;
        let email = self.email.as_deref()?;
        Some(Session::new(token, Identity::new(name, email)))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            log_file: DEFAULT_LOG_FILE.to_string(),
            reconnect: ReconnectPolicy::default(),
            prefill: LoginPrefill::default(),
        }
    }
}

impl ClientConfig {
    /// Read configuration from `SUDOKU_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let millis = |key: &str, default: Duration| {
            lookup(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(default)
        };
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            server_url: non_empty("SUDOKU_SERVER_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.server_url),
            poll_interval: millis("SUDOKU_POLL_INTERVAL_MS", defaults.poll_interval),
            request_timeout: millis("SUDOKU_REQUEST_TIMEOUT_MS", defaults.request_timeout),
            log_file: non_empty("SUDOKU_LOG_FILE").unwrap_or(defaults.log_file),
            reconnect: defaults.reconnect,
            prefill: LoginPrefill {
                access_token: non_empty("SUDOKU_ACCESS_TOKEN"),
                name: non_empty("SUDOKU_USER_NAME"),
                email: non_empty("SUDOKU_USER_EMAIL"),
            },
        }
    }

    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Base for REST calls, always `http(s)://`.
    pub fn http_base_url(&self) -> String {
        self.server_url
            .replacen("wss://", "https://", 1)
            .replacen("ws://", "http://", 1)
    }

    /// Channel endpoint for the given bearer token.
    pub fn ws_url(&self, token: &str) -> String {
        let base = self
            .server_url
            .replacen("https://", "wss://", 1)
            .replacen("http://", "ws://", 1);
        format!("{}/ws?auth={}", base, token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> ClientConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ClientConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = config_from(&[]);
        assert_eq!(config.server_url, "http://localhost:5000");
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.log_file, "sudoku-coop.log");
        assert!(config.prefill.session().is_none());
    }

    #[test]
    fn reads_overrides() {
        let config = config_from(&[
            ("SUDOKU_SERVER_URL", "https://sudoku.example.com/"),
            ("SUDOKU_POLL_INTERVAL_MS", "250"),
            ("SUDOKU_REQUEST_TIMEOUT_MS", "nope"),
        ]);
        assert_eq!(config.server_url, "https://sudoku.example.com");
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn derives_http_and_ws_urls() {
        let config = ClientConfig::default().with_server_url("https://sudoku.example.com");
        assert_eq!(config.http_base_url(), "https://sudoku.example.com");
        assert_eq!(
            config.ws_url("abc"),
            "wss://sudoku.example.com/ws?auth=abc"
        );

        let config = ClientConfig::default().with_server_url("ws://127.0.0.1:9000");
        assert_eq!(config.http_base_url(), "http://127.0.0.1:9000");
        assert_eq!(config.ws_url("t"), "ws://127.0.0.1:9000/ws?auth=t");
    }

    #[test]
    fn prefill_needs_all_three_values() {
        let config = config_from(&[
            ("SUDOKU_ACCESS_TOKEN", "tok"),
            ("SUDOKU_USER_NAME", "Ada"),
        ]);
        assert!(config.prefill.session().is_none());

        let config = config_from(&[
            ("SUDOKU_ACCESS_TOKEN", "tok"),
            ("SUDOKU_USER_NAME", "Ada"),
            ("SUDOKU_USER_EMAIL", "ada@example.com"),
        ]);
        let session = config.prefill.session().unwrap();
        assert_eq!(session.access_token(), "tok");
        assert_eq!(session.user_email(), "ada@example.com");
    }
}
