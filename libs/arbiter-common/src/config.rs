use std::env;
use std::fmt;
use std::time::Duration;

/// One judge API credential
///
/// Credentials in a set are equivalent; list order is priority order.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub key: String,
    pub host: Option<String>,
}

impl Credential {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            host: None,
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }
}

// Keys never reach logs
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("key", &"<redacted>")
            .field("host", &self.host)
            .finish()
    }
}

/// Remote judge settings
#[derive(Debug, Clone)]
pub struct JudgeConfig {
    pub base_url: String,
    pub credentials: Vec<Credential>,
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
    pub request_timeout: Duration,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            base_url: "https://judge0-ce.p.rapidapi.com".to_string(),
            credentials: Vec::new(),
            poll_interval: Duration::from_millis(1000),
            max_poll_attempts: 30,
            request_timeout: Duration::from_millis(15000),
        }
    }
}

/// Optional text-generation collaborator used for argument mapping
#[derive(Debug, Clone)]
pub struct OracleConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub sample_size: usize,
}

/// Application configuration
/// Provides defaults with environment variable overrides
#[derive(Debug, Clone)]
pub struct Config {
    pub redis_url: String,
    pub port: u16,
    pub judge: JudgeConfig,
    pub oracle: Option<OracleConfig>,
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = JudgeConfig::default();
        let host = env::var("JUDGE_API_HOST").ok().filter(|h| !h.trim().is_empty());

        let judge = JudgeConfig {
            base_url: env::var("JUDGE_BASE_URL").unwrap_or(defaults.base_url),
            credentials: parse_credentials(
                &env::var("JUDGE_API_KEYS").unwrap_or_default(),
                host.as_deref(),
            ),
            poll_interval: env_millis("JUDGE_POLL_INTERVAL_MS").unwrap_or(defaults.poll_interval),
            max_poll_attempts: env_parse("JUDGE_MAX_POLL_ATTEMPTS")
                .unwrap_or(defaults.max_poll_attempts),
            request_timeout: env_millis("JUDGE_REQUEST_TIMEOUT_MS")
                .unwrap_or(defaults.request_timeout),
        };

        let oracle = env::var("ORACLE_URL")
            .ok()
            .filter(|u| !u.trim().is_empty())
            .map(|url| OracleConfig {
                url,
                api_key: env::var("ORACLE_API_KEY").ok(),
                model: env::var("ORACLE_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
                sample_size: env_parse("ORACLE_SAMPLE_SIZE").unwrap_or(3),
            });

        Self {
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            port: env_parse("PORT").unwrap_or(3000),
            judge,
            oracle,
        }
    }

    pub fn new() -> Self {
        Self::from_env()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// Split a comma-separated key list into credentials, keeping order
pub fn parse_credentials(keys: &str, host: Option<&str>) -> Vec<Credential> {
    keys.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(|k| {
            let credential = Credential::new(k);
            match host {
                Some(h) => credential.with_host(h),
                None => credential,
            }
        })
        .collect()
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn env_millis(name: &str) -> Option<Duration> {
    env_parse::<u64>(name).map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_judge_defaults() {
        let judge = JudgeConfig::default();
        assert_eq!(judge.poll_interval, Duration::from_secs(1));
        assert_eq!(judge.max_poll_attempts, 30);
        assert!(judge.credentials.is_empty());
    }

    #[test]
    fn test_parse_credentials_keeps_order() {
        let creds = parse_credentials(" a , b,,c ", Some("judge.example"));
        assert_eq!(creds.len(), 3);
        assert_eq!(creds[0].key, "a");
        assert_eq!(creds[1].key, "b");
        assert_eq!(creds[2].key, "c");
        assert_eq!(creds[2].host.as_deref(), Some("judge.example"));
    }

    #[test]
    fn test_parse_credentials_empty() {
        assert!(parse_credentials("", None).is_empty());
    }

    #[test]
    fn test_credential_debug_redacts_key() {
        let debug = format!("{:?}", Credential::new("secret-key"));
        assert!(!debug.contains("secret-key"));
        assert!(debug.contains("redacted"));
    }
}
