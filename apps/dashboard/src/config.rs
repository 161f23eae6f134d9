use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::poller::PollConfig;
use crate::session::ProfileFailurePolicy;

/// Client configuration loaded from environment variables.
/// Fails at startup if `API_BASE_URL` is missing or a numeric value is malformed.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub token_path: PathBuf,
    pub request_timeout: Duration,
    pub poll_interval: Duration,
    pub poll_max_attempts: u32,
    pub profile_failure_policy: ProfileFailurePolicy,
    pub rust_log: String,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let api_base_url = require_env("API_BASE_URL")?
            .trim_end_matches('/')
            .to_string();

        let poll_interval_ms: u64 = parse_env("POLL_INTERVAL_MS", 2000)?;
        let poll_max_attempts: u32 = parse_env("POLL_MAX_ATTEMPTS", 60)?;
        check_poll_settings(poll_interval_ms, poll_max_attempts)?;

        Ok(ClientConfig {
            api_base_url,
            token_path: std::env::var("TOKEN_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".dashboard/session.json")),
            request_timeout: Duration::from_secs(parse_env("REQUEST_TIMEOUT_SECS", 30)?),
            poll_interval: Duration::from_millis(poll_interval_ms),
            poll_max_attempts,
            profile_failure_policy: parse_policy(
                &std::env::var("PROFILE_FAILURE_POLICY").unwrap_or_else(|_| "sign_out".into()),
            )?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            interval: self.poll_interval,
            max_attempts: self.poll_max_attempts,
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}

fn check_poll_settings(interval_ms: u64, max_attempts: u32) -> Result<()> {
    if interval_ms == 0 {
        bail!("POLL_INTERVAL_MS must be greater than zero");
    }
    if max_attempts == 0 {
        bail!("POLL_MAX_ATTEMPTS must be greater than zero");
    }
    Ok(())
}

fn parse_policy(raw: &str) -> Result<ProfileFailurePolicy> {
    match raw.trim() {
        "sign_out" => Ok(ProfileFailurePolicy::SignOut),
        "keep_on_transport_error" => Ok(ProfileFailurePolicy::KeepOnTransportError),
        other => bail!(
            "PROFILE_FAILURE_POLICY must be 'sign_out' or 'keep_on_transport_error', got '{other}'"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_policy_accepts_known_values() {
        assert_eq!(parse_policy("sign_out").unwrap(), ProfileFailurePolicy::SignOut);
        assert_eq!(
            parse_policy(" keep_on_transport_error ").unwrap(),
            ProfileFailurePolicy::KeepOnTransportError
        );
    }

    #[test]
    fn test_parse_policy_rejects_unknown() {
        assert!(parse_policy("retry").is_err());
    }

    #[test]
    fn test_zero_poll_settings_are_rejected() {
        let err = check_poll_settings(0, 60).unwrap_err();
        assert!(err.to_string().contains("POLL_INTERVAL_MS"));
        let err = check_poll_settings(2000, 0).unwrap_err();
        assert!(err.to_string().contains("POLL_MAX_ATTEMPTS"));
        assert!(check_poll_settings(1, 1).is_ok());
    }

    #[test]
    fn test_parse_env_falls_back_to_default() {
        let value: u32 = parse_env("DASHBOARD_TEST_UNSET_VARIABLE", 60).unwrap();
        assert_eq!(value, 60);
    }
}
