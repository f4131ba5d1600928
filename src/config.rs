//! Client configuration from environment variables, overridable by CLI flags.

use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5000/api";
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// When a role change made server-side is noticed by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoleRevalidation {
    /// Only discovered through the next 401/403 from the backend.
    #[default]
    Never,
    /// Re-fetch the profile before every user-initiated navigation.
    OnNavigation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_url: String,
    pub timeout: Duration,
    pub demo_mode: bool,
    pub role_revalidation: RoleRevalidation,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {name}: '{value}' ({reason})")]
    Invalid { name: &'static str, value: String, reason: &'static str },
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            demo_mode: false,
            role_revalidation: RoleRevalidation::Never,
        }
    }
}

pub fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = ClientConfig::default();
        if let Some(url) = lookup("WARDGATE_API_URL").filter(|s| !s.trim().is_empty()) {
            cfg.api_url = url.trim().to_string();
        }
        if let Some(v) = lookup("WARDGATE_HTTP_TIMEOUT_MS") {
            let ms = v.trim().parse::<u64>().ok().filter(|ms| *ms > 0).ok_or(ConfigError::Invalid {
                name: "WARDGATE_HTTP_TIMEOUT_MS",
                value: v.clone(),
                reason: "expected a positive number of milliseconds",
            })?;
            cfg.timeout = Duration::from_millis(ms);
        }
        if let Some(v) = lookup("WARDGATE_DEMO_MODE") {
            cfg.demo_mode = parse_bool(&v).ok_or(ConfigError::Invalid {
                name: "WARDGATE_DEMO_MODE",
                value: v.clone(),
                reason: "expected a boolean",
            })?;
        }
        if let Some(v) = lookup("WARDGATE_ROLE_REVALIDATE") {
            cfg.role_revalidation = match v.trim().to_lowercase().as_str() {
                "never" | "off" => RoleRevalidation::Never,
                "navigation" | "on_navigation" => RoleRevalidation::OnNavigation,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "WARDGATE_ROLE_REVALIDATE",
                        value: v.clone(),
                        reason: "expected 'never' or 'navigation'",
                    })
                }
            };
        }
        Ok(cfg)
    }
}
