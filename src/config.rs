//! Gate configuration parsed from environment variables.
//!
//! SYSTEM CONTEXT
//! ==============
//! Startup builds one `GateConfig` and shares it through `AppState`. Parsing
//! goes through a key lookup so tests can feed values without mutating the
//! process environment.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_RESOLVE_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_STATIC_DIR: &str = "static";
pub const DEFAULT_PROFILE_TABLE: &str = "profiles";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required env var {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Connection settings for the hosted auth provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Base URL without a trailing slash, e.g. `https://abc.example.co`.
    pub base_url: String,
    /// Public (anon) API key sent as the `apikey` header.
    pub anon_key: String,
    pub profile_table: String,
    pub connect_timeout: Duration,
    /// Upper bound for a single provider HTTP request.
    pub request_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateConfig {
    pub port: u16,
    pub public_url: String,
    pub cookie_secure: bool,
    pub static_dir: PathBuf,
    /// Bound on every session, user, and profile resolution.
    pub resolve_timeout: Duration,
    pub provider: ProviderConfig,
}

impl GateConfig {
    /// Build typed config from the process environment.
    ///
    /// Required:
    /// - `AUTH_PROVIDER_URL`
    /// - `AUTH_PROVIDER_ANON_KEY`
    ///
    /// Optional:
    /// - `PORT`: default 3000
    /// - `PUBLIC_URL`: default `http://localhost:{PORT}`
    /// - `COOKIE_SECURE`: inferred from `PUBLIC_URL` when absent
    /// - `STATIC_DIR`: default `static`
    /// - `PROFILE_TABLE`: default `profiles`
    /// - `AUTH_RESOLVE_TIMEOUT_MS`: default 5000
    /// - `AUTH_CONNECT_TIMEOUT_SECS`: default 5
    ///
    /// # Errors
    ///
    /// Returns an error if a required key is missing or a number is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build typed config from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`GateConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = parse_or("PORT", lookup("PORT"), DEFAULT_PORT)?;
        let base_url = required("AUTH_PROVIDER_URL", lookup("AUTH_PROVIDER_URL"))?
            .trim_end_matches('/')
            .to_owned();
        let anon_key = required("AUTH_PROVIDER_ANON_KEY", lookup("AUTH_PROVIDER_ANON_KEY"))?;

        let public_url = lookup("PUBLIC_URL")
            .map(|url| url.trim().trim_end_matches('/').to_owned())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| format!("http://localhost:{port}"));

        let cookie_secure = match lookup("COOKIE_SECURE") {
            Some(raw) => parse_bool(&raw).ok_or(ConfigError::Invalid { key: "COOKIE_SECURE", value: raw })?,
            None => public_url.starts_with("https://"),
        };

        let static_dir = lookup("STATIC_DIR").map_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR), PathBuf::from);
        let profile_table = lookup("PROFILE_TABLE").unwrap_or_else(|| DEFAULT_PROFILE_TABLE.to_owned());

        let resolve_ms = parse_or("AUTH_RESOLVE_TIMEOUT_MS", lookup("AUTH_RESOLVE_TIMEOUT_MS"), DEFAULT_RESOLVE_TIMEOUT_MS)?;
        let connect_secs =
            parse_or("AUTH_CONNECT_TIMEOUT_SECS", lookup("AUTH_CONNECT_TIMEOUT_SECS"), DEFAULT_CONNECT_TIMEOUT_SECS)?;
        if resolve_ms == 0 {
            return Err(ConfigError::Invalid { key: "AUTH_RESOLVE_TIMEOUT_MS", value: "0".into() });
        }
        let resolve_timeout = Duration::from_millis(resolve_ms);

        Ok(Self {
            port,
            public_url,
            cookie_secure,
            static_dir,
            resolve_timeout,
            provider: ProviderConfig {
                base_url,
                anon_key,
                profile_table,
                connect_timeout: Duration::from_secs(connect_secs),
                request_timeout: resolve_timeout,
            },
        })
    }

    /// Where the password-reset email should send the user back to.
    #[must_use]
    pub fn password_reset_redirect(&self) -> String {
        format!("{}/reset-password", self.public_url)
    }
}

fn required(key: &'static str, raw: Option<String>) -> Result<String, ConfigError> {
    raw.map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(key))
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}

/// Parse the usual boolean words (`1/true/yes/on`, `0/false/no/off`).
pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
