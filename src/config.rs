//! Runtime configuration.
//!
//! Resolved once at startup from environment variables (a `.env` file is
//! honored), falling back to [`Settings`], falling back to defaults.
//! Malformed values are errors rather than silently defaulted.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::did::{ChainId, IdentifierParser};
use crate::settings::Settings;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

impl ConfigError {
    fn invalid(key: &str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

/// Fully resolved gateway configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub http: HttpConfig,
    pub upstream: UpstreamConfig,
    pub identifiers: IdentifierConfig,
    pub session_package_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

impl HttpConfig {
    /// Listener address. The host may be a name; it is resolved at bind time.
    pub fn bind_target(&self) -> (&str, u16) {
        (self.host.as_str(), self.port)
    }
}

/// Registry indexer API connection.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub base_url: Url,
    pub timeout: Duration,
    pub api_key: Option<SecretString>,
}

#[derive(Debug, Clone, Copy)]
pub struct IdentifierConfig {
    pub default_chain_id: ChainId,
    pub lenient_agent_id: bool,
}

impl IdentifierConfig {
    pub fn parser(&self) -> IdentifierParser {
        IdentifierParser::new(self.default_chain_id, self.lenient_agent_id)
    }
}

impl Config {
    /// Resolve from the process environment over `settings`.
    pub fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        Self::resolve_with(settings, |key| std::env::var(key).ok())
    }

    /// Resolve using `lookup` in place of the process environment.
    pub fn resolve_with<F>(settings: &Settings, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let default_chain_id = match env("ARN_DEFAULT_CHAIN_ID") {
            Some(v) => parse_number::<u64>("ARN_DEFAULT_CHAIN_ID", &v)?,
            None => settings.default_chain_id,
        };
        if default_chain_id == 0 {
            return Err(ConfigError::invalid(
                "ARN_DEFAULT_CHAIN_ID",
                "chain id must be positive",
            ));
        }

        let lenient_agent_id = match env("ARN_LENIENT_AGENT_ID") {
            Some(v) => parse_bool("ARN_LENIENT_AGENT_ID", &v)?,
            None => settings.identifiers.lenient_agent_id,
        };

        let host = env("ARN_HTTP_HOST").unwrap_or_else(|| settings.server.host.clone());
        let port = match env("ARN_HTTP_PORT") {
            Some(v) => parse_number::<u16>("ARN_HTTP_PORT", &v)?,
            None => settings.server.port,
        };

        let raw_url = env("ARN_UPSTREAM_URL").unwrap_or_else(|| settings.upstream.base_url.clone());
        let base_url = Url::parse(raw_url.trim())
            .map_err(|e| ConfigError::invalid("ARN_UPSTREAM_URL", format!("{raw_url}: {e}")))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ConfigError::invalid(
                "ARN_UPSTREAM_URL",
                format!("unsupported scheme '{}'", base_url.scheme()),
            ));
        }

        let timeout_secs = match env("ARN_UPSTREAM_TIMEOUT_SECS") {
            Some(v) => parse_number::<u64>("ARN_UPSTREAM_TIMEOUT_SECS", &v)?,
            None => settings.upstream.timeout_secs,
        };

        let api_key = env("ARN_UPSTREAM_API_KEY").map(SecretString::from);

        let session_package_path = env("ARN_SESSION_PACKAGE_PATH")
            .or_else(|| settings.session_package_path.clone())
            .map(PathBuf::from);

        Ok(Self {
            http: HttpConfig { host, port },
            upstream: UpstreamConfig {
                base_url,
                timeout: Duration::from_secs(timeout_secs),
                api_key,
            },
            identifiers: IdentifierConfig {
                default_chain_id: ChainId::new(default_chain_id),
                lenient_agent_id,
            },
            session_package_path,
        })
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| ConfigError::invalid(key, format!("'{raw}': {e}")))
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(key, format!("'{raw}' is not a boolean"))),
    }
}
