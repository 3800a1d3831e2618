//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required in production
//! - `PARISH_API_URL` - Backend API root. Absolute URL, or a path such as
//!   `/api` that is joined onto `PARISH_SITE_URL`
//!
//! ## Optional
//! - `PARISH_ENV` - `development` (default) or `production`
//! - `PARISH_SITE_URL` - Origin that relative API paths resolve against
//!   (default: `http://localhost:3000`)
//! - `PARISH_STATE_FILE` - Local storage file (default: `.parish-state.json`)
//! - `PARISH_THEME_CSS` - File the theme stylesheet is written to
//! - `PARISH_HTTP_TIMEOUT_SECS` - Request timeout (default: 30)
//! - `PARISH_MTN_POLL_SECS` - MTN status poll cadence (default: 5)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_SITE_URL: &str = "http://localhost:3000";
const DEFAULT_API_PATH: &str = "/api";
const DEFAULT_STATE_FILE: &str = ".parish-state.json";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MTN_POLL_SECS: u64 = 5;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" | "local" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            _ => Err(format!("expected development or production, got {s}")),
        }
    }
}

/// Parish client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root every endpoint path is joined onto (always ends in `/`)
    pub api_url: Url,
    /// Whether `api_url` came from `PARISH_API_URL` rather than the default
    pub api_url_configured: bool,
    /// Deployment environment
    pub environment: Environment,
    /// File backing the persistent key/value store
    pub state_file: PathBuf,
    /// Optional stylesheet output for the liturgical theme
    pub theme_css_path: Option<PathBuf>,
    /// Per-request timeout
    pub http_timeout: Duration,
    /// Interval between MTN status checks
    pub mtn_poll_interval: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is malformed, or if `PARISH_API_URL`
    /// is missing in production.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let environment = get_env_or_default("PARISH_ENV", "development")
            .parse::<Environment>()
            .map_err(|e| ConfigError::InvalidEnvVar("PARISH_ENV".to_string(), e))?;

        let site_url = get_env_or_default("PARISH_SITE_URL", DEFAULT_SITE_URL);
        let configured = get_optional_env("PARISH_API_URL");
        if configured.is_none() && environment == Environment::Production {
            return Err(ConfigError::MissingEnvVar("PARISH_API_URL".to_string()));
        }
        let api_url_configured = configured.is_some();
        let api_url = resolve_api_url(
            &site_url,
            configured.as_deref().unwrap_or(DEFAULT_API_PATH),
        )?;

        let state_file = PathBuf::from(get_env_or_default("PARISH_STATE_FILE", DEFAULT_STATE_FILE));
        let theme_css_path = get_optional_env("PARISH_THEME_CSS").map(PathBuf::from);
        let http_timeout = Duration::from_secs(get_secs(
            "PARISH_HTTP_TIMEOUT_SECS",
            DEFAULT_HTTP_TIMEOUT_SECS,
        )?);
        let mtn_poll_interval =
            Duration::from_secs(get_secs("PARISH_MTN_POLL_SECS", DEFAULT_MTN_POLL_SECS)?);
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            api_url,
            api_url_configured,
            environment,
            state_file,
            theme_css_path,
            http_timeout,
            mtn_poll_interval,
            sentry_dsn,
        })
    }

    /// Configuration pointing at an explicit API root, with defaults for
    /// everything else. Used by tests and embedders.
    #[must_use]
    pub fn for_api_url(api_url: Url) -> Self {
        Self {
            api_url: with_trailing_slash(api_url),
            api_url_configured: true,
            environment: Environment::Development,
            state_file: PathBuf::from(DEFAULT_STATE_FILE),
            theme_css_path: None,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            mtn_poll_interval: Duration::from_secs(DEFAULT_MTN_POLL_SECS),
            sentry_dsn: None,
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Resolve the API root: absolute URLs are used as-is, paths are joined onto
/// the site origin.
fn resolve_api_url(site_url: &str, api_url: &str) -> Result<Url, ConfigError> {
    let url = if api_url.starts_with('/') {
        let site = Url::parse(site_url).map_err(|e| {
            ConfigError::InvalidEnvVar("PARISH_SITE_URL".to_string(), e.to_string())
        })?;
        site.join(api_url)
    } else {
        Url::parse(api_url)
    }
    .map_err(|e| ConfigError::InvalidEnvVar("PARISH_API_URL".to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            "PARISH_API_URL".to_string(),
            format!("unsupported scheme {}", url.scheme()),
        ));
    }

    Ok(with_trailing_slash(url))
}

/// Endpoint paths are joined relative to the API root, which only keeps the
/// last path segment if the root ends in `/`.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse a whole number of seconds.
fn get_secs(key: &str, default: u64) -> Result<u64, ConfigError> {
    get_optional_env(key).map_or(Ok(default), |value| {
        value
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_api_path_joins_site_origin() {
        let url = resolve_api_url("http://localhost:3000", "/api").unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/api/");
    }

    #[test]
    fn test_absolute_api_url_is_kept() {
        let url = resolve_api_url(DEFAULT_SITE_URL, "https://backend.parish.org/v1").unwrap();
        assert_eq!(url.as_str(), "https://backend.parish.org/v1/");
        assert_eq!(
            url.join("liturgical-color").unwrap().as_str(),
            "https://backend.parish.org/v1/liturgical-color"
        );
    }

    #[test]
    fn test_invalid_api_url() {
        let err = resolve_api_url(DEFAULT_SITE_URL, "not a url").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "PARISH_API_URL"));

        let err = resolve_api_url(DEFAULT_SITE_URL, "ftp://parish.org/api").unwrap_err();
        assert!(err.to_string().contains("unsupported scheme"));
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!("PROD".parse::<Environment>().unwrap(), Environment::Production);
        assert_eq!("dev".parse::<Environment>().unwrap(), Environment::Development);
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn test_for_api_url_adds_trailing_slash() {
        let config = ClientConfig::for_api_url(Url::parse("http://127.0.0.1:8080/api").unwrap());
        assert_eq!(config.api_url.as_str(), "http://127.0.0.1:8080/api/");
        assert!(config.api_url_configured);
        assert_eq!(config.mtn_poll_interval, Duration::from_secs(5));
    }
}
