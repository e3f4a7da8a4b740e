/// Backend location
///
/// The base URL is an explicit value handed to the client at construction
/// time. `from_env` resolves it the way the server binaries resolve their
/// bind address: environment variables with defaults.

use crate::error::ConfigError;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 8080;

pub const ENV_API_URL: &str = "OPSGRID_API_URL";
pub const ENV_API_HOST: &str = "OPSGRID_API_HOST";
pub const ENV_API_PORT: &str = "OPSGRID_API_PORT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    base_url: String,
}

impl ApiConfig {
    /// Use `base_url` as given (scheme required, trailing slash dropped)
    pub fn new(base_url: impl Into<String>) -> Result<Self, ConfigError> {
        let raw = base_url.into();
        let trimmed = raw.trim().trim_end_matches('/');
        let has_host = trimmed
            .split_once("://")
            .map(|(scheme, rest)| matches!(scheme, "http" | "https") && !rest.is_empty())
            .unwrap_or(false);
        if !has_host {
            return Err(ConfigError::InvalidUrl(raw));
        }
        Ok(ApiConfig {
            base_url: trimmed.to_string(),
        })
    }

    /// The dashboard convention: same host as the page, port 8080
    pub fn for_host(host: &str) -> Self {
        Self::for_host_port(host, DEFAULT_PORT)
    }

    pub fn for_host_port(host: &str, port: u16) -> Self {
        ApiConfig {
            base_url: format!("http://{}:{}", host, port),
        }
    }

    /// `OPSGRID_API_URL`, else `OPSGRID_API_HOST` / `OPSGRID_API_PORT`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL).filter(|u| !u.trim().is_empty()) {
            return Self::new(url);
        }

        let host = lookup(ENV_API_HOST).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match lookup(ENV_API_PORT) {
            Some(port) => port
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(port))?,
            None => DEFAULT_PORT,
        };
        Ok(Self::for_host_port(&host, port))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Join an endpoint path onto the base with exactly one `/`
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::for_host(DEFAULT_HOST)
    }
}
