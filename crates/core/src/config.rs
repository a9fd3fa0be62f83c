use std::time::Duration;
use url::Url;

pub const DEFAULT_SERVICE_URL: &str = "http://localhost:5000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const ENV_SERVICE_URL: &str = "EMOTION_SERVICE_URL";
pub const ENV_SERVICE_TIMEOUT_SECS: &str = "EMOTION_SERVICE_TIMEOUT_SECS";

pub const SENTENCE_ENDPOINT: &str = "analyze";
pub const CHARACTER_ENDPOINT: &str = "analyze_characters";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceUrl(Url);

impl ServiceUrl {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        let trimmed = value.trim();
        let mut url =
            Url::parse(trimmed).map_err(|_| ConfigError::InvalidServiceUrl(trimmed.to_owned()))?;
        if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
            return Err(ConfigError::InvalidServiceUrl(trimmed.to_owned()));
        }
        // Url::join replaces the last path segment unless the base ends with '/'.
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(Self(url))
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }

    pub fn endpoint(&self, name: &str) -> Result<Url, ConfigError> {
        self.0
            .join(name)
            .map_err(|_| ConfigError::InvalidServiceUrl(format!("{}{}", self.0, name)))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestTimeout {
    pub secs: u64,
}

impl RequestTimeout {
    pub fn new(secs: u64) -> Result<Self, ConfigError> {
        if secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(Self { secs })
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.secs)
    }
}

impl Default for RequestTimeout {
    fn default() -> Self {
        Self {
            secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceConfig {
    pub base_url: ServiceUrl,
    pub timeout: RequestTimeout,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid analysis service url: {0}")]
    InvalidServiceUrl(String),
    #[error("request timeout must be > 0 s")]
    ZeroTimeout,
    #[error("invalid value for {key}: {value}")]
    InvalidNumber { key: String, value: String },
}

pub trait Env {
    fn var(&self, key: &str) -> Option<String>;
}

#[derive(Clone, Debug, Default)]
pub struct StdEnv;

impl Env for StdEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Clone, Debug, Default)]
pub struct MapEnv {
    vars: std::collections::BTreeMap<String, String>,
}

impl MapEnv {
    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_owned(), value.to_owned());
        self
    }
}

impl Env for MapEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

pub fn resolve_string_with_default(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
    default: &str,
) -> String {
    match cli_value {
        Some(v) => v,
        None => env.var(env_key).unwrap_or_else(|| default.to_owned()),
    }
}

pub fn resolve_u64_with_default(
    cli_value: Option<u64>,
    env_key: &str,
    env: &impl Env,
    default: u64,
) -> Result<u64, ConfigError> {
    match cli_value {
        Some(v) => Ok(v),
        None => match env.var(env_key) {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
                key: env_key.to_owned(),
                value: raw,
            }),
            None => Ok(default),
        },
    }
}

pub fn resolve_service_config(
    cli_url: Option<String>,
    cli_timeout_secs: Option<u64>,
    env: &impl Env,
) -> Result<ServiceConfig, ConfigError> {
    let url = resolve_string_with_default(cli_url, ENV_SERVICE_URL, env, DEFAULT_SERVICE_URL);
    let secs = resolve_u64_with_default(
        cli_timeout_secs,
        ENV_SERVICE_TIMEOUT_SECS,
        env,
        DEFAULT_TIMEOUT_SECS,
    )?;

    Ok(ServiceConfig {
        base_url: ServiceUrl::parse(&url)?,
        timeout: RequestTimeout::new(secs)?,
    })
}
