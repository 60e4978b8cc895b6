use crate::error::ConfigurationError;
use serde::Deserialize;
use std::path::Path;

pub const API_KEY_VAR: &str = "API_KEY_1";
pub const API_ENDPOINT_VAR: &str = "API_ENDPOINT";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(deserialize_with = "deserialize_log_level")]
    pub log_level: LogLevel,
    pub backend: BackendConfig,
    pub payload: PayloadConfig,
    #[serde(default)]
    pub debug: DebugConfig,
    pub credentials: Credentials,
}

fn deserialize_log_level<'de, D>(deserializer: D) -> Result<LogLevel, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.try_into().map_err(serde::de::Error::custom)
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn get_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_version() -> String {
    "v3.2".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct PayloadConfig {
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,
}

fn default_max_image_bytes() -> usize {
    4 * 1024 * 1024
}

/// Debugging aids. Nothing in here may be enabled by default.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct DebugConfig {
    /// Answer every call with the first successful response. Results are wrong
    /// for every image after the first.
    #[serde(default)]
    pub cache_first_response: bool,
}

#[derive(Deserialize, Clone)]
pub struct Credentials {
    pub api_key: String,
    pub endpoint: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

pub trait Validatable {
    fn validate(&self) -> Result<(), String>;
}

impl Validatable for BackendConfig {
    fn validate(&self) -> Result<(), String> {
        if self.api_version.trim().is_empty() {
            return Err("backend.api_version must not be empty".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("backend.timeout_secs must be greater than zero".to_string());
        }
        Ok(())
    }
}

impl Validatable for PayloadConfig {
    fn validate(&self) -> Result<(), String> {
        if self.max_image_bytes == 0 {
            return Err("payload.max_image_bytes must be greater than zero".to_string());
        }
        Ok(())
    }
}

impl Validatable for Config {
    fn validate(&self) -> Result<(), String> {
        self.backend.validate()?;
        self.payload.validate()
    }
}

pub fn get_configuration() -> Result<Config, ConfigurationError> {
    dotenv::dotenv().ok();

    let base_path = std::env::current_dir()?;
    let configuration_directory = base_path.join("configuration");

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(ConfigurationError::Invalid)?;

    load_configuration(&configuration_directory, environment, |key| {
        std::env::var(key).ok()
    })
}

/// Layers `base.yaml`, `{environment}.yaml` and `APP_` variables, then adds the
/// backend credentials found through `lookup`. Credentials are checked first so
/// a missing variable is reported by name.
pub fn load_configuration<F>(
    configuration_directory: &Path,
    environment: Environment,
    lookup: F,
) -> Result<Config, ConfigurationError>
where
    F: Fn(&str) -> Option<String>,
{
    let api_key = lookup(API_KEY_VAR).ok_or(ConfigurationError::MissingVariable(API_KEY_VAR))?;
    let endpoint =
        lookup(API_ENDPOINT_VAR).ok_or(ConfigurationError::MissingVariable(API_ENDPOINT_VAR))?;

    let config = config::Config::builder()
        .add_source(config::File::from(
            configuration_directory.join("base.yaml"),
        ))
        .add_source(config::File::from(
            configuration_directory.join(format!("{}.yaml", environment.as_str())),
        ))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .set_override("credentials.api_key", api_key)?
        .set_override("credentials.endpoint", endpoint)?
        .build()?;

    let config = config.try_deserialize::<Config>()?;
    config.validate().map_err(ConfigurationError::Invalid)?;

    Ok(config)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" => Ok(Self::Warn),
            other => Err(format!(
                "{} is not a supported minimum log level. Use `debug`, `info` or `warn`.",
                other
            )),
        }
    }
}
