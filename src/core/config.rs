//! Runner configuration from YAML and environment variables

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

const DEFAULT_CAPACITY: usize = 10;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3600);
const DEFAULT_EXECUTOR: &str = "local";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_LOG_FORMAT: &str = "text";

/// Errors raised while loading or validating the runner configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("runner capacity must be greater than 0")]
    InvalidCapacity,

    #[error("runner timeout must be greater than 0")]
    InvalidTimeout,

    #[error("executor type must be 'local' or 'mock', got '{0}'")]
    InvalidExecutorType(String),
}

/// Top-level runner configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub runner: RunnerConfig,
    pub executor: ExecutorConfig,
    pub log: LogConfig,
}

/// Scheduling limits and workspace location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Upper bound on concurrently running steps
    pub capacity: usize,

    /// Whole-run timeout
    #[serde(with = "duration_format")]
    pub timeout: Duration,

    /// Default workspace directory
    pub workspace: PathBuf,
}

/// Executor selection and base environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Executor type: "local" or "mock"
    #[serde(rename = "type")]
    pub kind: String,

    /// Environment variables passed to every step
    pub env: HashMap<String, String>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Level filter: debug, info, warn, error
    pub level: String,

    /// Output format: text or json
    pub format: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            timeout: DEFAULT_TIMEOUT,
            workspace: default_workspace(),
        }
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            kind: DEFAULT_EXECUTOR.to_string(),
            env: HashMap::new(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            format: DEFAULT_LOG_FORMAT.to_string(),
        }
    }
}

fn default_workspace() -> PathBuf {
    std::env::temp_dir().join("cicd-workspace")
}

impl Config {
    /// Load configuration from a YAML file, filling defaults and validating
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string, filling defaults and validating
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Config = serde_yaml::from_str(yaml)?;
        config.apply_defaults();
        config.validate()?;
        Ok(config)
    }

    /// Build a configuration from defaults overridden by `CICD_*` variables
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`] with an explicit variable lookup
    pub fn from_env_with<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        let lookup = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(val) = lookup("CICD_RUNNER_CAPACITY") {
            match val.trim().parse() {
                Ok(capacity) => config.runner.capacity = capacity,
                Err(_) => warn!("Ignoring invalid CICD_RUNNER_CAPACITY: {}", val),
            }
        }
        if let Some(val) = lookup("CICD_RUNNER_TIMEOUT") {
            match parse_duration(&val) {
                Some(timeout) => config.runner.timeout = timeout,
                None => warn!("Ignoring invalid CICD_RUNNER_TIMEOUT: {}", val),
            }
        }
        if let Some(val) = lookup("CICD_RUNNER_WORKSPACE") {
            config.runner.workspace = PathBuf::from(val);
        }
        if let Some(val) = lookup("CICD_EXECUTOR_TYPE") {
            config.executor.kind = val;
        }
        if let Some(val) = lookup("CICD_LOG_LEVEL") {
            config.log.level = val;
        }

        config
    }

    /// Replace zero or empty values with defaults
    fn apply_defaults(&mut self) {
        if self.runner.capacity == 0 {
            self.runner.capacity = DEFAULT_CAPACITY;
        }
        if self.runner.timeout.is_zero() {
            self.runner.timeout = DEFAULT_TIMEOUT;
        }
        if self.runner.workspace.as_os_str().is_empty() {
            self.runner.workspace = default_workspace();
        }
        if self.executor.kind.is_empty() {
            self.executor.kind = DEFAULT_EXECUTOR.to_string();
        }
        if self.log.level.is_empty() {
            self.log.level = DEFAULT_LOG_LEVEL.to_string();
        }
        if self.log.format.is_empty() {
            self.log.format = DEFAULT_LOG_FORMAT.to_string();
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.runner.capacity == 0 {
            return Err(ConfigError::InvalidCapacity);
        }
        if self.runner.timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout);
        }
        if self.executor.kind != "local" && self.executor.kind != "mock" {
            return Err(ConfigError::InvalidExecutorType(self.executor.kind.clone()));
        }
        Ok(())
    }

    /// Resolve a variable, preferring the process environment
    pub fn env_value(&self, key: &str) -> Option<String> {
        std::env::var(key)
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| self.executor.env.get(key).cloned())
    }

    /// Set a variable in the executor environment
    pub fn set_env(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.executor.env.insert(key.into(), value.into());
    }
}

/// Parse a duration given as plain seconds (`"90"`) or with unit
/// suffixes (`"1h30m"`, `"500ms"`, `"2.5s"`)
pub fn parse_duration(input: &str) -> Option<Duration> {
    static UNIT: OnceLock<Regex> = OnceLock::new();
    let re = UNIT.get_or_init(|| {
        Regex::new(r"(\d+(?:\.\d+)?)(ns|us|µs|ms|s|m|h)").expect("duration regex is valid")
    });

    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if let Ok(secs) = input.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    let mut total_nanos = 0f64;
    let mut consumed = 0;
    for caps in re.captures_iter(input) {
        let whole = caps.get(0)?;
        if whole.start() != consumed {
            return None;
        }
        consumed = whole.end();

        let value: f64 = caps[1].parse().ok()?;
        let nanos_per_unit = match &caps[2] {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            _ => return None,
        };
        total_nanos += value * nanos_per_unit;
    }

    if consumed != input.len() {
        return None;
    }
    Some(Duration::from_nanos(total_nanos.round() as u64))
}

/// Serde adapter: integers are seconds, strings go through [`parse_duration`]
mod duration_format {
    use super::parse_duration;
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Secs(u64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{}s", value.as_secs_f64()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Secs(secs) => Ok(Duration::from_secs(secs)),
            Raw::Text(text) => parse_duration(&text)
                .ok_or_else(|| de::Error::custom(format!("invalid duration: {}", text))),
        }
    }
}
