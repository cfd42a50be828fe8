//! Configuration types for an onboarding run
//!
//! Everything a run needs is carried in [`OnboardConfig`], loaded from a
//! JSON file and then overridden by command line flags. Nothing is read from
//! the environment here.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::address::Address;
use crate::client::ConfirmationPolicy;
use crate::error::ConfigError;

/// Default number of simulated users
pub const DEFAULT_NUM_USERS: usize = 4;

/// Default upper bound for a funding request
pub const DEFAULT_MAX_FUNDING: u128 = 100;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OnboardConfig {
    /// Where the node runs
    pub deployment: Deployment,
    /// Node connection
    pub network: NetworkConfig,
    /// Credential file
    pub credentials: CredentialsConfig,
    /// User synthesis
    pub simulation: SimulationConfig,
    /// Funding driver
    pub funding: FundingConfig,
    /// Per-user profile files
    pub profiles: ProfileConfig,
    /// Logging
    pub logging: LoggingConfig,
}

impl OnboardConfig {
    /// Load configuration from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        let config: OnboardConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Default config file for a deployment under a project directory
    pub fn resolve_path(project_dir: impl AsRef<Path>, deployment: Deployment) -> PathBuf {
        project_dir.as_ref().join(deployment.config_file_name())
    }

    /// Check cross-field consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.network.validate()?;
        self.funding.validate()?;
        Ok(())
    }
}

/// Deployment type, which picks the default config file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Deployment {
    /// Local development chain
    #[default]
    Local,
    /// Cluster deployment
    Kubernetes,
}

impl Deployment {
    pub fn config_file_name(&self) -> &'static str {
        match self {
            Deployment::Local => "config_local.json",
            Deployment::Kubernetes => "config_k8s.json",
        }
    }
}

impl std::fmt::Display for Deployment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Deployment::Local => write!(f, "local"),
            Deployment::Kubernetes => write!(f, "kubernetes"),
        }
    }
}

impl std::str::FromStr for Deployment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(Deployment::Local),
            "kubernetes" | "k8s" => Ok(Deployment::Kubernetes),
            other => Err(ConfigError::Invalid(format!("unknown deployment: {}", other))),
        }
    }
}

/// Node connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// JSON-RPC endpoint
    pub rpc_url: String,
    /// Token contract queried for balances
    pub token_address: Option<Address>,
    /// Dispenser contract that hands out tokens
    pub dispenser_address: Option<Address>,
    /// How long an unlocked account stays unlocked
    #[serde(with = "humantime_serde")]
    pub unlock_duration: Duration,
    /// Per-request HTTP timeout
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:8545".to_string(),
            token_address: None,
            dispenser_address: None,
            unlock_duration: Duration::from_secs(300),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl NetworkConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.rpc_url.starts_with("http://") || self.rpc_url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "rpc_url must be an http(s) URL: {}",
                self.rpc_url
            )));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::Invalid("request_timeout must be non-zero".into()));
        }
        Ok(())
    }
}

/// Credential file location
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    pub path: PathBuf,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("passwords.csv"),
        }
    }
}

/// User synthesis settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// How many accounts become users
    pub num_users: usize,
    /// RNG seed for names and amounts (None = from entropy)
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_users: DEFAULT_NUM_USERS,
            seed: None,
        }
    }
}

/// Funding driver settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FundingConfig {
    /// Smallest amount requested (inclusive)
    pub min_amount: u128,
    /// Largest amount requested (inclusive)
    pub max_amount: u128,
    /// Delay between receipt polls
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Give up on a transaction after this long
    #[serde(with = "humantime_serde")]
    pub confirmation_timeout: Duration,
}

impl Default for FundingConfig {
    fn default() -> Self {
        Self {
            min_amount: 0,
            max_amount: DEFAULT_MAX_FUNDING,
            poll_interval: Duration::from_secs(1),
            confirmation_timeout: Duration::from_secs(120),
        }
    }
}

impl FundingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_amount > self.max_amount {
            return Err(ConfigError::Invalid(format!(
                "min_amount ({}) exceeds max_amount ({})",
                self.min_amount, self.max_amount
            )));
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::Invalid("poll_interval must be non-zero".into()));
        }
        Ok(())
    }

    pub fn amount_range(&self) -> std::ops::RangeInclusive<u128> {
        self.min_amount..=self.max_amount
    }

    pub fn confirmation_policy(&self) -> ConfirmationPolicy {
        ConfirmationPolicy {
            poll_interval: self.poll_interval,
            timeout: self.confirmation_timeout,
        }
    }
}

/// Per-user profile files
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    /// Directory for profile files (None = don't write any)
    pub dir: Option<PathBuf>,
    /// Remove existing profiles before writing new ones
    pub purge_on_start: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: LogLevel,
    /// Log format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Pretty,
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Log format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-field format
    Pretty,
    /// Compact single-line format
    Compact,
}

// Helper module for Duration serialization
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = humantime::format_duration(*duration).to_string();
        s.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
