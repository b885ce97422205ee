use alloy::primitives::Address;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use crate::chain::address_of;
use crate::runtime::RestartPolicy;
use crate::secret::Secret;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Either owner_address or owner_private_key must be set")]
    MissingOwner,

    #[error("Invalid owner_address: {0}")]
    InvalidOwnerAddress(String),

    #[error("Invalid owner_private_key")]
    InvalidOwnerKey,

    #[error("Invalid config: {0}")]
    Invalid(String),
}

fn default_min_burner_balance() -> Decimal {
    Decimal::new(5, 1)
}

fn default_fund_burner_amount() -> Decimal {
    Decimal::ONE
}

/// Guardian node deployment (`config.yaml`)
#[derive(Debug, Deserialize, Clone)]
pub struct NodeConfig {
    #[serde(default)]
    pub owner_address: Option<String>,
    #[serde(default)]
    pub owner_private_key: Option<Secret>,
    pub docker_image: String,
    pub rpc_url: String,
    #[serde(default = "default_min_burner_balance")]
    pub min_burner_balance: Decimal,
    #[serde(default = "default_fund_burner_amount")]
    pub fund_burner_amount: Decimal,
    pub chain_id: u64,
    #[serde(default)]
    pub container: ContainerConfig,
    #[serde(default)]
    pub supervision: SupervisionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ContainerConfig {
    /// Where the worker cache directory is mounted inside the container
    pub cache_mount: String,
    /// Environment variable carrying the owner address
    pub owner_env_var: String,
    pub restart_policy: RestartPolicy,
    pub pull_always: bool,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            cache_mount: "/app/cache".to_string(),
            owner_env_var: "OWNERS_ALLOWLIST".to_string(),
            restart_policy: RestartPolicy::UnlessStopped,
            pull_always: true,
        }
    }
}

/// Timeouts and attempt budgets of one supervision run
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SupervisionConfig {
    pub identity_timeout_secs: u64,
    pub heartbeat_timeout_secs: u64,
    pub log_tail_lines: usize,
    pub evidence_lines: usize,
    pub poll_interval_ms: u64,
    pub initial_check_attempts: u32,
    pub recheck_attempts: u32,
    pub recheck_interval_secs: u64,
    pub gas_limit: u64,
    pub rpc_timeout_secs: u64,
}

impl Default for SupervisionConfig {
    fn default() -> Self {
        Self {
            identity_timeout_secs: 60,
            heartbeat_timeout_secs: 900,
            log_tail_lines: 200,
            evidence_lines: 12,
            poll_interval_ms: 100,
            initial_check_attempts: 1,
            recheck_attempts: 10,
            recheck_interval_secs: 6,
            gas_limit: 21_000,
            rpc_timeout_secs: 30,
        }
    }
}

impl SupervisionConfig {
    pub fn identity_timeout(&self) -> Duration {
        Duration::from_secs(self.identity_timeout_secs)
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn recheck_interval(&self) -> Duration {
        Duration::from_secs(self.recheck_interval_secs)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    /// hourly | daily | never
    pub rotation: String,
    /// Echo guardian node output under the `NODE` target
    pub echo_node_output: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: "./logs".to_string(),
            log_file: "guardian_keeper.log".to_string(),
            use_json: false,
            rotation: "daily".to_string(),
            echo_node_output: true,
        }
    }
}

impl NodeConfig {
    /// Load and validate node config from YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: NodeConfig =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.owner_address()?;

        if self.docker_image.trim().is_empty() {
            return Err(ConfigError::Invalid("docker_image is empty".to_string()));
        }
        if self.rpc_url.trim().is_empty() {
            return Err(ConfigError::Invalid("rpc_url is empty".to_string()));
        }
        if self.min_burner_balance.is_sign_negative() || self.fund_burner_amount.is_sign_negative()
        {
            return Err(ConfigError::Invalid(
                "balances and amounts must not be negative".to_string(),
            ));
        }
        if self.fund_burner_amount <= self.min_burner_balance {
            warn!(
                fund_burner_amount = %self.fund_burner_amount,
                min_burner_balance = %self.min_burner_balance,
                "Funding amount does not exceed the minimum balance; one transfer may not be enough"
            );
        }
        Ok(())
    }

    /// `owner_address` when set, else the address of `owner_private_key`
    pub fn owner_address(&self) -> Result<Address, ConfigError> {
        if let Some(raw) = self.owner_address.as_deref().map(str::trim)
            && !raw.is_empty()
        {
            return raw
                .parse()
                .map_err(|_| ConfigError::InvalidOwnerAddress(raw.to_string()));
        }
        match &self.owner_private_key {
            Some(key) => address_of(key).map_err(|_| ConfigError::InvalidOwnerKey),
            None => Err(ConfigError::MissingOwner),
        }
    }
}
