use std::fmt;
use std::path::Path;
use std::time::Duration;

use agentdoc_backend_arweave::ArweaveConfig;
use agentdoc_backend_ipfs::IpfsConfig;
use agentdoc_core::{ChainContext, gateway::DEFAULT_GATEWAY_TIMEOUT};
use anyhow::Context;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIRMATION_TIMEOUT_MS: u64 = 30_000;

fn default_confirmation_timeout_ms() -> u64 {
    DEFAULT_CONFIRMATION_TIMEOUT_MS
}

fn default_gateway_timeout_ms() -> u64 {
    DEFAULT_GATEWAY_TIMEOUT.as_millis() as u64
}

/// Storage configuration, usually read from `config.toml`.
///
/// ```toml
/// signer_key_file = "config.secretkey"
///
/// [chain]
/// chain_id = 11155111
/// identity_registry = "0x..."
///
/// [arweave]
/// upload_url = "https://upload.ardrive.io"
///
/// [ipfs]
/// provider = "pinata"
/// jwt = "..."
///
/// [gateways]
/// timeout_ms = 10000
/// ipfs = ["https://ipfs.io/ipfs"]
/// ```
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageConfig {
    /// Credential shared by backends that sign uploads, unless they set
    /// their own.
    #[serde(default)]
    pub signer_key: Option<String>,
    #[serde(default)]
    pub signer_key_file: Option<String>,
    #[serde(default)]
    pub chain: Option<ChainConfig>,
    #[serde(default)]
    pub ipfs: Option<IpfsConfig>,
    #[serde(default)]
    pub arweave: Option<ArweaveConfig>,
    #[serde(default)]
    pub gateways: GatewayConfig,
    #[serde(default)]
    pub confirmation: ConfirmationConfig,
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("signer_key", &self.signer_key.as_ref().map(|_| "<redacted>"))
            .field("signer_key_file", &self.signer_key_file)
            .field("chain", &self.chain)
            .field("ipfs", &self.ipfs)
            .field("arweave", &self.arweave)
            .field("gateways", &self.gateways)
            .field("confirmation", &self.confirmation)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChainConfig {
    pub chain_id: u64,
    #[serde(default)]
    pub identity_registry: Option<String>,
    #[serde(default)]
    pub reputation_registry: Option<String>,
}

impl ChainConfig {
    /// Context for registration documents, naming the identity registry.
    pub fn identity_context(&self) -> ChainContext {
        let ctx = ChainContext::new(self.chain_id);
        match &self.identity_registry {
            Some(address) => ctx.with_registry(address),
            None => ctx,
        }
    }
}

/// Read gateways used when no backend of a scheme is configured.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub ipfs: Vec<String>,
    #[serde(default)]
    pub arweave: Vec<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_gateway_timeout_ms(),
            ipfs: Vec::new(),
            arweave: Vec::new(),
        }
    }
}

impl GatewayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfirmationConfig {
    #[serde(default = "default_confirmation_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_CONFIRMATION_TIMEOUT_MS,
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl ConfirmationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl StorageConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// The Arweave section with the shared signer credential filled in when
    /// it has none of its own. `None` when Arweave is absent or disabled.
    pub fn effective_arweave(&self) -> Option<ArweaveConfig> {
        let mut config = self.arweave.clone().filter(|c| c.enabled)?;
        if config.secret_key.is_none() && config.secret_key_file.is_none() {
            config.secret_key = self.signer_key.clone();
            config.secret_key_file = self.signer_key_file.clone();
        }
        Some(config)
    }

    /// The IPFS section, `None` when absent or disabled.
    pub fn effective_ipfs(&self) -> Option<&IpfsConfig> {
        self.ipfs.as_ref().filter(|c| c.enabled)
    }

    pub fn chain_context(&self) -> Option<ChainContext> {
        self.chain.as_ref().map(ChainConfig::identity_context)
    }
}
