use std::fmt;

use serde::{Deserialize, Serialize};

pub const TURBO_UPLOAD_URL: &str = "https://upload.ardrive.io";
pub const DEFAULT_UPLOAD_TIMEOUT_MS: u64 = 60_000;

fn default_upload_url() -> String {
    TURBO_UPLOAD_URL.to_owned()
}

fn default_upload_timeout_ms() -> u64 {
    DEFAULT_UPLOAD_TIMEOUT_MS
}

fn default_enabled() -> bool {
    true
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArweaveConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Inline ed25519 secret key, hex or base64url.
    #[serde(default)]
    pub secret_key: Option<String>,
    /// Path to a file holding the key, used when `secret_key` is unset.
    /// Relative paths resolve against the config file's directory.
    #[serde(default)]
    pub secret_key_file: Option<String>,
    /// Turbo-compatible bundler accepting signed data items.
    #[serde(default = "default_upload_url")]
    pub upload_url: String,
    #[serde(default)]
    pub gateways: Vec<String>,
    #[serde(default = "default_upload_timeout_ms")]
    pub upload_timeout_ms: u64,
    #[serde(default)]
    pub gateway_timeout_ms: Option<u64>,
}

impl Default for ArweaveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            secret_key: None,
            secret_key_file: None,
            upload_url: default_upload_url(),
            gateways: Vec::new(),
            upload_timeout_ms: DEFAULT_UPLOAD_TIMEOUT_MS,
            gateway_timeout_ms: None,
        }
    }
}

impl ArweaveConfig {
    pub fn with_secret_key(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: Some(secret_key.into()),
            ..Self::default()
        }
    }
}

impl fmt::Debug for ArweaveConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArweaveConfig")
            .field("enabled", &self.enabled)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .field("secret_key_file", &self.secret_key_file)
            .field("upload_url", &self.upload_url)
            .field("gateways", &self.gateways)
            .field("upload_timeout_ms", &self.upload_timeout_ms)
            .field("gateway_timeout_ms", &self.gateway_timeout_ms)
            .finish()
    }
}
