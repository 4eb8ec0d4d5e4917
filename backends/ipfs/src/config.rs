use std::fmt;

use serde::{Deserialize, Serialize};

pub const PINATA_UPLOAD_URL: &str = "https://uploads.pinata.cloud/v3/files";
pub const DEFAULT_UPLOAD_TIMEOUT_MS: u64 = 30_000;

fn default_pinata_upload_url() -> String {
    PINATA_UPLOAD_URL.to_owned()
}

fn default_upload_timeout_ms() -> u64 {
    DEFAULT_UPLOAD_TIMEOUT_MS
}

fn default_enabled() -> bool {
    true
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "provider")]
#[serde(rename_all = "snake_case")]
pub enum IpfsProvider {
    /// Pinata pinning service, authenticated with a JWT.
    Pinata {
        jwt: String,
        #[serde(default = "default_pinata_upload_url")]
        upload_url: String,
    },
    /// A Kubo node exposing its RPC API.
    Node { api_url: String },
}

impl IpfsProvider {
    pub fn pinata(jwt: impl Into<String>) -> Self {
        Self::Pinata {
            jwt: jwt.into(),
            upload_url: default_pinata_upload_url(),
        }
    }

    pub fn node(api_url: impl Into<String>) -> Self {
        Self::Node {
            api_url: api_url.into(),
        }
    }
}

// keeps the jwt out of logs
impl fmt::Debug for IpfsProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pinata { upload_url, .. } => f
                .debug_struct("Pinata")
                .field("jwt", &"<redacted>")
                .field("upload_url", upload_url)
                .finish(),
            Self::Node { api_url } => f.debug_struct("Node").field("api_url", api_url).finish(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IpfsConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(flatten)]
    pub provider: IpfsProvider,
    /// Read gateways, in preference order. Empty means the defaults.
    #[serde(default)]
    pub gateways: Vec<String>,
    #[serde(default = "default_upload_timeout_ms")]
    pub upload_timeout_ms: u64,
    #[serde(default)]
    pub gateway_timeout_ms: Option<u64>,
}

impl IpfsConfig {
    pub fn new(provider: IpfsProvider) -> Self {
        Self {
            enabled: true,
            provider,
            gateways: Vec::new(),
            upload_timeout_ms: DEFAULT_UPLOAD_TIMEOUT_MS,
            gateway_timeout_ms: None,
        }
    }
}
