//! Ordered read gateways per storage protocol.
//!
//! Order matters: when several gateways answer, the earliest one in the
//! list wins, no matter which answered first.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::uri::{ContentId, Scheme};

pub const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(10);

pub const DEFAULT_IPFS_GATEWAYS: &[&str] = &[
    "https://gateway.pinata.cloud/ipfs",
    "https://ipfs.io/ipfs",
    "https://dweb.link/ipfs",
];

pub const DEFAULT_ARWEAVE_GATEWAYS: &[&str] = &[
    "https://arweave.net",
    "https://turbo-gateway.com",
    "https://ario-gateway.nethermind.dev",
    "https://ar-io-gateway.svc.blacksand.xyz",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewaySet {
    scheme: Scheme,
    gateways: Vec<String>,
}

impl GatewaySet {
    pub fn new<I, S>(scheme: Scheme, gateways: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            scheme,
            gateways: gateways
                .into_iter()
                .map(|g| g.into().trim().trim_end_matches('/').to_owned())
                .filter(|g| !g.is_empty())
                .collect(),
        }
    }

    pub fn defaults(scheme: Scheme) -> Self {
        match scheme {
            Scheme::Ipfs => Self::new(scheme, DEFAULT_IPFS_GATEWAYS.iter().copied()),
            Scheme::Arweave => Self::new(scheme, DEFAULT_ARWEAVE_GATEWAYS.iter().copied()),
        }
    }

    /// The user's list if non-empty, otherwise the defaults.
    pub fn or_defaults(scheme: Scheme, gateways: &[String]) -> Self {
        let set = Self::new(scheme, gateways.iter().cloned());
        if set.is_empty() { Self::defaults(scheme) } else { set }
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn gateways(&self) -> &[String] {
        &self.gateways
    }

    pub fn len(&self) -> usize {
        self.gateways.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gateways.is_empty()
    }

    /// Appends a gateway at the lowest precedence.
    pub fn with_gateway(mut self, gateway: impl Into<String>) -> Self {
        let gateway = gateway.into().trim().trim_end_matches('/').to_owned();
        if !gateway.is_empty() {
            self.gateways.push(gateway);
        }
        self
    }

    pub fn url_for(gateway: &str, id: &ContentId) -> String {
        format!("{gateway}/{id}")
    }

    /// One URL per gateway, in precedence order.
    pub fn urls_for(&self, id: &ContentId) -> Vec<String> {
        self.gateways.iter().map(|g| Self::url_for(g, id)).collect()
    }
}
