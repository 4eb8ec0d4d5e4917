use std::time::Duration;

use agentdoc_core::{ContentResolver, GatewaySet, Scheme, StorageResult};
use agentdoc_resolve::GatewayRace;
use bytes::Bytes;

use crate::config::ArweaveConfig;

/// Reads Arweave transactions by racing the configured gateways.
#[derive(Debug, Clone)]
pub struct ArweaveResolver {
    race: GatewayRace,
}

impl Default for ArweaveResolver {
    fn default() -> Self {
        Self::new(&[])
    }
}

impl ArweaveResolver {
    /// Uses `gateways` in order, or the default set when empty.
    pub fn new(gateways: &[String]) -> Self {
        Self {
            race: GatewayRace::new(GatewaySet::or_defaults(Scheme::Arweave, gateways)),
        }
    }

    pub fn from_config(config: &ArweaveConfig) -> Self {
        let resolver = Self::new(&config.gateways);
        match config.gateway_timeout_ms {
            Some(ms) => resolver.with_timeout(Duration::from_millis(ms)),
            None => resolver,
        }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.race = self.race.with_client(client);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.race = self.race.with_timeout(timeout);
        self
    }

    pub fn gateways(&self) -> &GatewaySet {
        self.race.gateways()
    }
}

#[async_trait::async_trait]
impl ContentResolver for ArweaveResolver {
    fn scheme(&self) -> Scheme {
        Scheme::Arweave
    }

    async fn resolve(&self, identifier: &str) -> StorageResult<Bytes> {
        let bytes = self.race.fetch(identifier).await?;
        log::trace!("resolved {identifier} ({} bytes)", bytes.len());
        Ok(bytes)
    }
}
