//! Parallel gateway race.
//!
//! `GatewayRace` asks every gateway of a [`GatewaySet`] for the same
//! identifier concurrently, waits until every request has settled, then
//! returns the payload of the first gateway *in list order* that succeeded.
//!
//! Waiting for all requests (rather than taking whichever answers first)
//! lets a slower but healthy gateway win over a faster one that failed,
//! and keeps the selected gateway reproducible. Latency is bounded by the
//! slowest request, which in turn is bounded by the per-gateway timeout.
//!
//! ## Example
//!
//! ```ignore
//! let race = GatewayRace::new(GatewaySet::defaults(Scheme::Ipfs))
//!     .with_timeout(Duration::from_secs(5));
//!
//! let bytes = race.fetch("ipfs://bafy...").await?;
//! ```

use std::time::Duration;

use agentdoc_core::{
    ContentId, GatewayFailure, GatewaySet, StorageError, StorageResult,
    gateway::DEFAULT_GATEWAY_TIMEOUT,
};
use bytes::Bytes;
use futures::future::join_all;

#[derive(Debug, Clone)]
pub struct GatewayRace {
    client: reqwest::Client,
    gateways: GatewaySet,
    timeout: Duration,
}

impl GatewayRace {
    pub fn new(gateways: GatewaySet) -> Self {
        Self {
            client: reqwest::Client::new(),
            gateways,
            timeout: DEFAULT_GATEWAY_TIMEOUT,
        }
    }

    /// Reuse an existing HTTP client (connection pool).
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Per-gateway timeout. There is no separate timeout for the race.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn gateways(&self) -> &GatewaySet {
        &self.gateways
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetches `identifier`, which may carry the scheme's URI prefix.
    ///
    /// Returns:
    /// - the payload of the earliest listed gateway that succeeded
    /// - `StorageError::InvalidIdentifier` for blank identifiers, before
    ///   any request is made
    /// - `StorageError::Resolution` with every gateway's failure otherwise
    pub async fn fetch(&self, identifier: &str) -> StorageResult<Bytes> {
        let id = self.gateways.scheme().normalize_identifier(identifier)?;

        let mut failures = Vec::new();
        for outcome in self.fetch_all(&id).await {
            match outcome {
                Ok(bytes) => {
                    if !failures.is_empty() {
                        tracing::debug!(
                            "{id}: {} earlier gateway(s) failed before a success",
                            failures.len()
                        );
                    }
                    return Ok(bytes);
                }
                Err(failure) => failures.push(failure),
            }
        }

        tracing::warn!("{id}: all {} gateway(s) failed", failures.len());
        Err(StorageError::Resolution {
            identifier: id.to_string(),
            failures,
        })
    }

    /// Every gateway's outcome, in gateway list order.
    pub async fn fetch_all(&self, id: &ContentId) -> Vec<Result<Bytes, GatewayFailure>> {
        let requests = self
            .gateways
            .gateways()
            .iter()
            .map(|gateway| self.fetch_one(gateway, id));
        join_all(requests).await
    }

    async fn fetch_one(&self, gateway: &str, id: &ContentId) -> Result<Bytes, GatewayFailure> {
        let url = GatewaySet::url_for(gateway, id);
        fetch_direct(&self.client, &url, self.timeout)
            .await
            .map_err(|reason| {
                tracing::debug!("gateway {gateway} failed for {id}: {reason}");
                GatewayFailure {
                    gateway: gateway.to_owned(),
                    reason,
                }
            })
    }
}

/// One GET with a hard timeout covering headers and body.
/// Non-2xx responses are failures.
pub async fn fetch_direct(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<Bytes, String> {
    let request = async {
        let res = client.get(url).send().await.map_err(|e| e.to_string())?;
        let status = res.status();
        if !status.is_success() {
            return Err(format!("HTTP {status}"));
        }
        res.bytes().await.map_err(|e| e.to_string())
    };

    match tokio::time::timeout(timeout, request).await {
        Ok(result) => result,
        Err(_) => Err(format!("timed out after {}ms", timeout.as_millis())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentdoc_core::Scheme;

    #[test]
    fn race_builder() {
        let race = GatewayRace::new(GatewaySet::defaults(Scheme::Arweave))
            .with_timeout(Duration::from_millis(250));
        assert_eq!(race.gateways().len(), 4);
        assert_eq!(race.timeout(), Duration::from_millis(250));
    }

    #[tokio::test]
    async fn empty_gateway_set_fails_with_identifier() {
        let race = GatewayRace::new(GatewaySet::new(Scheme::Ipfs, Vec::<String>::new()));
        let err = race.fetch("bafyempty").await.unwrap_err();
        match err {
            StorageError::Resolution {
                identifier,
                failures,
            } => {
                assert_eq!(identifier, "bafyempty");
                assert!(failures.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn blank_identifier_is_rejected() {
        let race = GatewayRace::new(GatewaySet::defaults(Scheme::Ipfs));
        assert!(matches!(
            race.fetch("  ").await,
            Err(StorageError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            race.fetch("ipfs://").await,
            Err(StorageError::InvalidIdentifier(_))
        ));
    }
}
