use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use agentdoc_backend_arweave::{ArweaveBackend, ArweaveResolver};
use agentdoc_backend_ipfs::{IpfsBackend, IpfsResolver};
use agentdoc_core::{
    ContentResolver, GatewaySet, Scheme, StorageBackend, StorageResult,
    gateway::DEFAULT_GATEWAY_TIMEOUT,
};
use agentdoc_resolve::UriResolver;

use crate::config::StorageConfig;
use crate::priority::PriorityWriter;

/// Storage clients resolved once at startup.
///
/// Each scheme has an optional write slot and an optional read slot.
/// Code downstream checks whether a slot is filled; nothing is built
/// lazily.
#[derive(Clone)]
pub struct StorageClients {
    backends: BTreeMap<Scheme, Arc<dyn StorageBackend>>,
    resolvers: BTreeMap<Scheme, Arc<dyn ContentResolver>>,
    fallback_gateways: Vec<GatewaySet>,
    gateway_timeout: Duration,
}

impl fmt::Debug for StorageClients {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageClients")
            .field("backends", &self.backends.keys().collect::<Vec<_>>())
            .field("resolvers", &self.resolvers.keys().collect::<Vec<_>>())
            .field("gateway_timeout", &self.gateway_timeout)
            .finish_non_exhaustive()
    }
}

impl StorageClients {
    pub fn builder() -> StorageClientsBuilder {
        StorageClientsBuilder::default()
    }

    /// Builds every enabled backend from `config`.
    ///
    /// Fails with a configuration error when an enabled backend lacks a
    /// usable credential. `config_dir` resolves relative key file paths.
    pub fn from_config(config: &StorageConfig, config_dir: Option<&Path>) -> StorageResult<Self> {
        let mut builder = Self::builder().with_gateway_timeout(config.gateways.timeout());
        // A backend's own gateway timeout wins over the shared one.
        let gateway_timeout =
            |own: Option<u64>| Duration::from_millis(own.unwrap_or(config.gateways.timeout_ms));

        if let Some(arweave) = config.effective_arweave() {
            let resolver = ArweaveResolver::from_config(&arweave)
                .with_timeout(gateway_timeout(arweave.gateway_timeout_ms));
            builder = builder
                .with_backend(Arc::new(ArweaveBackend::create(&arweave, config_dir)?))
                .with_resolver(Arc::new(resolver));
        }
        if let Some(ipfs) = config.effective_ipfs() {
            let resolver = IpfsResolver::from_config(ipfs)
                .with_timeout(gateway_timeout(ipfs.gateway_timeout_ms));
            builder = builder
                .with_backend(Arc::new(IpfsBackend::create(ipfs)?))
                .with_resolver(Arc::new(resolver));
        }

        for (scheme, gateways) in [
            (Scheme::Ipfs, &config.gateways.ipfs),
            (Scheme::Arweave, &config.gateways.arweave),
        ] {
            if !gateways.is_empty() {
                builder =
                    builder.with_fallback_gateways(GatewaySet::new(scheme, gateways.iter()));
            }
        }

        Ok(builder.build())
    }

    pub fn backend(&self, scheme: Scheme) -> Option<Arc<dyn StorageBackend>> {
        self.backends.get(&scheme).cloned()
    }

    pub fn resolver(&self, scheme: Scheme) -> Option<Arc<dyn ContentResolver>> {
        self.resolvers.get(&scheme).cloned()
    }

    pub fn has_backends(&self) -> bool {
        !self.backends.is_empty()
    }

    /// Every configured backend, in write priority order.
    pub fn priority_writer(&self) -> PriorityWriter {
        PriorityWriter::new(self.backends.values().cloned().collect())
    }

    pub fn uri_resolver(&self) -> UriResolver {
        let mut resolver = UriResolver::new().with_timeout(self.gateway_timeout);
        for gateways in &self.fallback_gateways {
            resolver = resolver.with_fallback_gateways(gateways.clone());
        }
        for content in self.resolvers.values() {
            resolver = resolver.with_resolver(content.clone());
        }
        resolver
    }
}

pub struct StorageClientsBuilder {
    backends: BTreeMap<Scheme, Arc<dyn StorageBackend>>,
    resolvers: BTreeMap<Scheme, Arc<dyn ContentResolver>>,
    fallback_gateways: Vec<GatewaySet>,
    gateway_timeout: Duration,
}

impl Default for StorageClientsBuilder {
    fn default() -> Self {
        Self {
            backends: BTreeMap::new(),
            resolvers: BTreeMap::new(),
            fallback_gateways: Vec::new(),
            gateway_timeout: DEFAULT_GATEWAY_TIMEOUT,
        }
    }
}

impl StorageClientsBuilder {
    /// Fills the write slot of the backend's scheme.
    pub fn with_backend(mut self, backend: Arc<dyn StorageBackend>) -> Self {
        self.backends.insert(backend.scheme(), backend);
        self
    }

    /// Fills the read slot of the resolver's scheme.
    pub fn with_resolver(mut self, resolver: Arc<dyn ContentResolver>) -> Self {
        self.resolvers.insert(resolver.scheme(), resolver);
        self
    }

    /// Gateways raced for a scheme whose read slot stays empty.
    pub fn with_fallback_gateways(mut self, gateways: GatewaySet) -> Self {
        self.fallback_gateways.retain(|g| g.scheme() != gateways.scheme());
        self.fallback_gateways.push(gateways);
        self
    }

    pub fn with_gateway_timeout(mut self, timeout: Duration) -> Self {
        self.gateway_timeout = timeout;
        self
    }

    pub fn build(self) -> StorageClients {
        StorageClients {
            backends: self.backends,
            resolvers: self.resolvers,
            fallback_gateways: self.fallback_gateways,
            gateway_timeout: self.gateway_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentdoc_backend_arweave::ArweaveConfig;
    use agentdoc_backend_ipfs::{IpfsConfig, IpfsProvider};
    use agentdoc_core::StorageError;
    use std::time::Instant;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::config::GatewayConfig;

    const HEX_KEY: &str = "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60";

    #[test]
    fn empty_config_builds_no_backends() {
        let clients = StorageClients::from_config(&StorageConfig::default(), None).unwrap();
        assert!(!clients.has_backends());
        assert!(clients.priority_writer().is_empty());
        let resolver = clients.uri_resolver();
        assert!(!resolver.has_resolver(Scheme::Ipfs));
    }

    #[test]
    fn both_backends_in_priority_order() {
        let config = StorageConfig {
            arweave: Some(ArweaveConfig::with_secret_key(HEX_KEY)),
            ipfs: Some(IpfsConfig::new(IpfsProvider::pinata("a.b.c"))),
            ..Default::default()
        };
        let clients = StorageClients::from_config(&config, None).unwrap();
        let schemes: Vec<_> = clients
            .priority_writer()
            .backends()
            .iter()
            .map(|b| b.scheme())
            .collect();
        assert_eq!(schemes, [Scheme::Arweave, Scheme::Ipfs]);
        assert!(clients.uri_resolver().has_resolver(Scheme::Arweave));
        assert!(clients.resolver(Scheme::Ipfs).is_some());
    }

    #[test]
    fn enabled_backend_without_credential_fails_fast() {
        let config = StorageConfig {
            arweave: Some(ArweaveConfig::default()),
            ..Default::default()
        };
        assert!(matches!(
            StorageClients::from_config(&config, None),
            Err(StorageError::Configuration { backend: "arweave", .. })
        ));
    }

    #[tokio::test]
    async fn shared_gateway_timeout_reaches_backend_resolvers() {
        let slow = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("late")
                    .set_delay(Duration::from_millis(1500)),
            )
            .mount(&slow)
            .await;

        let mut ipfs = IpfsConfig::new(IpfsProvider::node("http://127.0.0.1:5001"));
        ipfs.gateways = vec![format!("{}/ipfs", slow.uri())];
        let config = StorageConfig {
            ipfs: Some(ipfs),
            gateways: GatewayConfig {
                timeout_ms: 200,
                ..Default::default()
            },
            ..Default::default()
        };
        let clients = StorageClients::from_config(&config, None).unwrap();

        let started = Instant::now();
        let res = clients.uri_resolver().load_bytes("ipfs://bafyslow").await;
        assert!(
            matches!(res, Err(StorageError::Resolution { .. })),
            "got {res:?}"
        );
        assert!(started.elapsed() < Duration::from_millis(1000));
    }

    #[test]
    fn disabled_backend_is_skipped() {
        let mut ipfs = IpfsConfig::new(IpfsProvider::pinata("bad"));
        ipfs.enabled = false;
        let config = StorageConfig {
            ipfs: Some(ipfs),
            ..Default::default()
        };
        let clients = StorageClients::from_config(&config, None).unwrap();
        assert!(clients.backend(Scheme::Ipfs).is_none());
    }
}
