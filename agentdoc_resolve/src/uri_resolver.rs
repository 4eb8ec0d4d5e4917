use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use agentdoc_core::{
    ContentResolver, GatewayFailure, GatewaySet, RegistrationDocument, Scheme, StorageError,
    StorageResult, UriTarget, gateway::DEFAULT_GATEWAY_TIMEOUT,
};
use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::race::{GatewayRace, fetch_direct};

/// Result of loading a URI.
///
/// `Unconfigured` and `UnsupportedScheme` are ordinary outcomes, not
/// errors: an agent may be registered before its document is uploaded.
#[derive(Debug, Clone, PartialEq)]
pub enum Loaded<T> {
    Content(T),
    /// The URI was empty or blank.
    Unconfigured,
    UnsupportedScheme(String),
}

impl<T> Loaded<T> {
    pub fn content(self) -> Option<T> {
        match self {
            Self::Content(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_unconfigured(&self) -> bool {
        matches!(self, Self::Unconfigured)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Loaded<U> {
        match self {
            Self::Content(value) => Loaded::Content(f(value)),
            Self::Unconfigured => Loaded::Unconfigured,
            Self::UnsupportedScheme(s) => Loaded::UnsupportedScheme(s),
        }
    }
}

/// Loads content by storage URI.
///
/// `ipfs://` and `ar://` URIs go to the resolver registered for that
/// scheme. Without one, the URI is raced across the scheme's fallback
/// gateway set, so reads stay parallel whether or not a backend client is
/// configured. `http(s)://` URLs are fetched directly.
#[derive(Debug, Clone)]
pub struct UriResolver {
    resolvers: BTreeMap<Scheme, Arc<dyn ContentResolver>>,
    fallback: BTreeMap<Scheme, GatewayRace>,
    client: reqwest::Client,
    timeout: Duration,
}

impl Default for UriResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl UriResolver {
    pub fn new() -> Self {
        let client = reqwest::Client::new();
        let fallback = Scheme::ALL
            .into_iter()
            .map(|scheme| {
                (
                    scheme,
                    GatewayRace::new(GatewaySet::defaults(scheme)).with_client(client.clone()),
                )
            })
            .collect();
        Self {
            resolvers: BTreeMap::new(),
            fallback,
            client,
            timeout: DEFAULT_GATEWAY_TIMEOUT,
        }
    }

    /// Registers the resolver for its scheme, replacing any previous one.
    pub fn with_resolver(mut self, resolver: Arc<dyn ContentResolver>) -> Self {
        self.resolvers.insert(resolver.scheme(), resolver);
        self
    }

    /// Overrides the gateways raced for a scheme that has no resolver.
    pub fn with_fallback_gateways(mut self, gateways: GatewaySet) -> Self {
        let race = GatewayRace::new(gateways)
            .with_client(self.client.clone())
            .with_timeout(self.timeout);
        self.fallback.insert(race.gateways().scheme(), race);
        self
    }

    /// Timeout for direct fetches and fallback gateways.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self.fallback = std::mem::take(&mut self.fallback)
            .into_iter()
            .map(|(scheme, race)| (scheme, race.with_timeout(timeout)))
            .collect();
        self
    }

    pub fn has_resolver(&self, scheme: Scheme) -> bool {
        self.resolvers.contains_key(&scheme)
    }

    pub async fn load_bytes(&self, uri: &str) -> StorageResult<Loaded<Bytes>> {
        match UriTarget::parse(uri)? {
            UriTarget::Unconfigured => Ok(Loaded::Unconfigured),
            UriTarget::Unsupported(scheme) => {
                tracing::debug!("cannot load {uri}: unsupported scheme {scheme}");
                Ok(Loaded::UnsupportedScheme(scheme))
            }
            UriTarget::Content(uri) => {
                let id = uri.id().as_str();
                let bytes = match self.resolvers.get(&uri.scheme()) {
                    Some(resolver) => resolver.resolve(id).await?,
                    None => match self.fallback.get(&uri.scheme()) {
                        Some(race) => race.fetch(id).await?,
                        None => {
                            return Err(StorageError::Resolution {
                                identifier: id.to_owned(),
                                failures: Vec::new(),
                            });
                        }
                    },
                };
                Ok(Loaded::Content(bytes))
            }
            UriTarget::Web(url) => {
                let bytes = fetch_direct(&self.client, url.as_str(), self.timeout)
                    .await
                    .map_err(|reason| StorageError::Resolution {
                        identifier: url.to_string(),
                        failures: vec![GatewayFailure {
                            gateway: url.origin().ascii_serialization(),
                            reason,
                        }],
                    })?;
                Ok(Loaded::Content(bytes))
            }
        }
    }

    pub async fn load_json<T: DeserializeOwned>(&self, uri: &str) -> StorageResult<Loaded<T>> {
        match self.load_bytes(uri).await? {
            Loaded::Content(bytes) => serde_json::from_slice(&bytes)
                .map(Loaded::Content)
                .map_err(|source| StorageError::Parse {
                    identifier: uri.trim().to_owned(),
                    source,
                }),
            Loaded::Unconfigured => Ok(Loaded::Unconfigured),
            Loaded::UnsupportedScheme(s) => Ok(Loaded::UnsupportedScheme(s)),
        }
    }

    /// Loads an agent registration document.
    pub async fn load(&self, uri: &str) -> StorageResult<Loaded<RegistrationDocument>> {
        self.load_json(uri).await
    }
}
