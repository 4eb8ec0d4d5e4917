use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use agentdoc_core::{
    AgentId, ChainContext, Endpoint, EndpointType, MetadataRecord, StorageBackend, StorageError,
    StorageUri, TrustModel, WalletRef,
};
use agentdoc_resolve::{Loaded, UriResolver};

use crate::config::{ConfirmationConfig, DEFAULT_CONFIRMATION_TIMEOUT_MS};
use crate::error::{AgentError, AgentResult};
use crate::guard::{WriteGuard, WriteState};
use crate::registry::{ConfirmationStatus, IdentityRegistry, TxHash, await_confirmation};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// What a registration write achieved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationOutcome {
    pub agent_id: AgentId,
    pub uri: StorageUri,
    pub tx: TxHash,
    pub confirmation: ConfirmationStatus,
}

#[derive(Debug)]
struct AgentState {
    record: MetadataRecord,
    dirty: BTreeSet<String>,
    uri: Option<String>,
}

/// One agent and the writes that publish it.
///
/// The agent exclusively owns its record and write guard. Registry and
/// storage clients are passed in and may be shared by many agents.
#[derive(Debug)]
pub struct Agent {
    state: Mutex<AgentState>,
    guard: WriteGuard,
    registry: Arc<dyn IdentityRegistry>,
    chain: ChainContext,
    confirmation_timeout: Duration,
    poll_interval: Duration,
}

impl Agent {
    pub fn new(
        record: MetadataRecord,
        registry: Arc<dyn IdentityRegistry>,
        chain: ChainContext,
    ) -> Self {
        Self {
            state: Mutex::new(AgentState {
                record,
                dirty: BTreeSet::new(),
                uri: None,
            }),
            guard: WriteGuard::new(),
            registry,
            chain,
            confirmation_timeout: Duration::from_millis(DEFAULT_CONFIRMATION_TIMEOUT_MS),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_confirmation(mut self, config: &ConfirmationConfig) -> Self {
        self.confirmation_timeout = config.timeout();
        self.poll_interval = config.poll_interval();
        self
    }

    /// Reads the agent's current URI from the registry and rebuilds its
    /// record from the stored document.
    ///
    /// An agent registered without a document loads with an empty record.
    pub async fn load(
        agent_id: AgentId,
        registry: Arc<dyn IdentityRegistry>,
        resolver: &UriResolver,
        chain: ChainContext,
    ) -> AgentResult<Self> {
        let uri = registry
            .agent_uri(agent_id)
            .await
            .map_err(AgentError::Registry)?;

        let mut record = match resolver.load(&uri).await? {
            Loaded::Content(document) => document.into_record(agent_id.chain_id),
            Loaded::Unconfigured => MetadataRecord::default(),
            Loaded::UnsupportedScheme(_) => return Err(StorageError::InvalidUri(uri).into()),
        };
        record.agent_id = Some(agent_id);

        let agent = Self::new(record, registry, chain);
        if !uri.trim().is_empty() {
            agent.lock().uri = Some(uri);
        }
        Ok(agent)
    }

    fn lock(&self) -> MutexGuard<'_, AgentState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, f: impl FnOnce(&mut MetadataRecord)) {
        let mut state = self.lock();
        f(&mut state.record);
        state.record.touch();
    }

    pub fn record(&self) -> MetadataRecord {
        self.lock().record.clone()
    }

    pub fn agent_id(&self) -> Option<AgentId> {
        self.lock().record.agent_id
    }

    /// URI of the last registered document.
    pub fn uri(&self) -> Option<String> {
        self.lock().uri.clone()
    }

    /// Metadata keys changed since the last registration.
    pub fn dirty_keys(&self) -> Vec<String> {
        self.lock().dirty.iter().cloned().collect()
    }

    pub fn write_state(&self) -> WriteState {
        self.guard.state()
    }

    pub fn chain(&self) -> &ChainContext {
        &self.chain
    }

    pub fn set_name(&self, name: impl Into<String>) {
        let name = name.into();
        self.update(|r| r.name = name);
    }

    pub fn set_description(&self, description: impl Into<String>) {
        let description = description.into();
        self.update(|r| r.description = description);
    }

    pub fn set_image(&self, image: Option<String>) {
        self.update(|r| r.image = image);
    }

    pub fn add_endpoint(&self, endpoint: Endpoint) {
        self.update(|r| r.endpoints.push(endpoint));
    }

    /// Removes every endpoint of `kind`.
    pub fn remove_endpoints(&self, kind: &EndpointType) {
        self.update(|r| r.endpoints.retain(|ep| &ep.kind != kind));
    }

    pub fn add_trust_model(&self, model: TrustModel) {
        self.update(|r| {
            if !r.trust_models.contains(&model) {
                r.trust_models.push(model);
            }
        });
    }

    pub fn set_wallet(&self, wallet: Option<WalletRef>) {
        self.update(|r| r.wallet = wallet);
    }

    pub fn set_active(&self, active: bool) {
        self.update(|r| r.active = active);
    }

    pub fn set_x402_support(&self, enabled: bool) {
        self.update(|r| r.x402_support = enabled);
    }

    /// Sets an on-chain metadata entry. The key is written to the registry
    /// on the next registration.
    pub fn set_metadata(&self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        let mut state = self.lock();
        state.record.metadata.insert(key.clone(), value);
        state.dirty.insert(key);
        state.record.touch();
    }

    /// Publishes the record through `backend` and points the registry at it.
    ///
    /// An agent without an id is first registered with an empty URI, since
    /// the document has to carry the id it is about to receive. Then:
    /// upload, flush changed metadata (best-effort), set the URI, wait for
    /// confirmation (best-effort), record the URI.
    ///
    /// Upload and registry write failures are returned. A confirmation
    /// wait that runs out is reported as
    /// [`ConfirmationStatus::SubmittedUnconfirmed`].
    pub async fn register(&self, backend: &dyn StorageBackend) -> AgentResult<RegistrationOutcome> {
        let _token = self.guard.try_acquire()?;

        let (mut record, dirty) = {
            let state = self.lock();
            (state.record.clone(), state.dirty.clone())
        };
        record.validate_for_write(Some(&self.chain))?;

        let (agent_id, newly_registered) = match record.agent_id {
            Some(id) => (id, false),
            None => {
                let id = self
                    .registry
                    .register("", &record.metadata)
                    .await
                    .map_err(AgentError::Registry)?;
                tracing::info!("registered agent {id} with an empty uri");
                // keep the id even if a later step fails, so a retry does not mint again
                self.lock().record.agent_id = Some(id);
                record.agent_id = Some(id);
                (id, true)
            }
        };

        let content_id = backend.upload_document(&record, Some(&self.chain)).await?;
        let uri = backend.uri_for(content_id);
        tracing::debug!("stored document of agent {agent_id} at {uri}");

        // registration already carried the full metadata map
        if !newly_registered {
            for key in &dirty {
                let Some(value) = record.metadata.get(key) else {
                    continue;
                };
                if let Err(err) = self.registry.set_metadata(agent_id, key, value).await {
                    tracing::warn!("failed to flush metadata '{key}' of agent {agent_id}: {err:#}");
                }
            }
        }

        let tx = self
            .registry
            .set_uri(agent_id, &uri.to_string())
            .await
            .map_err(AgentError::Registry)?;

        let confirmation = match await_confirmation(
            self.registry.as_ref(),
            &tx,
            self.confirmation_timeout,
            self.poll_interval,
        )
        .await
        {
            Ok(status) => status,
            Err(timeout) => {
                tracing::warn!("{timeout}, continuing");
                timeout.into()
            }
        };

        {
            let mut state = self.lock();
            // keys changed while the write was in flight stay dirty
            for key in &dirty {
                if state.record.metadata.get(key) == record.metadata.get(key) {
                    state.dirty.remove(key);
                }
            }
            if confirmation == ConfirmationStatus::Failed {
                tracing::warn!("set_uri transaction {tx} of agent {agent_id} failed");
            } else {
                state.uri = Some(uri.to_string());
            }
        }

        Ok(RegistrationOutcome {
            agent_id,
            uri,
            tx,
            confirmation,
        })
    }
}
