//! On-chain registry boundary.
//!
//! Contract calls are consumed through [`IdentityRegistry`] and
//! [`ReputationRegistry`]. The in-memory implementations at the bottom of
//! this module stand in for a chain in tests and dry runs.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::RwLock;
use std::time::Duration;

use agentdoc_core::AgentId;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Hash of a submitted transaction.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TxHash(pub String);

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the chain currently reports for a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Pending,
    Confirmed,
    Failed,
}

/// Outcome of waiting for a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationStatus {
    Confirmed,
    /// Submitted, but not seen confirmed before the wait ended. It may
    /// still confirm later.
    SubmittedUnconfirmed,
    Failed,
}

/// Confirmation was not observed in time. Advisory only.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("transaction {tx} not confirmed after {}ms", .waited.as_millis())]
pub struct ConfirmationTimeout {
    pub tx: TxHash,
    pub waited: Duration,
}

impl From<ConfirmationTimeout> for ConfirmationStatus {
    fn from(_: ConfirmationTimeout) -> Self {
        ConfirmationStatus::SubmittedUnconfirmed
    }
}

#[async_trait]
pub trait TransactionStatus: fmt::Debug + Send + Sync {
    async fn transaction_status(&self, tx: &TxHash) -> Result<TxStatus>;
}

/// Identity registry contract.
#[async_trait]
pub trait IdentityRegistry: TransactionStatus {
    /// Mints a new agent id. `uri` may be empty.
    async fn register(&self, uri: &str, metadata: &BTreeMap<String, String>) -> Result<AgentId>;

    async fn set_uri(&self, agent_id: AgentId, uri: &str) -> Result<TxHash>;

    async fn set_metadata(&self, agent_id: AgentId, key: &str, value: &str) -> Result<TxHash>;

    /// Current URI, empty when none was set.
    async fn agent_uri(&self, agent_id: AgentId) -> Result<String>;
}

/// Feedback as submitted on chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackSubmission {
    pub agent_id: AgentId,
    pub score: u8,
    pub tag1: Option<String>,
    pub tag2: Option<String>,
    /// Storage URI of the full feedback document, empty when it could not
    /// be stored.
    pub feedback_uri: String,
}

/// Reputation registry contract.
#[async_trait]
pub trait ReputationRegistry: TransactionStatus {
    async fn give_feedback(&self, submission: &FeedbackSubmission) -> Result<TxHash>;
}

/// Polls `registry` until `tx` settles or `timeout` elapses.
///
/// Status lookups that error are retried at the next poll.
pub async fn await_confirmation<R>(
    registry: &R,
    tx: &TxHash,
    timeout: Duration,
    poll_interval: Duration,
) -> std::result::Result<ConfirmationStatus, ConfirmationTimeout>
where
    R: TransactionStatus + ?Sized,
{
    let started = Instant::now();
    loop {
        match registry.transaction_status(tx).await {
            Ok(TxStatus::Confirmed) => return Ok(ConfirmationStatus::Confirmed),
            Ok(TxStatus::Failed) => return Ok(ConfirmationStatus::Failed),
            Ok(TxStatus::Pending) => {}
            Err(err) => tracing::debug!("status of {tx} unavailable: {err:#}"),
        }

        let waited = started.elapsed();
        if waited >= timeout {
            return Err(ConfirmationTimeout {
                tx: tx.clone(),
                waited,
            });
        }
        tokio::time::sleep(poll_interval.min(timeout - waited)).await;
    }
}

// ============================================================================
// In-Memory Registries
// ============================================================================

/// A call made against an in-memory registry, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryCall {
    Register { uri: String },
    SetUri { agent_id: AgentId, uri: String },
    SetMetadata {
        agent_id: AgentId,
        key: String,
        value: String,
    },
    GiveFeedback(FeedbackSubmission),
}

#[derive(Debug, Clone, Copy)]
enum Settlement {
    After(Duration),
    Never,
    Revert,
}

#[derive(Debug, Default)]
struct TxBook {
    counter: u64,
    submitted: HashMap<TxHash, Instant>,
    calls: Vec<RegistryCall>,
}

impl TxBook {
    fn submit(&mut self, call: RegistryCall) -> TxHash {
        self.counter += 1;
        let tx = TxHash(format!("0x{:064x}", self.counter));
        self.submitted.insert(tx.clone(), Instant::now());
        self.calls.push(call);
        tx
    }

    fn status(&self, tx: &TxHash, settlement: Settlement) -> Result<TxStatus> {
        let submitted_at = self
            .submitted
            .get(tx)
            .ok_or_else(|| anyhow!("unknown transaction {tx}"))?;
        Ok(match settlement {
            Settlement::After(lag) if submitted_at.elapsed() >= lag => TxStatus::Confirmed,
            Settlement::After(_) | Settlement::Never => TxStatus::Pending,
            Settlement::Revert => TxStatus::Failed,
        })
    }
}

#[derive(Debug, Default)]
struct IdentityState {
    next_token: u64,
    uris: HashMap<AgentId, String>,
    metadata: HashMap<AgentId, BTreeMap<String, String>>,
    book: TxBook,
}

/// In-memory identity registry on a single chain.
///
/// Transactions confirm once the configured lag has passed since they were
/// submitted; by default they confirm immediately.
#[derive(Debug)]
pub struct MemoryIdentityRegistry {
    chain_id: u64,
    settlement: Settlement,
    state: RwLock<IdentityState>,
}

impl MemoryIdentityRegistry {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            settlement: Settlement::After(Duration::ZERO),
            state: RwLock::default(),
        }
    }

    pub fn with_confirmation_lag(mut self, lag: Duration) -> Self {
        self.settlement = Settlement::After(lag);
        self
    }

    /// Transactions stay pending forever.
    pub fn never_confirming(mut self) -> Self {
        self.settlement = Settlement::Never;
        self
    }

    /// Every transaction reports as reverted.
    pub fn reverting(mut self) -> Self {
        self.settlement = Settlement::Revert;
        self
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn calls(&self) -> Vec<RegistryCall> {
        self.state.read().unwrap().book.calls.clone()
    }

    pub fn metadata_of(&self, agent_id: AgentId) -> BTreeMap<String, String> {
        self.state
            .read()
            .unwrap()
            .metadata
            .get(&agent_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl TransactionStatus for MemoryIdentityRegistry {
    async fn transaction_status(&self, tx: &TxHash) -> Result<TxStatus> {
        self.state.read().unwrap().book.status(tx, self.settlement)
    }
}

#[async_trait]
impl IdentityRegistry for MemoryIdentityRegistry {
    async fn register(&self, uri: &str, metadata: &BTreeMap<String, String>) -> Result<AgentId> {
        let mut state = self.state.write().unwrap();
        state.next_token += 1;
        let agent_id = AgentId::new(self.chain_id, state.next_token);
        state.uris.insert(agent_id, uri.to_owned());
        state.metadata.insert(agent_id, metadata.clone());
        state.book.submit(RegistryCall::Register {
            uri: uri.to_owned(),
        });
        Ok(agent_id)
    }

    async fn set_uri(&self, agent_id: AgentId, uri: &str) -> Result<TxHash> {
        let mut state = self.state.write().unwrap();
        let Some(current) = state.uris.get_mut(&agent_id) else {
            return Err(anyhow!("agent {agent_id} is not registered"));
        };
        *current = uri.to_owned();
        Ok(state.book.submit(RegistryCall::SetUri {
            agent_id,
            uri: uri.to_owned(),
        }))
    }

    async fn set_metadata(&self, agent_id: AgentId, key: &str, value: &str) -> Result<TxHash> {
        let mut state = self.state.write().unwrap();
        let Some(entries) = state.metadata.get_mut(&agent_id) else {
            return Err(anyhow!("agent {agent_id} is not registered"));
        };
        entries.insert(key.to_owned(), value.to_owned());
        Ok(state.book.submit(RegistryCall::SetMetadata {
            agent_id,
            key: key.to_owned(),
            value: value.to_owned(),
        }))
    }

    async fn agent_uri(&self, agent_id: AgentId) -> Result<String> {
        self.state
            .read()
            .unwrap()
            .uris
            .get(&agent_id)
            .cloned()
            .ok_or_else(|| anyhow!("agent {agent_id} is not registered"))
    }
}

/// In-memory reputation registry.
#[derive(Debug)]
pub struct MemoryReputationRegistry {
    settlement: Settlement,
    book: RwLock<TxBook>,
}

impl Default for MemoryReputationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryReputationRegistry {
    pub fn new() -> Self {
        Self {
            settlement: Settlement::After(Duration::ZERO),
            book: RwLock::default(),
        }
    }

    pub fn never_confirming(mut self) -> Self {
        self.settlement = Settlement::Never;
        self
    }

    pub fn submissions(&self) -> Vec<FeedbackSubmission> {
        self.book
            .read()
            .unwrap()
            .calls
            .iter()
            .filter_map(|call| match call {
                RegistryCall::GiveFeedback(submission) => Some(submission.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl TransactionStatus for MemoryReputationRegistry {
    async fn transaction_status(&self, tx: &TxHash) -> Result<TxStatus> {
        self.book.read().unwrap().status(tx, self.settlement)
    }
}

#[async_trait]
impl ReputationRegistry for MemoryReputationRegistry {
    async fn give_feedback(&self, submission: &FeedbackSubmission) -> Result<TxHash> {
        let mut book = self.book.write().unwrap();
        Ok(book.submit(RegistryCall::GiveFeedback(submission.clone())))
    }
}
