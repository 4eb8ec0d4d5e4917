//! Agent registration and feedback on top of agentdoc storage.
//!
//! An [`Agent`] owns one metadata record and serializes writes to it with a
//! [`WriteGuard`]. Registration stores the document through a
//! [`StorageBackend`](agentdoc_core::StorageBackend) and points the identity
//! registry at the resulting URI. [`FeedbackWriter`] stores feedback through
//! a [`PriorityWriter`], trying backends in order and falling back to an
//! on-chain submission without a document when none accepts it.

mod agent;
mod clients;
mod config;
mod error;
mod feedback;
mod guard;
mod priority;
pub mod registry;

pub use agent::{Agent, DEFAULT_POLL_INTERVAL, RegistrationOutcome};
pub use clients::{StorageClients, StorageClientsBuilder};
pub use config::{
    ChainConfig, ConfirmationConfig, DEFAULT_CONFIRMATION_TIMEOUT_MS, GatewayConfig,
    StorageConfig,
};
pub use error::{AgentError, AgentResult};
pub use feedback::{FeedbackOutcome, FeedbackWriter};
pub use guard::{WriteGuard, WriteState, WriteToken};
pub use priority::PriorityWriter;
pub use registry::{
    ConfirmationStatus, FeedbackSubmission, IdentityRegistry, MemoryIdentityRegistry,
    MemoryReputationRegistry, ReputationRegistry, TxHash, TxStatus,
};
