use agentdoc_core::{RecordError, StorageError};
use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AgentError {
    /// Another write on the same entity has not finished yet.
    #[error("a write for this agent is already in progress")]
    WriteInProgress,

    #[error("record cannot be written: {0}")]
    InvalidRecord(#[from] RecordError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("registry call failed: {0:#}")]
    Registry(anyhow::Error),
}

pub type AgentResult<T> = std::result::Result<T, AgentError>;
