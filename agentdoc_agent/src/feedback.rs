use std::sync::Arc;
use std::time::Duration;

use agentdoc_core::{ChainContext, FeedbackRecord, StorageUri};

use crate::agent::DEFAULT_POLL_INTERVAL;
use crate::config::{ConfirmationConfig, DEFAULT_CONFIRMATION_TIMEOUT_MS};
use crate::error::{AgentError, AgentResult};
use crate::priority::PriorityWriter;
use crate::registry::{
    ConfirmationStatus, FeedbackSubmission, ReputationRegistry, TxHash, await_confirmation,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackOutcome {
    pub tx: TxHash,
    /// Where the full document landed. `None` when no backend stored it;
    /// the on-chain submission then carries an empty URI.
    pub uri: Option<StorageUri>,
    pub confirmation: ConfirmationStatus,
}

/// Stores feedback documents and submits them to the reputation registry.
///
/// Storage is best-effort: the score always goes on chain, with or without
/// a document behind it.
#[derive(Debug, Clone)]
pub struct FeedbackWriter {
    writer: PriorityWriter,
    registry: Arc<dyn ReputationRegistry>,
    chain: ChainContext,
    confirmation_timeout: Duration,
    poll_interval: Duration,
}

impl FeedbackWriter {
    pub fn new(
        writer: PriorityWriter,
        registry: Arc<dyn ReputationRegistry>,
        chain: ChainContext,
    ) -> Self {
        Self {
            writer,
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

    pub async fn give(&self, record: &FeedbackRecord) -> AgentResult<FeedbackOutcome> {
        record.validate()?;

        let uri = self.writer.store_feedback(record, &self.chain).await;
        let submission = FeedbackSubmission {
            agent_id: record.agent_id,
            score: record.score,
            tag1: record.tag1.clone(),
            tag2: record.tag2.clone(),
            feedback_uri: uri.as_ref().map(ToString::to_string).unwrap_or_default(),
        };

        let tx = self
            .registry
            .give_feedback(&submission)
            .await
            .map_err(AgentError::Registry)?;
        tracing::info!("submitted feedback for agent {} in {tx}", record.agent_id);

        let confirmation = await_confirmation(
            self.registry.as_ref(),
            &tx,
            self.confirmation_timeout,
            self.poll_interval,
        )
        .await
        .unwrap_or_else(|timeout| {
            tracing::warn!("{timeout}, continuing");
            timeout.into()
        });

        Ok(FeedbackOutcome {
            tx,
            uri,
            confirmation,
        })
    }
}
