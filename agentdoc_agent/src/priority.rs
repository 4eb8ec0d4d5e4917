use std::fmt;
use std::future::Future;
use std::sync::Arc;

use agentdoc_core::{
    Annotation, ChainContext, ContentId, FeedbackRecord, MetadataRecord, StorageBackend,
    StorageResult, StorageUri,
};
use bytes::Bytes;

/// Writes to the first backend that accepts the content.
///
/// Backends are tried one after another in priority order, the permanent
/// ledger before the pinning network. A failed attempt is logged and the
/// next backend is tried. When every backend fails the write yields no URI
/// instead of an error, so the caller can still complete its on-chain step.
#[derive(Clone, Default)]
pub struct PriorityWriter {
    backends: Vec<Arc<dyn StorageBackend>>,
}

impl fmt::Debug for PriorityWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PriorityWriter")
            .field(
                "backends",
                &self.backends.iter().map(|b| b.scheme()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl PriorityWriter {
    pub fn new(mut backends: Vec<Arc<dyn StorageBackend>>) -> Self {
        // stable: equal priorities keep the caller's order
        backends.sort_by_key(|b| b.scheme().priority());
        Self { backends }
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    pub fn backends(&self) -> &[Arc<dyn StorageBackend>] {
        &self.backends
    }

    pub async fn store(&self, payload: Bytes, annotations: &[Annotation]) -> Option<StorageUri> {
        self.first_success("payload", |backend| {
            let payload = payload.clone();
            async move { backend.upload(payload, annotations).await }
        })
        .await
    }

    pub async fn store_document(
        &self,
        record: &MetadataRecord,
        chain: Option<&ChainContext>,
    ) -> Option<StorageUri> {
        self.first_success("registration document", |backend| async move {
            backend.upload_document(record, chain).await
        })
        .await
    }

    pub async fn store_feedback(
        &self,
        record: &FeedbackRecord,
        chain: &ChainContext,
    ) -> Option<StorageUri> {
        self.first_success("feedback document", |backend| async move {
            backend.upload_feedback(record, chain).await
        })
        .await
    }

    async fn first_success<'a, F, Fut>(&'a self, what: &str, upload: F) -> Option<StorageUri>
    where
        F: Fn(&'a Arc<dyn StorageBackend>) -> Fut,
        Fut: Future<Output = StorageResult<ContentId>>,
    {
        for backend in &self.backends {
            match upload(backend).await {
                Ok(id) => return Some(backend.uri_for(id)),
                Err(err) => {
                    tracing::warn!(
                        "storing {what} on {} failed, trying next backend: {err}",
                        backend.name()
                    );
                }
            }
        }
        if !self.backends.is_empty() {
            tracing::warn!("no backend accepted the {what}, continuing without a storage uri");
        }
        None
    }
}
