use async_trait::async_trait;
use bytes::Bytes;

use crate::{
    annotations::{Annotation, generate_annotations},
    document::format_document,
    error::{StorageError, StorageResult},
    feedback::{FeedbackRecord, format_feedback, generate_feedback_annotations},
    record::{ChainContext, MetadataRecord},
    uri::{ContentId, Scheme, StorageUri},
};

/// Write side of a storage network.
///
/// Implementations authenticate at construction time; a backend that
/// exists is ready to upload. They do not retry and do not cache.
#[async_trait]
pub trait StorageBackend: std::fmt::Debug + Send + Sync + 'static {
    fn scheme(&self) -> Scheme;

    fn name(&self) -> &'static str {
        self.scheme().backend_name()
    }

    /// Whether `upload` attaches annotations to the stored content.
    fn supports_annotations(&self) -> bool;

    /// Stores `payload` and returns its backend-native identifier.
    /// Backends without native tagging ignore `annotations`.
    async fn upload(&self, payload: Bytes, annotations: &[Annotation])
    -> StorageResult<ContentId>;

    /// Formats `record` and uploads the canonical document.
    ///
    /// Annotations are generated only for backends that support them and
    /// only when a chain is known, either from `chain` or from the record's
    /// own agent id.
    async fn upload_document(
        &self,
        record: &MetadataRecord,
        chain: Option<&ChainContext>,
    ) -> StorageResult<ContentId> {
        let payload = format_document(record, chain)
            .to_json_bytes()
            .map_err(|e| StorageError::upload(self.name(), e))?;

        let annotations = if self.supports_annotations() {
            let fallback = record.agent_id.map(|id| ChainContext::new(id.chain_id));
            match chain.or(fallback.as_ref()) {
                Some(chain) => generate_annotations(record, chain),
                None => Vec::new(),
            }
        } else {
            Vec::new()
        };

        self.upload(payload, &annotations).await
    }

    async fn upload_feedback(
        &self,
        record: &FeedbackRecord,
        chain: &ChainContext,
    ) -> StorageResult<ContentId> {
        let payload = format_feedback(record, Some(chain))
            .to_json_bytes()
            .map_err(|e| StorageError::upload(self.name(), e))?;
        let annotations = if self.supports_annotations() {
            generate_feedback_annotations(record, chain)
        } else {
            Vec::new()
        };
        self.upload(payload, &annotations).await
    }

    fn uri_for(&self, id: ContentId) -> StorageUri {
        StorageUri::new(self.scheme(), id)
    }
}

/// Read side of a storage network.
#[async_trait]
pub trait ContentResolver: std::fmt::Debug + Send + Sync + 'static {
    fn scheme(&self) -> Scheme;

    /// Fetches the bytes stored under `identifier`. A `scheme://` prefix
    /// is accepted; blank identifiers are rejected before any network call.
    async fn resolve(&self, identifier: &str) -> StorageResult<Bytes>;

    /// [`resolve`](Self::resolve) and parse as JSON. A parse failure is a
    /// [`StorageError::Parse`], distinct from any network failure.
    async fn resolve_json(&self, identifier: &str) -> StorageResult<serde_json::Value> {
        let bytes = self.resolve(identifier).await?;
        serde_json::from_slice(&bytes).map_err(|source| StorageError::Parse {
            identifier: identifier.to_owned(),
            source,
        })
    }
}
