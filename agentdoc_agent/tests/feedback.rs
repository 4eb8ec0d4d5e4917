use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use agentdoc_agent::{
    ConfirmationConfig, ConfirmationStatus, FeedbackWriter, MemoryReputationRegistry,
    PriorityWriter,
};
use agentdoc_backend_memory::MemoryBackend;
use agentdoc_core::{
    AgentId, Annotation, ChainContext, ContentId, FeedbackRecord, Scheme, StorageBackend,
    StorageError, StorageResult, annotations,
};
use async_trait::async_trait;
use bytes::Bytes;

/// Always refuses uploads with the configured error.
#[derive(Debug)]
struct RefusingBackend {
    scheme: Scheme,
    quota: bool,
    attempts: AtomicUsize,
}

impl RefusingBackend {
    fn new(scheme: Scheme, quota: bool) -> Arc<Self> {
        Arc::new(Self {
            scheme,
            quota,
            attempts: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl StorageBackend for RefusingBackend {
    fn scheme(&self) -> Scheme {
        self.scheme
    }

    fn supports_annotations(&self) -> bool {
        false
    }

    async fn upload(&self, _: Bytes, _: &[Annotation]) -> StorageResult<ContentId> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.quota {
            Err(StorageError::quota(self.name(), "buy credits"))
        } else {
            Err(StorageError::upload(self.name(), "HTTP 500"))
        }
    }
}

fn quick() -> ConfirmationConfig {
    ConfirmationConfig {
        timeout_ms: 50,
        poll_interval_ms: 5,
    }
}

fn feedback() -> FeedbackRecord {
    let mut record = FeedbackRecord::new(AgentId::new(84532, 7), "0xreviewer", 92);
    record.tag1 = Some("fast".into());
    record.text = Some("Answered within a second".into());
    record
}

#[tokio::test]
async fn quota_on_arweave_falls_through_to_ipfs() {
    let arweave = RefusingBackend::new(Scheme::Arweave, true);
    let ipfs = Arc::new(MemoryBackend::new(Scheme::Ipfs));
    // listed in the wrong order on purpose
    let writer =
        PriorityWriter::new(vec![ipfs.clone() as Arc<dyn StorageBackend>, arweave.clone()]);
    let registry = Arc::new(MemoryReputationRegistry::new());
    let feedback_writer = FeedbackWriter::new(writer, registry.clone(), ChainContext::new(84532))
        .with_confirmation(&quick());

    let outcome = feedback_writer.give(&feedback()).await.unwrap();

    assert_eq!(arweave.attempts.load(Ordering::SeqCst), 1);
    let uri = outcome.uri.unwrap();
    assert_eq!(uri.scheme(), Scheme::Ipfs);
    assert!(ipfs.get(uri.id()).is_some());
    assert_eq!(outcome.confirmation, ConfirmationStatus::Confirmed);

    let submissions = registry.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].feedback_uri, uri.to_string());
    assert_eq!(submissions[0].score, 92);
    assert_eq!(submissions[0].tag1.as_deref(), Some("fast"));
}

#[tokio::test]
async fn all_backends_failing_still_submits_without_uri() {
    let arweave = RefusingBackend::new(Scheme::Arweave, true);
    let ipfs = RefusingBackend::new(Scheme::Ipfs, false);
    let writer =
        PriorityWriter::new(vec![arweave.clone() as Arc<dyn StorageBackend>, ipfs.clone()]);
    let registry = Arc::new(MemoryReputationRegistry::new());
    let feedback_writer = FeedbackWriter::new(writer, registry.clone(), ChainContext::new(84532))
        .with_confirmation(&quick());

    let outcome = feedback_writer.give(&feedback()).await.unwrap();

    assert!(outcome.uri.is_none());
    assert_eq!(arweave.attempts.load(Ordering::SeqCst), 1);
    assert_eq!(ipfs.attempts.load(Ordering::SeqCst), 1);
    assert_eq!(registry.submissions()[0].feedback_uri, "");
}

#[tokio::test]
async fn no_backends_at_all_submits_without_uri() {
    let registry = Arc::new(MemoryReputationRegistry::new().never_confirming());
    let feedback_writer =
        FeedbackWriter::new(PriorityWriter::default(), registry.clone(), ChainContext::new(1))
            .with_confirmation(&quick());

    let outcome = feedback_writer.give(&feedback()).await.unwrap();
    assert!(outcome.uri.is_none());
    assert_eq!(
        outcome.confirmation,
        ConfirmationStatus::SubmittedUnconfirmed
    );
    assert_eq!(registry.submissions().len(), 1);
}

#[tokio::test]
async fn feedback_on_arweave_carries_annotations() {
    let arweave = Arc::new(MemoryBackend::new(Scheme::Arweave));
    let writer = PriorityWriter::new(vec![arweave.clone() as Arc<dyn StorageBackend>]);
    let feedback_writer = FeedbackWriter::new(
        writer,
        Arc::new(MemoryReputationRegistry::new()),
        ChainContext::new(84532),
    )
    .with_confirmation(&quick());

    let uri = feedback_writer.give(&feedback()).await.unwrap().uri.unwrap();
    let stored = arweave.get(uri.id()).unwrap();
    assert_eq!(
        annotations::find(&stored.annotations, annotations::DATA_TYPE),
        Some(annotations::DATA_TYPE_FEEDBACK)
    );
}

#[tokio::test]
async fn out_of_range_score_is_rejected_before_any_write() {
    let ipfs = Arc::new(MemoryBackend::new(Scheme::Ipfs));
    let registry = Arc::new(MemoryReputationRegistry::new());
    let feedback_writer = FeedbackWriter::new(
        PriorityWriter::new(vec![ipfs.clone() as Arc<dyn StorageBackend>]),
        registry.clone(),
        ChainContext::new(1),
    );

    let mut record = feedback();
    record.score = 101;
    assert!(feedback_writer.give(&record).await.is_err());
    assert!(ipfs.is_empty());
    assert!(registry.submissions().is_empty());
}
