use agentdoc_core::{
    Annotation, ContentId, ContentResolver, GatewayFailure, Scheme, StorageBackend, StorageError,
    StorageResult,
};
use base64::Engine;
use bytes::Bytes;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// What an upload left behind.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub payload: Bytes,
    pub annotations: Vec<Annotation>,
}

/// Process-local backend posing as one storage protocol.
///
/// Identifiers mimic the real network: posing as IPFS the id is derived
/// from the content alone, posing as Arweave every upload gets a fresh id.
#[derive(Debug)]
pub struct MemoryBackend {
    scheme: Scheme,
    annotations_supported: bool,
    objects: DashMap<ContentId, StoredObject>,
    uploads: AtomicU64,
}

impl MemoryBackend {
    /// Creates an empty backend. Annotations are kept when posing as
    /// Arweave, like the real adapters.
    pub fn new(scheme: Scheme) -> Self {
        Self {
            scheme,
            annotations_supported: scheme == Scheme::Arweave,
            objects: DashMap::new(),
            uploads: AtomicU64::new(0),
        }
    }

    pub fn with_annotations(mut self, supported: bool) -> Self {
        self.annotations_supported = supported;
        self
    }

    pub fn get(&self, id: &ContentId) -> Option<StoredObject> {
        self.objects.get(id).map(|entry| entry.value().clone())
    }

    /// Number of uploads accepted so far, including duplicates.
    pub fn upload_count(&self) -> u64 {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    fn derive_id(&self, payload: &[u8], nonce: u64) -> StorageResult<ContentId> {
        let id = match self.scheme {
            Scheme::Ipfs => blake3::hash(payload).to_hex().to_string(),
            Scheme::Arweave => {
                let mut hasher = blake3::Hasher::new();
                hasher.update(&nonce.to_le_bytes());
                hasher.update(payload);
                base64::engine::general_purpose::URL_SAFE_NO_PAD
                    .encode(hasher.finalize().as_bytes())
            }
        };
        ContentId::new(id)
    }
}

#[async_trait::async_trait]
impl StorageBackend for MemoryBackend {
    fn scheme(&self) -> Scheme {
        self.scheme
    }

    fn name(&self) -> &'static str {
        "memory"
    }

    fn supports_annotations(&self) -> bool {
        self.annotations_supported
    }

    /// Stores the payload, keeping annotations only when supported.
    async fn upload(&self, payload: Bytes, annotations: &[Annotation]) -> StorageResult<ContentId> {
        let nonce = self.uploads.fetch_add(1, Ordering::SeqCst);
        let id = self.derive_id(&payload, nonce)?;
        let annotations = if self.annotations_supported {
            annotations.to_vec()
        } else {
            Vec::new()
        };
        self.objects.insert(
            id.clone(),
            StoredObject {
                payload,
                annotations,
            },
        );
        Ok(id)
    }
}

#[async_trait::async_trait]
impl ContentResolver for MemoryBackend {
    fn scheme(&self) -> Scheme {
        self.scheme
    }

    async fn resolve(&self, identifier: &str) -> StorageResult<Bytes> {
        let id = self.scheme.normalize_identifier(identifier)?;
        match self.objects.get(&id) {
            Some(entry) => Ok(entry.payload.clone()),
            None => Err(StorageError::Resolution {
                identifier: id.to_string(),
                failures: vec![GatewayFailure {
                    gateway: "memory".to_owned(),
                    reason: "not found".to_owned(),
                }],
            }),
        }
    }
}
