//! Contract tests for storage backends.
//!
//! Any type that can both write and read content can be run through
//! [`BackendTests`] to check it honors the `StorageBackend` and
//! `ContentResolver` contracts.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! agentdoc_core = { workspace = true, features = ["testutil"] }
//! ```
//!
//! ```ignore
//! use agentdoc_core::testutil::BackendTests;
//!
//! #[tokio::test]
//! async fn test_my_backend() {
//!     let backend = MyBackend::new(...);
//!     BackendTests::new(&backend).run_all().await.unwrap();
//! }
//! ```

use bytes::Bytes;

use crate::{
    backend::{ContentResolver, StorageBackend},
    document::format_document,
    error::{StorageError, StorageResult},
    record::{ChainContext, Endpoint, MetadataRecord},
};

pub struct BackendTests<'a, B> {
    backend: &'a B,
}

impl<'a, B> BackendTests<'a, B>
where
    B: StorageBackend + ContentResolver,
{
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    pub async fn run_all(&self) -> StorageResult<()> {
        self.test_upload_then_resolve().await?;
        self.test_document_roundtrip().await?;
        self.test_prefixed_identifier().await?;
        self.test_blank_identifier_rejected().await?;
        self.test_malformed_json_is_parse_error().await?;
        Ok(())
    }

    /// A sample record with a couple of endpoints.
    pub fn sample_record() -> MetadataRecord {
        let mut record =
            MetadataRecord::new("Contract Agent", "Used by the backend contract suite");
        record
            .endpoints
            .push(Endpoint::new("MCP", "https://mcp.example").with_meta("version", "2025-06-18"));
        record
            .endpoints
            .push(Endpoint::new("A2A", "https://a2a.example/agent.json"));
        record.active = true;
        record
    }

    pub async fn test_upload_then_resolve(&self) -> StorageResult<()> {
        let data = Bytes::from_static(b"{\"hello\":\"world\"}");
        let id = self.backend.upload(data.clone(), &[]).await?;
        let fetched = self.backend.resolve(id.as_str()).await?;
        assert_eq!(fetched, data, "resolved bytes should match uploaded bytes");
        Ok(())
    }

    pub async fn test_document_roundtrip(&self) -> StorageResult<()> {
        let record = Self::sample_record();
        let chain = ChainContext::new(11155111).with_registry("0xregistry");
        let id = self.backend.upload_document(&record, Some(&chain)).await?;

        let loaded = self.backend.resolve_json(id.as_str()).await?;
        let expected = serde_json::to_value(format_document(&record, Some(&chain)))
            .map_err(|source| StorageError::Parse {
                identifier: id.to_string(),
                source,
            })?;
        assert_eq!(
            loaded,
            expected,
            "stored document should equal the formatted one"
        );
        Ok(())
    }

    pub async fn test_prefixed_identifier(&self) -> StorageResult<()> {
        let data = Bytes::from_static(b"prefixed");
        let id = self.backend.upload(data.clone(), &[]).await?;
        let uri = StorageBackend::uri_for(self.backend, id);
        let fetched = self.backend.resolve(&uri.to_string()).await?;
        assert_eq!(
            fetched,
            data,
            "a full storage uri should resolve like a bare id"
        );
        Ok(())
    }

    pub async fn test_blank_identifier_rejected(&self) -> StorageResult<()> {
        let res = self.backend.resolve("   ").await;
        assert!(
            matches!(res, Err(StorageError::InvalidIdentifier(_))),
            "blank identifiers must be rejected, got {res:?}"
        );
        Ok(())
    }

    pub async fn test_malformed_json_is_parse_error(&self) -> StorageResult<()> {
        let id = self
            .backend
            .upload(Bytes::from_static(b"not json {"), &[])
            .await?;
        let res = self.backend.resolve_json(id.as_str()).await;
        assert!(
            matches!(res, Err(StorageError::Parse { .. })),
            "malformed JSON must surface as a parse error, got {res:?}"
        );
        Ok(())
    }
}
