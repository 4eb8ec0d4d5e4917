//! Core agentdoc types and traits.
//!
//! This crate defines what every other agentdoc crate shares:
//!
//! - The agent metadata model (`record::MetadataRecord`, `record::Endpoint`, ...)
//! - The canonical storage document and its formatter (`document`)
//! - Searchable annotations attached to uploads (`annotations`)
//! - Feedback records and their documents (`feedback`)
//! - Storage URIs and content identifiers (`uri`)
//! - Ordered read gateways per protocol (`gateway`)
//! - The narrow backend capabilities (`backend::StorageBackend`,
//!   `backend::ContentResolver`) every storage network adapter implements
//! - The error taxonomy (`error::StorageError`)
//!
//! ## Wire-stable parts
//!
//! The JSON produced by [`document::format_document`] and the annotation
//! names in [`annotations`] are read by external indexers. Changes to them
//! are format changes, independent of which backend stored the bytes.

pub mod annotations;
pub mod backend;
pub mod document;
pub mod error;
pub mod feedback;
pub mod gateway;
pub mod record;
pub mod uri;

// Test utilities (behind feature flag)
#[cfg(feature = "testutil")]
pub mod testutil;

// --- Core Public Surface ---

pub use annotations::{Annotation, generate_annotations};
pub use backend::{ContentResolver, StorageBackend};
pub use document::{RegistrationDocument, format_document};
pub use error::{GatewayFailure, RecordError, StorageError, StorageResult};
pub use feedback::{FeedbackDocument, FeedbackRecord};
pub use gateway::GatewaySet;
pub use record::{
    AgentId, ChainContext, Endpoint, EndpointType, MetadataRecord, TrustModel, WalletRef,
};
pub use uri::{ContentId, Scheme, StorageUri, UriTarget};
