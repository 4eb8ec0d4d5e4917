//! Searchable key/value annotations attached to uploads.
//!
//! Only backends that can tag a write natively (see
//! [`StorageBackend::supports_annotations`](crate::StorageBackend::supports_annotations))
//! receive them. They are regenerated for every write.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::record::{ChainContext, EndpointType, MetadataRecord};

pub const CONTENT_TYPE: &str = "Content-Type";
pub const APP_NAME: &str = "App-Name";
pub const PROTOCOL: &str = "Protocol";
pub const DATA_TYPE: &str = "Data-Type";
pub const CHAIN_ID: &str = "Chain-Id";
pub const AGENT_ID: &str = "Agent-Id";
pub const SCHEMA_VERSION: &str = "Schema-Version";
pub const HAS_MCP: &str = "Has-MCP";
pub const HAS_A2A: &str = "Has-A2A";
pub const HAS_WALLET: &str = "Has-Wallet";
pub const ACTIVE: &str = "Active";
pub const TIMESTAMP: &str = "Timestamp";

pub const PROTOCOL_NAME: &str = "ERC-8004";
pub const SCHEMA_VERSION_VALUE: &str = "1.0";
pub const DATA_TYPE_REGISTRATION: &str = "agent-registration";
pub const DATA_TYPE_FEEDBACK: &str = "agent-feedback";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub name: String,
    pub value: String,
}

impl Annotation {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

pub fn app_name() -> String {
    format!("agentdoc-v{}", env!("CARGO_PKG_VERSION"))
}

/// ISO-8601, UTC, millisecond precision.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Value of the first annotation called `name`.
pub fn find<'a>(annotations: &'a [Annotation], name: &str) -> Option<&'a str> {
    annotations
        .iter()
        .find(|a| a.name == name)
        .map(|a| a.value.as_str())
}

/// The tags every document carries, in wire order, with `Agent-Id` slotted
/// in before the schema version when known.
pub(crate) fn base_annotations(
    data_type: &str,
    chain: &ChainContext,
    agent_id: Option<String>,
) -> Vec<Annotation> {
    let mut tags = vec![
        Annotation::new(CONTENT_TYPE, "application/json"),
        Annotation::new(APP_NAME, app_name()),
        Annotation::new(PROTOCOL, PROTOCOL_NAME),
        Annotation::new(DATA_TYPE, data_type),
        Annotation::new(CHAIN_ID, chain.chain_id.to_string()),
    ];
    if let Some(agent_id) = agent_id {
        tags.push(Annotation::new(AGENT_ID, agent_id));
    }
    tags.push(Annotation::new(SCHEMA_VERSION, SCHEMA_VERSION_VALUE));
    tags
}

/// Annotations for a registration document, stamped with the current time.
pub fn generate_annotations(record: &MetadataRecord, chain: &ChainContext) -> Vec<Annotation> {
    generate_annotations_at(record, chain, Utc::now())
}

/// Same as [`generate_annotations`] with an explicit timestamp.
pub fn generate_annotations_at(
    record: &MetadataRecord,
    chain: &ChainContext,
    at: DateTime<Utc>,
) -> Vec<Annotation> {
    let mut tags = base_annotations(
        DATA_TYPE_REGISTRATION,
        chain,
        record.agent_id.map(|id| id.to_string()),
    );

    tags.push(flag(HAS_MCP, record.has_endpoint(&EndpointType::Mcp)));
    tags.push(flag(HAS_A2A, record.has_endpoint(&EndpointType::A2a)));
    tags.push(flag(HAS_WALLET, record.has_wallet()));
    tags.push(flag(ACTIVE, record.active));
    tags.push(Annotation::new(TIMESTAMP, format_timestamp(at)));
    tags
}

fn flag(name: &str, value: bool) -> Annotation {
    Annotation::new(name, if value { "true" } else { "false" })
}
