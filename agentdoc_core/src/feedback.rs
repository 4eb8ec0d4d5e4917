//! Feedback left by a reviewer about an agent.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::annotations::{
    self, Annotation, DATA_TYPE_FEEDBACK, TIMESTAMP, base_annotations, format_timestamp,
};
use crate::document::UNRESOLVED_REGISTRY;
use crate::error::RecordError;
use crate::record::{AgentId, ChainContext};

pub const REVIEWER: &str = "Reviewer";
pub const SCORE: &str = "Score";
pub const TAG1: &str = "Tag1";
pub const TAG2: &str = "Tag2";
pub const CAPABILITY: &str = "Capability";
pub const SKILL: &str = "Skill";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRecord {
    pub agent_id: AgentId,
    /// Address of the reviewing client.
    pub reviewer: String,
    /// 0..=100
    pub score: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capability: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl FeedbackRecord {
    pub fn new(agent_id: AgentId, reviewer: impl Into<String>, score: u8) -> Self {
        Self {
            agent_id,
            reviewer: reviewer.into(),
            score,
            tag1: None,
            tag2: None,
            capability: None,
            skill: None,
            text: None,
            context: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    pub fn validate(&self) -> Result<(), RecordError> {
        if self.score > 100 {
            return Err(RecordError::ScoreOutOfRange(self.score));
        }
        if self.reviewer.trim().is_empty() {
            return Err(RecordError::EmptyReviewer);
        }
        Ok(())
    }
}

/// Stored form of a [`FeedbackRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackDocument {
    pub agent_registry: String,
    pub agent_id: u64,
    pub client_address: String,
    pub created_at: String,
    pub score: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capability: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, serde_json::Value>,
}

impl FeedbackDocument {
    pub fn to_json_bytes(&self) -> serde_json::Result<Bytes> {
        serde_json::to_vec(self).map(Bytes::from)
    }
}

pub fn format_feedback(record: &FeedbackRecord, chain: Option<&ChainContext>) -> FeedbackDocument {
    let agent_registry = match chain {
        Some(ChainContext {
            chain_id,
            registry_address: Some(address),
        }) => format!("eip155:{chain_id}:{address}"),
        _ => UNRESOLVED_REGISTRY.to_owned(),
    };
    FeedbackDocument {
        agent_registry,
        agent_id: record.agent_id.token_id,
        client_address: record.reviewer.clone(),
        created_at: format_timestamp(record.created_at),
        score: record.score,
        tag1: record.tag1.clone(),
        tag2: record.tag2.clone(),
        capability: record.capability.clone(),
        skill: record.skill.clone(),
        text: record.text.clone(),
        context: record.context.clone(),
    }
}

pub fn generate_feedback_annotations(
    record: &FeedbackRecord,
    chain: &ChainContext,
) -> Vec<Annotation> {
    generate_feedback_annotations_at(record, chain, Utc::now())
}

pub fn generate_feedback_annotations_at(
    record: &FeedbackRecord,
    chain: &ChainContext,
    at: DateTime<Utc>,
) -> Vec<Annotation> {
    let mut tags = base_annotations(DATA_TYPE_FEEDBACK, chain, Some(record.agent_id.to_string()));

    if !record.reviewer.is_empty() {
        tags.push(Annotation::new(REVIEWER, &record.reviewer));
    }
    tags.push(Annotation::new(SCORE, record.score.to_string()));
    let optional = [
        (TAG1, &record.tag1),
        (TAG2, &record.tag2),
        (CAPABILITY, &record.capability),
        (SKILL, &record.skill),
    ];
    for (name, value) in optional {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            tags.push(Annotation::new(name, value));
        }
    }
    tags.push(Annotation::new(TIMESTAMP, format_timestamp(at)));
    tags
}
