//! Agent metadata model.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::RecordError;

/// On-chain identity of an agent: the registry's chain and the token id
/// minted for it. Rendered as `<chainId>:<tokenId>`.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AgentId {
    pub chain_id: u64,
    pub token_id: u64,
}

impl AgentId {
    pub fn new(chain_id: u64, token_id: u64) -> Self {
        Self { chain_id, token_id }
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chain_id, self.token_id)
    }
}

impl FromStr for AgentId {
    type Err = RecordError;

    /// Accepts `<chainId>:<tokenId>` and the CAIP-style
    /// `eip155:<chainId>:<tokenId>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || RecordError::InvalidAgentId(s.to_owned());
        let trimmed = s.trim();
        let trimmed = trimmed.strip_prefix("eip155:").unwrap_or(trimmed);
        let (chain, token) = trimmed.split_once(':').ok_or_else(invalid)?;
        Ok(Self {
            chain_id: chain.parse().map_err(|_| invalid())?,
            token_id: token.parse().map_err(|_| invalid())?,
        })
    }
}

impl TryFrom<String> for AgentId {
    type Error = RecordError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AgentId> for String {
    fn from(value: AgentId) -> Self {
        value.to_string()
    }
}

/// Protocol an endpoint speaks.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EndpointType {
    Mcp,
    A2a,
    Ens,
    Did,
    Oasf,
    Wallet,
    Other(String),
}

impl EndpointType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Mcp => "MCP",
            Self::A2a => "A2A",
            Self::Ens => "ENS",
            Self::Did => "DID",
            Self::Oasf => "OASF",
            Self::Wallet => "agentWallet",
            Self::Other(name) => name,
        }
    }
}

impl From<&str> for EndpointType {
    fn from(value: &str) -> Self {
        match value {
            "MCP" => Self::Mcp,
            "A2A" => Self::A2a,
            "ENS" => Self::Ens,
            "DID" => Self::Did,
            "OASF" => Self::Oasf,
            "agentWallet" => Self::Wallet,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl From<String> for EndpointType {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<EndpointType> for String {
    fn from(value: EndpointType) -> Self {
        value.as_str().to_owned()
    }
}

impl fmt::Display for EndpointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A network endpoint advertised by an agent.
///
/// Several endpoints of the same type may coexist; they are kept in
/// insertion order and never deduplicated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    #[serde(rename = "type")]
    pub kind: EndpointType,
    pub value: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, serde_json::Value>,
}

impl Endpoint {
    pub fn new(kind: impl Into<EndpointType>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
            meta: BTreeMap::new(),
        }
    }

    pub fn with_meta(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TrustModel {
    Reputation,
    CryptoEconomic,
    TeeAttestation,
    Other(String),
}

impl TrustModel {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Reputation => "reputation",
            Self::CryptoEconomic => "crypto-economic",
            Self::TeeAttestation => "tee-attestation",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for TrustModel {
    fn from(value: String) -> Self {
        match value.as_str() {
            "reputation" => Self::Reputation,
            "crypto-economic" => Self::CryptoEconomic,
            "tee-attestation" => Self::TeeAttestation,
            _ => Self::Other(value),
        }
    }
}

impl From<TrustModel> for String {
    fn from(value: TrustModel) -> Self {
        value.as_str().to_owned()
    }
}

/// Wallet an agent receives payments on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletRef {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
}

/// The chain and identity registry a document is written for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainContext {
    pub chain_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_address: Option<String>,
}

impl ChainContext {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            registry_address: None,
        }
    }

    pub fn with_registry(mut self, address: impl Into<String>) -> Self {
        self.registry_address = Some(address.into());
        self
    }
}

/// Everything an agent publishes about itself.
///
/// The record is plain data; exclusive ownership lies with the entity
/// wrapper that created it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<AgentId>,
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
    #[serde(default)]
    pub trust_models: Vec<TrustModel>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub x402_support: bool,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Unix seconds of the last local modification.
    #[serde(default)]
    pub updated_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet: Option<WalletRef>,
}

impl MetadataRecord {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn has_endpoint(&self, kind: &EndpointType) -> bool {
        self.endpoints.iter().any(|ep| &ep.kind == kind)
    }

    pub fn endpoints_of<'a>(
        &'a self,
        kind: &'a EndpointType,
    ) -> impl Iterator<Item = &'a Endpoint> {
        self.endpoints.iter().filter(move |ep| &ep.kind == kind)
    }

    pub fn has_wallet(&self) -> bool {
        self.wallet.is_some() || self.has_endpoint(&EndpointType::Wallet)
    }

    /// Required fields are present.
    pub fn validate(&self) -> Result<(), RecordError> {
        if self.name.trim().is_empty() {
            return Err(RecordError::EmptyName);
        }
        if self.description.trim().is_empty() {
            return Err(RecordError::EmptyDescription);
        }
        Ok(())
    }

    /// Like [`validate`](Self::validate), and additionally rejects a wallet
    /// whose chain cannot be determined from the record or `chain`, so the
    /// formatter never has to fall back to a default chain for a write.
    pub fn validate_for_write(&self, chain: Option<&ChainContext>) -> Result<(), RecordError> {
        self.validate()?;
        if let Some(wallet) = &self.wallet
            && wallet.chain_id.is_none()
            && chain.is_none()
        {
            return Err(RecordError::WalletChainUnknown(wallet.address.clone()));
        }
        Ok(())
    }

    /// Stamps `updated_at` with the current time.
    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().timestamp().max(0) as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_id_parses_both_forms() {
        assert_eq!(
            "11155111:42".parse::<AgentId>().unwrap(),
            AgentId::new(11155111, 42)
        );
        assert_eq!("eip155:1:7".parse::<AgentId>().unwrap(), AgentId::new(1, 7));
        assert!("42".parse::<AgentId>().is_err());
        assert!("a:b".parse::<AgentId>().is_err());
    }

    #[test]
    fn endpoint_types_keep_wire_names() {
        for name in ["MCP", "A2A", "ENS", "DID", "OASF", "agentWallet", "custom"] {
            assert_eq!(EndpointType::from(name).as_str(), name);
        }
        assert_eq!(
            EndpointType::from("custom"),
            EndpointType::Other("custom".into())
        );
    }

    #[test]
    fn record_json_uses_camel_case() {
        let json = serde_json::json!({
            "agentId": "1:5",
            "name": "X",
            "description": "Y",
            "endpoints": [{"type": "MCP", "value": "https://mcp.example"}],
            "trustModels": ["reputation"],
            "x402Support": true,
            "wallet": {"address": "0xabc", "chainId": 8453}
        });
        let record: MetadataRecord = serde_json::from_value(json).unwrap();
        assert_eq!(record.agent_id, Some(AgentId::new(1, 5)));
        assert_eq!(record.endpoints[0].kind, EndpointType::Mcp);
        assert_eq!(record.trust_models, vec![TrustModel::Reputation]);
        assert!(record.x402_support);
        assert!(!record.active);
        assert_eq!(record.wallet.as_ref().unwrap().chain_id, Some(8453));
    }

    #[test]
    fn validate_requires_name_and_description() {
        assert_eq!(
            MetadataRecord::new("", "d").validate(),
            Err(RecordError::EmptyName)
        );
        assert_eq!(
            MetadataRecord::new("n", "  ").validate(),
            Err(RecordError::EmptyDescription)
        );
        assert!(MetadataRecord::new("n", "d").validate().is_ok());
    }

    #[test]
    fn wallet_without_chain_is_rejected_for_writes() {
        let mut record = MetadataRecord::new("n", "d");
        record.wallet = Some(WalletRef {
            address: "0xabc".into(),
            chain_id: None,
        });
        assert_eq!(
            record.validate_for_write(None),
            Err(RecordError::WalletChainUnknown("0xabc".into()))
        );
        let mainnet = ChainContext::new(1);
        assert!(record.validate_for_write(Some(&mainnet)).is_ok());
    }

    #[test]
    fn same_type_endpoints_are_not_deduplicated() {
        let mut record = MetadataRecord::new("n", "d");
        record.endpoints.push(Endpoint::new("MCP", "https://a"));
        record.endpoints.push(Endpoint::new("MCP", "https://a"));
        assert_eq!(record.endpoints_of(&EndpointType::Mcp).count(), 2);
    }
}
