//! Canonical storage document for agent registrations.
//!
//! The document produced here is identical no matter which backend ends up
//! storing it, because indexers parse documents from every backend with one
//! parser.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::record::{AgentId, ChainContext, Endpoint, EndpointType, MetadataRecord, WalletRef};

pub const REGISTRATION_TYPE: &str = "https://eips.ethereum.org/EIPS/eip-8004#registration-v1";

/// Chain id used for a wallet endpoint when neither the wallet nor the
/// chain context names one. Write paths reject such records up front
/// (see [`MetadataRecord::validate_for_write`]).
pub const FALLBACK_WALLET_CHAIN_ID: u64 = 1;

/// Registry reference written when the registry address is not known yet.
pub const UNRESOLVED_REGISTRY: &str = "eip155:1:{identityRegistry}";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationDocument {
    #[serde(rename = "type")]
    pub doc_type: String,
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub endpoints: Vec<DocumentEndpoint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub registrations: Vec<Registration>,
    #[serde(
        default,
        rename = "supportedTrusts",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub supported_trusts: Vec<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default, rename = "x402support")]
    pub x402_support: bool,
}

/// `{name, endpoint, ...meta}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentEndpoint {
    pub name: String,
    pub endpoint: String,
    #[serde(flatten)]
    pub meta: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub agent_id: u64,
    pub agent_registry: String,
}

/// Builds the storage document for `record`.
///
/// Pure and deterministic: equal inputs give byte-identical output.
pub fn format_document(
    record: &MetadataRecord,
    chain: Option<&ChainContext>,
) -> RegistrationDocument {
    let mut endpoints: Vec<DocumentEndpoint> =
        record.endpoints.iter().map(document_endpoint).collect();

    if let Some(wallet) = &record.wallet {
        endpoints.push(DocumentEndpoint {
            name: EndpointType::Wallet.as_str().to_owned(),
            endpoint: wallet_caip10(wallet, chain),
            meta: serde_json::Map::new(),
        });
    }

    let registrations = record
        .agent_id
        .map(|agent_id| {
            vec![Registration {
                agent_id: agent_id.token_id,
                agent_registry: registry_reference(chain),
            }]
        })
        .unwrap_or_default();

    RegistrationDocument {
        doc_type: REGISTRATION_TYPE.to_owned(),
        name: record.name.clone(),
        description: record.description.clone(),
        image: record.image.clone().filter(|image| !image.is_empty()),
        endpoints,
        registrations,
        supported_trusts: record
            .trust_models
            .iter()
            .map(|t| t.as_str().to_owned())
            .collect(),
        active: record.active,
        x402_support: record.x402_support,
    }
}

fn document_endpoint(ep: &Endpoint) -> DocumentEndpoint {
    // `name` and `endpoint` are reserved by the document shape.
    let meta = ep
        .meta
        .iter()
        .filter(|(key, _)| key.as_str() != "name" && key.as_str() != "endpoint")
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    DocumentEndpoint {
        name: ep.kind.as_str().to_owned(),
        endpoint: ep.value.clone(),
        meta,
    }
}

fn wallet_caip10(wallet: &WalletRef, chain: Option<&ChainContext>) -> String {
    let chain_id = match (wallet.chain_id, chain) {
        (Some(id), _) => id,
        (None, Some(chain)) => chain.chain_id,
        (None, None) => {
            tracing::warn!(
                "wallet {} has no chain id and no chain context; using chain {}",
                wallet.address,
                FALLBACK_WALLET_CHAIN_ID
            );
            FALLBACK_WALLET_CHAIN_ID
        }
    };
    format!("eip155:{chain_id}:{}", wallet.address)
}

fn registry_reference(chain: Option<&ChainContext>) -> String {
    match chain {
        Some(ChainContext {
            chain_id,
            registry_address: Some(address),
        }) => format!("eip155:{chain_id}:{address}"),
        _ => UNRESOLVED_REGISTRY.to_owned(),
    }
}

impl RegistrationDocument {
    pub fn to_json_bytes(&self) -> serde_json::Result<Bytes> {
        serde_json::to_vec(self).map(Bytes::from)
    }

    /// Rebuilds a metadata record from a stored document.
    ///
    /// `agentWallet` endpoints become the wallet reference and the first
    /// registration becomes the agent id on `chain_id`. Fields the document
    /// does not carry (metadata map, timestamps) are left empty.
    pub fn into_record(self, chain_id: u64) -> MetadataRecord {
        let mut wallet = None;
        let mut endpoints = Vec::with_capacity(self.endpoints.len());
        for ep in self.endpoints {
            if ep.name == EndpointType::Wallet.as_str()
                && wallet.is_none()
                && let Some(parsed) = parse_caip10(&ep.endpoint)
            {
                wallet = Some(parsed);
                continue;
            }
            endpoints.push(Endpoint {
                kind: EndpointType::from(ep.name),
                value: ep.endpoint,
                meta: ep.meta.into_iter().collect(),
            });
        }

        MetadataRecord {
            agent_id: self
                .registrations
                .first()
                .map(|r| AgentId::new(chain_id, r.agent_id)),
            name: self.name,
            description: self.description,
            image: self.image,
            endpoints,
            trust_models: self.supported_trusts.into_iter().map(Into::into).collect(),
            active: self.active,
            x402_support: self.x402_support,
            wallet,
            ..Default::default()
        }
    }
}

fn parse_caip10(value: &str) -> Option<WalletRef> {
    let mut parts = value.splitn(3, ':');
    if parts.next()? != "eip155" {
        return None;
    }
    let chain_id = parts.next()?.parse().ok()?;
    let address = parts.next()?;
    Some(WalletRef {
        address: address.to_owned(),
        chain_id: Some(chain_id),
    })
}
