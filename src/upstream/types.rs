//! Payloads exchanged with the registry and name-service collaborators.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::did::{AgentId, ChainId};
use crate::numeric::{RawNumeric, normalize};

/// Full agent record. Only the key fields are interpreted; everything
/// else (name, metadata, owner, ...) passes through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRecord {
    pub agent_id: AgentId,
    pub chain_id: ChainId,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordPayload {
    #[serde(default)]
    agent_id: Option<AgentId>,
    #[serde(default)]
    chain_id: Option<ChainId>,
    #[serde(flatten)]
    details: Map<String, Value>,
}

impl AgentRecord {
    /// Decode a record fetched for `(agent_id, chain_id)`. Indexers that key
    /// records by path may leave either field out of the body; the requested
    /// pair stands in for whatever is missing.
    pub fn from_payload(
        agent_id: AgentId,
        chain_id: ChainId,
        payload: Value,
    ) -> Result<Self, serde_json::Error> {
        let payload: RecordPayload = serde_json::from_value(payload)?;
        Ok(Self {
            agent_id: payload.agent_id.unwrap_or(agent_id),
            chain_id: payload.chain_id.unwrap_or(chain_id),
            details: payload.details,
        })
    }
}

/// Sort direction for discovery search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl OrderDirection {
    /// Case-insensitive `ASC` / `DESC`; anything else is `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "ASC" => Some(Self::Asc),
            "DESC" => Some(Self::Desc),
            _ => None,
        }
    }
}

/// Discovery search request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    pub page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_direction: Option<OrderDirection>,
}

/// One page of discovery results. Candidates are kept as raw JSON since
/// different indexers nest the key fields differently.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    #[serde(default)]
    pub agents: Vec<Value>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub total_pages: Option<u32>,
}

/// Feedback listing window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackQuery {
    pub include_revoked: bool,
    pub limit: u32,
    pub offset: u32,
}

impl Default for FeedbackQuery {
    fn default() -> Self {
        Self {
            include_revoked: false,
            limit: 100,
            offset: 0,
        }
    }
}

/// A single feedback entry, passed through as received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeedbackEntry(pub Value);

/// Aggregate reputation figures for an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReputationSummary {
    pub count: RawNumeric,
    pub average_score: f64,
}

/// Name-service record, passed through as received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NameInfo(pub Value);

/// Result of a registry write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxOutcome {
    pub tx_hash: String,
    #[serde(default)]
    pub receipt: Option<TxReceipt>,
}

/// Transaction receipt. Gas figures are chain integers and serialize as
/// canonical decimal strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    #[serde(default)]
    pub gas_used: Option<RawNumeric>,
    #[serde(default)]
    pub cumulative_gas_used: Option<RawNumeric>,
    #[serde(default)]
    pub effective_gas_price: Option<RawNumeric>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// One on-chain metadata entry of an agent token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub key: String,
    pub value: String,
}

/// Fields an agent update may change. An empty `tokenURI` still counts
/// as a change; an empty metadata list does not.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentUpdate {
    #[serde(rename = "tokenURI", default, skip_serializing_if = "Option::is_none")]
    pub token_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Vec<MetadataEntry>>,
}

impl AgentUpdate {
    pub fn is_empty(&self) -> bool {
        self.token_uri.is_none() && self.metadata.as_ref().is_none_or(Vec::is_empty)
    }
}

/// Registration of a new agent owned by an externally owned account.
/// The caller signs; the collaborator only prepares the transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAgentRequest {
    pub agent_name: String,
    pub agent_account: String,
    pub chain_id: ChainId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supported_trust: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoints: Option<Vec<Value>>,
    pub owner_type: &'static str,
    pub execution_mode: &'static str,
}

/// Raw answer to a create request. Which fields are set decides the shape;
/// see [`CreateAgentResult::into_outcome`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAgentResult {
    #[serde(default)]
    pub requires_client_signing: bool,
    #[serde(default)]
    pub transaction: Option<Value>,
    #[serde(rename = "tokenURI", default)]
    pub token_uri: Option<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub agent_id: Option<RawNumeric>,
    #[serde(default)]
    pub tx_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CreateAgentOutcome {
    /// Unsigned registration for the caller to sign and submit.
    ClientSigning {
        transaction: Option<Value>,
        token_uri: Option<String>,
        metadata: Option<Value>,
    },
    /// Registration already mined.
    Registered { agent_id: String, tx_hash: String },
}

impl CreateAgentResult {
    /// `None` when the answer is neither a signing request nor a mined
    /// registration with a usable agent id.
    pub fn into_outcome(self) -> Option<CreateAgentOutcome> {
        if self.requires_client_signing {
            return Some(CreateAgentOutcome::ClientSigning {
                transaction: self.transaction,
                token_uri: self.token_uri,
                metadata: self.metadata,
            });
        }
        let agent_id = normalize(self.agent_id.as_ref()).filter(|id| id != "0")?;
        let tx_hash = self.tx_hash.filter(|hash| !hash.is_empty())?;
        Some(CreateAgentOutcome::Registered { agent_id, tx_hash })
    }
}
