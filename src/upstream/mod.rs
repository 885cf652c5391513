//! Collaborator capabilities consumed by the gateway.
//!
//! Chain reads, discovery search and registry writes all live behind these
//! traits. The gateway only validates input, orders the calls, and shapes
//! the results; [`http::HttpUpstream`] is the production implementation.

pub mod http;
pub mod types;

use async_trait::async_trait;

use crate::did::{Address, AgentId, ChainId};

pub use http::HttpUpstream;
pub use types::{
    AgentRecord, AgentUpdate, CreateAgentOutcome, CreateAgentRequest, CreateAgentResult,
    FeedbackEntry, FeedbackQuery, MetadataEntry, NameInfo, OrderDirection, ReputationSummary,
    SearchPage, SearchRequest, TxOutcome, TxReceipt,
};

/// Failure of a collaborator call.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode upstream response: {0}")]
    Decode(String),
}

impl UpstreamError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Name-service reads.
#[async_trait]
pub trait NameService: Send + Sync {
    /// Agent id recorded in the reverse record for `account`, if any.
    async fn reverse_lookup_agent(
        &self,
        account: &Address,
        chain_id: ChainId,
    ) -> Result<Option<AgentId>, UpstreamError>;

    async fn name_info(&self, name: &str, chain_id: ChainId) -> Result<NameInfo, UpstreamError>;

    /// `None` when availability cannot be determined.
    async fn is_name_available(
        &self,
        name: &str,
        chain_id: ChainId,
    ) -> Result<Option<bool>, UpstreamError>;
}

/// Identity-registry reads, discovery search, and admin writes.
#[async_trait]
pub trait AgentRegistry: Send + Sync {
    async fn search_agents(&self, request: &SearchRequest) -> Result<SearchPage, UpstreamError>;

    async fn agent_record(
        &self,
        agent_id: &AgentId,
        chain_id: ChainId,
    ) -> Result<AgentRecord, UpstreamError>;

    async fn agent_feedback(
        &self,
        agent_id: &AgentId,
        chain_id: ChainId,
        query: &FeedbackQuery,
    ) -> Result<Vec<FeedbackEntry>, UpstreamError>;

    async fn reputation_summary(
        &self,
        agent_id: &AgentId,
        chain_id: ChainId,
    ) -> Result<ReputationSummary, UpstreamError>;

    /// Re-index the agent named by a `did:8004` literal.
    async fn refresh_agent(&self, agent_did: &str) -> Result<serde_json::Value, UpstreamError>;

    /// Transfer the agent token to the account named by a `did:ethr` literal.
    async fn transfer_agent(&self, agent_did: &str, to_did: &str)
    -> Result<TxOutcome, UpstreamError>;

    /// Change the token URI and/or metadata of the agent on `chain_id`.
    async fn update_agent(
        &self,
        agent_did: &str,
        chain_id: ChainId,
        update: &AgentUpdate,
    ) -> Result<TxOutcome, UpstreamError>;

    /// Burn the agent token by transferring it to the zero address.
    async fn delete_agent(&self, agent_did: &str) -> Result<TxOutcome, UpstreamError>;

    async fn create_agent(
        &self,
        request: &CreateAgentRequest,
    ) -> Result<CreateAgentResult, UpstreamError>;
}

/// Account ownership reads.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// Owner of a (possibly smart-contract) account, if known.
    async fn account_owner(
        &self,
        account: &Address,
        chain_id: ChainId,
    ) -> Result<Option<Address>, UpstreamError>;
}
