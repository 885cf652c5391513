//! Account → agent resolution.
//!
//! Strategies are tried strictly in order, never concurrently:
//!
//! 1. Name-service reverse record for the account. Absence is common, so
//!    any failure here is logged and treated as "no match".
//! 2. Discovery search for the account literal, first result only. Only
//!    runs when step 1 is inconclusive since search is the expensive call.
//!    Failures are likewise logged and treated as "no match".
//! 3. The full agent record for whichever agent id was found. This call is
//!    required: its failure is the caller's failure.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::did::{Address, AgentId, ChainId, EthrIdentifier};
use crate::numeric::RawNumeric;
use crate::upstream::{AgentRecord, AgentRegistry, NameService, SearchRequest, UpstreamError};

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// Neither strategy produced an agent id. Carries the caller's inputs
    /// as given.
    #[error("no agent found for account {} on chain {chain_id}", account.as_provided())]
    NotFound { account: Address, chain_id: ChainId },

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

/// Key fields pulled out of a discovery search hit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct Candidate {
    agent_id: Option<AgentId>,
    chain_id: Option<ChainId>,
}

impl Candidate {
    /// Read a search hit. The agent id may sit under `data.agentId` or at
    /// the top level (`data` wins when it has the key at all) and may be a
    /// number or a decimal string. Only `data.chainId` is consulted for the
    /// chain.
    fn from_hit(hit: &Value) -> Option<Self> {
        let object = hit.as_object()?;
        let data = object.get("data").and_then(Value::as_object);

        let raw_agent_id = match data.and_then(|d| d.get("agentId")) {
            Some(value) => Some(value),
            None => object.get("agentId"),
        };
        let agent_id = raw_agent_id
            .and_then(RawNumeric::from_json)
            .and_then(|raw| AgentId::from_raw(&raw));

        let chain_id = data
            .and_then(|d| d.get("chainId"))
            .and_then(Value::as_u64)
            .map(ChainId::new);

        Some(Self { agent_id, chain_id })
    }
}

/// Resolves accounts to agent records through the configured collaborators.
#[derive(Clone)]
pub struct AgentResolver {
    names: Arc<dyn NameService>,
    registry: Arc<dyn AgentRegistry>,
    default_chain_id: ChainId,
}

impl AgentResolver {
    pub fn new(
        names: Arc<dyn NameService>,
        registry: Arc<dyn AgentRegistry>,
        default_chain_id: ChainId,
    ) -> Self {
        Self {
            names,
            registry,
            default_chain_id,
        }
    }

    pub async fn resolve_agent_by_account(
        &self,
        identifier: &EthrIdentifier,
    ) -> Result<AgentRecord, ResolveError> {
        let account = &identifier.account;
        let mut chain_id = identifier.chain_id;

        let mut agent_id = self.reverse_lookup(account, chain_id).await;

        if agent_id.is_none()
            && let Some(candidate) = self.discover(account).await
        {
            agent_id = candidate.agent_id;
            if !chain_id.is_resolved()
                && let Some(candidate_chain) = candidate.chain_id
            {
                chain_id = candidate_chain;
            }
        }

        let Some(agent_id) = agent_id else {
            return Err(ResolveError::NotFound {
                account: account.clone(),
                chain_id: identifier.chain_id,
            });
        };

        let effective_chain_id = chain_id.or(self.default_chain_id);
        debug!(
            account = %account,
            %agent_id,
            chain_id = %effective_chain_id,
            "Resolved account to agent"
        );
        Ok(self
            .registry
            .agent_record(&agent_id, effective_chain_id)
            .await?)
    }

    async fn reverse_lookup(&self, account: &Address, chain_id: ChainId) -> Option<AgentId> {
        match self.names.reverse_lookup_agent(account, chain_id).await {
            Ok(found) => found,
            Err(error) => {
                warn!(account = %account, %chain_id, %error, "Reverse lookup by account failed");
                None
            }
        }
    }

    async fn discover(&self, account: &Address) -> Option<Candidate> {
        let request = SearchRequest {
            query: Some(account.as_provided().to_string()),
            page: Some(1),
            page_size: 1,
            ..Default::default()
        };
        match self.registry.search_agents(&request).await {
            Ok(page) => page.agents.first().and_then(Candidate::from_hit),
            Err(error) => {
                warn!(account = %account, %error, "Discovery search by account failed");
                None
            }
        }
    }
}
