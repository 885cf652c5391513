//! In-memory collaborators for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use arn_gateway::api::AppState;
use arn_gateway::did::{Address, AgentId, ChainId, IdentifierParser};
use arn_gateway::upstream::{
    AccountDirectory, AgentRecord, AgentRegistry, AgentUpdate, CreateAgentRequest,
    CreateAgentResult, FeedbackEntry, FeedbackQuery, NameInfo, NameService, ReputationSummary,
    SearchPage, SearchRequest, TxOutcome, UpstreamError,
};
use async_trait::async_trait;
use serde_json::{Map, Value, json};

pub const SEPOLIA: u64 = 11_155_111;
pub const ACCOUNT: &str = "0x52908400098527886E0F7030069857D2E4169EE7";

fn unavailable(what: &str) -> UpstreamError {
    UpstreamError::Status {
        status: 503,
        body: format!("{what} unavailable"),
    }
}

/// Scriptable stand-in for every collaborator. Each call is recorded by
/// name in `calls`.
#[derive(Default)]
pub struct FakeUpstream {
    pub reverse_agent: Option<u64>,
    pub reverse_fails: bool,

    pub search_hits: Vec<Value>,
    pub search_total: Option<u64>,
    pub search_fails: bool,

    /// Known records keyed by (agent id, chain id).
    pub records: HashMap<(u64, u64), Value>,

    pub feedback: Vec<Value>,
    pub feedback_fails: bool,
    pub summary: Option<ReputationSummary>,

    pub refresh_result: Value,
    /// Outcome of transfer, update and delete; `None` fails the write.
    pub transfer: Option<TxOutcome>,
    pub create_result: Option<CreateAgentResult>,

    /// Owners keyed by lowercase account.
    pub owners: HashMap<String, String>,
    pub owner_fails: bool,

    pub names: HashMap<String, Value>,
    pub availability: Option<bool>,

    pub calls: Mutex<Vec<String>>,
    pub searches: Mutex<Vec<SearchRequest>>,
    pub feedback_queries: Mutex<Vec<FeedbackQuery>>,
    pub record_lookups: Mutex<Vec<(String, ChainId)>>,
    pub refreshed: Mutex<Vec<String>>,
    pub transfers: Mutex<Vec<(String, String)>>,
    pub updates: Mutex<Vec<(String, ChainId, AgentUpdate)>>,
    pub deletes: Mutex<Vec<String>>,
    pub creates: Mutex<Vec<CreateAgentRequest>>,
}

impl FakeUpstream {
    pub fn with_record(mut self, agent_id: u64, chain_id: u64, details: Value) -> Self {
        self.records.insert((agent_id, chain_id), details);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }
}

#[async_trait]
impl NameService for FakeUpstream {
    async fn reverse_lookup_agent(
        &self,
        _account: &Address,
        _chain_id: ChainId,
    ) -> Result<Option<AgentId>, UpstreamError> {
        self.record("reverse_lookup_agent");
        if self.reverse_fails {
            return Err(unavailable("reverse resolver"));
        }
        Ok(self.reverse_agent.map(AgentId::from))
    }

    async fn name_info(&self, name: &str, _chain_id: ChainId) -> Result<NameInfo, UpstreamError> {
        self.record("name_info");
        self.names
            .get(name)
            .cloned()
            .map(NameInfo)
            .ok_or_else(|| UpstreamError::NotFound(format!("name {name}")))
    }

    async fn is_name_available(
        &self,
        _name: &str,
        _chain_id: ChainId,
    ) -> Result<Option<bool>, UpstreamError> {
        self.record("is_name_available");
        Ok(self.availability)
    }
}

#[async_trait]
impl AgentRegistry for FakeUpstream {
    async fn search_agents(&self, request: &SearchRequest) -> Result<SearchPage, UpstreamError> {
        self.record("search_agents");
        self.searches.lock().unwrap().push(request.clone());
        if self.search_fails {
            return Err(unavailable("discovery"));
        }
        Ok(SearchPage {
            agents: self.search_hits.clone(),
            total: self.search_total,
            ..Default::default()
        })
    }

    async fn agent_record(
        &self,
        agent_id: &AgentId,
        chain_id: ChainId,
    ) -> Result<AgentRecord, UpstreamError> {
        self.record("agent_record");
        self.record_lookups
            .lock()
            .unwrap()
            .push((agent_id.to_string(), chain_id));

        let key = agent_id
            .to_string()
            .parse::<u64>()
            .ok()
            .map(|id| (id, chain_id.get()));
        let details = key
            .and_then(|key| self.records.get(&key))
            .ok_or_else(|| UpstreamError::NotFound(format!("agent {agent_id}")))?;

        let details: Map<String, Value> = details.as_object().cloned().unwrap_or_default();
        Ok(AgentRecord {
            agent_id: *agent_id,
            chain_id,
            details,
        })
    }

    async fn agent_feedback(
        &self,
        _agent_id: &AgentId,
        _chain_id: ChainId,
        query: &FeedbackQuery,
    ) -> Result<Vec<FeedbackEntry>, UpstreamError> {
        self.record("agent_feedback");
        self.feedback_queries.lock().unwrap().push(*query);
        if self.feedback_fails {
            return Err(unavailable("feedback index"));
        }
        Ok(self.feedback.iter().cloned().map(FeedbackEntry).collect())
    }

    async fn reputation_summary(
        &self,
        _agent_id: &AgentId,
        _chain_id: ChainId,
    ) -> Result<ReputationSummary, UpstreamError> {
        self.record("reputation_summary");
        self.summary
            .clone()
            .ok_or_else(|| unavailable("reputation registry"))
    }

    async fn refresh_agent(&self, agent_did: &str) -> Result<Value, UpstreamError> {
        self.record("refresh_agent");
        self.refreshed.lock().unwrap().push(agent_did.to_string());
        Ok(self.refresh_result.clone())
    }

    async fn transfer_agent(&self, agent_did: &str, to_did: &str) -> Result<TxOutcome, UpstreamError> {
        self.record("transfer_agent");
        self.transfers
            .lock()
            .unwrap()
            .push((agent_did.to_string(), to_did.to_string()));
        self.transfer.clone().ok_or_else(|| unavailable("signer"))
    }

    async fn update_agent(
        &self,
        agent_did: &str,
        chain_id: ChainId,
        update: &AgentUpdate,
    ) -> Result<TxOutcome, UpstreamError> {
        self.record("update_agent");
        self.updates
            .lock()
            .unwrap()
            .push((agent_did.to_string(), chain_id, update.clone()));
        self.transfer.clone().ok_or_else(|| unavailable("signer"))
    }

    async fn delete_agent(&self, agent_did: &str) -> Result<TxOutcome, UpstreamError> {
        self.record("delete_agent");
        self.deletes.lock().unwrap().push(agent_did.to_string());
        self.transfer.clone().ok_or_else(|| unavailable("signer"))
    }

    async fn create_agent(
        &self,
        request: &CreateAgentRequest,
    ) -> Result<CreateAgentResult, UpstreamError> {
        self.record("create_agent");
        self.creates.lock().unwrap().push(request.clone());
        self.create_result
            .clone()
            .ok_or_else(|| unavailable("registration service"))
    }
}

#[async_trait]
impl AccountDirectory for FakeUpstream {
    async fn account_owner(
        &self,
        account: &Address,
        _chain_id: ChainId,
    ) -> Result<Option<Address>, UpstreamError> {
        self.record("account_owner");
        if self.owner_fails {
            return Err(unavailable("account directory"));
        }
        self.owners
            .get(&account.canonical())
            .map(|owner| Address::parse(owner))
            .transpose()
            .map_err(|e| UpstreamError::Decode(e.to_string()))
    }
}

pub fn state(upstream: Arc<FakeUpstream>) -> AppState {
    AppState::new(
        IdentifierParser::default(),
        upstream.clone(),
        upstream.clone(),
        upstream,
    )
}

pub fn sample_record(name: &str) -> Value {
    json!({ "name": name, "owner": ACCOUNT.to_lowercase() })
}
