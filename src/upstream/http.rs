//! reqwest-backed collaborator client.
//!
//! Talks to the registry indexer API rooted at `upstream.base_url`:
//!
//! | Capability | Request |
//! |---|---|
//! | discovery search | `POST agents/search` |
//! | agent record | `GET agents/{chainId}/{agentId}` |
//! | feedback | `GET agents/{chainId}/{agentId}/feedback` |
//! | reputation | `GET agents/{chainId}/{agentId}/reputation` |
//! | refresh | `POST agents/refresh` |
//! | transfer | `POST agents/transfer` |
//! | update | `POST agents/update` |
//! | delete | `POST agents/delete` |
//! | create (EOA owner) | `POST agents/create` |
//! | reverse record | `GET names/reverse/{chainId}/{account}` |
//! | name info | `GET names/{chainId}/{name}` |
//! | availability | `GET names/{chainId}/{name}/availability` |
//! | account owner | `GET accounts/{chainId}/{account}/owner` |
//!
//! HTTP 404 maps to [`UpstreamError::NotFound`], or to `None` for lookups
//! whose absence is an ordinary answer.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;
use url::Url;

use super::{
    AccountDirectory, AgentRecord, AgentRegistry, AgentUpdate, CreateAgentRequest,
    CreateAgentResult, FeedbackEntry, FeedbackQuery, NameInfo, NameService, ReputationSummary,
    SearchPage, SearchRequest, TxOutcome, UpstreamError,
};
use crate::config::UpstreamConfig;
use crate::did::{Address, AgentId, ChainId};
use crate::numeric::RawNumeric;

/// HTTP client for the registry indexer API.
pub struct HttpUpstream {
    client: reqwest::Client,
    base_url: Url,
    api_key: Option<SecretString>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReverseRecord {
    #[serde(default)]
    agent_id: Option<RawNumeric>,
}

#[derive(Deserialize)]
struct OwnerRecord {
    #[serde(default)]
    owner: Option<String>,
}

#[derive(Deserialize)]
struct Availability {
    #[serde(default)]
    available: Option<bool>,
}

impl HttpUpstream {
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("arn-gateway/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// Base URL with `segments` appended, each percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.api_key {
            Some(key) => builder.bearer_auth(key.expose_secret()),
            None => builder,
        }
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        what: &str,
    ) -> Result<T, UpstreamError> {
        let response = builder.send().await?;
        let status = response.status();
        debug!(%status, what, "Upstream response");

        if status == StatusCode::NOT_FOUND {
            return Err(UpstreamError::NotFound(what.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| UpstreamError::Decode(format!("{what}: {e}")))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        what: &str,
    ) -> Result<T, UpstreamError> {
        let url = self.endpoint(segments);
        self.send_json(self.request(Method::GET, url), what).await
    }
}

/// Treat a 404 as an absent value.
fn optional<T>(result: Result<T, UpstreamError>) -> Result<Option<T>, UpstreamError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(UpstreamError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

#[async_trait]
impl NameService for HttpUpstream {
    async fn reverse_lookup_agent(
        &self,
        account: &Address,
        chain_id: ChainId,
    ) -> Result<Option<AgentId>, UpstreamError> {
        let chain = chain_id.to_string();
        let account = account.canonical();
        let record: Option<ReverseRecord> = optional(
            self.get_json(&["names", "reverse", &chain, &account], "reverse record")
                .await,
        )?;
        Ok(record
            .and_then(|r| r.agent_id)
            .and_then(|raw| AgentId::from_raw(&raw)))
    }

    async fn name_info(&self, name: &str, chain_id: ChainId) -> Result<NameInfo, UpstreamError> {
        let chain = chain_id.to_string();
        self.get_json(&["names", &chain, name], "name").await
    }

    async fn is_name_available(
        &self,
        name: &str,
        chain_id: ChainId,
    ) -> Result<Option<bool>, UpstreamError> {
        let chain = chain_id.to_string();
        let availability: Availability = self
            .get_json(&["names", &chain, name, "availability"], "name availability")
            .await?;
        Ok(availability.available)
    }
}

#[async_trait]
impl AgentRegistry for HttpUpstream {
    async fn search_agents(&self, request: &SearchRequest) -> Result<SearchPage, UpstreamError> {
        let url = self.endpoint(&["agents", "search"]);
        self.send_json(self.request(Method::POST, url).json(request), "agent search")
            .await
    }

    async fn agent_record(
        &self,
        agent_id: &AgentId,
        chain_id: ChainId,
    ) -> Result<AgentRecord, UpstreamError> {
        let (chain, agent) = (chain_id.to_string(), agent_id.to_string());
        let payload = self.get_json(&["agents", &chain, &agent], "agent").await?;
        AgentRecord::from_payload(*agent_id, chain_id, payload)
            .map_err(|e| UpstreamError::Decode(format!("agent: {e}")))
    }

    async fn agent_feedback(
        &self,
        agent_id: &AgentId,
        chain_id: ChainId,
        query: &FeedbackQuery,
    ) -> Result<Vec<FeedbackEntry>, UpstreamError> {
        let (chain, agent) = (chain_id.to_string(), agent_id.to_string());
        let url = self.endpoint(&["agents", &chain, &agent, "feedback"]);
        let builder = self.request(Method::GET, url).query(query);
        self.send_json(builder, "agent feedback").await
    }

    async fn reputation_summary(
        &self,
        agent_id: &AgentId,
        chain_id: ChainId,
    ) -> Result<ReputationSummary, UpstreamError> {
        let (chain, agent) = (chain_id.to_string(), agent_id.to_string());
        self.get_json(&["agents", &chain, &agent, "reputation"], "reputation summary")
            .await
    }

    async fn refresh_agent(&self, agent_did: &str) -> Result<serde_json::Value, UpstreamError> {
        let url = self.endpoint(&["agents", "refresh"]);
        let body = json!({ "did": agent_did });
        self.send_json(self.request(Method::POST, url).json(&body), "agent refresh")
            .await
    }

    async fn transfer_agent(
        &self,
        agent_did: &str,
        to_did: &str,
    ) -> Result<TxOutcome, UpstreamError> {
        let url = self.endpoint(&["agents", "transfer"]);
        let body = json!({ "did": agent_did, "to": to_did });
        self.send_json(self.request(Method::POST, url).json(&body), "agent transfer")
            .await
    }

    async fn update_agent(
        &self,
        agent_did: &str,
        chain_id: ChainId,
        update: &AgentUpdate,
    ) -> Result<TxOutcome, UpstreamError> {
        let url = self.endpoint(&["agents", "update"]);
        let body = json!({
            "did": agent_did,
            "chainId": chain_id,
            "tokenURI": update.token_uri,
            "metadata": update.metadata,
        });
        self.send_json(self.request(Method::POST, url).json(&body), "agent update")
            .await
    }

    async fn delete_agent(&self, agent_did: &str) -> Result<TxOutcome, UpstreamError> {
        let url = self.endpoint(&["agents", "delete"]);
        let body = json!({ "did": agent_did });
        self.send_json(self.request(Method::POST, url).json(&body), "agent delete")
            .await
    }

    async fn create_agent(
        &self,
        request: &CreateAgentRequest,
    ) -> Result<CreateAgentResult, UpstreamError> {
        let url = self.endpoint(&["agents", "create"]);
        self.send_json(self.request(Method::POST, url).json(request), "agent create")
            .await
    }
}

#[async_trait]
impl AccountDirectory for HttpUpstream {
    async fn account_owner(
        &self,
        account: &Address,
        chain_id: ChainId,
    ) -> Result<Option<Address>, UpstreamError> {
        let chain = chain_id.to_string();
        let account = account.canonical();
        let record: Option<OwnerRecord> = optional(
            self.get_json(&["accounts", &chain, &account, "owner"], "account owner")
                .await,
        )?;
        record
            .and_then(|r| r.owner)
            .map(|owner| {
                Address::parse(&owner)
                    .map_err(|e| UpstreamError::Decode(format!("account owner: {e}")))
            })
            .transpose()
    }
}
