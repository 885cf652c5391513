//! Agent routes.

use std::collections::HashMap;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use super::{ApiError, AppState, identifier_param};
use crate::aggregate::aggregate;
use crate::did::{
    Address, AgentId, ChainId, ETHR_DID_PARAM, REGISTRY_DID_PARAM, RegistryIdentifier,
    build_ethr_did, build_registry_did,
};
use crate::numeric::normalize;
use crate::resolver::ResolveError;
use crate::upstream::{
    AgentRecord, AgentUpdate, CreateAgentOutcome, CreateAgentRequest, FeedbackEntry,
    FeedbackQuery, OrderDirection, ReputationSummary, SearchPage, SearchRequest,
};

const INVALID_REGISTRY_DID: &str = "Invalid 8004 DID";
const INVALID_ETHR_DID: &str = "Invalid ETHR DID";
const SESSION_PACKAGE_FAILURE: &str = "Failed to build session package";
const DEFAULT_PAGE_SIZE: u32 = 10;

/// Decoded `did:8004` literal plus its parsed form.
fn registry_identifier(
    state: &AppState,
    params: &HashMap<String, String>,
) -> Result<(String, RegistryIdentifier), ApiError> {
    let literal = identifier_param(params, REGISTRY_DID_PARAM, INVALID_REGISTRY_DID)?;
    let identifier = state
        .parser
        .parse_registry(&literal)
        .map_err(|e| ApiError::identifier(INVALID_REGISTRY_DID, e))?;
    Ok((literal, identifier))
}

// ---------------------------------------------------------------------------
// by-account
// ---------------------------------------------------------------------------

/// `GET /api/agents/by-account/{did:ethr}`
pub async fn by_account(
    State(state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
) -> Result<Json<AgentRecord>, ApiError> {
    let literal = identifier_param(&params, ETHR_DID_PARAM, INVALID_ETHR_DID)?;
    let identifier = state
        .parser
        .parse_ethr(&literal)
        .map_err(|e| ApiError::identifier(INVALID_ETHR_DID, e))?;

    match state.resolver().resolve_agent_by_account(&identifier).await {
        Ok(record) => Ok(Json(record)),
        Err(ResolveError::NotFound { account, chain_id }) => Err(ApiError::AccountNotFound {
            error: "Agent not found for account",
            account: account.as_provided().to_string(),
            chain_id,
        }),
        Err(ResolveError::Upstream(source)) => Err(ApiError::upstream(
            "Failed to resolve agent by account",
            source,
        )),
    }
}

// ---------------------------------------------------------------------------
// feedback
// ---------------------------------------------------------------------------

/// Raw query string of the feedback route.
#[derive(Debug, Default, Deserialize)]
pub struct FeedbackParams {
    #[serde(rename = "includeRevoked")]
    pub include_revoked: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl FeedbackParams {
    fn to_query(&self) -> Result<FeedbackQuery, ApiError> {
        let defaults = FeedbackQuery::default();
        Ok(FeedbackQuery {
            include_revoked: matches!(self.include_revoked.as_deref(), Some("true" | "1")),
            limit: parse_window("limit", self.limit.as_deref())?.unwrap_or(defaults.limit),
            offset: parse_window("offset", self.offset.as_deref())?.unwrap_or(defaults.offset),
        })
    }
}

fn parse_window(name: &str, raw: Option<&str>) -> Result<Option<u32>, ApiError> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => v.parse().map(Some).map_err(|_| {
            ApiError::InvalidRequest(format!("{name} must be a non-negative integer, got '{v}'"))
        }),
    }
}

/// Reputation summary as sent on the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryPayload {
    pub count: Option<String>,
    pub average_score: f64,
}

impl From<ReputationSummary> for SummaryPayload {
    fn from(summary: ReputationSummary) -> Self {
        Self {
            count: normalize(Some(&summary.count)),
            average_score: summary.average_score,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackResponse {
    pub agent_did: String,
    pub agent_id: AgentId,
    pub chain_id: ChainId,
    pub include_revoked: bool,
    pub feedback: Vec<FeedbackEntry>,
    pub summary: Option<SummaryPayload>,
}

/// `GET /api/agents/{did:8004}/feedback`
///
/// The feedback list is required; the reputation summary is enrichment
/// and comes back `null` if its lookup fails.
pub async fn feedback(
    State(state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
    Query(query): Query<FeedbackParams>,
) -> Result<Json<FeedbackResponse>, ApiError> {
    let (agent_did, identifier) = registry_identifier(&state, &params)?;
    let window = query.to_query()?;
    let registry = state.registry.as_ref();

    let aggregation = aggregate(
        "reputation summary",
        registry.agent_feedback(&identifier.agent_id, identifier.chain_id, &window),
        registry.reputation_summary(&identifier.agent_id, identifier.chain_id),
    )
    .await
    .map_err(|e| ApiError::upstream("Failed to fetch agent feedback", e))?;

    debug!(
        did = %agent_did,
        entries = aggregation.primary().len(),
        summary_failed = aggregation.secondary_failed(),
        "Fetched agent feedback"
    );

    let (feedback, summary) = aggregation.into_parts();
    Ok(Json(FeedbackResponse {
        agent_did,
        agent_id: identifier.agent_id,
        chain_id: identifier.chain_id,
        include_revoked: window.include_revoked,
        feedback,
        summary: summary.map(SummaryPayload::from),
    }))
}

// ---------------------------------------------------------------------------
// refresh / transfer
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct RefreshBody {
    #[serde(rename = "chainId")]
    chain_id: Option<u64>,
}

/// `POST /api/agents/{did:8004}/refresh`
///
/// An optional `{ "chainId": n }` body retargets the refresh; any other
/// body (or none) keeps the DID's own chain.
pub async fn refresh(
    State(state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let (agent_did, identifier) = registry_identifier(&state, &params)?;

    let chain_id = serde_json::from_slice::<RefreshBody>(&body)
        .ok()
        .and_then(|b| b.chain_id)
        .map(ChainId::new)
        .unwrap_or(identifier.chain_id);
    let effective_did = if chain_id == identifier.chain_id {
        agent_did
    } else {
        build_registry_did(chain_id, identifier.agent_id)
    };

    info!(did = %effective_did, "Refreshing agent");
    let result = state
        .registry
        .refresh_agent(&effective_did)
        .await
        .map_err(|e| ApiError::upstream("Failed to refresh agent", e))?;

    Ok(Json(json!({ "success": true, "result": result })))
}

#[derive(Debug, Default, Deserialize)]
struct TransferBody {
    #[serde(default)]
    to: Option<String>,
}

/// `POST /api/agents/{did:8004}/transfer`
pub async fn transfer(
    State(state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let (agent_did, identifier) = registry_identifier(&state, &params)?;

    let body: TransferBody = serde_json::from_slice(&body)
        .map_err(|e| ApiError::InvalidRequest(format!("Invalid JSON body: {e}")))?;
    let to = body
        .to
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            ApiError::InvalidRequest("Missing required field: to (recipient address)".to_string())
        })?;
    let recipient = Address::parse(to).map_err(|_| {
        ApiError::InvalidRequest(
            "Invalid recipient address format. Must be a valid Ethereum address (0x...)"
                .to_string(),
        )
    })?;

    let to_did = build_ethr_did(identifier.chain_id, &recipient);
    info!(did = %agent_did, to = %to_did, "Transferring agent");
    let outcome = state
        .registry
        .transfer_agent(&agent_did, &to_did)
        .await
        .map_err(|e| ApiError::upstream("Failed to transfer agent", e))?;

    Ok(Json(json!({
        "success": true,
        "txHash": outcome.tx_hash,
        "receipt": outcome.receipt,
    })))
}

// ---------------------------------------------------------------------------
// update / delete
// ---------------------------------------------------------------------------

/// `PUT /api/agents/{did:8004}/update`
pub async fn update(
    State(state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let (agent_did, identifier) = registry_identifier(&state, &params)?;

    let update: AgentUpdate = if body.is_empty() {
        AgentUpdate::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::InvalidRequest(format!("Invalid JSON body: {e}")))?
    };
    if update.is_empty() {
        return Err(ApiError::InvalidRequest(
            "At least one update field is required: tokenURI or metadata".to_string(),
        ));
    }

    info!(did = %agent_did, "Updating agent");
    let outcome = state
        .registry
        .update_agent(&agent_did, identifier.chain_id, &update)
        .await
        .map_err(|e| ApiError::upstream("Failed to update agent", e))?;

    Ok(Json(json!({ "success": true, "txHash": outcome.tx_hash })))
}

/// `DELETE /api/agents/{did:8004}/delete`
pub async fn delete(
    State(state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let (agent_did, _) = registry_identifier(&state, &params)?;

    info!(did = %agent_did, "Deleting agent");
    let outcome = state
        .registry
        .delete_agent(&agent_did)
        .await
        .map_err(|e| ApiError::upstream("Failed to delete agent", e))?;

    Ok(Json(json!({ "success": true, "txHash": outcome.tx_hash })))
}

// ---------------------------------------------------------------------------
// create-for-eoa
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateBody {
    agent_name: Option<String>,
    agent_account: Option<String>,
    description: Option<String>,
    image: Option<String>,
    agent_url: Option<String>,
    supported_trust: Option<Vec<String>>,
    endpoints: Option<Vec<Value>>,
    chain_id: Option<Value>,
}

/// Chain from the body as a number or decimal string; absent or zero
/// means the configured default.
fn body_chain_id(raw: Option<&Value>, default: ChainId) -> Result<ChainId, ApiError> {
    let chain = match raw {
        None | Some(Value::Null) => return Ok(default),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(default),
        Some(Value::Number(n)) => n.as_u64().map(ChainId::new),
        Some(Value::String(s)) => ChainId::from_segment(s.trim()),
        Some(_) => None,
    };
    chain.map(|c| c.or(default)).ok_or_else(|| {
        ApiError::InvalidRequest("chainId must be a non-negative integer".to_string())
    })
}

/// `POST /api/agents/create-for-eoa`
///
/// Prepares a registration for an EOA-owned agent. The caller signs and
/// submits the returned transaction unless the collaborator already did.
pub async fn create_for_eoa(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let body: CreateBody = serde_json::from_slice(&body)
        .map_err(|e| ApiError::InvalidRequest(format!("Invalid JSON body: {e}")))?;

    let missing = || {
        ApiError::InvalidRequest(
            "Missing required fields: agentName and agentAccount are required".to_string(),
        )
    };
    let agent_name = body.agent_name.filter(|s| !s.is_empty()).ok_or_else(missing)?;
    let agent_account = body.agent_account.filter(|s| !s.is_empty()).ok_or_else(missing)?;
    Address::parse(&agent_account).map_err(|_| {
        ApiError::InvalidRequest(
            "Invalid agentAccount format. Must be a valid Ethereum address (0x...)".to_string(),
        )
    })?;
    let chain_id = body_chain_id(body.chain_id.as_ref(), state.parser.default_chain_id())?;

    let request = CreateAgentRequest {
        agent_name,
        agent_account,
        chain_id,
        description: body.description,
        image: body.image,
        agent_url: body.agent_url,
        supported_trust: body.supported_trust,
        endpoints: body.endpoints,
        owner_type: "eoa",
        execution_mode: "client",
    };
    info!(name = %request.agent_name, %chain_id, "Creating agent");
    let result = state
        .registry
        .create_agent(&request)
        .await
        .map_err(|e| ApiError::upstream("Failed to create agent", e))?;

    match result.into_outcome() {
        Some(CreateAgentOutcome::ClientSigning {
            transaction,
            token_uri,
            metadata,
        }) => Ok(Json(json!({
            "success": true,
            "requiresClientSigning": true,
            "transaction": transaction,
            "tokenURI": token_uri,
            "metadata": metadata,
        }))),
        Some(CreateAgentOutcome::Registered { agent_id, tx_hash }) => Ok(Json(json!({
            "success": true,
            "agentId": agent_id,
            "txHash": tx_hash,
        }))),
        None => Err(ApiError::internal(
            "Failed to create agent",
            "Unexpected result type from createAgent",
        )),
    }
}

// ---------------------------------------------------------------------------
// session-package
// ---------------------------------------------------------------------------

/// `GET /api/agents/{did:8004}/session-package`
///
/// Serves the configured session-package template with this agent's id
/// and chain stamped in.
pub async fn session_package(
    State(state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let (_, identifier) = registry_identifier(&state, &params)?;

    let path = state.session_package_path.as_deref().ok_or_else(|| {
        ApiError::internal(
            SESSION_PACKAGE_FAILURE,
            "no session package template is configured",
        )
    })?;
    let template = tokio::fs::read(path).await.map_err(|e| {
        ApiError::internal(SESSION_PACKAGE_FAILURE, format!("{}: {e}", path.display()))
    })?;
    let mut package: Map<String, Value> = serde_json::from_slice(&template).map_err(|e| {
        ApiError::internal(
            SESSION_PACKAGE_FAILURE,
            format!("{} is not a JSON object: {e}", path.display()),
        )
    })?;

    package.insert("agentId".to_string(), json!(identifier.agent_id));
    package.insert("chainId".to_string(), json!(identifier.chain_id));
    Ok(Json(Value::Object(package)))
}

// ---------------------------------------------------------------------------
// search
// ---------------------------------------------------------------------------

/// Raw query string of `GET /api/agents/search`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub query: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
    /// JSON-encoded filter object.
    pub params: Option<String>,
    pub order_by: Option<String>,
    pub order_direction: Option<String>,
}

impl SearchParams {
    fn into_request(self) -> SearchRequest {
        SearchRequest {
            query: non_blank(self.query),
            page: self.page.as_deref().and_then(parse_page_number),
            page_size: self
                .page_size
                .as_deref()
                .and_then(parse_page_number)
                .unwrap_or(DEFAULT_PAGE_SIZE),
            params: self
                .params
                .as_deref()
                .and_then(|raw| serde_json::from_str::<Map<String, Value>>(raw).ok()),
            order_by: non_blank(self.order_by),
            order_direction: self.order_direction.as_deref().and_then(OrderDirection::parse),
        }
    }
}

/// Build a search request from a loosely-typed JSON body. Fields of the
/// wrong type are ignored.
fn search_request_from_body(body: &Value) -> SearchRequest {
    let number = |key: &str| {
        body.get(key)
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
    };
    let text = |key: &str| non_blank(body.get(key).and_then(Value::as_str).map(str::to_string));

    SearchRequest {
        query: text("query"),
        page: number("page"),
        page_size: number("pageSize").unwrap_or(DEFAULT_PAGE_SIZE),
        params: body.get("params").and_then(Value::as_object).cloned(),
        order_by: text("orderBy"),
        order_direction: text("orderDirection")
            .as_deref()
            .and_then(OrderDirection::parse),
    }
}

fn parse_page_number(raw: &str) -> Option<u32> {
    raw.trim().parse().ok()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub success: bool,
    pub agents: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

impl From<SearchPage> for SearchResponse {
    /// Fill in paging fields the indexer left out.
    fn from(page: SearchPage) -> Self {
        let count = u32::try_from(page.agents.len()).unwrap_or(u32::MAX);
        let total_pages = page.total_pages.unwrap_or_else(|| {
            let total = page.total.unwrap_or(u64::from(count));
            let per_page = u64::from(page.page_size.unwrap_or(count).max(1));
            u32::try_from(total.div_ceil(per_page).max(1)).unwrap_or(u32::MAX)
        });

        Self {
            success: true,
            total: page.total,
            page: page.page.unwrap_or(1),
            page_size: page.page_size.unwrap_or(count),
            total_pages,
            agents: page.agents,
        }
    }
}

async fn run_search(state: &AppState, request: SearchRequest) -> Result<SearchResponse, ApiError> {
    debug!(?request, "Searching agents");
    let page = state
        .registry
        .search_agents(&request)
        .await
        .map_err(|e| ApiError::upstream("Failed to search agents", e))?;
    Ok(SearchResponse::from(page))
}

/// `GET /api/agents/search`
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    run_search(&state, params.into_request()).await.map(Json)
}

/// `POST /api/agents/search`. An unreadable body searches with defaults.
pub async fn search_post(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SearchResponse>, ApiError> {
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    run_search(&state, search_request_from_body(&body))
        .await
        .map(Json)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::numeric::RawNumeric;

    #[test]
    fn create_chain_from_number_or_string() {
        let default = ChainId::new(11_155_111);
        assert_eq!(body_chain_id(None, default).unwrap(), default);
        assert_eq!(body_chain_id(Some(&json!(0)), default).unwrap(), default);
        assert_eq!(body_chain_id(Some(&json!("")), default).unwrap(), default);
        assert_eq!(body_chain_id(Some(&json!(8453)), default).unwrap(), ChainId::new(8453));
        assert_eq!(body_chain_id(Some(&json!(" 10 ")), default).unwrap(), ChainId::new(10));
        assert!(body_chain_id(Some(&json!(-1)), default).is_err());
        assert!(body_chain_id(Some(&json!("base")), default).is_err());
    }

    #[test]
    fn feedback_window_defaults() {
        let query = FeedbackParams::default().to_query().unwrap();
        assert_eq!(query, FeedbackQuery::default());
        assert_eq!(query.limit, 100);
        assert_eq!(query.offset, 0);
        assert!(!query.include_revoked);
    }

    #[test]
    fn feedback_window_parses_flags() {
        for (raw, expected) in [("true", true), ("1", true), ("yes", false), ("TRUE", false)] {
            let params = FeedbackParams {
                include_revoked: Some(raw.to_string()),
                ..Default::default()
            };
            assert_eq!(params.to_query().unwrap().include_revoked, expected, "{raw}");
        }

        let params = FeedbackParams {
            limit: Some(" 25 ".to_string()),
            offset: Some("50".to_string()),
            ..Default::default()
        };
        let query = params.to_query().unwrap();
        assert_eq!((query.limit, query.offset), (25, 50));
    }

    #[test]
    fn feedback_window_rejects_garbage() {
        let params = FeedbackParams {
            limit: Some("lots".to_string()),
            ..Default::default()
        };
        assert!(matches!(params.to_query(), Err(ApiError::InvalidRequest(_))));
    }

    #[test]
    fn summary_count_is_normalized() {
        let payload = SummaryPayload::from(ReputationSummary {
            count: RawNumeric::Float(12.0),
            average_score: 87.5,
        });
        assert_eq!(payload.count.as_deref(), Some("12"));
    }

    #[test]
    fn search_params_apply_defaults() {
        let request = SearchParams {
            query: Some("  ".to_string()),
            page: Some("abc".to_string()),
            order_direction: Some("desc".to_string()),
            params: Some(r#"{"chainId": 1}"#.to_string()),
            ..Default::default()
        }
        .into_request();

        assert_eq!(request.query, None);
        assert_eq!(request.page, None);
        assert_eq!(request.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(request.order_direction, Some(OrderDirection::Desc));
        assert_eq!(request.params.unwrap()["chainId"], 1);
    }

    #[test]
    fn search_body_ignores_wrong_types() {
        let request = search_request_from_body(&json!({
            "query": " agent ",
            "page": "2",
            "pageSize": 5,
            "params": "not an object",
            "orderDirection": "ASC"
        }));
        assert_eq!(request.query.as_deref(), Some("agent"));
        assert_eq!(request.page, None);
        assert_eq!(request.page_size, 5);
        assert_eq!(request.params, None);
        assert_eq!(request.order_direction, Some(OrderDirection::Asc));

        let request = search_request_from_body(&Value::Null);
        assert_eq!(request.page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn search_response_fills_paging() {
        let response = SearchResponse::from(SearchPage {
            agents: vec![json!({"agentId": "1"}), json!({"agentId": "2"})],
            total: Some(5),
            ..Default::default()
        });
        assert_eq!(response.page, 1);
        assert_eq!(response.page_size, 2);
        assert_eq!(response.total_pages, 3);

        let empty = SearchResponse::from(SearchPage::default());
        assert_eq!(empty.page_size, 0);
        assert_eq!(empty.total_pages, 1);

        let explicit = SearchResponse::from(SearchPage {
            agents: vec![],
            total: Some(40),
            page: Some(2),
            page_size: Some(10),
            total_pages: Some(4),
        });
        assert_eq!((explicit.page, explicit.page_size, explicit.total_pages), (2, 10, 4));
    }
}
