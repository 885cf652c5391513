//! HTTP surface.
//!
//! Handlers are thin: they pull the identifier out of the path (checking
//! every alias the transport may have used), parse it, call collaborators
//! in the order the operation requires, and shape the JSON response.

pub mod accounts;
pub mod agents;
pub mod error;
pub mod names;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::http::Method;
use axum::routing::{delete, get, post, put};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::did::{IdentifierParser, ParamAliases};
use crate::resolver::AgentResolver;
use crate::upstream::{AccountDirectory, AgentRegistry, NameService};

pub use error::ApiError;

/// Shared handler state. Cheap to clone; holds no per-request data.
#[derive(Clone)]
pub struct AppState {
    pub parser: IdentifierParser,
    pub registry: Arc<dyn AgentRegistry>,
    pub names: Arc<dyn NameService>,
    pub accounts: Arc<dyn AccountDirectory>,
    pub session_package_path: Option<PathBuf>,
}

impl AppState {
    pub fn new(
        parser: IdentifierParser,
        registry: Arc<dyn AgentRegistry>,
        names: Arc<dyn NameService>,
        accounts: Arc<dyn AccountDirectory>,
    ) -> Self {
        Self {
            parser,
            registry,
            names,
            accounts,
            session_package_path: None,
        }
    }

    pub fn with_session_package(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_package_path = Some(path.into());
        self
    }

    pub fn resolver(&self) -> AgentResolver {
        AgentResolver::new(
            self.names.clone(),
            self.registry.clone(),
            self.parser.default_chain_id(),
        )
    }
}

/// Pull an identifier literal out of the path parameters, tagging any
/// failure with the route's 400 summary.
pub(crate) fn identifier_param(
    params: &HashMap<String, String>,
    aliases: ParamAliases,
    summary: &'static str,
) -> Result<String, ApiError> {
    aliases
        .resolve(params)
        .map_err(|e| ApiError::identifier(summary, e))
}

/// Build the gateway router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route(
            "/api/agents/search",
            get(agents::search).post(agents::search_post),
        )
        .route("/api/agents/create-for-eoa", post(agents::create_for_eoa))
        .route("/api/agents/by-account/{didethr}", get(agents::by_account))
        .route("/api/agents/{did8004}/feedback", get(agents::feedback))
        .route("/api/agents/{did8004}/refresh", post(agents::refresh))
        .route("/api/agents/{did8004}/transfer", post(agents::transfer))
        .route("/api/agents/{did8004}/update", put(agents::update))
        .route("/api/agents/{did8004}/delete", delete(agents::delete))
        .route(
            "/api/agents/{did8004}/session-package",
            get(agents::session_package),
        )
        .route(
            "/api/accounts/owner/by-account/{didethr}",
            get(accounts::owner_by_account),
        )
        .route("/api/names/{didens}", get(names::name_info))
        .route("/api/names/{didens}/is-available", get(names::is_available))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}
