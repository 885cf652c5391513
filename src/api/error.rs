//! Error-to-status mapping for the HTTP surface.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use crate::did::{ChainId, DidError};
use crate::upstream::UpstreamError;

/// Route-level failure. Every variant renders as a JSON body with an
/// `error` summary.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unparseable identifier in the path (400).
    #[error("{summary}: {source}")]
    Identifier {
        summary: &'static str,
        #[source]
        source: DidError,
    },

    /// Bad query or body field (400).
    #[error("{0}")]
    InvalidRequest(String),

    /// Nothing is associated with the account (404). Echoes the caller's
    /// account spelling and chain.
    #[error("{error}: {account} on chain {chain_id}")]
    AccountNotFound {
        error: &'static str,
        account: String,
        chain_id: ChainId,
    },

    /// A required collaborator call failed (404 when the upstream reports
    /// the entity missing, 500 otherwise).
    #[error("{summary}: {source}")]
    Upstream {
        summary: &'static str,
        #[source]
        source: UpstreamError,
    },

    /// Local failure that is not the caller's fault (500).
    #[error("{summary}: {message}")]
    Internal {
        summary: &'static str,
        message: String,
    },
}

impl ApiError {
    pub fn identifier(summary: &'static str, source: DidError) -> Self {
        Self::Identifier { summary, source }
    }

    pub fn upstream(summary: &'static str, source: UpstreamError) -> Self {
        Self::Upstream { summary, source }
    }

    pub fn internal(summary: &'static str, message: impl Into<String>) -> Self {
        Self::Internal {
            summary,
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Identifier { .. } | Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::AccountNotFound { .. } => StatusCode::NOT_FOUND,
            Self::Upstream { source, .. } if source.is_not_found() => StatusCode::NOT_FOUND,
            Self::Upstream { .. } | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(%status, "{}", self);
        }

        let body = match self {
            Self::Identifier { summary, source } => {
                json!({ "error": summary, "message": source.to_string() })
            }
            Self::InvalidRequest(message) => json!({ "error": message }),
            Self::AccountNotFound {
                error,
                account,
                chain_id,
            } => json!({ "error": error, "account": account, "chainId": chain_id }),
            Self::Upstream { summary, source } => {
                json!({ "error": summary, "message": source.to_string() })
            }
            Self::Internal { summary, message } => json!({ "error": summary, "message": message }),
        };

        (status, Json(body)).into_response()
    }
}
