//! Account routes.

use std::collections::HashMap;

use axum::Json;
use axum::extract::{Path, State};
use serde::Serialize;

use super::{ApiError, AppState, identifier_param};
use crate::did::{ChainId, ETHR_DID_PARAM};

const INVALID_ETHR_DID: &str = "Invalid ETHR DID";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerResponse {
    pub owner: String,
    pub account: String,
    pub chain_id: ChainId,
}

/// `GET /api/accounts/owner/by-account/{did:ethr}`
pub async fn owner_by_account(
    State(state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
) -> Result<Json<OwnerResponse>, ApiError> {
    let literal = identifier_param(&params, ETHR_DID_PARAM, INVALID_ETHR_DID)?;
    let identifier = state
        .parser
        .parse_ethr(&literal)
        .map_err(|e| ApiError::identifier(INVALID_ETHR_DID, e))?;

    let owner = state
        .accounts
        .account_owner(&identifier.account, identifier.chain_id)
        .await
        .map_err(|e| ApiError::upstream("Failed to get account owner", e))?;

    match owner {
        Some(owner) => Ok(Json(OwnerResponse {
            owner: owner.as_provided().to_string(),
            account: identifier.account.as_provided().to_string(),
            chain_id: identifier.chain_id,
        })),
        None => Err(ApiError::AccountNotFound {
            error: "Account owner not found",
            account: identifier.account.as_provided().to_string(),
            chain_id: identifier.chain_id,
        }),
    }
}
