//! Name-service routes.

use std::collections::HashMap;

use axum::Json;
use axum::extract::{Path, State};
use serde_json::{Value, json};

use super::{ApiError, AppState, identifier_param};
use crate::did::{ENS_DID_PARAM, NameServiceIdentifier};

const INVALID_ENS_DID: &str = "Invalid ENS DID";
const AVAILABILITY_FAILURE: &str = "Failed to check ENS availability";

fn name_identifier(
    state: &AppState,
    params: &HashMap<String, String>,
) -> Result<NameServiceIdentifier, ApiError> {
    let literal = identifier_param(params, ENS_DID_PARAM, INVALID_ENS_DID)?;
    state
        .parser
        .parse_ens(&literal)
        .map_err(|e| ApiError::identifier(INVALID_ENS_DID, e))
}

/// `GET /api/names/{did:ens}`
pub async fn name_info(
    State(state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let identifier = name_identifier(&state, &params)?;
    let info = state
        .names
        .name_info(&identifier.name, identifier.chain_id)
        .await
        .map_err(|e| ApiError::upstream("Failed to get ENS name info", e))?;
    Ok(Json(json!({ "nameInfo": info })))
}

/// `GET /api/names/{did:ens}/is-available`
///
/// An indeterminate answer from the name service is a server error, not
/// `false`.
pub async fn is_available(
    State(state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let identifier = name_identifier(&state, &params)?;
    let available = state
        .names
        .is_name_available(&identifier.name, identifier.chain_id)
        .await
        .map_err(|e| ApiError::upstream(AVAILABILITY_FAILURE, e))?
        .ok_or_else(|| ApiError::internal(AVAILABILITY_FAILURE, "Unable to determine availability"))?;
    Ok(Json(json!({ "available": available })))
}
