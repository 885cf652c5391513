//! `did:8004` registry-token identifiers.

use std::fmt;

use serde::Serialize;
use tracing::warn;

use super::{AgentId, ChainId, DidError};

pub const REGISTRY_PREFIX: &str = "did:8004:";

/// A token in the identity registry of a specific chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryIdentifier {
    pub chain_id: ChainId,
    pub agent_id: AgentId,
}

impl fmt::Display for RegistryIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{REGISTRY_PREFIX}{}:{}", self.chain_id, self.agent_id)
    }
}

/// Build the canonical `did:8004` literal for a registry token.
pub fn build_registry_did(chain_id: ChainId, agent_id: AgentId) -> String {
    RegistryIdentifier { chain_id, agent_id }.to_string()
}

/// Parse `did:8004:<chainId>:<agentId>`.
///
/// Everything after the chain segment is rejoined, so an agent id that
/// itself contains colons reaches the agent-id check intact. In lenient
/// mode an agent id that is not a decimal integer reads as `0`.
pub(super) fn parse(raw: &str, lenient_agent_id: bool) -> Result<RegistryIdentifier, DidError> {
    let literal = raw.trim();
    let parts: Vec<&str> = literal.split(':').collect();
    if parts.len() < 4 || parts[0] != "did" || parts[1] != "8004" {
        return Err(DidError::MalformedIdentifier(format!(
            "expected {REGISTRY_PREFIX}<chainId>:<agentId>, got '{literal}'"
        )));
    }

    let chain_id = ChainId::from_segment(parts[2].trim()).ok_or_else(|| {
        DidError::InvalidChainSegment(format!("'{}' in '{literal}'", parts[2]))
    })?;

    let agent_segment = parts[3..].join(":");
    let agent_id = match AgentId::parse_decimal(&agent_segment) {
        Some(id) => id,
        None if lenient_agent_id => {
            warn!(
                did = literal,
                segment = %agent_segment,
                "Unparseable agent id in registry DID, reading it as 0"
            );
            AgentId::ZERO
        }
        None => {
            return Err(DidError::InvalidAgentId(format!(
                "'{agent_segment}' in '{literal}'"
            )));
        }
    };

    Ok(RegistryIdentifier { chain_id, agent_id })
}
