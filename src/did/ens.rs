//! `did:ens` name-service identifiers.
//!
//! Accepted shapes are `did:ens:<name>` and `did:ens:<chainId>:<name>`.
//! Names are compared lowercase.

use std::fmt;

use serde::Serialize;

use super::{ChainId, DidError};

pub const ENS_PREFIX: &str = "did:ens:";

/// A registered name on a specific chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NameServiceIdentifier {
    pub name: String,
    pub chain_id: ChainId,
}

impl fmt::Display for NameServiceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{ENS_PREFIX}{}:{}", self.chain_id, self.name)
    }
}

pub(super) fn parse(raw: &str, default_chain_id: ChainId) -> Result<NameServiceIdentifier, DidError> {
    let literal = raw.trim();
    let rest = literal.strip_prefix(ENS_PREFIX).ok_or_else(|| {
        DidError::MalformedIdentifier(format!("expected {ENS_PREFIX}..., got '{literal}'"))
    })?;

    let (chain_id, name) = match rest.split_once(':') {
        Some((segment, name)) => {
            let chain_id = ChainId::from_segment(segment).ok_or_else(|| {
                DidError::InvalidChainSegment(format!("'{segment}' in '{literal}'"))
            })?;
            (chain_id, name)
        }
        None => (default_chain_id, rest),
    };

    Ok(NameServiceIdentifier {
        name: validate_name(name)?,
        chain_id,
    })
}

fn validate_name(name: &str) -> Result<String, DidError> {
    let name = name.trim().to_lowercase();
    if name.is_empty() {
        return Err(DidError::InvalidNameIdentifier("name is empty".to_string()));
    }
    if !name.contains('.') {
        return Err(DidError::InvalidNameIdentifier(format!(
            "'{name}' has no parent domain"
        )));
    }
    if name.split('.').any(str::is_empty) {
        return Err(DidError::InvalidNameIdentifier(format!(
            "'{name}' has an empty label"
        )));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| c.is_whitespace() || c.is_control() || matches!(c, ':' | '/' | '?' | '#'))
    {
        return Err(DidError::InvalidNameIdentifier(format!(
            "'{name}' contains forbidden character {bad:?}"
        )));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::did::DEFAULT_CHAIN_ID;

    #[test]
    fn name_without_chain_uses_default() {
        let id = parse("did:ens:Agent.Example.eth", DEFAULT_CHAIN_ID).unwrap();
        assert_eq!(id.name, "agent.example.eth");
        assert_eq!(id.chain_id, DEFAULT_CHAIN_ID);
    }

    #[test]
    fn explicit_chain_is_honored() {
        let id = parse("did:ens:1:vitalik.eth", DEFAULT_CHAIN_ID).unwrap();
        assert_eq!(id.chain_id, ChainId::new(1));
        assert_eq!(id.name, "vitalik.eth");
    }

    #[test]
    fn non_numeric_chain_is_rejected() {
        assert!(matches!(
            parse("did:ens:mainnet:vitalik.eth", DEFAULT_CHAIN_ID),
            Err(DidError::InvalidChainSegment(_))
        ));
    }

    #[test]
    fn malformed_names_are_rejected() {
        for literal in [
            "did:ens:",
            "did:ens:eth",
            "did:ens:agent..eth",
            "did:ens:.eth",
            "did:ens:1:bad name.eth",
            "did:ens:1:a.eth:extra",
        ] {
            assert!(
                matches!(
                    parse(literal, DEFAULT_CHAIN_ID),
                    Err(DidError::InvalidNameIdentifier(_))
                ),
                "accepted {literal}"
            );
        }
    }

    #[test]
    fn wrong_scheme_is_malformed() {
        assert!(matches!(
            parse("did:ethr:vitalik.eth", DEFAULT_CHAIN_ID),
            Err(DidError::MalformedIdentifier(_))
        ));
    }
}
