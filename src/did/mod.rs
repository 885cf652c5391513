//! Decentralized identifiers accepted at the gateway boundary.
//!
//! Three schemes are understood:
//!
//! - `did:ethr:[<segment>:]*<address>`: an account, optionally scoped to
//!   a chain somewhere among the middle segments.
//! - `did:8004:<chainId>:<agentId>`: a token in the ERC-8004 identity
//!   registry.
//! - `did:ens:[<chainId>:]<name>`: a name-service name.
//!
//! Every parser is a pure function over the literal. Chain ids absent from
//! the literal fall back to the configured default chain.

pub mod address;
pub mod ens;
pub mod ethr;
pub mod params;
pub mod registry;

use std::fmt;

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

use crate::numeric::RawNumeric;

pub use address::Address;
pub use ens::NameServiceIdentifier;
pub use ethr::{EthrIdentifier, build_ethr_did};
pub use params::{ENS_DID_PARAM, ETHR_DID_PARAM, ParamAliases, REGISTRY_DID_PARAM};
pub use registry::{RegistryIdentifier, build_registry_did};

/// Sepolia, the network the registry is deployed to by default.
pub const DEFAULT_CHAIN_ID: ChainId = ChainId(11_155_111);

/// Identifier parse failures. All of them are client-input errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DidError {
    #[error("missing {param} parameter")]
    MissingIdentifierParameter { param: &'static str },
    #[error("malformed identifier: {0}")]
    MalformedIdentifier(String),
    #[error("invalid account address: {0}")]
    InvalidAddress(String),
    #[error("invalid chain id segment: {0}")]
    InvalidChainSegment(String),
    #[error("invalid agent id segment: {0}")]
    InvalidAgentId(String),
    #[error("invalid name identifier: {0}")]
    InvalidNameIdentifier(String),
}

/// Numeric network identifier.
///
/// Zero is representable because producers emit it, but it never counts as
/// a resolved chain (see [`ChainId::is_resolved`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(u64);

impl ChainId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    /// Whether this id names an actual network.
    pub const fn is_resolved(self) -> bool {
        self.0 > 0
    }

    /// This id when resolved, otherwise `fallback`.
    pub const fn or(self, fallback: ChainId) -> ChainId {
        if self.is_resolved() { self } else { fallback }
    }

    /// Parse a pure-digit segment. Anything else, including values that
    /// overflow `u64`, is `None`.
    pub fn from_segment(segment: &str) -> Option<Self> {
        if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        segment.parse().ok().map(Self)
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Registry token id.
///
/// Carried as a uint256 and always rendered as a canonical decimal string,
/// both in JSON and in DIDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentId(U256);

impl AgentId {
    pub const ZERO: AgentId = AgentId(U256::ZERO);

    /// Parse a decimal literal (surrounding whitespace allowed).
    pub fn parse_decimal(literal: &str) -> Option<Self> {
        let trimmed = literal.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        U256::from_str_radix(trimmed, 10).ok().map(Self)
    }

    /// Normalize an upstream numeric and read it as an agent id.
    pub fn from_raw(raw: &RawNumeric) -> Option<Self> {
        raw.canonical().as_deref().and_then(Self::parse_decimal)
    }
}

impl From<u64> for AgentId {
    fn from(value: u64) -> Self {
        Self(U256::from(value))
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl Serialize for AgentId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AgentId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawNumeric::deserialize(deserializer)?;
        Self::from_raw(&raw).ok_or_else(|| {
            serde::de::Error::custom(format!("agent id is not a non-negative integer: {raw:?}"))
        })
    }
}

/// A parsed identifier. Exactly one scheme is active.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Identifier {
    Ethr(EthrIdentifier),
    Registry(RegistryIdentifier),
    NameService(NameServiceIdentifier),
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ethr(id) => fmt::Display::fmt(id, f),
            Self::Registry(id) => fmt::Display::fmt(id, f),
            Self::NameService(id) => fmt::Display::fmt(id, f),
        }
    }
}

/// Scheme dispatcher carrying the parse-time configuration.
#[derive(Debug, Clone, Copy)]
pub struct IdentifierParser {
    default_chain_id: ChainId,
    lenient_agent_id: bool,
}

impl Default for IdentifierParser {
    fn default() -> Self {
        Self::new(DEFAULT_CHAIN_ID, true)
    }
}

impl IdentifierParser {
    /// `lenient_agent_id` keeps the legacy behavior of reading an
    /// unparseable registry agent id as `0` instead of rejecting it.
    pub fn new(default_chain_id: ChainId, lenient_agent_id: bool) -> Self {
        Self {
            default_chain_id,
            lenient_agent_id,
        }
    }

    pub fn default_chain_id(&self) -> ChainId {
        self.default_chain_id
    }

    /// Parse any supported scheme, chosen by prefix.
    pub fn parse(&self, raw: &str) -> Result<Identifier, DidError> {
        let literal = raw.trim();
        if literal.starts_with(ethr::ETHR_PREFIX) {
            self.parse_ethr(literal).map(Identifier::Ethr)
        } else if literal.starts_with(registry::REGISTRY_PREFIX) {
            self.parse_registry(literal).map(Identifier::Registry)
        } else if literal.starts_with(ens::ENS_PREFIX) {
            self.parse_ens(literal).map(Identifier::NameService)
        } else {
            Err(DidError::MalformedIdentifier(format!(
                "unsupported scheme in '{literal}'"
            )))
        }
    }

    pub fn parse_ethr(&self, raw: &str) -> Result<EthrIdentifier, DidError> {
        ethr::parse(raw, self.default_chain_id)
    }

    pub fn parse_registry(&self, raw: &str) -> Result<RegistryIdentifier, DidError> {
        registry::parse(raw, self.lenient_agent_id)
    }

    pub fn parse_ens(&self, raw: &str) -> Result<NameServiceIdentifier, DidError> {
        ens::parse(raw, self.default_chain_id)
    }
}
