//! Account addresses (20 bytes, `0x` + 40 hex characters).

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Serialize, Serializer};

use super::DidError;

static ADDRESS_HEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^0x[0-9a-fA-F]{40}$").unwrap());

/// A validated account address.
///
/// Equality and hashing are case-insensitive (they compare the bytes). The
/// caller's original spelling is kept so responses can echo it back.
#[derive(Debug, Clone)]
pub struct Address {
    bytes: alloy::primitives::Address,
    provided: String,
}

impl Address {
    /// Validate an address literal.
    ///
    /// All-lowercase and all-uppercase hex are accepted as-is; mixed case
    /// must carry a valid EIP-55 checksum.
    pub fn parse(literal: &str) -> Result<Self, DidError> {
        if !ADDRESS_HEX.is_match(literal) {
            return Err(DidError::InvalidAddress(format!(
                "'{literal}' is not 0x followed by 40 hex characters"
            )));
        }
        let bytes = alloy::primitives::Address::from_str(literal)
            .map_err(|e| DidError::InvalidAddress(format!("'{literal}': {e}")))?;

        let hex = &literal[2..];
        let mixed_case = hex.bytes().any(|b| b.is_ascii_lowercase())
            && hex.bytes().any(|b| b.is_ascii_uppercase());
        if mixed_case && bytes.to_checksum(None) != literal {
            return Err(DidError::InvalidAddress(format!(
                "'{literal}' has an invalid EIP-55 checksum"
            )));
        }

        Ok(Self {
            bytes,
            provided: literal.to_string(),
        })
    }

    /// Lowercase `0x`-prefixed form.
    pub fn canonical(&self) -> String {
        format!("{:#x}", self.bytes)
    }

    /// The address exactly as the caller spelled it.
    pub fn as_provided(&self) -> &str {
        &self.provided
    }
}

impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for Address {}

impl Hash for Address {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bytes.hash(state);
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.bytes)
    }
}

impl FromStr for Address {
    type Err = DidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
