//! Route-parameter aliases for identifier literals.
//!
//! Path segments cannot always carry a literal colon, so the same logical
//! parameter reaches us under one of several keys: with the colon, with
//! the colon dropped, or with U+A789 (MODIFIER LETTER COLON) standing in
//! for it. Values may additionally be percent-encoded and may use the same
//! substitute colon internally.

use std::collections::HashMap;

use super::DidError;

/// Stand-in used by transports that cannot carry `:` in a path segment.
pub const SUBSTITUTE_COLON: char = '\u{A789}';

/// The keys under which one logical parameter may arrive, in lookup order.
#[derive(Debug, Clone, Copy)]
pub struct ParamAliases {
    logical: &'static str,
    keys: &'static [&'static str],
}

pub const REGISTRY_DID_PARAM: ParamAliases = ParamAliases {
    logical: "did:8004",
    keys: &["did:8004", "did8004", "did\u{A789}8004"],
};

pub const ETHR_DID_PARAM: ParamAliases = ParamAliases {
    logical: "did:ethr",
    keys: &["did:ethr", "didethr", "did\u{A789}ethr"],
};

pub const ENS_DID_PARAM: ParamAliases = ParamAliases {
    logical: "did:ens",
    keys: &["did:ens", "didens", "did\u{A789}ens"],
};

impl ParamAliases {
    /// Return the first non-empty value among the aliases, decoded.
    pub fn resolve(&self, params: &HashMap<String, String>) -> Result<String, DidError> {
        let raw = self
            .keys
            .iter()
            .find_map(|key| params.get(*key).filter(|v| !v.is_empty()))
            .ok_or(DidError::MissingIdentifierParameter {
                param: self.logical,
            })?;

        let decoded = decode_literal(raw)?;
        if decoded.is_empty() {
            return Err(DidError::MissingIdentifierParameter {
                param: self.logical,
            });
        }
        Ok(decoded)
    }
}

/// Percent-decode a literal, restore substitute colons, and trim it.
pub fn decode_literal(raw: &str) -> Result<String, DidError> {
    let decoded = urlencoding::decode(raw).map_err(|e| {
        DidError::MalformedIdentifier(format!("'{raw}' is not valid percent-encoded UTF-8: {e}"))
    })?;
    Ok(decoded.replace(SUBSTITUTE_COLON, ":").trim().to_string())
}
