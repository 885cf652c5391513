//! `did:ethr` account identifiers.
//!
//! Producers disagree on what sits between the method and the address
//! (`did:ethr:0x..`, `did:ethr:11155111:0x..`,
//! `did:ethr:mainnet:11155111:0x..`, ...). The address is always the last
//! segment. The chain id is the first pure-digit segment found scanning
//! the middle segments from right to left; with no such segment the
//! default chain applies.

use std::fmt;

use serde::Serialize;

use super::{Address, ChainId, DidError};

pub const ETHR_PREFIX: &str = "did:ethr:";

/// An account on a specific chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EthrIdentifier {
    pub chain_id: ChainId,
    pub account: Address,
}

impl fmt::Display for EthrIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{ETHR_PREFIX}{}:{}", self.chain_id, self.account)
    }
}

/// Build the canonical `did:ethr` literal for an account.
pub fn build_ethr_did(chain_id: ChainId, account: &Address) -> String {
    EthrIdentifier {
        chain_id,
        account: account.clone(),
    }
    .to_string()
}

pub(super) fn parse(raw: &str, default_chain_id: ChainId) -> Result<EthrIdentifier, DidError> {
    let literal = raw.trim();
    if !literal.starts_with(ETHR_PREFIX) {
        return Err(DidError::MalformedIdentifier(format!(
            "expected {ETHR_PREFIX}..., got '{literal}'"
        )));
    }

    let segments: Vec<&str> = literal.split(':').collect();
    let (account_segment, rest) = match segments.split_last() {
        Some((last, rest)) if last.starts_with("0x") => (*last, rest),
        _ => {
            return Err(DidError::MalformedIdentifier(format!(
                "'{literal}' is missing its account component"
            )));
        }
    };

    // rest = ["did", "ethr", middle...]; the rightmost all-digit segment
    // is the chain, even when it does not fit a chain id.
    let chain_id = match rest[2..].iter().rev().find(|segment| is_digits(segment)) {
        Some(segment) => ChainId::from_segment(segment).ok_or_else(|| {
            DidError::InvalidChainSegment(format!("'{segment}' in '{literal}' is out of range"))
        })?,
        None => default_chain_id,
    };

    let account = Address::parse(account_segment)?;
    Ok(EthrIdentifier { chain_id, account })
}

fn is_digits(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::did::DEFAULT_CHAIN_ID;

    const ACCOUNT: &str = "0x1234567890123456789012345678901234567890";

    fn parse_default(raw: &str) -> Result<EthrIdentifier, DidError> {
        parse(raw, DEFAULT_CHAIN_ID)
    }

    #[test]
    fn recovers_chain_regardless_of_leading_segments() {
        for prefix in ["", "mainnet:", "a:b:c:", "eip155:sepolia:"] {
            let literal = format!("did:ethr:{prefix}84532:{ACCOUNT}");
            let id = parse_default(&literal).unwrap();
            assert_eq!(id.chain_id, ChainId::new(84532), "for {literal}");
        }
    }

    #[test]
    fn rightmost_numeric_segment_wins() {
        let id = parse_default(&format!("did:ethr:1:mainnet:10:net:{ACCOUNT}")).unwrap();
        assert_eq!(id.chain_id, ChainId::new(10));
    }

    #[test]
    fn oversized_numeric_segment_is_rejected() {
        for literal in [
            format!("did:ethr:5:99999999999999999999999:{ACCOUNT}"),
            format!("did:ethr:99999999999999999999999:{ACCOUNT}"),
        ] {
            assert!(
                matches!(parse_default(&literal), Err(DidError::InvalidChainSegment(_))),
                "accepted {literal}"
            );
        }
    }

    #[test]
    fn no_numeric_segment_uses_default() {
        let id = parse_default(&format!("did:ethr:{ACCOUNT}")).unwrap();
        assert_eq!(id.chain_id, DEFAULT_CHAIN_ID);

        let id = parse_default(&format!("did:ethr:sepolia:{ACCOUNT}")).unwrap();
        assert_eq!(id.chain_id, DEFAULT_CHAIN_ID);

        let id = parse(&format!("did:ethr:{ACCOUNT}"), ChainId::new(8453)).unwrap();
        assert_eq!(id.chain_id, ChainId::new(8453));
    }

    #[test]
    fn normalizes_account_case() {
        let id = parse_default(
            "did:ethr:mainnet:11155111:0xABCDEF0000000000000000000000000000000001",
        )
        .unwrap();
        assert_eq!(id.chain_id, ChainId::new(11_155_111));
        assert_eq!(
            id.account.canonical(),
            "0xabcdef0000000000000000000000000000000001"
        );
        assert_eq!(
            id.account.as_provided(),
            "0xABCDEF0000000000000000000000000000000001"
        );
    }

    #[test]
    fn bad_address_is_invalid_address() {
        for account in ["0x1234", "0xnothex0000000000000000000000000000000000", "0x"] {
            let literal = format!("did:ethr:1:{account}");
            assert!(
                matches!(parse_default(&literal), Err(DidError::InvalidAddress(_))),
                "accepted {literal}"
            );
        }
    }

    #[test]
    fn missing_account_is_malformed() {
        assert!(matches!(
            parse_default("did:ethr:11155111"),
            Err(DidError::MalformedIdentifier(_))
        ));
        assert!(matches!(
            parse_default("did:ethr:"),
            Err(DidError::MalformedIdentifier(_))
        ));
        assert!(matches!(
            parse_default(&format!("did:pkh:{ACCOUNT}")),
            Err(DidError::MalformedIdentifier(_))
        ));
    }

    #[test]
    fn builds_canonical_literal() {
        let account = Address::parse(ACCOUNT).unwrap();
        assert_eq!(
            build_ethr_did(ChainId::new(1), &account),
            format!("did:ethr:1:{ACCOUNT}")
        );
    }
}
