//! Gateway for an ERC-8004 agent registry.
//!
//! Parses the decentralized identifiers the registry speaks (`did:ethr`,
//! `did:8004`, `did:ens`), resolves accounts to registered agents,
//! aggregates required and best-effort upstream reads, and normalizes
//! on-chain numbers into wire-safe strings. [`api`] exposes all of it over
//! HTTP.

pub mod aggregate;
pub mod api;
pub mod config;
pub mod did;
pub mod numeric;
pub mod resolver;
pub mod settings;
pub mod upstream;
