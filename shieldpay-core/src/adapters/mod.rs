//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - `solana` / `spl-token` command-line tools for the LedgerClient port
//! - In-memory demo ledger for demo mode and testing

pub mod demo;
pub mod spl_token;
