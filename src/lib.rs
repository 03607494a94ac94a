//! powchain: a single-node proof-of-work ledger with a wallet REST API.
//!
//! The `blockchain` module holds the ledger core; `api` and `config`
//! are the HTTP surface and node settings composed by the binary.

pub mod api;
pub mod blockchain;
pub mod config;
