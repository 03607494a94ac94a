// Blockchain module
//
// This module contains the core ledger implementation including:
// - Transaction and Block structures
// - Canonical block hashing
// - Proof of work search
// - The Blockchain (chain + pending pool)
// - Wallet key pairs and addresses

pub mod block;
pub mod chain;
pub mod crypto;
pub mod hash;
pub mod pow;
pub mod transaction;

// Re-export main components for easier access
pub use block::Block;
pub use chain::{Blockchain, BlockchainError, MineOutcome};
pub use crypto::{Address, Wallet};
pub use hash::Digest;
pub use pow::MiningSignal;
pub use transaction::Transaction;
