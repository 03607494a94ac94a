use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use std::fmt;

use super::hash::{self, Digest};
use super::transaction::Transaction;

/// Represents a sealed block in the blockchain
///
/// A block never changes after construction. Its hash is computed from
/// its own fields only, so the same block always hashes the same way.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Block {
    /// Seal time in nanoseconds since the Unix epoch
    timestamp: i64,

    /// Proof of work (nonce)
    nonce: u64,

    /// Hash of the previous block
    previous_hash: Digest,

    /// Transactions sealed into this block, in pool order
    transactions: Vec<Transaction>,
}

/// Current wall time in nanoseconds since the Unix epoch
pub(crate) fn now_nanos() -> i64 {
    let now = Utc::now();
    now.timestamp_nanos_opt()
        .unwrap_or_else(|| now.timestamp_micros().saturating_mul(1_000))
}

impl Block {
    /// Creates a new block stamped with the current time
    ///
    /// # Arguments
    ///
    /// * `nonce` - The proof of work (nonce)
    /// * `previous_hash` - The hash of the previous block
    /// * `transactions` - The list of transactions to include in the block
    pub fn new(nonce: u64, previous_hash: Digest, transactions: Vec<Transaction>) -> Self {
        Block::with_timestamp(now_nanos(), nonce, previous_hash, transactions)
    }

    /// Creates a new block with an explicit timestamp
    ///
    /// Mining fixes the timestamp before searching for a nonce and seals
    /// with that same value.
    pub fn with_timestamp(
        timestamp: i64,
        nonce: u64,
        previous_hash: Digest,
        transactions: Vec<Transaction>,
    ) -> Self {
        Block {
            timestamp,
            nonce,
            previous_hash,
            transactions,
        }
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn previous_hash(&self) -> &Digest {
        &self.previous_hash
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Calculates the SHA-256 hash of the block
    pub fn hash(&self) -> Digest {
        hash::hash_fields(
            self.timestamp,
            self.nonce,
            &self.previous_hash,
            &self.transactions,
        )
    }

    /// Returns the canonical encoding of the block as text
    ///
    /// This is exactly the byte string that `hash` digests.
    pub fn canonical_json(&self) -> String {
        let bytes = hash::canonical_encoding(
            self.timestamp,
            self.nonce,
            &self.previous_hash,
            &self.transactions,
        );
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "timestamp       {}", self.timestamp)?;
        writeln!(f, "nonce           {}", self.nonce)?;
        write!(f, "previous_hash   {}", self.previous_hash)?;
        for transaction in &self.transactions {
            write!(f, "\n{}", transaction)?;
        }
        Ok(())
    }
}
