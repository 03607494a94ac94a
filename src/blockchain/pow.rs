use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::hash::{self, Digest};
use super::transaction::Transaction;

/// Shared stop flag for an in-flight nonce search
///
/// Clones share the same flag. Once triggered it stays set.
#[derive(Debug, Clone, Default)]
pub struct MiningSignal(Arc<AtomicBool>);

impl MiningSignal {
    /// Creates a new untriggered signal
    pub fn new() -> Self {
        MiningSignal(Arc::new(AtomicBool::new(false)))
    }

    /// Asks any search watching this signal to stop
    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Checks whether both handles share one flag
    pub(crate) fn same_as(&self, other: &MiningSignal) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Checks whether a nonce solves the puzzle for the given block fields
///
/// # Arguments
///
/// * `nonce` - The candidate nonce
/// * `previous_hash` - The hash of the block being extended
/// * `transactions` - The transactions the block will seal
/// * `timestamp` - The timestamp the block will be sealed with
/// * `difficulty` - Required number of leading zero hex characters
pub fn valid_proof(
    nonce: u64,
    previous_hash: &Digest,
    transactions: &[Transaction],
    timestamp: i64,
    difficulty: usize,
) -> bool {
    hash::hash_fields(timestamp, nonce, previous_hash, transactions).meets_difficulty(difficulty)
}

/// Searches nonces from zero upwards until one satisfies `valid_proof`
///
/// The search has no upper bound. It returns `None` as soon as `signal`
/// is triggered.
pub fn find_nonce(
    previous_hash: &Digest,
    transactions: &[Transaction],
    timestamp: i64,
    difficulty: usize,
    signal: &MiningSignal,
) -> Option<u64> {
    let mut nonce: u64 = 0;

    loop {
        if signal.is_triggered() {
            return None;
        }

        if valid_proof(nonce, previous_hash, transactions, timestamp, difficulty) {
            return Some(nonce);
        }

        nonce = nonce.wrapping_add(1);
    }
}
