use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use std::fmt;

use super::crypto::Address;

/// Sender address used for mining reward transactions
pub const MINING_SENDER: &str = "THE BLOCKCHAIN";

/// Represents a transfer recorded in the ledger
///
/// Transactions are plain values: fields are fixed at construction and
/// two transactions with the same fields are equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Transaction {
    /// Sender's address
    sender: Address,

    /// Recipient's address
    recipient: Address,

    /// Amount being transferred
    amount: f64,
}

impl Transaction {
    /// Creates a new transaction
    ///
    /// # Arguments
    ///
    /// * `sender` - The address of the sender
    /// * `recipient` - The address of the recipient
    /// * `amount` - The amount to transfer
    pub fn new(sender: Address, recipient: Address, amount: f64) -> Self {
        Transaction {
            sender,
            recipient,
            amount,
        }
    }

    /// Creates a mining reward transaction paid by the system sender
    pub fn new_reward(recipient: Address, amount: f64) -> Self {
        Transaction::new(Address(MINING_SENDER.to_string()), recipient, amount)
    }

    pub fn sender(&self) -> &Address {
        &self.sender
    }

    pub fn recipient(&self) -> &Address {
        &self.recipient
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    /// Checks if the transaction is a mining reward
    pub fn is_reward(&self) -> bool {
        self.sender.0 == MINING_SENDER
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", "-".repeat(40))?;
        writeln!(f, "sender_blockchain_address      {}", self.sender)?;
        writeln!(f, "recipient_blockchain_address   {}", self.recipient)?;
        write!(f, "value                          {:.1}", self.amount)
    }
}
