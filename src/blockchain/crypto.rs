use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use std::fmt;

/// Represents a blockchain address
///
/// Wallet addresses are base58-encoded public keys; the ledger itself
/// treats addresses as opaque strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct Address(pub String);

impl Address {
    /// Creates a new address from a public key
    pub fn from_public_key(public_key: &VerifyingKey) -> Self {
        let bytes = public_key.as_bytes();
        let encoded = bs58::encode(bytes).into_string();
        Address(encoded)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Address(s.to_string())
    }
}

/// Represents a wallet with a keypair
#[derive(Debug, Clone)]
pub struct Wallet {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
    address: Address,
}

impl Wallet {
    /// Creates a new wallet with a random keypair
    pub fn new() -> Self {
        let mut csprng = OsRng;
        let signing_key = SigningKey::generate(&mut csprng);
        Wallet::from_signing_key(signing_key)
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let verifying_key = VerifyingKey::from(&signing_key);
        let address = Address::from_public_key(&verifying_key);

        Wallet {
            signing_key,
            verifying_key,
            address,
        }
    }

    /// Gets the wallet's address
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Exports the private key as lowercase hex
    pub fn private_key_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    /// Exports the public key as lowercase hex
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.verifying_key.as_bytes())
    }
}

impl Default for Wallet {
    fn default() -> Self {
        Wallet::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wallet_creation() {
        let wallet = Wallet::new();

        assert!(!wallet.address().0.is_empty());
        assert_eq!(wallet.private_key_hex().len(), 64);
        assert_eq!(wallet.public_key_hex().len(), 64);
    }

    #[test]
    fn test_wallets_are_distinct() {
        let first = Wallet::new();
        let second = Wallet::new();

        assert_ne!(first.address(), second.address());
    }

    #[test]
    fn test_address_encodes_public_key() {
        let wallet = Wallet::new();

        let decoded = bs58::decode(&wallet.address().0).into_vec().unwrap();
        assert_eq!(hex::encode(decoded), wallet.public_key_hex());
    }

    #[test]
    fn test_address_from_str() {
        let address = Address::from("A");

        assert_eq!(address.0, "A");
        assert_eq!(address.to_string(), "A");
    }
}
