use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest as _, Sha256};
use utoipa::ToSchema;

use std::fmt;
use std::str::FromStr;

use super::crypto::Address;
use super::transaction::Transaction;

/// Version of the canonical block encoding fed to the hasher
pub const ENCODING_VERSION: u32 = 1;

/// A 256-bit SHA-256 digest
///
/// Displayed and serialized as lowercase hex.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, ToSchema)]
#[schema(value_type = String, example = "00a1b2c3...")]
pub struct Digest(pub [u8; 32]);

impl Digest {
    /// The all-zero digest used as the "empty" previous hash
    pub const ZERO: Digest = Digest([0u8; 32]);

    /// Returns the raw digest bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns the lowercase hex form of the digest
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Checks whether the hex form starts with `difficulty` zero characters
    pub fn meets_difficulty(&self, difficulty: usize) -> bool {
        let hex = self.to_hex();
        if difficulty > hex.len() {
            return false;
        }

        hex[..difficulty].bytes().all(|c| c == b'0')
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for Digest {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Digest(bytes))
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Canonical view of a block's hashed fields.
///
/// Field order here is the wire order and must not change within an
/// encoding version.
#[derive(Serialize)]
struct CanonicalBlock<'a> {
    timestamp: i64,
    nonce: u64,
    previous_hash: Digest,
    transactions: Vec<CanonicalTransaction<'a>>,
}

#[derive(Serialize)]
struct CanonicalTransaction<'a> {
    sender: &'a Address,
    recipient: &'a Address,
    #[serde(serialize_with = "serialize_amount")]
    amount: f64,
}

/// Writes finite amounts as JSON numbers and the rest as "NaN", "inf" or "-inf".
///
/// Plain serde_json maps every non-finite float to `null`, which would make
/// such blocks collide. The ledger is meant to carry finite amounts only;
/// the HTTP layer rejects anything else.
fn serialize_amount<S: Serializer>(amount: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if amount.is_finite() {
        serializer.serialize_f64(*amount)
    } else if amount.is_nan() {
        serializer.serialize_str("NaN")
    } else if amount.is_sign_positive() {
        serializer.serialize_str("inf")
    } else {
        serializer.serialize_str("-inf")
    }
}

/// Encodes block fields into the canonical byte form
pub fn canonical_encoding(
    timestamp: i64,
    nonce: u64,
    previous_hash: &Digest,
    transactions: &[Transaction],
) -> Vec<u8> {
    let canonical = CanonicalBlock {
        timestamp,
        nonce,
        previous_hash: *previous_hash,
        transactions: transactions
            .iter()
            .map(|transaction| CanonicalTransaction {
                sender: transaction.sender(),
                recipient: transaction.recipient(),
                amount: transaction.amount(),
            })
            .collect(),
    };

    match serde_json::to_vec(&canonical) {
        Ok(encoded) => encoded,
        // Only strings, integers and finite floats reach the writer.
        Err(err) => unreachable!("canonical block encoding failed: {}", err),
    }
}

/// Hashes block fields with SHA-256 over their canonical encoding
pub fn hash_fields(
    timestamp: i64,
    nonce: u64,
    previous_hash: &Digest,
    transactions: &[Transaction],
) -> Digest {
    let encoded = canonical_encoding(timestamp, nonce, previous_hash, transactions);
    Digest(Sha256::digest(&encoded).into())
}
