//! Domain primitives: Timestamp, Identity, AssetId, PresaleId.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Host-provided time in seconds since Unix epoch.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Create a Timestamp from seconds.
    pub fn new(secs: i64) -> Self {
        Timestamp(secs)
    }

    /// Get the underlying seconds value.
    pub fn as_secs(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A party able to sign operations (admin or buyer wallet).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Identity(pub String);

impl Identity {
    /// Create an Identity from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Identity(id.into())
    }

    /// Get the identity as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mint/asset identifier (sale token or quote currency).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssetId(pub String);

impl AssetId {
    /// Create an AssetId from a string.
    pub fn new(asset: impl Into<String>) -> Self {
        AssetId(asset.into())
    }

    /// Get the asset id as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable address of a presale ledger.
///
/// Derived from the admin identity and an admin-chosen seed, so one admin can
/// run several sales side by side while each remains uniquely addressable.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PresaleId(pub String);

impl PresaleId {
    /// Derive the id for `(admin, seed)`.
    ///
    /// The admin is prefixed with its u64 little-endian byte length before hashing so that distinct
    /// `(admin, seed)` pairs can never produce the same preimage. The SHA-256
    /// digest is truncated to 128 bits.
    pub fn derive(admin: &Identity, seed: u64) -> Self {
        let mut hasher = Sha256::new();
        hasher.update((admin.as_str().len() as u64).to_le_bytes());
        hasher.update(admin.as_str().as_bytes());
        hasher.update(seed.to_le_bytes());
        let hash = hasher.finalize();
        PresaleId(format!("presale:{}", hex::encode(&hash[..16])))
    }

    /// Get the id as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PresaleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presale_id_is_deterministic() {
        let admin = Identity::new("admin");
        assert_eq!(PresaleId::derive(&admin, 7), PresaleId::derive(&admin, 7));
        assert!(PresaleId::derive(&admin, 7).as_str().starts_with("presale:"));
    }

    #[test]
    fn test_presale_id_differs_by_seed_and_admin() {
        let a = Identity::new("admin-a");
        let b = Identity::new("admin-b");
        assert_ne!(PresaleId::derive(&a, 1), PresaleId::derive(&a, 2));
        assert_ne!(PresaleId::derive(&a, 1), PresaleId::derive(&b, 1));
    }

    #[test]
    fn test_presale_id_preimage_uses_u64_length_prefix() {
        let admin = Identity::new("admin");
        let mut hasher = Sha256::new();
        hasher.update(5u64.to_le_bytes());
        hasher.update(b"admin");
        hasher.update(9u64.to_le_bytes());
        let expected = format!("presale:{}", hex::encode(&hasher.finalize()[..16]));
        assert_eq!(PresaleId::derive(&admin, 9).as_str(), expected);
    }

    #[test]
    fn test_presale_id_hex_length() {
        let id = PresaleId::derive(&Identity::new("admin"), 0);
        // "presale:" + 32 hex chars
        assert_eq!(id.as_str().len(), 8 + 32);
    }

    #[test]
    fn test_identity_display() {
        let id = Identity::new("0xabc");
        assert_eq!(id.to_string(), "0xabc");
    }

    #[test]
    fn test_timestamp_ordering() {
        assert!(Timestamp::new(10) < Timestamp::new(20));
        assert_eq!(Timestamp::default().as_secs(), 0);
    }
}
