//! Participant and contract addresses.

use crate::hash::hash_concat;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Raw address bytes.
pub type AddressBytes = [u8; 20];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid address: {0}")]
    Invalid(String),
}

/// Identity of a participant or of a deployed contract instance.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(pub AddressBytes);

impl Address {
    /// The zero address. Never a valid transfer recipient.
    pub const ZERO: Self = Self([0u8; 20]);

    pub fn from_bytes(bytes: AddressBytes) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &AddressBytes {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// Convert to a hex string (with 0x prefix).
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parse from a hex string (with or without 0x prefix).
    pub fn from_hex(s: &str) -> Result<Self, AddressError> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped).map_err(|_| AddressError::Invalid(s.to_string()))?;
        let arr: AddressBytes = bytes
            .try_into()
            .map_err(|_| AddressError::Invalid(s.to_string()))?;
        Ok(Self(arr))
    }

    /// Address of the contract instance created by `deployer`'s `nonce`-th deployment.
    ///
    /// First 20 bytes of `blake3(deployer || nonce_le)`.
    pub fn derive_contract(deployer: &Address, nonce: u64) -> Self {
        let h = hash_concat(&[&deployer.0, &nonce.to_le_bytes()]);
        let mut addr = [0u8; 20];
        addr.copy_from_slice(&h.0[..20]);
        Self(addr)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Hex string in human-readable formats such as JSON, raw bytes otherwise.
impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex())
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            Self::from_hex(&s).map_err(serde::de::Error::custom)
        } else {
            AddressBytes::deserialize(deserializer).map(Self)
        }
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_roundtrip_with_and_without_prefix() {
        let addr = Address([0xAB; 20]);
        assert_eq!(Address::from_hex(&addr.to_hex()).unwrap(), addr);
        assert_eq!(Address::from_hex(&"ab".repeat(20)).unwrap(), addr);
        assert_eq!(addr.to_string().len(), 42);
    }

    #[test]
    fn test_rejects_wrong_length() {
        assert!(matches!(
            Address::from_hex("0x1234"),
            Err(AddressError::Invalid(_))
        ));
        assert!("0xzz".parse::<Address>().is_err());
    }

    #[test]
    fn test_derived_contract_addresses_are_stable_and_distinct() {
        let deployer = Address([1u8; 20]);
        let first = Address::derive_contract(&deployer, 0);
        assert_eq!(first, Address::derive_contract(&deployer, 0));
        assert_ne!(first, Address::derive_contract(&deployer, 1));
        assert_ne!(first, Address::derive_contract(&Address([2u8; 20]), 0));
    }

    #[test]
    fn test_json_uses_hex() {
        let addr = Address([0x01; 20]);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{}\"", addr.to_hex()));
        assert_eq!(serde_json::from_str::<Address>(&json).unwrap(), addr);
        assert!(serde_json::from_str::<Address>("\"0x12\"").is_err());

        let bytes = bincode::serialize(&addr).unwrap();
        assert_eq!(bytes.len(), 20);
        assert_eq!(bincode::deserialize::<Address>(&bytes).unwrap(), addr);
    }

    #[test]
    fn test_zero_address() {
        assert!(Address::ZERO.is_zero());
        assert!(!Address([1u8; 20]).is_zero());
    }
}
