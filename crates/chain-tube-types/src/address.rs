//! Address utilities.
//!
//! This module is the canonical source for address handling in the workspace.
//! Addresses are 20-byte values rendered as bech32 strings whose human-readable
//! part depends on the role:
//! - account: `core1...`
//! - validator operator: `corevaloper1...`
//! - validator consensus: `corevalcons1...`

use bech32::{Bech32, Hrp};
use sha2::{Digest, Sha256};
use std::fmt;

/// Length of every address in bytes.
pub const ADDRESS_LEN: usize = 20;

/// Errors produced while parsing addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// The string is not valid bech32.
    InvalidBech32 { input: String, reason: String },
    /// The human-readable prefix does not match the expected role.
    WrongPrefix { expected: String, got: String },
    /// The decoded payload has the wrong length.
    InvalidLength { len: usize },
}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressError::InvalidBech32 { input, reason } => {
                write!(f, "invalid bech32 address '{}': {}", input, reason)
            }
            AddressError::WrongPrefix { expected, got } => {
                write!(f, "invalid Bech32 prefix; expected {}, got {}", expected, got)
            }
            AddressError::InvalidLength { len } => {
                write!(
                    f,
                    "address length must be {} bytes, got {}",
                    ADDRESS_LEN, len
                )
            }
        }
    }
}

impl std::error::Error for AddressError {}

/// A 20-byte account, operator or consensus address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, AddressError> {
        let arr: [u8; ADDRESS_LEN] = bytes
            .try_into()
            .map_err(|_| AddressError::InvalidLength { len: bytes.len() })?;
        Ok(Self(arr))
    }

    /// Derive an address from public key bytes: first 20 bytes of SHA-256.
    pub fn from_pubkey_bytes(pubkey: &[u8]) -> Self {
        Self::truncated_hash(pubkey)
    }

    /// Deterministic address of a named module account.
    pub fn module(name: &str) -> Self {
        Self::truncated_hash(name.as_bytes())
    }

    fn truncated_hash(data: &[u8]) -> Self {
        let digest = Sha256::digest(data);
        let mut out = [0u8; ADDRESS_LEN];
        out.copy_from_slice(&digest[..ADDRESS_LEN]);
        Self(out)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Render with the given human-readable prefix.
    pub fn to_bech32(&self, hrp: &str) -> String {
        // Prefixes come from `Bech32Prefixes` and the payload is 20 bytes, both
        // well inside bech32 limits; fall back to hex rather than panic.
        Hrp::parse(hrp)
            .ok()
            .and_then(|hrp| bech32::encode::<Bech32>(hrp, &self.0).ok())
            .unwrap_or_else(|| format!("{}:{}", hrp, hex::encode(self.0)))
    }

    /// Parse a bech32 string and require the given prefix.
    pub fn from_bech32(input: &str, expected_hrp: &str) -> Result<Self, AddressError> {
        let (hrp, data) = bech32::decode(input.trim()).map_err(|e| {
            AddressError::InvalidBech32 {
                input: input.to_string(),
                reason: e.to_string(),
            }
        })?;
        if hrp.as_str() != expected_hrp {
            return Err(AddressError::WrongPrefix {
                expected: expected_hrp.to_string(),
                got: hrp.as_str().to_string(),
            });
        }
        Self::from_slice(&data)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", hex::encode(self.0))
    }
}

/// Human-readable prefixes for each address role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bech32Prefixes {
    pub account: String,
    pub validator: String,
    pub consensus: String,
}

impl Bech32Prefixes {
    /// Derive the role prefixes from a base account prefix.
    pub fn from_base(prefix: &str) -> Self {
        Self {
            account: prefix.to_string(),
            validator: format!("{}valoper", prefix),
            consensus: format!("{}valcons", prefix),
        }
    }
}

impl Default for Bech32Prefixes {
    fn default() -> Self {
        Self::from_base("core")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bech32_roundtrip_with_prefix() {
        let addr = Address::new([7u8; ADDRESS_LEN]);
        let encoded = addr.to_bech32("core");
        assert!(encoded.starts_with("core1"));
        assert_eq!(Address::from_bech32(&encoded, "core").unwrap(), addr);
    }

    #[test]
    fn test_wrong_prefix_rejected() {
        let addr = Address::new([1u8; ADDRESS_LEN]);
        let encoded = addr.to_bech32("corevaloper");
        let err = Address::from_bech32(&encoded, "core").unwrap_err();
        assert!(matches!(err, AddressError::WrongPrefix { .. }));
        assert!(err.to_string().contains("corevaloper"));
    }

    #[test]
    fn test_garbage_rejected() {
        let err = Address::from_bech32("not-an-address", "core").unwrap_err();
        assert!(matches!(err, AddressError::InvalidBech32 { .. }));
    }

    #[test]
    fn test_module_addresses_are_stable_and_distinct() {
        assert_eq!(Address::module("fee_collector"), Address::module("fee_collector"));
        assert_ne!(
            Address::module("bonded_tokens_pool"),
            Address::module("not_bonded_tokens_pool")
        );
    }

    #[test]
    fn test_prefixes_from_base() {
        let p = Bech32Prefixes::from_base("devcore");
        assert_eq!(p.validator, "devcorevaloper");
        assert_eq!(p.consensus, "devcorevalcons");
    }
}
