//! Key material.
//!
//! Accounts sign with secp256k1 (ECDSA over SHA-256, 64-byte compact
//! signatures, 33-byte compressed public keys). Validators use ed25519 for
//! consensus. Both derive their address as the first 20 bytes of SHA-256 of
//! the public key.

use std::fmt;

use k256::ecdsa::signature::{Signer, Verifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use rand::rngs::OsRng;

use crate::address::Address;
use crate::proto::crypto::{Ed25519PubKey, Secp256k1PubKey};
use crate::proto::{Any, TypeUrl};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    InvalidPrivateKey(String),
    InvalidPublicKey(String),
    UnsupportedKeyType(String),
}

impl fmt::Display for KeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyError::InvalidPrivateKey(e) => write!(f, "invalid private key: {}", e),
            KeyError::InvalidPublicKey(e) => write!(f, "invalid public key: {}", e),
            KeyError::UnsupportedKeyType(url) => write!(f, "unsupported public key type: {}", url),
        }
    }
}

impl std::error::Error for KeyError {}

/// secp256k1 account key.
#[derive(Clone)]
pub struct Secp256k1Key {
    inner: SigningKey,
}

impl Secp256k1Key {
    pub fn generate() -> Self {
        Self {
            inner: SigningKey::random(&mut OsRng),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        SigningKey::from_slice(bytes)
            .map(|inner| Self { inner })
            .map_err(|e| KeyError::InvalidPrivateKey(e.to_string()))
    }

    /// Raw 32-byte private scalar.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.inner.to_bytes().to_vec()
    }

    /// 33-byte compressed SEC1 public key.
    pub fn public_key_bytes(&self) -> Vec<u8> {
        self.inner.verifying_key().to_sec1_bytes().to_vec()
    }

    pub fn public_key_any(&self) -> Any {
        Any::pack(&Secp256k1PubKey {
            key: self.public_key_bytes(),
        })
    }

    pub fn address(&self) -> Address {
        Address::from_pubkey_bytes(&self.public_key_bytes())
    }

    pub fn sign(&self, msg: &[u8]) -> Vec<u8> {
        let signature: Signature = self.inner.sign(msg);
        signature.to_bytes().to_vec()
    }
}

impl fmt::Debug for Secp256k1Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secp256k1Key")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

/// ed25519 consensus key.
#[derive(Clone)]
pub struct Ed25519Key {
    inner: ed25519_dalek::SigningKey,
}

impl Ed25519Key {
    pub fn generate() -> Self {
        Self {
            inner: ed25519_dalek::SigningKey::generate(&mut OsRng),
        }
    }

    pub fn public_key_bytes(&self) -> Vec<u8> {
        self.inner.verifying_key().to_bytes().to_vec()
    }

    pub fn public_key_any(&self) -> Any {
        Any::pack(&Ed25519PubKey {
            key: self.public_key_bytes(),
        })
    }

    pub fn address(&self) -> Address {
        Address::from_pubkey_bytes(&self.public_key_bytes())
    }
}

impl fmt::Debug for Ed25519Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ed25519Key")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

/// Extract the raw key bytes from an `Any`-packed public key and derive its address.
pub fn address_from_pubkey_any(any: &Any) -> Result<Address, KeyError> {
    Ok(Address::from_pubkey_bytes(&pubkey_bytes_from_any(any)?))
}

pub fn pubkey_bytes_from_any(any: &Any) -> Result<Vec<u8>, KeyError> {
    let decode_err = |e: prost::DecodeError| KeyError::InvalidPublicKey(e.to_string());
    if any.type_url == Secp256k1PubKey::TYPE_URL {
        let pk = any
            .unpack::<Secp256k1PubKey>()
            .map_err(decode_err)?
            .unwrap_or_default();
        if pk.key.len() != 33 {
            return Err(KeyError::InvalidPublicKey(format!(
                "secp256k1 key must be 33 bytes, got {}",
                pk.key.len()
            )));
        }
        Ok(pk.key)
    } else if any.type_url == Ed25519PubKey::TYPE_URL {
        let pk = any
            .unpack::<Ed25519PubKey>()
            .map_err(decode_err)?
            .unwrap_or_default();
        if pk.key.len() != 32 {
            return Err(KeyError::InvalidPublicKey(format!(
                "ed25519 key must be 32 bytes, got {}",
                pk.key.len()
            )));
        }
        Ok(pk.key)
    } else {
        Err(KeyError::UnsupportedKeyType(any.type_url.clone()))
    }
}

/// Verify a 64-byte compact secp256k1 signature over `msg`.
pub fn verify_secp256k1(pubkey: &[u8], msg: &[u8], signature: &[u8]) -> bool {
    let Ok(key) = VerifyingKey::from_sec1_bytes(pubkey) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(signature) else {
        return false;
    };
    key.verify(msg, &signature).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secp256k1_private_key_roundtrip() {
        let key = Secp256k1Key::generate();
        let restored = Secp256k1Key::from_bytes(&key.to_bytes()).unwrap();
        assert_eq!(key.address(), restored.address());
        assert_eq!(key.public_key_bytes().len(), 33);
    }

    #[test]
    fn test_sign_and_verify() {
        let key = Secp256k1Key::generate();
        let sig = key.sign(b"sign doc");
        assert_eq!(sig.len(), 64);
        assert!(verify_secp256k1(&key.public_key_bytes(), b"sign doc", &sig));
        assert!(!verify_secp256k1(&key.public_key_bytes(), b"tampered", &sig));
    }

    #[test]
    fn test_address_from_pubkey_any() {
        let key = Secp256k1Key::generate();
        assert_eq!(address_from_pubkey_any(&key.public_key_any()).unwrap(), key.address());

        let cons = Ed25519Key::generate();
        assert_eq!(address_from_pubkey_any(&cons.public_key_any()).unwrap(), cons.address());

        let bogus = Any {
            type_url: "/unknown.Key".to_string(),
            value: vec![],
        };
        assert!(matches!(
            address_from_pubkey_any(&bogus),
            Err(KeyError::UnsupportedKeyType(_))
        ));
    }

    #[test]
    fn test_invalid_private_key() {
        assert!(Secp256k1Key::from_bytes(&[0u8; 3]).is_err());
    }
}
