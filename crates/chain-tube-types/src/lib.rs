//! Shared types for the chain-tube workspace.
//!
//! This crate provides the foundational types used by the application double,
//! the harness core, the C boundary and the Rust runner client:
//!
//! - [`proto`] - protobuf wire messages (transactions, queries, params, results)
//! - [`address`] - 20-byte addresses and their bech32 text form
//! - [`coin`] - coin amount parsing, validation and arithmetic
//! - [`keys`] - secp256k1 / ed25519 key material and signatures
//! - [`encoding`] - base64 helpers with context-aware errors
//! - [`env_utils`] - typed environment variable parsing

pub mod address;
pub mod coin;
pub mod encoding;
pub mod env_utils;
pub mod keys;
pub mod proto;

pub use address::{Address, AddressError, Bech32Prefixes, ADDRESS_LEN};
pub use coin::CoinError;
pub use keys::{Ed25519Key, KeyError, Secp256k1Key};
pub use proto::{Any, Coin, TypeUrl};
