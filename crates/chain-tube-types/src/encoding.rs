//! Base64 helpers.
//!
//! Every payload that crosses the C boundary (transactions, query
//! requests, private keys and result envelopes) is standard padded base64.

use anyhow::{anyhow, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

pub fn base64_encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode `b64`, naming `what` was being decoded in the error.
///
/// ```
/// use chain_tube_types::encoding::base64_decode;
///
/// assert_eq!(base64_decode("AQI=", "payload").unwrap(), vec![1, 2]);
/// assert!(base64_decode("@@", "tx bytes").unwrap_err().to_string().contains("tx bytes"));
/// ```
pub fn base64_decode(b64: &str, what: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(b64)
        .map_err(|e| anyhow!("invalid base64 {what}: {e}"))
}

/// Like [`base64_decode`] but drops the error.
pub fn try_base64_decode(b64: &str) -> Option<Vec<u8>> {
    STANDARD.decode(b64).ok()
}
