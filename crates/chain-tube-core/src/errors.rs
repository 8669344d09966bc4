//! Harness error types.
//!
//! Two tiers cross the boundary:
//!
//! - [`ReportedError`](crate::result::ReportedError) - expected domain
//!   failures (a transaction that fails, an unknown query route). These are
//!   encoded into a result envelope and handed back to the caller.
//! - [`FatalError`] - contract violations between caller and harness (a
//!   handle the harness never issued, undecodable base64, a genesis that does
//!   not load). The C boundary logs these and aborts the process.

use std::fmt;

/// Unrecoverable harness failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FatalError {
    /// The handle was never issued or has been cleaned up.
    UnknownHandle(u64),
    /// A base64 argument did not decode.
    Base64(String),
    /// The coins argument of `fund_account` is not a coin or coin list.
    CoinsJson(String),
    /// An address argument is not a valid account address.
    Address { input: String, reason: String },
    /// The addressed account does not exist.
    AccountNotFound(String),
    /// Building the application or loading genesis failed.
    Bootstrap(String),
    /// Producing or committing a block failed.
    Block(String),
    /// Creating or removing the scratch directory failed.
    ScratchDir(String),
    /// `validator_address` index outside the validator set.
    ValidatorIndex { index: i32, count: usize },
    /// Any other state access that should never fail.
    State(String),
}

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FatalError::UnknownHandle(id) => write!(f, "env not found: {}", id),
            FatalError::Base64(msg) => write!(f, "{}", msg),
            FatalError::CoinsJson(reason) => write!(f, "invalid coins json: {}", reason),
            FatalError::Address { input, reason } => {
                write!(f, "invalid address '{}': {}", input, reason)
            }
            FatalError::AccountNotFound(addr) => write!(f, "account {} not found", addr),
            FatalError::Bootstrap(msg) => write!(f, "environment setup failed: {}", msg),
            FatalError::Block(msg) => write!(f, "block production failed: {}", msg),
            FatalError::ScratchDir(msg) => write!(f, "scratch directory error: {}", msg),
            FatalError::ValidatorIndex { index, count } => write!(
                f,
                "validator index {} out of range ({} validators)",
                index, count
            ),
            FatalError::State(msg) => write!(f, "state access failed: {}", msg),
        }
    }
}

impl std::error::Error for FatalError {}

pub type FatalResult<T> = Result<T, FatalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_the_handle() {
        assert_eq!(FatalError::UnknownHandle(7).to_string(), "env not found: 7");
    }

    #[test]
    fn test_validator_index_message() {
        let err = FatalError::ValidatorIndex { index: 3, count: 1 };
        assert!(err.to_string().contains("index 3"));
        assert!(err.to_string().contains("1 validators"));
    }
}
