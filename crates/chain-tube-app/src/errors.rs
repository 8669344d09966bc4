//! Application error type.
//!
//! Every domain failure of the chain application surfaces as an [`AppError`].
//! The `Display` output is the message the harness reports back to callers,
//! so variants render in the same terse style as the chain's own errors.

use std::fmt;

use chain_tube_types::{AddressError, CoinError, KeyError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Malformed transaction bytes or structure.
    TxDecode(String),
    /// A request or message failed stateless validation.
    InvalidRequest(String),
    /// Signer not permitted to perform the action.
    Unauthorized(String),
    /// Signature did not verify against the sign document.
    InvalidSignature { signer: String },
    /// Account sequence in the signer info does not match state.
    WrongSequence { expected: u64, got: u64 },
    /// Referenced account does not exist.
    UnknownAddress(String),
    InsufficientFunds {
        address: String,
        needed: String,
        available: String,
    },
    InsufficientFee(String),
    OutOfGas {
        limit: u64,
        used: u64,
        descriptor: String,
    },
    /// Transaction exceeds a consensus block limit.
    BlockLimit(String),
    /// No handler for the message type.
    UnknownMessage(String),
    /// No query handler is registered for the path.
    NoRoute(String),
    NotFound(String),
    AlreadyExists(String),
    SendDisabled(String),
    /// A parameter set failed validation.
    InvalidParams(String),
    /// A parameter set does not match the subspace's declared type.
    ParamsTypeMismatch {
        subspace: String,
        expected: String,
        got: String,
    },
    InvalidGenesis(String),
    /// Block request violates height or time continuity.
    InvalidBlock(String),
    Address(AddressError),
    Coin(CoinError),
    Key(KeyError),
    Decode(String),
    Io(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::TxDecode(msg) => write!(f, "tx parse error: {}", msg),
            AppError::InvalidRequest(msg) => write!(f, "invalid request: {}", msg),
            AppError::Unauthorized(msg) => write!(f, "unauthorized: {}", msg),
            AppError::InvalidSignature { signer } => write!(
                f,
                "signature verification failed for {}; please verify account number, sequence and chain-id: unauthorized",
                signer
            ),
            AppError::WrongSequence { expected, got } => write!(
                f,
                "account sequence mismatch, expected {}, got {}: incorrect account sequence",
                expected, got
            ),
            AppError::UnknownAddress(addr) => {
                write!(f, "account {} not found: unknown address", addr)
            }
            AppError::InsufficientFunds {
                address,
                needed,
                available,
            } => write!(
                f,
                "spendable balance {} is smaller than {} for {}: insufficient funds",
                if available.is_empty() { "0" } else { available },
                needed,
                address
            ),
            AppError::InsufficientFee(msg) => write!(f, "insufficient fee: {}", msg),
            AppError::OutOfGas {
                limit,
                used,
                descriptor,
            } => write!(
                f,
                "out of gas in location: {}; gasWanted: {}, gasUsed: {}: out of gas",
                descriptor, limit, used
            ),
            AppError::BlockLimit(msg) => write!(f, "block limit exceeded: {}", msg),
            AppError::UnknownMessage(url) => {
                write!(f, "unrecognized message type: {}: unknown request", url)
            }
            AppError::NoRoute(path) => write!(f, "No route found for `{}`", path),
            AppError::NotFound(msg) => write!(f, "{}: not found", msg),
            AppError::AlreadyExists(msg) => write!(f, "{}: already exists", msg),
            AppError::SendDisabled(denom) => {
                write!(f, "{} transfers are currently disabled: send not enabled", denom)
            }
            AppError::InvalidParams(msg) => write!(f, "invalid params: {}", msg),
            AppError::ParamsTypeMismatch {
                subspace,
                expected,
                got,
            } => write!(
                f,
                "param set type mismatch for subspace {}: expected {}, got {}",
                subspace, expected, got
            ),
            AppError::InvalidGenesis(msg) => write!(f, "invalid genesis: {}", msg),
            AppError::InvalidBlock(msg) => write!(f, "invalid block: {}", msg),
            AppError::Address(e) => write!(f, "{}", e),
            AppError::Coin(e) => write!(f, "{}", e),
            AppError::Key(e) => write!(f, "{}", e),
            AppError::Decode(msg) => write!(f, "failed to decode: {}", msg),
            AppError::Io(msg) => write!(f, "io error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<AddressError> for AppError {
    fn from(e: AddressError) -> Self {
        AppError::Address(e)
    }
}

impl From<CoinError> for AppError {
    fn from(e: CoinError) -> Self {
        AppError::Coin(e)
    }
}

impl From<KeyError> for AppError {
    fn from(e: KeyError) -> Self {
        AppError::Key(e)
    }
}

impl From<prost::DecodeError> for AppError {
    fn from(e: prost::DecodeError) -> Self {
        AppError::Decode(e.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Io(e.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
