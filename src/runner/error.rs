//! Client-side error types.

use std::fmt;

use chain_tube_core::{EnvelopeError, ErrorCode, FatalError, ReportedError};

#[derive(Debug, Clone, PartialEq)]
pub enum RunnerError {
    /// The harness answered a query with an error envelope.
    QueryError { msg: String },
    /// The harness answered a transaction with an error envelope.
    ExecuteError { msg: String },
    /// A harness call violated its contract.
    Fatal(FatalError),
    DecodeError(DecodeError),
    EncodeError(EncodeError),
    GenericError(String),
}

impl fmt::Display for RunnerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunnerError::QueryError { msg } => write!(f, "query error: {}", msg),
            RunnerError::ExecuteError { msg } => write!(f, "execute error: {}", msg),
            RunnerError::Fatal(e) => write!(f, "harness failure: {}", e),
            RunnerError::DecodeError(e) => write!(f, "decode error: {}", e),
            RunnerError::EncodeError(e) => write!(f, "encode error: {}", e),
            RunnerError::GenericError(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for RunnerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RunnerError::Fatal(e) => Some(e),
            RunnerError::DecodeError(e) => Some(e),
            RunnerError::EncodeError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ReportedError> for RunnerError {
    fn from(e: ReportedError) -> Self {
        match e.code {
            ErrorCode::QueryError => RunnerError::QueryError { msg: e.message },
            ErrorCode::ExecuteError => RunnerError::ExecuteError { msg: e.message },
        }
    }
}

impl From<FatalError> for RunnerError {
    fn from(e: FatalError) -> Self {
        RunnerError::Fatal(e)
    }
}

impl From<DecodeError> for RunnerError {
    fn from(e: DecodeError) -> Self {
        RunnerError::DecodeError(e)
    }
}

impl From<EncodeError> for RunnerError {
    fn from(e: EncodeError) -> Self {
        RunnerError::EncodeError(e)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// The response envelope itself is malformed.
    Envelope(EnvelopeError),
    ProtoDecodeError(prost::DecodeError),
    /// A key or address handed back by the harness does not parse.
    InvalidKey(String),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Envelope(e) => write!(f, "invalid result envelope: {}", e),
            DecodeError::ProtoDecodeError(e) => write!(f, "{}", e),
            DecodeError::InvalidKey(msg) => write!(f, "invalid key: {}", msg),
        }
    }
}

impl std::error::Error for DecodeError {}

#[derive(Debug, Clone, PartialEq)]
pub enum EncodeError {
    JsonEncodeError(String),
    /// The signer's account could not be read while building a transaction.
    MissingAccount(String),
    /// A fee coin amount is not an unsigned integer.
    InvalidFee(String),
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::JsonEncodeError(msg) => write!(f, "json encoding failed: {}", msg),
            EncodeError::MissingAccount(addr) => {
                write!(f, "cannot sign for {}: account does not exist", addr)
            }
            EncodeError::InvalidFee(amount) => write!(f, "invalid fee amount '{}'", amount),
        }
    }
}

impl std::error::Error for EncodeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reported_error_maps_by_code() {
        assert_eq!(
            RunnerError::from(ReportedError::query("no route")),
            RunnerError::QueryError {
                msg: "no route".to_string()
            }
        );
        assert_eq!(
            RunnerError::from(ReportedError::execute("out of gas")),
            RunnerError::ExecuteError {
                msg: "out of gas".to_string()
            }
        );
    }

    #[test]
    fn test_display_keeps_message() {
        let err = RunnerError::ExecuteError {
            msg: "insufficient funds".to_string(),
        };
        assert_eq!(err.to_string(), "execute error: insufficient funds");
    }
}
