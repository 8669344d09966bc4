//! Result envelope codec.
//!
//! Every boundary operation with a reportable failure answers with one
//! envelope: a tag byte followed by either the raw success payload or a
//! UTF-8 error message. The envelope travels as standard base64 text.
//!
//! | tag | meaning        | payload       |
//! |-----|----------------|---------------|
//! | `0` | ok             | raw bytes     |
//! | `1` | query error    | UTF-8 message |
//! | `2` | execute error  | UTF-8 message |

use std::fmt;

use chain_tube_types::encoding::{base64_encode, try_base64_decode};

/// Error code carried in the envelope tag byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorCode {
    QueryError = 1,
    ExecuteError = 2,
}

impl ErrorCode {
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(ErrorCode::QueryError),
            2 => Some(ErrorCode::ExecuteError),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::QueryError => write!(f, "query error"),
            ErrorCode::ExecuteError => write!(f, "execute error"),
        }
    }
}

/// A domain failure reported back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportedError {
    pub code: ErrorCode,
    pub message: String,
}

impl ReportedError {
    pub fn query(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::QueryError,
            message: message.into(),
        }
    }

    pub fn execute(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::ExecuteError,
            message: message.into(),
        }
    }
}

impl fmt::Display for ReportedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ReportedError {}

/// Why an envelope could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    Base64,
    Empty,
    UnknownTag(u8),
    InvalidUtf8,
}

impl fmt::Display for EnvelopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvelopeError::Base64 => write!(f, "envelope is not valid base64"),
            EnvelopeError::Empty => write!(f, "envelope has no tag byte"),
            EnvelopeError::UnknownTag(tag) => write!(f, "undefined envelope code: {}", tag),
            EnvelopeError::InvalidUtf8 => write!(f, "error message is not valid UTF-8"),
        }
    }
}

impl std::error::Error for EnvelopeError {}

/// Tagged success-or-error result of one boundary operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultEnvelope(pub Result<Vec<u8>, ReportedError>);

impl ResultEnvelope {
    pub const OK_TAG: u8 = 0;

    pub fn ok(payload: Vec<u8>) -> Self {
        Self(Ok(payload))
    }

    pub fn err(error: ReportedError) -> Self {
        Self(Err(error))
    }

    pub fn is_ok(&self) -> bool {
        self.0.is_ok()
    }

    pub fn encode(&self) -> Vec<u8> {
        match &self.0 {
            Ok(payload) => {
                let mut out = Vec::with_capacity(payload.len() + 1);
                out.push(Self::OK_TAG);
                out.extend_from_slice(payload);
                out
            }
            Err(e) => {
                let mut out = Vec::with_capacity(e.message.len() + 1);
                out.push(e.code.as_byte());
                out.extend_from_slice(e.message.as_bytes());
                out
            }
        }
    }

    pub fn to_base64(&self) -> String {
        base64_encode(&self.encode())
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        let (&tag, content) = bytes.split_first().ok_or(EnvelopeError::Empty)?;
        if tag == Self::OK_TAG {
            return Ok(Self::ok(content.to_vec()));
        }
        let code = ErrorCode::from_byte(tag).ok_or(EnvelopeError::UnknownTag(tag))?;
        let message = std::str::from_utf8(content).map_err(|_| EnvelopeError::InvalidUtf8)?;
        Ok(Self::err(ReportedError {
            code,
            message: message.to_string(),
        }))
    }

    pub fn from_base64(b64: &str) -> Result<Self, EnvelopeError> {
        let bytes = try_base64_decode(b64).ok_or(EnvelopeError::Base64)?;
        Self::decode(&bytes)
    }

    pub fn into_result(self) -> Result<Vec<u8>, ReportedError> {
        self.0
    }
}

impl From<Result<Vec<u8>, ReportedError>> for ResultEnvelope {
    fn from(result: Result<Vec<u8>, ReportedError>) -> Self {
        Self(result)
    }
}
