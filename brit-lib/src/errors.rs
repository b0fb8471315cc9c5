//! Error types for BRIT operations.
//!
//! Every fallible protocol operation returns [`BritError`]. The variants map
//! onto the failure classes a caller has to tell apart: structural problems
//! with a message, cryptographic failures, and "the Matcher could not be
//! reached" (which callers answer with the hardwired-address fallback).

use std::fmt;

/// Error codes for FFI and mobile integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum BritErrorCode {
    /// Request plaintext did not parse
    MalformedRequest = 1000,
    /// Response plaintext or envelope did not parse
    MalformedResponse = 1001,
    /// Protocol version outside the supported range
    UnsupportedProtocolVersion = 1002,
    /// Asymmetric encryption of a request failed
    RequestEncryptionFailed = 2000,
    /// Asymmetric decryption of a request failed
    RequestDecryptionFailed = 2001,
    /// Response MAC did not verify
    IntegrityCheckFailed = 2002,
    /// A single address row was dropped while parsing a response
    AddressParseSkipped = 3000,
    /// Mnemonic failed validation
    InvalidSeedPhrase = 4000,
    /// Address failed Base58Check validation
    InvalidAddress = 4001,
    /// Address store failure
    Store = 5000,
    /// Matcher could not be reached
    Transport = 6000,
}

/// Error type for BRIT protocol operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BritError {
    /// Serialized `PayerRequest` is structurally invalid.
    MalformedRequest(String),

    /// Serialized or encrypted `MatcherResponse` is structurally invalid.
    MalformedResponse(String),

    /// A raw protocol version value is not one this library speaks.
    UnsupportedProtocolVersion(u32),

    /// The asymmetric engine could not encrypt the request.
    RequestEncryptionFailed(String),

    /// Wrong keyring, wrong password or corrupt request ciphertext.
    RequestDecryptionFailed(String),

    /// The v2 response MAC did not match. Nothing from the message is used.
    IntegrityCheckFailed,

    /// An address row was skipped. Never returned from a parse; it is
    /// reported through logs and [`crate::protocol::ParsedMatcherResponse`].
    AddressParseSkipped {
        /// The offending row
        row: String,
        /// Why it was rejected
        reason: String,
    },

    /// Mnemonic has an unsupported length or a bad checksum.
    InvalidSeedPhrase(String),

    /// Address string is not a valid main-net Base58Check address.
    InvalidAddress {
        /// The rejected input
        address: String,
        /// Validation failure
        reason: String,
    },

    /// Address store failure.
    Store(String),

    /// The Matcher could not be reached.
    Transport(String),
}

impl BritError {
    /// Get the error code for FFI/mobile integration.
    pub fn code(&self) -> BritErrorCode {
        match self {
            Self::MalformedRequest(_) => BritErrorCode::MalformedRequest,
            Self::MalformedResponse(_) => BritErrorCode::MalformedResponse,
            Self::UnsupportedProtocolVersion(_) => BritErrorCode::UnsupportedProtocolVersion,
            Self::RequestEncryptionFailed(_) => BritErrorCode::RequestEncryptionFailed,
            Self::RequestDecryptionFailed(_) => BritErrorCode::RequestDecryptionFailed,
            Self::IntegrityCheckFailed => BritErrorCode::IntegrityCheckFailed,
            Self::AddressParseSkipped { .. } => BritErrorCode::AddressParseSkipped,
            Self::InvalidSeedPhrase(_) => BritErrorCode::InvalidSeedPhrase,
            Self::InvalidAddress { .. } => BritErrorCode::InvalidAddress,
            Self::Store(_) => BritErrorCode::Store,
            Self::Transport(_) => BritErrorCode::Transport,
        }
    }

    /// Get the error message as an owned String (useful for FFI).
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Returns true if retrying the same operation later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Store(_))
    }

    /// Returns true for failures that mean a message was tampered with or
    /// was not addressed to us. These must never trigger a fallback.
    pub fn is_verification_failure(&self) -> bool {
        matches!(
            self,
            Self::IntegrityCheckFailed
                | Self::MalformedResponse(_)
                | Self::UnsupportedProtocolVersion(_)
                | Self::RequestDecryptionFailed(_)
        )
    }

    /// Create a malformed request error.
    pub fn malformed_request(reason: impl Into<String>) -> Self {
        Self::MalformedRequest(reason.into())
    }

    /// Create a malformed response error.
    pub fn malformed_response(reason: impl Into<String>) -> Self {
        Self::MalformedResponse(reason.into())
    }

    /// Create an invalid address error.
    pub fn invalid_address(address: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAddress {
            address: address.into(),
            reason: reason.into(),
        }
    }

    /// Create a transport error from any error type.
    pub fn transport<E: std::error::Error>(err: E) -> Self {
        Self::Transport(err.to_string())
    }
}

impl fmt::Display for BritError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedRequest(msg) => write!(f, "malformed payer request: {}", msg),
            Self::MalformedResponse(msg) => write!(f, "malformed matcher response: {}", msg),
            Self::UnsupportedProtocolVersion(version) => {
                write!(f, "unsupported BRIT protocol version: {}", version)
            }
            Self::RequestEncryptionFailed(msg) => write!(f, "request encryption failed: {}", msg),
            Self::RequestDecryptionFailed(msg) => write!(f, "request decryption failed: {}", msg),
            Self::IntegrityCheckFailed => {
                write!(f, "matcher response failed integrity check")
            }
            Self::AddressParseSkipped { row, reason } => {
                write!(f, "skipped address row '{}': {}", row, reason)
            }
            Self::InvalidSeedPhrase(msg) => write!(f, "invalid seed phrase: {}", msg),
            Self::InvalidAddress { address, reason } => {
                write!(f, "invalid address '{}': {}", address, reason)
            }
            Self::Store(msg) => write!(f, "address store error: {}", msg),
            Self::Transport(msg) => write!(f, "matcher unreachable: {}", msg),
        }
    }
}

impl std::error::Error for BritError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            BritError::IntegrityCheckFailed.code(),
            BritErrorCode::IntegrityCheckFailed
        );
        assert_eq!(BritErrorCode::IntegrityCheckFailed as i32, 2002);

        let err = BritError::Transport("connection refused".into());
        assert_eq!(err.code(), BritErrorCode::Transport);
        assert!(err.is_retryable());
        assert!(!err.is_verification_failure());
    }

    #[test]
    fn test_verification_failures_are_not_retryable() {
        let errs = [
            BritError::IntegrityCheckFailed,
            BritError::malformed_response("too short"),
            BritError::UnsupportedProtocolVersion(3),
        ];
        for err in errs {
            assert!(err.is_verification_failure());
            assert!(!err.is_retryable());
        }
    }

    #[test]
    fn test_error_display() {
        let err = BritError::invalid_address("1XXX", "bad checksum");
        assert!(err.to_string().contains("1XXX"));
        assert!(err.to_string().contains("bad checksum"));

        let err = BritError::UnsupportedProtocolVersion(7);
        assert_eq!(err.to_string(), "unsupported BRIT protocol version: 7");
    }
}
