//! BRIT wire messages.
//!
//! Both messages are UTF-8 text, one field per line, encrypted before they
//! leave the process.
//!
//! # Layout
//!
//! | Message           | Rows                                                                 |
//! |-------------------|----------------------------------------------------------------------|
//! | `PayerRequest`    | `version`, `walletId` (hex), `sessionKey` (hex), `firstTxDate`       |
//! | `MatcherResponse` | `version`, `replayDate`, then one address per row                    |
//!
//! Dates are epoch milliseconds, or [`NOT_PRESENT`] when absent.
//!
//! # Versions
//!
//! The request's version selects the response cipher on both ends. The
//! version a response reports about itself is informational only.

mod request;
mod response;

pub use request::*;
pub use response::*;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{BritError, Result};

/// Row separator for both messages.
pub const SEPARATOR: char = '\n';

/// Marker written in place of an absent date.
pub const NOT_PRESENT: &str = "not-present";

/// Protocol versions this library speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum ProtocolVersion {
    /// AES-CBC response with no MAC. Kept for legacy wallets.
    V1,
    /// AES-CBC response followed by an HMAC-SHA256 tag.
    V2,
}

impl ProtocolVersion {
    /// Version used for new requests.
    pub const CURRENT: Self = Self::V2;

    pub fn as_u32(self) -> u32 {
        match self {
            Self::V1 => 1,
            Self::V2 => 2,
        }
    }

    /// Whether responses under this version carry a MAC.
    pub fn is_authenticated(self) -> bool {
        matches!(self, Self::V2)
    }
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        Self::CURRENT
    }
}

impl TryFrom<u32> for ProtocolVersion {
    type Error = BritError;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            1 => Ok(Self::V1),
            2 => Ok(Self::V2),
            other => Err(BritError::UnsupportedProtocolVersion(other)),
        }
    }
}

impl From<ProtocolVersion> for u32 {
    fn from(value: ProtocolVersion) -> Self {
        value.as_u32()
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u32())
    }
}

/// Parse a version row, mapping every failure through `err`.
pub(crate) fn parse_version_row(
    row: &str,
    err: impl Fn(String) -> BritError,
) -> Result<ProtocolVersion> {
    let raw: u32 = row
        .trim()
        .parse()
        .map_err(|_| err(format!("version row '{}' is not numeric", row)))?;
    ProtocolVersion::try_from(raw)
        .map_err(|_| err(format!("version {} is outside the range [1,2]", raw)))
}

pub(crate) fn encode_optional_date(date: Option<&DateTime<Utc>>) -> String {
    match date {
        Some(date) => date.timestamp_millis().to_string(),
        None => NOT_PRESENT.to_string(),
    }
}

pub(crate) fn parse_optional_date(
    row: &str,
    err: impl Fn(String) -> BritError,
) -> Result<Option<DateTime<Utc>>> {
    let row = row.trim();
    if row == NOT_PRESENT {
        return Ok(None);
    }
    let millis: i64 = row
        .parse()
        .map_err(|_| err(format!("date row '{}' is not epoch millis", row)))?;
    DateTime::from_timestamp_millis(millis)
        .map(Some)
        .ok_or_else(|| err(format!("date {} is out of range", millis)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_conversion() {
        assert_eq!(ProtocolVersion::try_from(1).unwrap(), ProtocolVersion::V1);
        assert_eq!(ProtocolVersion::try_from(2).unwrap(), ProtocolVersion::V2);
        assert!(matches!(
            ProtocolVersion::try_from(3),
            Err(BritError::UnsupportedProtocolVersion(3))
        ));
        assert!(matches!(
            ProtocolVersion::try_from(0),
            Err(BritError::UnsupportedProtocolVersion(0))
        ));
        assert_eq!(ProtocolVersion::CURRENT.to_string(), "2");
    }

    #[test]
    fn test_version_serde_is_numeric() {
        let json = serde_json::to_string(&ProtocolVersion::V1).unwrap();
        assert_eq!(json, "1");
        assert!(serde_json::from_str::<ProtocolVersion>("5").is_err());
    }

    #[test]
    fn test_optional_date() {
        let date = DateTime::from_timestamp_millis(1_400_000_000_123).unwrap();
        let row = encode_optional_date(Some(&date));
        assert_eq!(row, "1400000000123");
        assert_eq!(
            parse_optional_date(&row, BritError::MalformedRequest).unwrap(),
            Some(date)
        );
        assert_eq!(
            parse_optional_date(NOT_PRESENT, BritError::MalformedRequest).unwrap(),
            None
        );
        assert!(parse_optional_date("yesterday", BritError::MalformedRequest).is_err());
    }
}
