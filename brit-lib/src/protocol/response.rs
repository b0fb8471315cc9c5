use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use super::{encode_optional_date, parse_optional_date, parse_version_row, ProtocolVersion, SEPARATOR};
use crate::address::BitcoinAddress;
use crate::{BritError, Result};

/// The Matcher's answer: where to pay fees and how far back to replay.
///
/// Equality compares the replay date and the address set. The version is
/// carried for diagnostics only.
#[derive(Debug, Clone, Eq)]
pub struct MatcherResponse {
    version: ProtocolVersion,
    replay_date: Option<DateTime<Utc>>,
    addresses: BTreeSet<BitcoinAddress>,
}

impl PartialEq for MatcherResponse {
    fn eq(&self, other: &Self) -> bool {
        self.replay_date == other.replay_date && self.addresses == other.addresses
    }
}

impl MatcherResponse {
    /// Build a response at the current protocol version.
    pub fn new(
        replay_date: Option<DateTime<Utc>>,
        addresses: impl IntoIterator<Item = BitcoinAddress>,
    ) -> Self {
        Self::with_version(ProtocolVersion::CURRENT, replay_date, addresses)
    }

    pub fn with_version(
        version: ProtocolVersion,
        replay_date: Option<DateTime<Utc>>,
        addresses: impl IntoIterator<Item = BitcoinAddress>,
    ) -> Self {
        Self {
            version,
            replay_date,
            addresses: addresses.into_iter().collect(),
        }
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    pub fn replay_date(&self) -> Option<&DateTime<Utc>> {
        self.replay_date.as_ref()
    }

    pub fn addresses(&self) -> &BTreeSet<BitcoinAddress> {
        &self.addresses
    }

    /// Encode as `version`, `replayDate`, then one row per address.
    ///
    /// Every row is terminated by the separator. Addresses are written in
    /// sorted order, so the output is stable across calls.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = String::new();
        out.push_str(&self.version.to_string());
        out.push(SEPARATOR);
        out.push_str(&encode_optional_date(self.replay_date.as_ref()));
        out.push(SEPARATOR);
        for address in &self.addresses {
            out.push_str(address.as_str());
            out.push(SEPARATOR);
        }
        out.into_bytes()
    }

    /// Decode a serialized response, dropping unusable address rows.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        Self::parse_detailed(bytes).map(|parsed| parsed.response)
    }

    /// Decode a serialized response and report which rows were dropped.
    ///
    /// # Errors
    ///
    /// [`BritError::MalformedResponse`] if the text is not UTF-8, the version
    /// row is missing, non-numeric or outside `[1,2]`, or the replay date row
    /// is missing or unreadable. A bad address row is never an error.
    pub fn parse_detailed(bytes: &[u8]) -> Result<ParsedMatcherResponse> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| BritError::malformed_response(format!("not UTF-8: {e}")))?;
        let mut rows = text.split(SEPARATOR);

        let version_row = rows
            .next()
            .filter(|row| !row.trim().is_empty())
            .ok_or_else(|| BritError::malformed_response("missing version row"))?;
        let version = parse_version_row(version_row, BritError::MalformedResponse)?;

        let replay_row = rows
            .next()
            .ok_or_else(|| BritError::malformed_response("missing replay date row"))?;
        let replay_date = parse_optional_date(replay_row, BritError::MalformedResponse)?;

        let mut addresses = BTreeSet::new();
        let mut skipped = Vec::new();
        for row in rows.map(str::trim).filter(|row| !row.is_empty()) {
            match BitcoinAddress::new(row) {
                Ok(address) => {
                    addresses.insert(address);
                }
                Err(e) => {
                    tracing::warn!(row, error = %e, "skipping malformed address in matcher response");
                    skipped.push(BritError::AddressParseSkipped {
                        row: row.to_owned(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        tracing::debug!(
            %version,
            addresses = addresses.len(),
            skipped = skipped.len(),
            "parsed matcher response"
        );
        Ok(ParsedMatcherResponse {
            response: Self {
                version,
                replay_date,
                addresses,
            },
            skipped,
        })
    }
}

/// A parsed response plus the address rows that were dropped on the way.
#[derive(Debug, Clone)]
pub struct ParsedMatcherResponse {
    pub response: MatcherResponse,
    /// One [`BritError::AddressParseSkipped`] per dropped row.
    pub skipped: Vec<BritError>,
}

impl ParsedMatcherResponse {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

/// A serialized [`MatcherResponse`] after the response cipher.
///
/// Version 1 payloads are bare AES-CBC ciphertext. Version 2 payloads carry a
/// trailing 32-byte HMAC-SHA256 tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedMatcherResponse {
    payload: Vec<u8>,
}

impl EncryptedMatcherResponse {
    pub fn new(payload: Vec<u8>) -> Self {
        Self { payload }
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }
}
