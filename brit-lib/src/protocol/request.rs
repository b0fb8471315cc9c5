use chrono::{DateTime, Utc};

use super::{encode_optional_date, parse_optional_date, parse_version_row, ProtocolVersion, SEPARATOR};
use crate::identity::{SessionKey, WalletId};
use crate::{BritError, Result};

const REQUEST_ROWS: usize = 4;

/// The Payer's request for fee addresses.
///
/// Carries the wallet's pseudonymous id, the session key the Matcher must
/// use as the response IV, and optionally the date of the wallet's first
/// transaction so the Matcher can tell it how far back to replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayerRequest {
    version: ProtocolVersion,
    wallet_id: WalletId,
    session_key: SessionKey,
    first_transaction_date: Option<DateTime<Utc>>,
}

impl PayerRequest {
    /// Build a request at the current protocol version.
    pub fn new(
        wallet_id: WalletId,
        session_key: SessionKey,
        first_transaction_date: Option<DateTime<Utc>>,
    ) -> Self {
        Self::with_version(
            ProtocolVersion::CURRENT,
            wallet_id,
            session_key,
            first_transaction_date,
        )
    }

    /// Build a version 1 request, for talking to legacy Matchers.
    pub fn legacy(
        wallet_id: WalletId,
        session_key: SessionKey,
        first_transaction_date: Option<DateTime<Utc>>,
    ) -> Self {
        Self::with_version(
            ProtocolVersion::V1,
            wallet_id,
            session_key,
            first_transaction_date,
        )
    }

    pub fn with_version(
        version: ProtocolVersion,
        wallet_id: WalletId,
        session_key: SessionKey,
        first_transaction_date: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            version,
            wallet_id,
            session_key,
            first_transaction_date,
        }
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    pub fn wallet_id(&self) -> &WalletId {
        &self.wallet_id
    }

    pub fn session_key(&self) -> &SessionKey {
        &self.session_key
    }

    pub fn first_transaction_date(&self) -> Option<&DateTime<Utc>> {
        self.first_transaction_date.as_ref()
    }

    /// Encode as four newline-separated rows with no trailing separator.
    pub fn serialize(&self) -> Vec<u8> {
        let rows = [
            self.version.to_string(),
            self.wallet_id.to_hex(),
            self.session_key.to_hex(),
            encode_optional_date(self.first_transaction_date.as_ref()),
        ];
        rows.join(&SEPARATOR.to_string()).into_bytes()
    }

    /// Decode a serialized request.
    ///
    /// # Errors
    ///
    /// [`BritError::MalformedRequest`] if the text is not UTF-8, does not
    /// have exactly four rows, or any row fails to decode. Out-of-range
    /// versions are reported the same way.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| BritError::malformed_request(format!("not UTF-8: {e}")))?;

        let rows: Vec<&str> = text.split(SEPARATOR).collect();
        if rows.len() != REQUEST_ROWS {
            return Err(BritError::malformed_request(format!(
                "expected {} rows, found {}",
                REQUEST_ROWS,
                rows.len()
            )));
        }

        let version = parse_version_row(rows[0], BritError::MalformedRequest)?;
        let wallet_id: WalletId = rows[1].trim().parse()?;
        let session_key = SessionKey::parse_hex_or_base58(rows[2].trim())?;
        let first_transaction_date = parse_optional_date(rows[3], BritError::MalformedRequest)?;

        tracing::debug!(%version, "parsed payer request");
        Ok(Self {
            version,
            wallet_id,
            session_key,
            first_transaction_date,
        })
    }
}

/// A serialized [`PayerRequest`] sealed to the Matcher's public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedPayerRequest {
    payload: Vec<u8>,
}

impl EncryptedPayerRequest {
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
