//! Wallet identity and per-exchange key material.
//!
//! - [`WalletId`]: 20-byte one-way identifier derived from the wallet seed.
//!   The Matcher only ever sees this value, never the seed.
//! - [`ResponseKey`]: SHA-256 of the wallet id. Both ends compute it
//!   independently to key the response cipher.
//! - [`SessionKey`]: 16 random bytes chosen by the Payer for each exchange.
//!   Used as the response cipher IV.

use std::fmt;
use std::str::FromStr;

use hkdf::Hkdf;
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{BritError, Result};

/// Length of a [`WalletId`] in bytes.
pub const WALLET_ID_LENGTH: usize = 20;

/// Length of a [`SessionKey`] in bytes.
pub const SESSION_KEY_LENGTH: usize = 16;

/// Length of a [`ResponseKey`] in bytes.
pub const RESPONSE_KEY_LENGTH: usize = 32;

const WALLET_ID_SALT: &[u8] = b"brit-wallet-id";
const WALLET_ID_INFO: &[u8] = b"brit-wallet-id-v1";

/// Pseudonymous wallet handle sent to the Matcher.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WalletId([u8; WALLET_ID_LENGTH]);

impl WalletId {
    /// Derive the wallet id from raw seed bytes.
    ///
    /// # Security
    ///
    /// HKDF-SHA256 under a fixed BRIT salt. The seed cannot be recovered
    /// from the output and the id is unrelated to any key the wallet signs with.
    pub fn from_seed(seed: &[u8]) -> Self {
        let hk = Hkdf::<Sha256>::new(Some(WALLET_ID_SALT), seed);
        let mut id = [0u8; WALLET_ID_LENGTH];
        hk.expand(WALLET_ID_INFO, &mut id)
            .expect("20-byte output is within the HKDF-SHA256 limit");
        Self(id)
    }

    pub fn from_bytes(bytes: [u8; WALLET_ID_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; WALLET_ID_LENGTH] {
        &self.0
    }

    /// Stretch the id into the 256-bit key protecting the Matcher's response.
    pub fn response_key(&self) -> ResponseKey {
        let digest = Sha256::digest(self.0);
        let mut key = [0u8; RESPONSE_KEY_LENGTH];
        key.copy_from_slice(&digest);
        ResponseKey(key)
    }

    /// Lower-case hex, as used on the wire.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// Derive the wallet id for a seed.
pub fn derive_wallet_id(seed: &[u8]) -> WalletId {
    WalletId::from_seed(seed)
}

/// Derive the response key for a wallet id.
pub fn derive_response_key(wallet_id: &WalletId) -> ResponseKey {
    wallet_id.response_key()
}

impl fmt::Display for WalletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for WalletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WalletId({})", self.to_hex())
    }
}

impl FromStr for WalletId {
    type Err = BritError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = hex::decode(s)
            .map_err(|e| BritError::malformed_request(format!("wallet id is not hex: {e}")))?;
        let id: [u8; WALLET_ID_LENGTH] = bytes.try_into().map_err(|v: Vec<u8>| {
            BritError::malformed_request(format!(
                "wallet id must be {} bytes, got {}",
                WALLET_ID_LENGTH,
                v.len()
            ))
        })?;
        Ok(Self(id))
    }
}

/// AES/HMAC key for the Matcher's response. Zeroized on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ResponseKey([u8; RESPONSE_KEY_LENGTH]);

impl ResponseKey {
    pub fn as_bytes(&self) -> &[u8; RESPONSE_KEY_LENGTH] {
        &self.0
    }
}

impl fmt::Debug for ResponseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ResponseKey(..)")
    }
}

/// Per-exchange random key. Zeroized on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SessionKey([u8; SESSION_KEY_LENGTH]);

impl SessionKey {
    /// Fresh key from the OS random source.
    pub fn random() -> Self {
        let mut key = [0u8; SESSION_KEY_LENGTH];
        rand::rngs::OsRng.fill_bytes(&mut key);
        Self(key)
    }

    pub fn from_bytes(bytes: [u8; SESSION_KEY_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SESSION_KEY_LENGTH] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Decode a session key row. Older peers wrote Base58, current ones hex.
    ///
    /// Hex is tried first: a 32-character hex string can also be valid
    /// Base58 but decodes to the wrong length there.
    pub fn parse_hex_or_base58(s: &str) -> Result<Self> {
        if let Ok(bytes) = hex::decode(s) {
            if let Ok(key) = <[u8; SESSION_KEY_LENGTH]>::try_from(bytes.as_slice()) {
                return Ok(Self(key));
            }
        }
        let bytes = bs58::decode(s).into_vec().map_err(|e| {
            BritError::malformed_request(format!("session key is neither hex nor base58: {e}"))
        })?;
        let key: [u8; SESSION_KEY_LENGTH] = bytes.try_into().map_err(|v: Vec<u8>| {
            BritError::malformed_request(format!(
                "session key must be {} bytes, got {}",
                SESSION_KEY_LENGTH,
                v.len()
            ))
        })?;
        Ok(Self(key))
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKey(..)")
    }
}
