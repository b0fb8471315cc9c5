//! Bitcoin main-net fee addresses.
//!
//! Fee addresses travel as plain text rows in the Matcher's response, so
//! every row is checked with Base58Check before it can become a payment
//! destination. Only legacy P2PKH (`1...`) and P2SH (`3...`) addresses are
//! accepted.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{BritError, Result};

/// Version byte of a main-net P2PKH address.
const P2PKH_VERSION: u8 = 0x00;

/// Version byte of a main-net P2SH address.
const P2SH_VERSION: u8 = 0x05;

/// Version byte plus 20-byte hash.
const PAYLOAD_LENGTH: usize = 21;

/// A validated main-net Base58Check address.
///
/// # Example
///
/// ```
/// use brit_lib::BitcoinAddress;
///
/// let addr: BitcoinAddress = "1AhN6rPdrMuKBGFDKR1k9A8SCLYaNgXhty".parse().unwrap();
/// assert_eq!(addr.as_str(), "1AhN6rPdrMuKBGFDKR1k9A8SCLYaNgXhty");
/// assert!("1XXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXX".parse::<BitcoinAddress>().is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BitcoinAddress(String);

impl BitcoinAddress {
    /// Validate and wrap an address string.
    pub fn new(address: impl Into<String>) -> Result<Self> {
        let address = address.into();
        let trimmed = address.trim();

        if trimmed.len() < 26 || trimmed.len() > 35 {
            return Err(BritError::invalid_address(
                trimmed,
                format!("length {} outside 26..=35", trimmed.len()),
            ));
        }

        let payload = bs58::decode(trimmed)
            .with_check(None)
            .into_vec()
            .map_err(|e| BritError::invalid_address(trimmed, e.to_string()))?;

        if payload.len() != PAYLOAD_LENGTH {
            return Err(BritError::invalid_address(
                trimmed,
                format!("payload is {} bytes", payload.len()),
            ));
        }
        if payload[0] != P2PKH_VERSION && payload[0] != P2SH_VERSION {
            return Err(BritError::invalid_address(
                trimmed,
                format!("version byte {:#04x} is not main-net", payload[0]),
            ));
        }

        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for pay-to-script-hash addresses.
    pub fn is_p2sh(&self) -> bool {
        self.0.starts_with('3')
    }
}

impl FromStr for BitcoinAddress {
    type Err = BritError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for BitcoinAddress {
    type Error = BritError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<BitcoinAddress> for String {
    fn from(value: BitcoinAddress) -> Self {
        value.0
    }
}

impl AsRef<str> for BitcoinAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BitcoinAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for BitcoinAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitcoinAddress({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_addresses() {
        for addr in [
            "1AhN6rPdrMuKBGFDKR1k9A8SCLYaNgXhty",
            "14Ru32Lb4kdLGfAMz1VAtxh3UFku62HaNH",
            "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa",
        ] {
            let parsed = BitcoinAddress::new(addr).unwrap();
            assert_eq!(parsed.as_str(), addr);
            assert!(!parsed.is_p2sh());
        }
    }

    #[test]
    fn test_mangled_address_rejected() {
        let err = BitcoinAddress::new("1XXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXX").unwrap_err();
        assert!(matches!(err, BritError::InvalidAddress { .. }));
    }

    #[test]
    fn test_checksum_failure_rejected() {
        // Last character changed
        assert!(BitcoinAddress::new("1AhN6rPdrMuKBGFDKR1k9A8SCLYaNgXhtz").is_err());
    }

    #[test]
    fn test_length_rejected() {
        assert!(BitcoinAddress::new("").is_err());
        assert!(BitcoinAddress::new("1abc").is_err());
    }

    #[test]
    fn test_whitespace_trimmed() {
        let parsed = BitcoinAddress::new(" 1AhN6rPdrMuKBGFDKR1k9A8SCLYaNgXhty\r").unwrap();
        assert_eq!(parsed.as_str(), "1AhN6rPdrMuKBGFDKR1k9A8SCLYaNgXhty");
    }

    #[test]
    fn test_serde_validates() {
        let addr = BitcoinAddress::new("1AhN6rPdrMuKBGFDKR1k9A8SCLYaNgXhty").unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"1AhN6rPdrMuKBGFDKR1k9A8SCLYaNgXhty\"");
        let back: BitcoinAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);

        assert!(serde_json::from_str::<BitcoinAddress>("\"1XXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXX\"").is_err());
    }
}
