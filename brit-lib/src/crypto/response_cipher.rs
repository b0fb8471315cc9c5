//! Matcher response encryption.
//!
//! The response is keyed by material only the two ends can compute: the
//! AES/HMAC key is SHA-256 of the wallet id, the IV is the session key the
//! Payer put in its request. The request's version picks the variant.
//!
//! # Wire Format
//!
//! ```text
//! V1: [AES-256-CBC/PKCS7 ciphertext]
//! V2: [AES-256-CBC/PKCS7 ciphertext][32 bytes HMAC-SHA256(key, ciphertext)]
//! ```
//!
//! # Security Properties
//!
//! - **Encrypt-then-MAC**: the V2 tag is verified before any decryption, so
//!   a forged payload never reaches the padding check
//! - **Constant time**: tags are compared with `subtle`
//! - **No partial trust**: a failed tag rejects the whole message

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::identity::{ResponseKey, SessionKey, WalletId, SESSION_KEY_LENGTH};
use crate::protocol::{
    EncryptedMatcherResponse, MatcherResponse, ParsedMatcherResponse, PayerRequest,
    ProtocolVersion,
};
use crate::{BritError, Result};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// Size of the V2 authentication tag in bytes.
pub const MAC_SIZE: usize = 32;

/// AES block size; every ciphertext is a non-empty multiple of it.
const BLOCK_SIZE: usize = 16;

/// Response cipher bound to one exchange.
///
/// # Example
///
/// ```
/// use brit_lib::crypto::ResponseCipher;
/// use brit_lib::protocol::{MatcherResponse, PayerRequest};
/// use brit_lib::{SessionKey, WalletId};
///
/// let request = PayerRequest::new(WalletId::from_seed(b"seed"), SessionKey::random(), None);
/// let cipher = ResponseCipher::for_request(&request);
///
/// let response = MatcherResponse::new(None, Vec::new());
/// let encrypted = cipher.encrypt(&response).unwrap();
/// assert_eq!(cipher.decrypt(&encrypted).unwrap(), response);
/// ```
#[derive(Clone)]
pub struct ResponseCipher {
    version: ProtocolVersion,
    key: ResponseKey,
    iv: SessionKey,
}

impl ResponseCipher {
    pub fn new(version: ProtocolVersion, wallet_id: &WalletId, session_key: &SessionKey) -> Self {
        Self {
            version,
            key: wallet_id.response_key(),
            iv: session_key.clone(),
        }
    }

    /// Cipher for the response to `request`, at the request's version.
    pub fn for_request(request: &PayerRequest) -> Self {
        Self::new(request.version(), request.wallet_id(), request.session_key())
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// Encrypt a response under this exchange's variant.
    pub fn encrypt(&self, response: &MatcherResponse) -> Result<EncryptedMatcherResponse> {
        self.encrypt_serialized(&response.serialize())
    }

    /// Encrypt an already serialized response body as-is.
    pub fn encrypt_serialized(&self, plaintext: &[u8]) -> Result<EncryptedMatcherResponse> {
        let ciphertext = self.aes_encrypt(plaintext);
        let payload = match self.version {
            ProtocolVersion::V1 => ciphertext,
            ProtocolVersion::V2 => {
                let mac = self.compute_mac(&ciphertext)?;
                let mut payload = ciphertext;
                payload.extend_from_slice(&mac);
                payload
            }
        };
        Ok(EncryptedMatcherResponse::new(payload))
    }

    /// Decrypt and parse a response.
    pub fn decrypt(&self, encrypted: &EncryptedMatcherResponse) -> Result<MatcherResponse> {
        self.decrypt_detailed(encrypted).map(|parsed| parsed.response)
    }

    /// Decrypt and parse, keeping the record of skipped address rows.
    ///
    /// # Errors
    ///
    /// - [`BritError::MalformedResponse`]: payload too short, bad padding,
    ///   or plaintext that does not parse
    /// - [`BritError::IntegrityCheckFailed`]: V2 tag mismatch. The ciphertext
    ///   is not decrypted in that case.
    pub fn decrypt_detailed(
        &self,
        encrypted: &EncryptedMatcherResponse,
    ) -> Result<ParsedMatcherResponse> {
        let payload = encrypted.payload();
        let ciphertext = match self.version {
            ProtocolVersion::V1 => payload,
            ProtocolVersion::V2 => {
                if payload.len() < MAC_SIZE {
                    return Err(BritError::malformed_response(format!(
                        "payload of {} bytes cannot carry a {}-byte MAC",
                        payload.len(),
                        MAC_SIZE
                    )));
                }
                let (ciphertext, received_mac) = payload.split_at(payload.len() - MAC_SIZE);
                let expected_mac = self.compute_mac(ciphertext)?;
                if !bool::from(expected_mac[..].ct_eq(received_mac)) {
                    tracing::warn!("matcher response MAC mismatch, rejecting message");
                    return Err(BritError::IntegrityCheckFailed);
                }
                ciphertext
            }
        };

        let plaintext = self.aes_decrypt(ciphertext)?;
        MatcherResponse::parse_detailed(&plaintext)
    }

    fn aes_encrypt(&self, plaintext: &[u8]) -> Vec<u8> {
        Aes256CbcEnc::new(&(*self.key.as_bytes()).into(), &(*self.iv.as_bytes()).into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext)
    }

    fn aes_decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
            return Err(BritError::malformed_response(format!(
                "ciphertext length {} is not a positive multiple of {}",
                ciphertext.len(),
                BLOCK_SIZE
            )));
        }
        Aes256CbcDec::new(&(*self.key.as_bytes()).into(), &(*self.iv.as_bytes()).into())
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| BritError::malformed_response("bad padding"))
    }

    fn compute_mac(&self, ciphertext: &[u8]) -> Result<[u8; MAC_SIZE]> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(self.key.as_bytes())
            .map_err(|e| BritError::malformed_response(e.to_string()))?;
        mac.update(ciphertext);
        let mut out = [0u8; MAC_SIZE];
        out.copy_from_slice(&mac.finalize().into_bytes());
        Ok(out)
    }
}

impl std::fmt::Debug for ResponseCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCipher")
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

// Session keys double as the CBC IV.
const _: () = assert!(SESSION_KEY_LENGTH == BLOCK_SIZE);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::BitcoinAddress;
    use chrono::DateTime;

    fn fixed_request(version: ProtocolVersion) -> PayerRequest {
        PayerRequest::with_version(
            version,
            WalletId::from_bytes([0x5A; 20]),
            SessionKey::from_bytes([0xC3; 16]),
            None,
        )
    }

    fn response() -> MatcherResponse {
        MatcherResponse::new(
            DateTime::from_timestamp_millis(1_400_000_000_000),
            [
                BitcoinAddress::new("1AhN6rPdrMuKBGFDKR1k9A8SCLYaNgXhty").unwrap(),
                BitcoinAddress::new("14Ru32Lb4kdLGfAMz1VAtxh3UFku62HaNH").unwrap(),
            ],
        )
    }

    #[test]
    fn test_v1_roundtrip() {
        let cipher = ResponseCipher::for_request(&fixed_request(ProtocolVersion::V1));
        let encrypted = cipher.encrypt(&response()).unwrap();
        assert_eq!(encrypted.payload().len() % BLOCK_SIZE, 0);
        assert_eq!(cipher.decrypt(&encrypted).unwrap(), response());
    }

    #[test]
    fn test_v2_roundtrip_and_layout() {
        let v1 = ResponseCipher::for_request(&fixed_request(ProtocolVersion::V1));
        let v2 = ResponseCipher::for_request(&fixed_request(ProtocolVersion::V2));
        let plain = v1.encrypt(&response()).unwrap();
        let authenticated = v2.encrypt(&response()).unwrap();

        assert_eq!(authenticated.payload().len(), plain.payload().len() + MAC_SIZE);
        assert_eq!(v2.decrypt(&authenticated).unwrap(), response());
    }

    #[test]
    fn test_v2_tag_is_hmac_of_ciphertext() {
        let request = fixed_request(ProtocolVersion::V2);
        let cipher = ResponseCipher::for_request(&request);
        let payload = cipher.encrypt(&response()).unwrap().into_payload();
        let (ciphertext, tag) = payload.split_at(payload.len() - MAC_SIZE);

        let mut mac = <HmacSha256 as Mac>::new_from_slice(
            request.wallet_id().response_key().as_bytes(),
        )
        .unwrap();
        mac.update(ciphertext);
        assert!(mac.verify_slice(tag).is_ok());
    }

    #[test]
    fn test_v2_any_bit_flip_fails_integrity() {
        let cipher = ResponseCipher::for_request(&fixed_request(ProtocolVersion::V2));
        let payload = cipher.encrypt(&response()).unwrap().into_payload();

        for byte in 0..payload.len() {
            for bit in 0..8 {
                let mut tampered = payload.clone();
                tampered[byte] ^= 1 << bit;
                let result = cipher.decrypt(&EncryptedMatcherResponse::new(tampered));
                assert_eq!(result, Err(BritError::IntegrityCheckFailed));
            }
        }
    }

    #[test]
    fn test_v2_short_payload_malformed() {
        let cipher = ResponseCipher::for_request(&fixed_request(ProtocolVersion::V2));
        let result = cipher.decrypt(&EncryptedMatcherResponse::new(vec![0; MAC_SIZE - 1]));
        assert!(matches!(result, Err(BritError::MalformedResponse(_))));
    }

    #[test]
    fn test_v1_payload_rejected_by_v2_cipher() {
        let v1 = ResponseCipher::for_request(&fixed_request(ProtocolVersion::V1));
        let v2 = ResponseCipher::for_request(&fixed_request(ProtocolVersion::V2));
        let encrypted = v1.encrypt(&response()).unwrap();
        assert_eq!(v2.decrypt(&encrypted), Err(BritError::IntegrityCheckFailed));
    }

    #[test]
    fn test_v2_payload_rejected_by_v1_cipher() {
        let v1 = ResponseCipher::for_request(&fixed_request(ProtocolVersion::V1));
        let v2 = ResponseCipher::for_request(&fixed_request(ProtocolVersion::V2));
        let encrypted = v2.encrypt(&response()).unwrap();
        assert!(v1.decrypt(&encrypted).is_err());
    }

    #[test]
    fn test_wrong_wallet_cannot_read() {
        let cipher = ResponseCipher::for_request(&fixed_request(ProtocolVersion::V2));
        let encrypted = cipher.encrypt(&response()).unwrap();

        let other = ResponseCipher::new(
            ProtocolVersion::V2,
            &WalletId::from_bytes([0x00; 20]),
            &SessionKey::from_bytes([0xC3; 16]),
        );
        assert_eq!(other.decrypt(&encrypted), Err(BritError::IntegrityCheckFailed));
    }

    #[test]
    fn test_v1_bad_length_malformed() {
        let cipher = ResponseCipher::for_request(&fixed_request(ProtocolVersion::V1));
        assert!(matches!(
            cipher.decrypt(&EncryptedMatcherResponse::new(vec![])),
            Err(BritError::MalformedResponse(_))
        ));
        assert!(matches!(
            cipher.decrypt(&EncryptedMatcherResponse::new(vec![0; 17])),
            Err(BritError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_response_version_does_not_select_cipher() {
        let v1_response = MatcherResponse::with_version(ProtocolVersion::V1, None, []);
        let cipher = ResponseCipher::for_request(&fixed_request(ProtocolVersion::V2));
        let encrypted = cipher.encrypt(&v1_response).unwrap();

        let payload_len = encrypted.payload().len();
        assert!(payload_len >= MAC_SIZE + BLOCK_SIZE);
        let decrypted = cipher.decrypt(&encrypted).unwrap();
        assert_eq!(decrypted.version(), ProtocolVersion::V1);
    }
}
