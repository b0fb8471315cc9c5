//! Payer request sealing.

use super::engine::{AsymmetricEngine, MatcherKeyring, MatcherPublicKey};
use crate::protocol::{EncryptedPayerRequest, PayerRequest};
use crate::{BritError, Result};

/// Serialize `request` and seal it to the Matcher's public key.
///
/// # Errors
///
/// Any engine failure is reported as [`BritError::RequestEncryptionFailed`].
pub fn encrypt(
    request: &PayerRequest,
    engine: &dyn AsymmetricEngine,
    matcher_public_key: &MatcherPublicKey,
) -> Result<EncryptedPayerRequest> {
    let plaintext = zeroize::Zeroizing::new(request.serialize());
    let payload = engine
        .encrypt_to(&plaintext, matcher_public_key)
        .map_err(|e| BritError::RequestEncryptionFailed(e.to_string()))?;
    Ok(EncryptedPayerRequest::new(payload))
}

/// Open a sealed request on the Matcher side.
///
/// # Errors
///
/// - [`BritError::RequestDecryptionFailed`]: wrong keyring or password, or
///   corrupt ciphertext
/// - [`BritError::MalformedRequest`]: the plaintext is not a valid request
pub fn decrypt(
    encrypted: &EncryptedPayerRequest,
    engine: &dyn AsymmetricEngine,
    keyring: &MatcherKeyring,
    password: &str,
) -> Result<PayerRequest> {
    let plaintext = zeroize::Zeroizing::new(
        engine
            .decrypt_with(encrypted.payload(), keyring, password)
            .map_err(|e| BritError::RequestDecryptionFailed(e.to_string()))?,
    );
    PayerRequest::parse(&plaintext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::engine::{EngineError, EngineResult, SealedBoxEngine};
    use crate::identity::{SessionKey, WalletId};
    use crate::test_utils::TestFixtures;

    struct FailingEngine;

    impl AsymmetricEngine for FailingEngine {
        fn encrypt_to(&self, _: &[u8], _: &MatcherPublicKey) -> EngineResult<Vec<u8>> {
            Err(EngineError::EncryptFailed("offline".into()))
        }

        fn decrypt_with(&self, _: &[u8], _: &MatcherKeyring, _: &str) -> EngineResult<Vec<u8>> {
            Ok(b"not a request".to_vec())
        }
    }

    fn request() -> PayerRequest {
        PayerRequest::new(WalletId::from_bytes([3; 20]), SessionKey::random(), None)
    }

    #[test]
    fn test_roundtrip() {
        let keyring = TestFixtures::matcher_keyring();
        let engine = SealedBoxEngine::new();
        let request = request();

        let encrypted = encrypt(&request, &engine, &keyring.public_key().unwrap()).unwrap();
        let decrypted =
            decrypt(&encrypted, &engine, &keyring, TestFixtures::MATCHER_PASSWORD).unwrap();
        assert_eq!(decrypted, request);
    }

    #[test]
    fn test_wrong_password() {
        let keyring = TestFixtures::matcher_keyring();
        let engine = SealedBoxEngine::new();
        let encrypted = encrypt(&request(), &engine, &keyring.public_key().unwrap()).unwrap();

        let result = decrypt(&encrypted, &engine, &keyring, "not the password");
        assert!(matches!(result, Err(BritError::RequestDecryptionFailed(_))));
    }

    #[test]
    fn test_engine_failure_maps_to_encryption_failed() {
        let keyring = TestFixtures::matcher_keyring();
        let result = encrypt(&request(), &FailingEngine, &keyring.public_key().unwrap());
        assert!(matches!(result, Err(BritError::RequestEncryptionFailed(_))));
    }

    #[test]
    fn test_garbage_plaintext_is_malformed() {
        let keyring = TestFixtures::matcher_keyring();
        let encrypted = EncryptedPayerRequest::new(vec![0; 8]);
        let result = decrypt(&encrypted, &FailingEngine, &keyring, "x");
        assert!(matches!(result, Err(BritError::MalformedRequest(_))));
    }
}
