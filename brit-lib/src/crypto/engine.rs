//! Asymmetric engine used to seal Payer requests to the Matcher.
//!
//! The protocol only needs "encrypt to a public key" and "decrypt with a
//! password-protected private keyring". [`AsymmetricEngine`] is that seam.
//! [`SealedBoxEngine`] is the production implementation:
//!
//! - X25519 between a fresh ephemeral key and the Matcher's static key
//! - HKDF-SHA256 over the shared secret, bound to both public keys
//! - AES-256-GCM over the request bytes
//!
//! # Wire Format
//!
//! ```text
//! [1 byte version][32 bytes ephemeral public key][12 bytes nonce][ciphertext][16 bytes tag]
//! ```
//!
//! The Matcher's static secret lives in a [`MatcherKeyring`]: the secret
//! encrypted under an Argon2id-derived key, stored as JSON.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use argon2::{Algorithm, Argon2, Params, Version};
use hkdf::Hkdf;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};
use zeroize::Zeroizing;

/// Current sealed box format version.
const SEALED_BOX_VERSION: u8 = 1;

/// Current keyring format version.
const KEYRING_VERSION: u32 = 1;

/// Size of the nonce in bytes (96 bits for GCM).
const NONCE_SIZE: usize = 12;

/// Size of the authentication tag in bytes.
const TAG_SIZE: usize = 16;

/// Size of an X25519 public key.
const PUBLIC_KEY_SIZE: usize = 32;

/// Size of the keyring salt.
const SALT_SIZE: usize = 16;

const REQUEST_KEY_INFO: &[u8] = b"brit-request-sealed-box-v1";

/// Engine error types.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Encryption failed: {0}")]
    EncryptFailed(String),
    #[error("Decryption failed: {0}")]
    DecryptFailed(String),
    #[error("Invalid ciphertext format")]
    InvalidFormat,
    #[error("Unsupported version: {0}")]
    UnsupportedVersion(u8),
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),
    #[error("Keyring error: {0}")]
    Keyring(String),
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        Self::Keyring(err.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Keyring(err.to_string())
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Public-key encryption consumed by the request cipher.
pub trait AsymmetricEngine: Send + Sync {
    /// Encrypt `plaintext` so only the holder of `recipient`'s keyring can read it.
    fn encrypt_to(&self, plaintext: &[u8], recipient: &MatcherPublicKey) -> EngineResult<Vec<u8>>;

    /// Decrypt with the private key sealed in `keyring`.
    fn decrypt_with(
        &self,
        ciphertext: &[u8],
        keyring: &MatcherKeyring,
        password: &str,
    ) -> EngineResult<Vec<u8>>;
}

/// The Matcher's X25519 public key, distributed to wallets.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MatcherPublicKey([u8; PUBLIC_KEY_SIZE]);

impl MatcherPublicKey {
    pub fn from_bytes(bytes: [u8; PUBLIC_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.0
    }

    fn to_x25519(self) -> PublicKey {
        PublicKey::from(self.0)
    }
}

impl From<&StaticSecret> for MatcherPublicKey {
    fn from(secret: &StaticSecret) -> Self {
        Self(PublicKey::from(secret).to_bytes())
    }
}

impl fmt::Display for MatcherPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for MatcherPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MatcherPublicKey({})", self)
    }
}

impl FromStr for MatcherPublicKey {
    type Err = EngineError;

    fn from_str(s: &str) -> EngineResult<Self> {
        let bytes = hex::decode(s.trim()).map_err(|e| EngineError::Keyring(e.to_string()))?;
        let key: [u8; PUBLIC_KEY_SIZE] = bytes
            .try_into()
            .map_err(|_| EngineError::Keyring("public key must be 32 bytes".into()))?;
        Ok(Self(key))
    }
}

impl TryFrom<String> for MatcherPublicKey {
    type Error = EngineError;

    fn try_from(value: String) -> EngineResult<Self> {
        value.parse()
    }
}

impl From<MatcherPublicKey> for String {
    fn from(value: MatcherPublicKey) -> Self {
        value.to_string()
    }
}

/// Argon2id cost parameters stored alongside a sealed keyring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyringParams {
    /// Memory cost in KiB.
    pub m_cost: u32,
    /// Number of passes.
    pub t_cost: u32,
    /// Degree of parallelism.
    pub p_cost: u32,
}

impl Default for KeyringParams {
    fn default() -> Self {
        Self {
            m_cost: Params::DEFAULT_M_COST,
            t_cost: Params::DEFAULT_T_COST,
            p_cost: Params::DEFAULT_P_COST,
        }
    }
}

impl KeyringParams {
    fn derive_key(&self, password: &str, salt: &[u8]) -> EngineResult<Zeroizing<[u8; 32]>> {
        let params = Params::new(self.m_cost, self.t_cost, self.p_cost, Some(32))
            .map_err(|e| EngineError::KeyDerivation(e.to_string()))?;
        let mut key = Zeroizing::new([0u8; 32]);
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
            .hash_password_into(password.as_bytes(), salt, &mut *key)
            .map_err(|e| EngineError::KeyDerivation(e.to_string()))?;
        Ok(key)
    }
}

/// Password-protected Matcher private key.
#[derive(Clone, Serialize, Deserialize)]
pub struct MatcherKeyring {
    /// Version of the keyring format
    pub version: u32,
    /// Argon2id parameters used to derive the sealing key
    pub params: KeyringParams,
    /// Encrypted X25519 secret (hex encoded)
    pub encrypted_secret_hex: String,
    /// Salt used for key derivation (hex encoded)
    pub salt_hex: String,
    /// Nonce used for encryption (hex encoded)
    pub nonce_hex: String,
    /// Public key for distribution to wallets (hex encoded)
    pub public_key_hex: String,
}

impl fmt::Debug for MatcherKeyring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatcherKeyring")
            .field("version", &self.version)
            .field("public_key_hex", &self.public_key_hex)
            .finish_non_exhaustive()
    }
}

impl MatcherKeyring {
    /// Generate a fresh Matcher key and seal it under `password`.
    pub fn generate(password: &str) -> EngineResult<Self> {
        Self::generate_with_params(password, KeyringParams::default())
    }

    /// Generate with explicit Argon2 costs.
    pub fn generate_with_params(password: &str, params: KeyringParams) -> EngineResult<Self> {
        let secret = StaticSecret::random_from_rng(rand::rngs::OsRng);
        Self::seal(&secret, password, params)
    }

    /// Seal an existing secret under `password`.
    pub fn seal(secret: &StaticSecret, password: &str, params: KeyringParams) -> EngineResult<Self> {
        let mut salt = [0u8; SALT_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut salt);
        let key = params.derive_key(password, &salt)?;

        let cipher = Aes256Gcm::new_from_slice(&*key)
            .map_err(|e| EngineError::EncryptFailed(e.to_string()))?;
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);

        let secret_bytes = Zeroizing::new(secret.to_bytes());
        let encrypted = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), secret_bytes.as_slice())
            .map_err(|e| EngineError::EncryptFailed(e.to_string()))?;

        Ok(Self {
            version: KEYRING_VERSION,
            params,
            encrypted_secret_hex: hex::encode(encrypted),
            salt_hex: hex::encode(salt),
            nonce_hex: hex::encode(nonce_bytes),
            public_key_hex: MatcherPublicKey::from(secret).to_string(),
        })
    }

    /// The public half, as recorded in the keyring.
    pub fn public_key(&self) -> EngineResult<MatcherPublicKey> {
        self.public_key_hex.parse()
    }

    /// Recover the secret.
    ///
    /// # Errors
    ///
    /// [`EngineError::DecryptFailed`] on a wrong password or a corrupt
    /// keyring. The recovered secret must reproduce the recorded public key.
    pub fn unlock(&self, password: &str) -> EngineResult<StaticSecret> {
        if self.version != KEYRING_VERSION {
            return Err(EngineError::Keyring(format!(
                "unsupported keyring version {}",
                self.version
            )));
        }
        let salt = hex::decode(&self.salt_hex).map_err(|e| EngineError::Keyring(e.to_string()))?;
        let nonce_bytes =
            hex::decode(&self.nonce_hex).map_err(|e| EngineError::Keyring(e.to_string()))?;
        let encrypted = hex::decode(&self.encrypted_secret_hex)
            .map_err(|e| EngineError::Keyring(e.to_string()))?;
        if nonce_bytes.len() != NONCE_SIZE {
            return Err(EngineError::Keyring("invalid nonce length".into()));
        }

        let key = self.params.derive_key(password, &salt)?;
        let cipher = Aes256Gcm::new_from_slice(&*key)
            .map_err(|e| EngineError::DecryptFailed(e.to_string()))?;
        let decrypted = Zeroizing::new(
            cipher
                .decrypt(Nonce::from_slice(&nonce_bytes), encrypted.as_ref())
                .map_err(|_| {
                    EngineError::DecryptFailed("wrong password or corrupted keyring".into())
                })?,
        );

        let secret_bytes: [u8; 32] = decrypted
            .as_slice()
            .try_into()
            .map_err(|_| EngineError::Keyring("invalid secret length".into()))?;
        let secret = StaticSecret::from(secret_bytes);

        if MatcherPublicKey::from(&secret) != self.public_key()? {
            return Err(EngineError::Keyring(
                "public key mismatch - keyring may be corrupted".into(),
            ));
        }
        Ok(secret)
    }

    pub fn to_json(&self) -> EngineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a keyring file written by [`MatcherKeyring::save`].
    pub fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> EngineResult<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// X25519 + HKDF-SHA256 + AES-256-GCM sealed boxes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SealedBoxEngine;

impl SealedBoxEngine {
    pub fn new() -> Self {
        Self
    }

    fn derive_key(
        shared_secret: &[u8],
        ephemeral_public: &[u8; PUBLIC_KEY_SIZE],
        recipient: &MatcherPublicKey,
    ) -> EngineResult<Zeroizing<[u8; 32]>> {
        let mut salt = [0u8; PUBLIC_KEY_SIZE * 2];
        salt[..PUBLIC_KEY_SIZE].copy_from_slice(ephemeral_public);
        salt[PUBLIC_KEY_SIZE..].copy_from_slice(recipient.as_bytes());

        let hk = Hkdf::<Sha256>::new(Some(&salt), shared_secret);
        let mut key = Zeroizing::new([0u8; 32]);
        hk.expand(REQUEST_KEY_INFO, &mut *key)
            .map_err(|e| EngineError::KeyDerivation(e.to_string()))?;
        Ok(key)
    }
}

impl AsymmetricEngine for SealedBoxEngine {
    fn encrypt_to(&self, plaintext: &[u8], recipient: &MatcherPublicKey) -> EngineResult<Vec<u8>> {
        let ephemeral = EphemeralSecret::random_from_rng(rand::rngs::OsRng);
        let ephemeral_public = PublicKey::from(&ephemeral).to_bytes();
        let shared = ephemeral.diffie_hellman(&recipient.to_x25519());
        if !shared.was_contributory() {
            return Err(EngineError::EncryptFailed(
                "recipient public key is a low-order point".into(),
            ));
        }

        let key = Self::derive_key(shared.as_bytes(), &ephemeral_public, recipient)?;
        let cipher = Aes256Gcm::new_from_slice(&*key)
            .map_err(|e| EngineError::EncryptFailed(e.to_string()))?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut nonce_bytes);
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|e| EngineError::EncryptFailed(e.to_string()))?;

        let mut result = Vec::with_capacity(1 + PUBLIC_KEY_SIZE + NONCE_SIZE + ciphertext.len());
        result.push(SEALED_BOX_VERSION);
        result.extend_from_slice(&ephemeral_public);
        result.extend_from_slice(&nonce_bytes);
        result.extend_from_slice(&ciphertext);
        Ok(result)
    }

    fn decrypt_with(
        &self,
        ciphertext: &[u8],
        keyring: &MatcherKeyring,
        password: &str,
    ) -> EngineResult<Vec<u8>> {
        let min_len = 1 + PUBLIC_KEY_SIZE + NONCE_SIZE + TAG_SIZE;
        if ciphertext.len() < min_len {
            return Err(EngineError::InvalidFormat);
        }
        if ciphertext[0] != SEALED_BOX_VERSION {
            return Err(EngineError::UnsupportedVersion(ciphertext[0]));
        }

        let mut ephemeral_public = [0u8; PUBLIC_KEY_SIZE];
        ephemeral_public.copy_from_slice(&ciphertext[1..1 + PUBLIC_KEY_SIZE]);
        let nonce_bytes = &ciphertext[1 + PUBLIC_KEY_SIZE..1 + PUBLIC_KEY_SIZE + NONCE_SIZE];
        let encrypted = &ciphertext[1 + PUBLIC_KEY_SIZE + NONCE_SIZE..];

        let secret = keyring.unlock(password)?;
        let recipient = MatcherPublicKey::from(&secret);
        let shared = secret.diffie_hellman(&PublicKey::from(ephemeral_public));
        if !shared.was_contributory() {
            return Err(EngineError::DecryptFailed(
                "ephemeral key is a low-order point".into(),
            ));
        }

        let key = Self::derive_key(shared.as_bytes(), &ephemeral_public, &recipient)?;
        let cipher = Aes256Gcm::new_from_slice(&*key)
            .map_err(|e| EngineError::DecryptFailed(e.to_string()))?;
        cipher
            .decrypt(Nonce::from_slice(nonce_bytes), encrypted)
            .map_err(|_| EngineError::DecryptFailed("Authentication failed".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn light_params() -> KeyringParams {
        KeyringParams {
            m_cost: 256,
            t_cost: 1,
            p_cost: 1,
        }
    }

    fn keyring() -> MatcherKeyring {
        MatcherKeyring::generate_with_params("opensesame", light_params()).unwrap()
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let keyring = keyring();
        let engine = SealedBoxEngine::new();
        let public_key = keyring.public_key().unwrap();

        let sealed = engine.encrypt_to(b"hello matcher", &public_key).unwrap();
        let opened = engine.decrypt_with(&sealed, &keyring, "opensesame").unwrap();
        assert_eq!(opened, b"hello matcher");
    }

    #[test]
    fn test_ciphertext_format() {
        let keyring = keyring();
        let sealed = SealedBoxEngine
            .encrypt_to(b"test", &keyring.public_key().unwrap())
            .unwrap();
        assert_eq!(sealed.len(), 1 + PUBLIC_KEY_SIZE + NONCE_SIZE + 4 + TAG_SIZE);
        assert_eq!(sealed[0], SEALED_BOX_VERSION);
    }

    #[test]
    fn test_wrong_password_fails() {
        let keyring = keyring();
        let sealed = SealedBoxEngine
            .encrypt_to(b"secret", &keyring.public_key().unwrap())
            .unwrap();
        let result = SealedBoxEngine.decrypt_with(&sealed, &keyring, "wrong");
        assert!(matches!(result, Err(EngineError::DecryptFailed(_))));
    }

    #[test]
    fn test_wrong_keyring_fails() {
        let intended = keyring();
        let other = keyring();
        let sealed = SealedBoxEngine
            .encrypt_to(b"secret", &intended.public_key().unwrap())
            .unwrap();
        assert!(SealedBoxEngine
            .decrypt_with(&sealed, &other, "opensesame")
            .is_err());
    }

    #[test]
    fn test_tampering_detected() {
        let keyring = keyring();
        let mut sealed = SealedBoxEngine
            .encrypt_to(b"secret", &keyring.public_key().unwrap())
            .unwrap();
        let last_idx = sealed.len() - 1;
        sealed[last_idx] ^= 1;
        assert!(SealedBoxEngine
            .decrypt_with(&sealed, &keyring, "opensesame")
            .is_err());
    }

    #[test]
    fn test_invalid_format_rejected() {
        let keyring = keyring();
        let result = SealedBoxEngine.decrypt_with(&[1, 2, 3], &keyring, "opensesame");
        assert!(matches!(result, Err(EngineError::InvalidFormat)));

        let mut bad_version = vec![99u8];
        bad_version.extend_from_slice(&[0u8; 60]);
        let result = SealedBoxEngine.decrypt_with(&bad_version, &keyring, "opensesame");
        assert!(matches!(result, Err(EngineError::UnsupportedVersion(99))));
    }

    #[test]
    fn test_keyring_json_roundtrip() {
        let keyring = keyring();
        let json = keyring.to_json().unwrap();
        let restored = MatcherKeyring::from_json(&json).unwrap();
        assert_eq!(
            restored.public_key().unwrap(),
            keyring.public_key().unwrap()
        );
        assert!(restored.unlock("opensesame").is_ok());
    }

    #[test]
    fn test_keyring_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matcher-keyring.json");
        let keyring = keyring();
        keyring.save(&path).unwrap();

        let loaded = MatcherKeyring::load(&path).unwrap();
        assert_eq!(loaded.public_key_hex, keyring.public_key_hex);
    }

    #[test]
    fn test_tampered_public_key_detected() {
        let mut keyring = keyring();
        keyring.public_key_hex = MatcherPublicKey::from_bytes([9u8; 32]).to_string();
        assert!(matches!(
            keyring.unlock("opensesame"),
            Err(EngineError::Keyring(_))
        ));
    }

    #[test]
    fn test_public_key_hex() {
        let key = MatcherPublicKey::from_bytes([0xAB; 32]);
        let parsed: MatcherPublicKey = key.to_string().parse().unwrap();
        assert_eq!(parsed, key);
        assert!("abcd".parse::<MatcherPublicKey>().is_err());
    }
}
