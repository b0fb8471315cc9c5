//! Matcher role: open Payer requests and answer with today's fee addresses.
//!
//! ```text
//! EncryptedPayerRequest
//!   -> decrypt_payer_request   (keyring + password)
//!   -> process                 (address store lookup, replay date)
//!   -> encrypt_matcher_response (request's version picks the variant)
//!   -> EncryptedMatcherResponse
//! ```
//!
//! The wallet id and session key of a request are used for that one
//! response only. Nothing about the Payer is written to the store.

mod store;

pub use store::*;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use zeroize::Zeroizing;

use crate::crypto::{
    request_cipher, AsymmetricEngine, MatcherKeyring, MatcherPublicKey, ResponseCipher,
    SealedBoxEngine,
};
use crate::protocol::{
    EncryptedMatcherResponse, EncryptedPayerRequest, MatcherResponse, PayerRequest,
};
use crate::{BritError, Result};

/// Matcher key material.
#[derive(Clone)]
pub struct MatcherConfig {
    keyring: MatcherKeyring,
    password: Zeroizing<String>,
}

impl MatcherConfig {
    pub fn new(keyring: MatcherKeyring, password: impl Into<String>) -> Self {
        Self {
            keyring,
            password: Zeroizing::new(password.into()),
        }
    }

    /// Load the keyring from a JSON file written by [`MatcherKeyring::save`].
    pub fn from_keyring_file(path: impl AsRef<Path>, password: impl Into<String>) -> Result<Self> {
        let keyring = MatcherKeyring::load(path)
            .map_err(|e| BritError::RequestDecryptionFailed(e.to_string()))?;
        Ok(Self::new(keyring, password))
    }

    pub fn keyring(&self) -> &MatcherKeyring {
        &self.keyring
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for MatcherConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatcherConfig")
            .field("keyring", &self.keyring)
            .finish_non_exhaustive()
    }
}

/// Service-side half of the protocol.
pub trait Matcher: Send + Sync {
    fn config(&self) -> &MatcherConfig;

    /// Public key Payers encrypt their requests to.
    fn public_key(&self) -> Result<MatcherPublicKey>;

    /// Open a sealed request.
    fn decrypt_payer_request(&self, encrypted: &EncryptedPayerRequest) -> Result<PayerRequest>;

    /// Build the response for an opened request.
    fn process(&self, request: &PayerRequest) -> Result<MatcherResponse>;

    /// Encrypt `response` for the Payer that sent `request`.
    fn encrypt_matcher_response(
        &self,
        response: &MatcherResponse,
        request: &PayerRequest,
    ) -> Result<EncryptedMatcherResponse>;

    /// Full request-to-response pipeline.
    fn process_encrypted(&self, encrypted: &EncryptedPayerRequest) -> Result<EncryptedMatcherResponse> {
        let request = self.decrypt_payer_request(encrypted)?;
        let response = self.process(&request)?;
        self.encrypt_matcher_response(&response, &request)
    }
}

/// Production Matcher backed by an [`AddressRotationStore`].
pub struct BasicMatcher {
    config: MatcherConfig,
    store: Arc<dyn AddressRotationStore>,
    engine: Arc<dyn AsymmetricEngine>,
}

impl BasicMatcher {
    /// Matcher using the [`SealedBoxEngine`].
    pub fn new(config: MatcherConfig, store: Arc<dyn AddressRotationStore>) -> Self {
        Self::with_engine(config, store, Arc::new(SealedBoxEngine::new()))
    }

    pub fn with_engine(
        config: MatcherConfig,
        store: Arc<dyn AddressRotationStore>,
        engine: Arc<dyn AsymmetricEngine>,
    ) -> Self {
        Self {
            config,
            store,
            engine,
        }
    }

    pub fn store(&self) -> &Arc<dyn AddressRotationStore> {
        &self.store
    }

    /// Build the response as it would be on `date`.
    ///
    /// The response takes the request's version and echoes its first
    /// transaction date as the replay date.
    pub fn process_for_date(&self, request: &PayerRequest, date: NaiveDate) -> Result<MatcherResponse> {
        let addresses = self.store.addresses_for_date(date)?;
        if addresses.is_empty() {
            tracing::warn!(%date, "no fee addresses published for date");
        }
        Ok(MatcherResponse::with_version(
            request.version(),
            request.first_transaction_date().copied(),
            addresses,
        ))
    }
}

impl fmt::Debug for BasicMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicMatcher")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Matcher for BasicMatcher {
    fn config(&self) -> &MatcherConfig {
        &self.config
    }

    fn public_key(&self) -> Result<MatcherPublicKey> {
        self.config
            .keyring
            .public_key()
            .map_err(|e| BritError::RequestEncryptionFailed(e.to_string()))
    }

    fn decrypt_payer_request(&self, encrypted: &EncryptedPayerRequest) -> Result<PayerRequest> {
        request_cipher::decrypt(
            encrypted,
            self.engine.as_ref(),
            &self.config.keyring,
            self.config.password(),
        )
    }

    fn process(&self, request: &PayerRequest) -> Result<MatcherResponse> {
        self.process_for_date(request, Utc::now().date_naive())
    }

    fn encrypt_matcher_response(
        &self,
        response: &MatcherResponse,
        request: &PayerRequest,
    ) -> Result<EncryptedMatcherResponse> {
        ResponseCipher::for_request(request).encrypt(response)
    }
}
