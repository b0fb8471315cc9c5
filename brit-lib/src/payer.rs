//! Payer role: build and seal requests, open the Matcher's answer.
//!
//! The Payer keeps no per-exchange state of its own. The [`PayerRequest`]
//! returned by [`Payer::new_payer_request`] holds the wallet id and session
//! key, and is handed back to [`Payer::decrypt_matcher_response`] to pick
//! the response variant and keys.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::{
    request_cipher, AsymmetricEngine, MatcherPublicKey, ResponseCipher, SealedBoxEngine,
};
use crate::identity::{SessionKey, WalletId};
use crate::protocol::{
    EncryptedMatcherResponse, EncryptedPayerRequest, MatcherResponse, ParsedMatcherResponse,
    PayerRequest, ProtocolVersion,
};
use crate::Result;

/// Payer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayerConfig {
    /// Key requests are sealed to.
    pub matcher_public_key: MatcherPublicKey,
}

impl PayerConfig {
    pub fn new(matcher_public_key: MatcherPublicKey) -> Self {
        Self { matcher_public_key }
    }
}

/// Wallet-side half of the protocol.
pub trait Payer: Send + Sync {
    fn config(&self) -> &PayerConfig;

    /// Request at the current protocol version.
    fn new_payer_request(
        &self,
        wallet_id: WalletId,
        session_key: SessionKey,
        first_transaction_date: Option<DateTime<Utc>>,
    ) -> PayerRequest {
        PayerRequest::new(wallet_id, session_key, first_transaction_date)
    }

    /// Request at an explicit version, for Matchers that predate V2.
    fn new_legacy_payer_request(
        &self,
        version: ProtocolVersion,
        wallet_id: WalletId,
        session_key: SessionKey,
        first_transaction_date: Option<DateTime<Utc>>,
    ) -> PayerRequest {
        PayerRequest::with_version(version, wallet_id, session_key, first_transaction_date)
    }

    fn encrypt_payer_request(&self, request: &PayerRequest) -> Result<EncryptedPayerRequest>;

    /// Open the response to `request`.
    ///
    /// The request's version decides whether a MAC is expected. Whatever
    /// version the response reports about itself is not consulted.
    fn decrypt_matcher_response(
        &self,
        encrypted: &EncryptedMatcherResponse,
        request: &PayerRequest,
    ) -> Result<MatcherResponse> {
        self.decrypt_matcher_response_detailed(encrypted, request)
            .map(|parsed| parsed.response)
    }

    /// Like [`Payer::decrypt_matcher_response`], keeping skipped address rows.
    fn decrypt_matcher_response_detailed(
        &self,
        encrypted: &EncryptedMatcherResponse,
        request: &PayerRequest,
    ) -> Result<ParsedMatcherResponse>;
}

/// Production Payer.
#[derive(Clone)]
pub struct BasicPayer {
    config: PayerConfig,
    engine: Arc<dyn AsymmetricEngine>,
}

impl BasicPayer {
    /// Payer using the [`SealedBoxEngine`].
    pub fn new(config: PayerConfig) -> Self {
        Self::with_engine(config, Arc::new(SealedBoxEngine::new()))
    }

    pub fn with_engine(config: PayerConfig, engine: Arc<dyn AsymmetricEngine>) -> Self {
        Self { config, engine }
    }
}

impl std::fmt::Debug for BasicPayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicPayer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Payer for BasicPayer {
    fn config(&self) -> &PayerConfig {
        &self.config
    }

    fn encrypt_payer_request(&self, request: &PayerRequest) -> Result<EncryptedPayerRequest> {
        request_cipher::encrypt(request, self.engine.as_ref(), &self.config.matcher_public_key)
    }

    fn decrypt_matcher_response_detailed(
        &self,
        encrypted: &EncryptedMatcherResponse,
        request: &PayerRequest,
    ) -> Result<ParsedMatcherResponse> {
        let parsed = ResponseCipher::for_request(request).decrypt_detailed(encrypted)?;
        if parsed.response.version() != request.version() {
            tracing::debug!(
                request_version = %request.version(),
                response_version = %parsed.response.version(),
                "matcher reported a different version than requested"
            );
        }
        Ok(parsed)
    }
}
