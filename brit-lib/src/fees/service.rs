//! Fee Service
//!
//! Runs one Payer-side exchange with a Matcher and turns the result, plus the
//! wallet's spend history, into a [`FeeState`].
//!
//! Two failure classes are kept apart:
//!
//! - The Matcher could not be reached. This is [`ExchangeOutcome::Unreachable`]
//!   and the wallet keeps using the hardwired pool.
//! - The Matcher answered but the answer failed verification. This is an
//!   `Err` and must not be papered over with the hardwired pool.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::engine::FeeStateEngine;
use super::policy::FeePolicy;
use super::state::{FeeState, SpendRecord};
use crate::identity::{SessionKey, WalletId};
use crate::payer::{BasicPayer, Payer, PayerConfig};
use crate::protocol::{
    EncryptedMatcherResponse, EncryptedPayerRequest, MatcherResponse, ParsedMatcherResponse,
};
use crate::Result;

/// Errors raised while moving bytes to and from a Matcher.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connection(String),
    #[error("Request timed out")]
    Timeout,
    #[error("Matcher rejected the request: {0}")]
    Rejected(String),
}

/// Carries an encrypted request to a Matcher and brings back its answer.
///
/// HTTP and other network plumbing live behind this trait.
#[async_trait]
pub trait MatcherTransport: Send + Sync {
    async fn exchange(
        &self,
        request: EncryptedPayerRequest,
    ) -> std::result::Result<EncryptedMatcherResponse, TransportError>;
}

/// Result of [`FeeService::perform_exchange`].
#[derive(Debug, Clone)]
pub enum ExchangeOutcome {
    /// A verified response.
    Response(ParsedMatcherResponse),
    /// The transport failed; fall back to hardwired addresses.
    Unreachable { reason: String },
}

impl ExchangeOutcome {
    pub fn response(&self) -> Option<&MatcherResponse> {
        match self {
            Self::Response(parsed) => Some(&parsed.response),
            Self::Unreachable { .. } => None,
        }
    }

    pub fn into_response(self) -> Option<MatcherResponse> {
        match self {
            Self::Response(parsed) => Some(parsed.response),
            Self::Unreachable { .. } => None,
        }
    }

    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable { .. })
    }
}

/// Payer-side entry point combining the exchange and the fee engine.
#[derive(Clone)]
pub struct FeeService {
    payer: Arc<dyn Payer>,
    engine: FeeStateEngine,
}

impl FeeService {
    pub fn new(config: PayerConfig, policy: FeePolicy) -> Self {
        Self::with_payer(Arc::new(BasicPayer::new(config)), policy)
    }

    pub fn with_payer(payer: Arc<dyn Payer>, policy: FeePolicy) -> Self {
        Self {
            payer,
            engine: FeeStateEngine::new(policy),
        }
    }

    pub fn policy(&self) -> &FeePolicy {
        self.engine.policy()
    }

    /// Ask the Matcher for today's fee addresses.
    ///
    /// A fresh session key is drawn for every call.
    ///
    /// # Errors
    ///
    /// Encryption failures, and any response that does not decrypt, verify
    /// or parse.
    pub async fn perform_exchange(
        &self,
        wallet_id: &WalletId,
        first_transaction_date: Option<DateTime<Utc>>,
        transport: &dyn MatcherTransport,
    ) -> Result<ExchangeOutcome> {
        let request =
            self.payer
                .new_payer_request(*wallet_id, SessionKey::random(), first_transaction_date);
        let encrypted = self.payer.encrypt_payer_request(&request)?;

        let encrypted_response = match transport.exchange(encrypted).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "matcher unreachable, using hardwired fee addresses");
                return Ok(ExchangeOutcome::Unreachable {
                    reason: e.to_string(),
                });
            }
        };

        let parsed = self
            .payer
            .decrypt_matcher_response_detailed(&encrypted_response, &request)
            .map_err(|e| {
                tracing::warn!(error = %e, "matcher response failed verification");
                e
            })?;
        if parsed.skipped_count() > 0 {
            tracing::warn!(skipped = parsed.skipped_count(), "matcher response had unreadable addresses");
        }
        tracing::debug!(addresses = parsed.response.addresses().len(), "matcher exchange complete");
        Ok(ExchangeOutcome::Response(parsed))
    }

    /// Fee state for a wallet given its history and the last verified
    /// response, if any.
    pub fn calculate_fee_state(
        &self,
        wallet_id: &WalletId,
        history: &[SpendRecord],
        cached: Option<&MatcherResponse>,
    ) -> FeeState {
        self.engine.calculate(wallet_id, history, cached)
    }
}

impl std::fmt::Debug for FeeService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeeService")
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}
