//! Matcher Service
//!
//! Wraps a [`Matcher`] with the checks a public endpoint needs: payload size
//! limits, per-IP throttling, and a response cache for retried requests.
//! The order is fixed: size, throttle, cache, decrypt.

use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use brit_lib::crypto::MatcherPublicKey;
use brit_lib::fees::{MatcherTransport, TransportError};
use brit_lib::matcher::Matcher;
use brit_lib::protocol::{EncryptedMatcherResponse, EncryptedPayerRequest};
use brit_lib::BritError;

use crate::cache::{RequestDigest, ResponseCache, TtlResponseCache};
use crate::config::ServiceConfig;
use crate::throttle::RequestThrottle;

/// Why a request was refused.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ServiceError {
    #[error("empty request payload")]
    EmptyPayload,
    #[error("request payload of {size} bytes exceeds {max}")]
    PayloadTooLarge { size: usize, max: usize },
    #[error("too many requests")]
    Throttled,
    #[error(transparent)]
    Protocol(#[from] BritError),
}

impl ServiceError {
    /// HTTP status an endpoint should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::EmptyPayload => 400,
            Self::PayloadTooLarge { .. } => 413,
            Self::Throttled => 429,
            Self::Protocol(e) if e.is_retryable() => 503,
            Self::Protocol(_) => 400,
        }
    }
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Request handling for one Matcher.
pub struct MatcherService {
    matcher: Arc<dyn Matcher>,
    cache: Arc<dyn ResponseCache>,
    throttle: Arc<RequestThrottle>,
    config: ServiceConfig,
}

impl MatcherService {
    pub fn new(matcher: Arc<dyn Matcher>, config: ServiceConfig) -> Self {
        let cache = Arc::new(TtlResponseCache::new(config.cache.clone()));
        let throttle = Arc::new(RequestThrottle::new(config.throttle.clone()));
        Self::with_parts(matcher, cache, throttle, config)
    }

    pub fn with_parts(
        matcher: Arc<dyn Matcher>,
        cache: Arc<dyn ResponseCache>,
        throttle: Arc<RequestThrottle>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            matcher,
            cache,
            throttle,
            config,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<dyn ResponseCache> {
        &self.cache
    }

    pub fn throttle(&self) -> &Arc<RequestThrottle> {
        &self.throttle
    }

    /// Key Payers encrypt to.
    pub fn public_key(&self) -> brit_lib::Result<MatcherPublicKey> {
        self.matcher.public_key()
    }

    /// Handle one encrypted request from `client_ip`.
    ///
    /// # Errors
    ///
    /// Size and throttle rejections, plus any protocol error from the
    /// Matcher. Failed requests are never cached.
    #[tracing::instrument(skip(self, payload), fields(size = payload.len()))]
    pub fn handle(&self, client_ip: IpAddr, payload: &[u8]) -> ServiceResult<EncryptedMatcherResponse> {
        if payload.is_empty() {
            return Err(ServiceError::EmptyPayload);
        }
        if payload.len() > self.config.max_payload_bytes {
            tracing::warn!(max = self.config.max_payload_bytes, "oversized request");
            return Err(ServiceError::PayloadTooLarge {
                size: payload.len(),
                max: self.config.max_payload_bytes,
            });
        }
        if !self.throttle.check_and_record(client_ip) {
            tracing::info!("request throttled");
            return Err(ServiceError::Throttled);
        }

        let digest = RequestDigest::of(payload);
        if let Some(cached) = self.cache.get(&digest) {
            tracing::debug!(?digest, "served from cache");
            return Ok(cached);
        }

        let request = EncryptedPayerRequest::new(payload.to_vec());
        let response = self.matcher.process_encrypted(&request).map_err(|e| {
            tracing::warn!(error = %e, code = ?e.code(), "request failed");
            ServiceError::Protocol(e)
        })?;
        self.cache.put(digest, response.clone());
        Ok(response)
    }

    /// Same as [`handle`](Self::handle) for a request that arrived as text.
    pub fn handle_text(&self, client_ip: IpAddr, payload: &str) -> ServiceResult<EncryptedMatcherResponse> {
        self.handle(client_ip, payload.as_bytes())
    }
}

impl std::fmt::Debug for MatcherService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatcherService")
            .field("config", &self.config)
            .field("cached", &self.cache.len())
            .finish_non_exhaustive()
    }
}

/// Hands requests straight to a [`MatcherService`] in the same process.
#[derive(Debug, Clone)]
pub struct LoopbackTransport {
    service: Arc<MatcherService>,
    client_ip: IpAddr,
}

impl LoopbackTransport {
    pub fn new(service: Arc<MatcherService>, client_ip: IpAddr) -> Self {
        Self { service, client_ip }
    }
}

#[async_trait]
impl MatcherTransport for LoopbackTransport {
    async fn exchange(
        &self,
        request: EncryptedPayerRequest,
    ) -> Result<EncryptedMatcherResponse, TransportError> {
        self.service
            .handle(self.client_ip, request.payload())
            .map_err(|e| TransportError::Rejected(e.to_string()))
    }
}
