//! Common test utilities for brit-lib integration tests

use std::sync::Arc;

use async_trait::async_trait;
use brit_lib::fees::{MatcherTransport, TransportError};
use brit_lib::matcher::{AddressRotationStore, BasicMatcher, InMemoryAddressStore, Matcher, MatcherConfig};
use brit_lib::payer::{BasicPayer, PayerConfig};
use brit_lib::protocol::{EncryptedMatcherResponse, EncryptedPayerRequest};
use brit_lib::test_utils::TestFixtures;
use chrono::Utc;

/// A Matcher publishing the fixture addresses for today, and a Payer that
/// knows its public key.
#[allow(dead_code)]
pub struct TestContext {
    pub store: Arc<InMemoryAddressStore>,
    pub matcher: Arc<BasicMatcher>,
    pub payer: BasicPayer,
}

#[allow(dead_code)]
impl TestContext {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryAddressStore::new());
        store
            .store_addresses_for_date(Utc::now().date_naive(), &TestFixtures::address_set())
            .unwrap();

        let config = MatcherConfig::new(TestFixtures::matcher_keyring(), TestFixtures::MATCHER_PASSWORD);
        let matcher = Arc::new(BasicMatcher::new(config, store.clone()));
        let payer = BasicPayer::new(PayerConfig::new(matcher.public_key().unwrap()));

        Self {
            store,
            matcher,
            payer,
        }
    }

    pub fn transport(&self) -> InProcessTransport {
        InProcessTransport {
            matcher: Arc::clone(&self.matcher),
        }
    }
}

/// Calls the Matcher directly, in the same process.
pub struct InProcessTransport {
    matcher: Arc<BasicMatcher>,
}

#[async_trait]
impl MatcherTransport for InProcessTransport {
    async fn exchange(
        &self,
        request: EncryptedPayerRequest,
    ) -> Result<EncryptedMatcherResponse, TransportError> {
        self.matcher
            .process_encrypted(&request)
            .map_err(|e| TransportError::Rejected(e.to_string()))
    }
}

/// Never reaches a Matcher.
#[allow(dead_code)]
pub struct DownTransport;

#[async_trait]
impl MatcherTransport for DownTransport {
    async fn exchange(
        &self,
        _request: EncryptedPayerRequest,
    ) -> Result<EncryptedMatcherResponse, TransportError> {
        Err(TransportError::Connection("connection refused".into()))
    }
}
