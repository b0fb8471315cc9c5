//! Common test utilities for brit-matcher integration tests

use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, Once};

use brit_lib::matcher::{AddressRotationStore, BasicMatcher, FileAddressStore, MatcherConfig};
use brit_lib::payer::{BasicPayer, PayerConfig};
use brit_lib::test_utils::TestFixtures;
use brit_matcher::{MatcherService, ServiceConfig};
use chrono::Utc;
use tempfile::TempDir;

static TRACING: Once = Once::new();

pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

#[allow(dead_code)]
pub fn client(last: u8) -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(192, 0, 2, last))
}

/// A service backed by a file store in a temp directory, publishing the
/// fixture addresses for today.
#[allow(dead_code)]
pub struct ServiceContext {
    pub dir: TempDir,
    pub store: Arc<FileAddressStore>,
    pub service: Arc<MatcherService>,
    pub payer: BasicPayer,
}

#[allow(dead_code)]
impl ServiceContext {
    pub fn new(config: ServiceConfig) -> Self {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileAddressStore::new(dir.path()).unwrap());
        store
            .store_addresses_for_date(Utc::now().date_naive(), &TestFixtures::address_set())
            .unwrap();

        let matcher_config =
            MatcherConfig::new(TestFixtures::matcher_keyring(), TestFixtures::MATCHER_PASSWORD);
        let service = Arc::new(MatcherService::new(
            Arc::new(BasicMatcher::new(matcher_config, store.clone())),
            config,
        ));
        let payer = BasicPayer::new(PayerConfig::new(service.public_key().unwrap()));

        Self {
            dir,
            store,
            service,
            payer,
        }
    }
}
