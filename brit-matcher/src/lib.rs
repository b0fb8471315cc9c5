//! # brit-matcher
//!
//! Request handling for a BRIT Matcher endpoint. Network framing is left to
//! the embedding server; this crate takes raw request bytes plus the client
//! IP and returns the encrypted response bytes.
//!
//! ```no_run
//! use std::net::{IpAddr, Ipv4Addr};
//! use std::sync::Arc;
//!
//! use brit_lib::matcher::{BasicMatcher, FileAddressStore, MatcherConfig};
//! use brit_matcher::{MatcherService, ServiceConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = MatcherConfig::from_keyring_file("matcher-keyring.json", "password")?;
//! let store = Arc::new(FileAddressStore::new("/var/lib/brit")?);
//! let service = MatcherService::new(
//!     Arc::new(BasicMatcher::new(config, store)),
//!     ServiceConfig::default(),
//! );
//!
//! let payload: Vec<u8> = Vec::new();
//! let response = service.handle(IpAddr::V4(Ipv4Addr::LOCALHOST), &payload)?;
//! # let _ = response;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod service;
pub mod throttle;

pub use cache::{CacheConfig, RequestDigest, ResponseCache, TtlResponseCache};
pub use config::{ConfigError, ServiceConfig, DEFAULT_MAX_PAYLOAD_BYTES};
pub use service::{LoopbackTransport, MatcherService, ServiceError, ServiceResult};
pub use throttle::{RequestThrottle, ThrottleConfig};
