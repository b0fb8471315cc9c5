//! BRIT protocol library.
//!
//! A wallet (the Payer) learns, once in a while and without revealing who it
//! is, which addresses to pay its usage fee to. A coordinating service (the
//! Matcher) hands out a rotating set of fee addresses per day and only ever
//! sees a one-way token derived from the wallet seed.
//!
//! # Features
//!
//! - **Identity**: BIP-39 seeds, one-way wallet ids, per-exchange session keys
//! - **Wire messages**: versioned newline-separated request and response codecs
//! - **Encryption**: sealed-box requests to the Matcher, AES-CBC responses
//!   with HMAC-SHA256 from version 2 on
//! - **Matcher**: date-keyed address rotation store, in memory or on disk
//! - **Fees**: randomized fee triggering with a hardwired fallback pool
//!
//! # Example
//!
//! ```ignore
//! use brit_lib::prelude::*;
//!
//! let payer = BasicPayer::new(PayerConfig::new(matcher_public_key));
//! let request = payer.new_payer_request(wallet_id, SessionKey::random(), None);
//! let encrypted = payer.encrypt_payer_request(&request)?;
//!
//! // ... send `encrypted` to the Matcher, receive `encrypted_response` ...
//!
//! let response = payer.decrypt_matcher_response(&encrypted_response, &request)?;
//! ```

pub mod address;
pub mod crypto;
pub mod errors;
pub mod fees;
pub mod identity;
pub mod matcher;
pub mod payer;
pub mod prelude;
pub mod protocol;
pub mod seed_phrase;

/// Shared fixtures for BRIT tests.
///
/// This module is only available with the `test-utils` feature or in test builds.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use address::BitcoinAddress;
pub use errors::{BritError, BritErrorCode};
pub use identity::{derive_response_key, derive_wallet_id, ResponseKey, SessionKey, WalletId};
pub use protocol::ProtocolVersion;

/// Common result alias for BRIT operations.
pub type Result<T> = std::result::Result<T, BritError>;
