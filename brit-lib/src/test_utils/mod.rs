//! Test utilities for BRIT.
//!
//! Shared fixtures (a cached Matcher keyring, a reference wallet id, known
//! good and bad addresses) and assertion helpers for fee states and
//! decrypted responses.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use brit_lib::test_utils::TestFixtures;
//!
//! let keyring = TestFixtures::matcher_keyring();
//! let wallet_id = TestFixtures::wallet_id();
//! ```

mod assertions;
mod fixtures;

pub use assertions::{assert_fee_state_within_window, assert_same_addresses};
pub use fixtures::TestFixtures;
