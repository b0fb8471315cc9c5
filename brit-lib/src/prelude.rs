//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use brit_lib::prelude::*;
//! ```

// Core types
pub use crate::{BitcoinAddress, ProtocolVersion, SessionKey, WalletId};

// Error handling
pub use crate::errors::{BritError, BritErrorCode};
pub use crate::Result;

// Messages
pub use crate::protocol::{
    EncryptedMatcherResponse, EncryptedPayerRequest, MatcherResponse, ParsedMatcherResponse,
    PayerRequest,
};

// Roles
pub use crate::matcher::{
    AddressRotationStore, BasicMatcher, FileAddressStore, InMemoryAddressStore, Matcher,
    MatcherConfig,
};
pub use crate::payer::{BasicPayer, Payer, PayerConfig};

// Crypto
pub use crate::crypto::{MatcherKeyring, MatcherPublicKey, ResponseCipher, SealedBoxEngine};

// Fees
pub use crate::fees::{
    ExchangeOutcome, FeePolicy, FeeService, FeeState, FeeStateEngine, MatcherTransport,
    SpendRecord, TransportError,
};

// Seed phrases
pub use crate::seed_phrase::{Bip39SeedPhraseGenerator, SeedPhraseGenerator, SeedPhraseSize};
