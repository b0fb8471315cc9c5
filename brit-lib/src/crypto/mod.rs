//! Encryption for both legs of a BRIT exchange.
//!
//! - Request leg: [`request_cipher`] seals a serialized `PayerRequest` to the
//!   Matcher's public key through an [`AsymmetricEngine`].
//! - Response leg: [`ResponseCipher`] protects the `MatcherResponse` with
//!   AES-256-CBC, plus HMAC-SHA256 from version 2 on.

pub mod engine;
pub mod request_cipher;
mod response_cipher;

pub use engine::{
    AsymmetricEngine, EngineError, EngineResult, KeyringParams, MatcherKeyring, MatcherPublicKey,
    SealedBoxEngine,
};
pub use response_cipher::{ResponseCipher, MAC_SIZE};
