//! Payer-side fee accounting.
//!
//! # Overview
//!
//! A wallet owes `fee_per_send_satoshi` for every send it makes. It pays the
//! running total to a fee address at a send count chosen at random within a
//! window, so an observer cannot tell from the chain which send will carry
//! the fee.
//!
//! - [`FeePolicy`]: amounts, window width, fallback addresses
//! - [`FeeStateEngine`]: replays spend history into a [`FeeState`]
//! - [`FeeService`]: Matcher exchange plus engine, for wallet integration

mod engine;
mod policy;
mod service;
mod state;

pub use engine::FeeStateEngine;
pub use policy::{
    hardwired_fee_addresses, normalise_raw_fee_per_kb, FeeBand, FeePolicy,
    DEFAULT_FEE_PER_KB, DEFAULT_FEE_PER_SEND_SATOSHI, DEFAULT_NEXT_SEND_DELTA_UPPER_LIMIT,
    HARDWIRED_FEE_ADDRESSES, MAXIMUM_FEE_PER_KB, MINIMUM_FEE_PER_KB,
};
pub use service::{ExchangeOutcome, FeeService, MatcherTransport, TransportError};
pub use state::{FeeState, SpendRecord};
