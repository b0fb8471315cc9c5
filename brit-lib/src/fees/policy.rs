//! Fee Policy
//!
//! Constants and bands that bound the Payer's fee accounting, plus the
//! fallback address list used when no Matcher answer is available.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::address::BitcoinAddress;

/// Fee charged per non-fee send when the policy does not say otherwise.
pub const DEFAULT_FEE_PER_SEND_SATOSHI: u64 = 10_000;

/// Default width of the randomized trigger window.
pub const DEFAULT_NEXT_SEND_DELTA_UPPER_LIMIT: u32 = 20;

pub const MINIMUM_FEE_PER_KB: u64 = 5_000;
pub const DEFAULT_FEE_PER_KB: u64 = 10_000;
pub const MAXIMUM_FEE_PER_KB: u64 = 50_000;

/// Fee addresses shipped with the library, used until a Matcher answers.
pub const HARDWIRED_FEE_ADDRESSES: &[&str] = &[
    "1MkTpZN4TpLwJjZt9zHBXREJA8avUHXB3q",
    "1WGmwv86m1fFNVDRQ2YagdAFCButd36SV",
    "1PP1BvDeXjUcPDiEHBPWptQBAukhAwsLFt",
    "128f69V7GRqNSKwrjMkcuB6dbFKKEPtaLC",
];

/// The built-in fallback pool.
pub fn hardwired_fee_addresses() -> BTreeSet<BitcoinAddress> {
    HARDWIRED_FEE_ADDRESSES
        .iter()
        .filter_map(|a| match BitcoinAddress::new(*a) {
            Ok(address) => Some(address),
            Err(e) => {
                tracing::error!(address = a, error = %e, "built-in fee address does not parse");
                None
            }
        })
        .collect()
}

/// Inclusive `[min, max]` range in satoshi.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBand {
    pub min: u64,
    pub max: u64,
}

impl FeeBand {
    /// Allowed range for the per-send fee.
    pub const FEE_PER_SEND: FeeBand = FeeBand {
        min: 1_000,
        max: 100_000,
    };

    /// Allowed range for a fee-per-kilobyte hint.
    pub const FEE_PER_KB: FeeBand = FeeBand {
        min: MINIMUM_FEE_PER_KB,
        max: MAXIMUM_FEE_PER_KB,
    };

    pub fn clamp(&self, value: u64) -> u64 {
        value.clamp(self.min, self.max)
    }

    pub fn contains(&self, value: u64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// Clamp an externally supplied fee-per-KB hint.
///
/// Zero means "not set" and gives the default. Negative values clamp to the
/// minimum like any other value below the band.
pub fn normalise_raw_fee_per_kb(raw: i64) -> u64 {
    if raw == 0 {
        return DEFAULT_FEE_PER_KB;
    }
    FeeBand::FEE_PER_KB.clamp(raw.max(0).unsigned_abs())
}

/// Payer-side fee settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeePolicy {
    /// Owed per non-fee send. Clamped into [`FeeBand::FEE_PER_SEND`].
    pub fee_per_send_satoshi: u64,
    /// Width of the trigger window. Values below 1 are treated as 1.
    pub next_send_delta_upper_limit: u32,
    /// Fallback pool. Empty means the built-in list.
    pub hardwired_addresses: BTreeSet<BitcoinAddress>,
}

impl Default for FeePolicy {
    fn default() -> Self {
        Self {
            fee_per_send_satoshi: DEFAULT_FEE_PER_SEND_SATOSHI,
            next_send_delta_upper_limit: DEFAULT_NEXT_SEND_DELTA_UPPER_LIMIT,
            hardwired_addresses: hardwired_fee_addresses(),
        }
    }
}

impl FeePolicy {
    pub fn with_fee_per_send_satoshi(mut self, fee: u64) -> Self {
        self.fee_per_send_satoshi = fee;
        self
    }

    pub fn with_window(mut self, window: u32) -> Self {
        self.next_send_delta_upper_limit = window;
        self
    }

    pub fn with_hardwired_addresses(
        mut self,
        addresses: impl IntoIterator<Item = BitcoinAddress>,
    ) -> Self {
        self.hardwired_addresses = addresses.into_iter().collect();
        self
    }

    /// Per-send fee after band clamping.
    pub fn effective_fee_per_send(&self) -> u64 {
        FeeBand::FEE_PER_SEND.clamp(self.fee_per_send_satoshi)
    }

    /// Trigger window width, at least 1.
    pub fn effective_window(&self) -> u32 {
        self.next_send_delta_upper_limit.max(1)
    }

    /// Fallback pool, never empty.
    pub fn hardwired_pool(&self) -> BTreeSet<BitcoinAddress> {
        if self.hardwired_addresses.is_empty() {
            hardwired_fee_addresses()
        } else {
            self.hardwired_addresses.clone()
        }
    }
}
