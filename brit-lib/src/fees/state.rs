//! Fee accounting values.

use serde::{Deserialize, Serialize};

use crate::address::BitcoinAddress;

/// One outgoing payment from the wallet, as the fee engine sees it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendRecord {
    pub destination: BitcoinAddress,
    pub amount_satoshi: u64,
}

impl SpendRecord {
    pub fn new(destination: BitcoinAddress, amount_satoshi: u64) -> Self {
        Self {
            destination,
            amount_satoshi,
        }
    }
}

/// What the wallet owes and where the next fee goes.
///
/// Derived from spend history on demand; never stored on its own.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeState {
    /// Sends since the last qualifying fee payment.
    pub current_number_of_sends: u32,
    /// `fee_per_send_satoshi * current_number_of_sends`.
    pub fee_owed: u64,
    pub fee_per_send_satoshi: u64,
    pub next_fee_address: BitcoinAddress,
    /// Send count at which the fee should be paid. Always within
    /// `current..=current + window - 1`.
    pub next_fee_send_count: u32,
    /// True when no Matcher addresses were available.
    pub is_using_hardwired_addresses: bool,
    /// Number of qualifying fee payments seen in the history.
    pub fee_cycle: u32,
}

impl FeeState {
    /// Whether the wallet should attach the fee to its next send.
    pub fn is_fee_due(&self) -> bool {
        self.fee_owed > 0 && self.current_number_of_sends >= self.next_fee_send_count
    }

    /// Smallest payment to `next_fee_address` that clears the obligation.
    pub fn required_payment(&self) -> u64 {
        self.fee_owed.saturating_add(self.fee_per_send_satoshi)
    }
}
