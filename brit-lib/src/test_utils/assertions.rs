//! Assertion helpers.

use std::collections::BTreeSet;

use crate::address::BitcoinAddress;
use crate::fees::FeeState;
use crate::protocol::MatcherResponse;

/// Assert the trigger count sits inside `current..=current + window - 1`.
pub fn assert_fee_state_within_window(state: &FeeState, window: u32) {
    assert!(
        state.next_fee_send_count >= state.current_number_of_sends,
        "next_fee_send_count {} is below current sends {}",
        state.next_fee_send_count,
        state.current_number_of_sends
    );
    let upper = state.current_number_of_sends + window.max(1) - 1;
    assert!(
        state.next_fee_send_count <= upper,
        "next_fee_send_count {} exceeds window upper bound {}",
        state.next_fee_send_count,
        upper
    );
    assert_eq!(
        state.fee_owed,
        state.fee_per_send_satoshi * u64::from(state.current_number_of_sends)
    );
}

/// Assert a response carries exactly `expected`.
pub fn assert_same_addresses(response: &MatcherResponse, expected: &BTreeSet<BitcoinAddress>) {
    assert_eq!(
        response.addresses(),
        expected,
        "matcher response addresses differ from expected set"
    );
}
