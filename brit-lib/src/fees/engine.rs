//! Fee state calculation.
//!
//! The engine replays a wallet's sends, oldest first. A send to any known
//! fee address that covers `fee_owed + fee_per_send` closes the current fee
//! cycle; every other send adds one to the count.
//!
//! Address and trigger draws come from a ChaCha20 stream keyed by the wallet
//! id and the cycle index, so repeated calculations agree until the next
//! qualifying payment while different wallets disagree.

use std::collections::BTreeSet;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use sha2::{Digest, Sha256};

use super::policy::FeePolicy;
use super::state::{FeeState, SpendRecord};
use crate::address::BitcoinAddress;
use crate::identity::WalletId;
use crate::protocol::MatcherResponse;

const DRAW_DOMAIN: &[u8] = b"brit-fee-draw-v1";

/// Computes [`FeeState`]s under one [`FeePolicy`].
#[derive(Clone, Debug, Default)]
pub struct FeeStateEngine {
    policy: FeePolicy,
}

impl FeeStateEngine {
    pub fn new(policy: FeePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &FeePolicy {
        &self.policy
    }

    /// Current fee state for a wallet.
    ///
    /// `cached` is the last verified Matcher response. `None`, or a response
    /// with no addresses, selects the hardwired pool.
    pub fn calculate(
        &self,
        wallet_id: &WalletId,
        history: &[SpendRecord],
        cached: Option<&MatcherResponse>,
    ) -> FeeState {
        let fee_per_send = self.policy.effective_fee_per_send();
        let window = self.policy.effective_window();
        let hardwired = self.policy.hardwired_pool();

        let (pool, is_using_hardwired_addresses) = match cached {
            Some(response) if !response.addresses().is_empty() => {
                (response.addresses().clone(), false)
            }
            _ => (hardwired.clone(), true),
        };

        let mut current_number_of_sends: u32 = 0;
        let mut fee_cycle: u32 = 0;
        for spend in history {
            let owed = fee_per_send.saturating_mul(u64::from(current_number_of_sends));
            let is_fee_address =
                pool.contains(&spend.destination) || hardwired.contains(&spend.destination);
            if is_fee_address && spend.amount_satoshi >= owed.saturating_add(fee_per_send) {
                tracing::debug!(
                    sends = current_number_of_sends,
                    paid = spend.amount_satoshi,
                    "fee obligation satisfied"
                );
                current_number_of_sends = 0;
                fee_cycle = fee_cycle.saturating_add(1);
            } else {
                current_number_of_sends = current_number_of_sends.saturating_add(1);
            }
        }

        let mut rng = draw_rng(wallet_id, fee_cycle);
        let next_fee_address = pick_address(&pool, &mut rng);
        let target: u32 = rng.gen_range(0..window);
        let upper = current_number_of_sends.saturating_add(window - 1);
        let next_fee_send_count = target.max(current_number_of_sends).min(upper);

        FeeState {
            current_number_of_sends,
            fee_owed: fee_per_send.saturating_mul(u64::from(current_number_of_sends)),
            fee_per_send_satoshi: fee_per_send,
            next_fee_address,
            next_fee_send_count,
            is_using_hardwired_addresses,
            fee_cycle,
        }
    }
}

fn draw_rng(wallet_id: &WalletId, fee_cycle: u32) -> ChaCha20Rng {
    let mut hasher = Sha256::new();
    hasher.update(DRAW_DOMAIN);
    hasher.update(wallet_id.as_bytes());
    hasher.update(fee_cycle.to_be_bytes());
    ChaCha20Rng::from_seed(hasher.finalize().into())
}

// The pool comes from `hardwired_pool` or a non-empty response, so it has at
// least one entry.
fn pick_address(pool: &BTreeSet<BitcoinAddress>, rng: &mut ChaCha20Rng) -> BitcoinAddress {
    let candidates: Vec<&BitcoinAddress> = pool.iter().collect();
    let index = rng.gen_range(0..candidates.len());
    candidates[index].clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fees::policy::{hardwired_fee_addresses, DEFAULT_FEE_PER_SEND_SATOSHI};
    use crate::test_utils::TestFixtures;

    fn non_fee_send() -> SpendRecord {
        SpendRecord::new(
            BitcoinAddress::new(TestFixtures::NON_FEE_ADDRESS).unwrap(),
            1_000_000,
        )
    }

    #[test]
    fn test_fresh_wallet_owes_nothing() {
        let engine = FeeStateEngine::default();
        let state = engine.calculate(&TestFixtures::wallet_id(), &[], None);
        assert_eq!(state.current_number_of_sends, 0);
        assert_eq!(state.fee_owed, 0);
        assert_eq!(state.fee_per_send_satoshi, DEFAULT_FEE_PER_SEND_SATOSHI);
        assert!(state.is_using_hardwired_addresses);
        assert!(hardwired_fee_addresses().contains(&state.next_fee_address));
        assert!(!state.is_fee_due());
    }

    #[test]
    fn test_forty_sends_then_payment() {
        let engine = FeeStateEngine::default();
        let wallet_id = TestFixtures::wallet_id();
        let mut history = Vec::new();
        let mut state = engine.calculate(&wallet_id, &history, None);

        for i in 1..=40u32 {
            history.push(non_fee_send());
            state = engine.calculate(&wallet_id, &history, None);
            assert_eq!(state.current_number_of_sends, i);
            assert_eq!(state.fee_owed, 10_000 * u64::from(i));
            assert!(state.next_fee_send_count >= state.current_number_of_sends);
            assert!(state.next_fee_send_count <= state.current_number_of_sends + 19);
        }
        assert_eq!(state.fee_owed, 400_000);

        history.push(SpendRecord::new(state.next_fee_address.clone(), state.required_payment()));
        let state = engine.calculate(&wallet_id, &history, None);
        assert_eq!(state.current_number_of_sends, 0);
        assert_eq!(state.fee_owed, 0);
        assert_eq!(state.fee_cycle, 1);
    }

    #[test]
    fn test_underpayment_counts_as_send() {
        let engine = FeeStateEngine::default();
        let wallet_id = TestFixtures::wallet_id();
        let mut history = vec![non_fee_send(), non_fee_send()];
        let state = engine.calculate(&wallet_id, &history, None);

        history.push(SpendRecord::new(state.next_fee_address.clone(), state.fee_owed));
        let state = engine.calculate(&wallet_id, &history, None);
        assert_eq!(state.current_number_of_sends, 3);
        assert_eq!(state.fee_cycle, 0);
    }

    #[test]
    fn test_matcher_pool_is_used() {
        let engine = FeeStateEngine::default();
        let response = MatcherResponse::new(None, TestFixtures::address_set());
        let state = engine.calculate(&TestFixtures::wallet_id(), &[], Some(&response));
        assert!(!state.is_using_hardwired_addresses);
        assert!(TestFixtures::address_set().contains(&state.next_fee_address));
    }

    #[test]
    fn test_empty_matcher_response_falls_back() {
        let engine = FeeStateEngine::default();
        let response = MatcherResponse::new(None, Vec::new());
        let state = engine.calculate(&TestFixtures::wallet_id(), &[], Some(&response));
        assert!(state.is_using_hardwired_addresses);
        assert!(hardwired_fee_addresses().contains(&state.next_fee_address));
    }

    #[test]
    fn test_payment_to_hardwired_address_counts_with_matcher_pool() {
        let engine = FeeStateEngine::default();
        let response = MatcherResponse::new(None, TestFixtures::address_set());
        let hardwired = hardwired_fee_addresses().into_iter().next().unwrap();
        let history = vec![non_fee_send(), SpendRecord::new(hardwired, 20_000)];
        let state = engine.calculate(&TestFixtures::wallet_id(), &history, Some(&response));
        assert_eq!(state.current_number_of_sends, 0);
    }

    #[test]
    fn test_draws_are_stable_within_a_cycle() {
        let engine = FeeStateEngine::default();
        let wallet_id = TestFixtures::wallet_id();
        let first = engine.calculate(&wallet_id, &[non_fee_send()], None);
        let again = engine.calculate(&wallet_id, &[non_fee_send()], None);
        assert_eq!(first, again);

        let other = engine.calculate(&WalletId::from_bytes([9; 20]), &[non_fee_send()], None);
        assert_eq!(other.current_number_of_sends, first.current_number_of_sends);
    }

    #[test]
    fn test_window_of_one_pins_trigger() {
        let engine = FeeStateEngine::new(FeePolicy::default().with_window(1));
        let history = vec![non_fee_send(); 5];
        let state = engine.calculate(&TestFixtures::wallet_id(), &history, None);
        assert_eq!(state.next_fee_send_count, 5);
        assert!(state.is_fee_due());
    }
}
