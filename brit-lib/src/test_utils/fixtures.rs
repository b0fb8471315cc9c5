//! Test fixtures.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use crate::address::BitcoinAddress;
use crate::crypto::{KeyringParams, MatcherKeyring};
use crate::identity::WalletId;
use crate::seed_phrase::{Bip39SeedPhraseGenerator, SeedPhraseGenerator};

/// Collection of commonly used test fixtures.
pub struct TestFixtures;

impl TestFixtures {
    /// Password protecting [`TestFixtures::matcher_keyring`].
    pub const MATCHER_PASSWORD: &'static str = "brit-matcher-test-password";

    /// BIP-39 reference phrase.
    pub const SEED_PHRASE: &'static str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    /// Addresses a test Matcher publishes.
    pub const MATCHER_ADDRESSES: &'static [&'static str] = &[
        "1AhN6rPdrMuKBGFDKR1k9A8SCLYaNgXhty",
        "14Ru32Lb4kdLGfAMz1VAtxh3UFku62HaNH",
        "1KesQEF2yC2FzkJYLLozZJdbBF7zRhrdSC",
        "1CuWW5fDxuFN6CcrRi51ADWHXAMJPYxY5y",
    ];

    /// A valid address that is not a fee address anywhere.
    pub const NON_FEE_ADDRESS: &'static str = "1CQH7Hp9nNQVDcKtFVwbA8tqPMNWDBvqE3";

    /// Right shape, wrong checksum.
    pub const MANGLED_ADDRESS: &'static str = "1XXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXX";

    /// Argon2 parameters cheap enough for unit tests.
    pub fn light_keyring_params() -> KeyringParams {
        KeyringParams {
            m_cost: 256,
            t_cost: 1,
            p_cost: 1,
        }
    }

    /// A Matcher keyring sealed with [`TestFixtures::MATCHER_PASSWORD`].
    ///
    /// Generated once per process; every call returns the same key.
    pub fn matcher_keyring() -> MatcherKeyring {
        static KEYRING: OnceLock<MatcherKeyring> = OnceLock::new();
        KEYRING
            .get_or_init(|| {
                MatcherKeyring::generate_with_params(
                    Self::MATCHER_PASSWORD,
                    Self::light_keyring_params(),
                )
                .expect("test keyring generation")
            })
            .clone()
    }

    /// Wallet id derived from [`TestFixtures::SEED_PHRASE`].
    pub fn wallet_id() -> WalletId {
        let generator = Bip39SeedPhraseGenerator::new();
        let seed = generator
            .convert_to_seed(&Bip39SeedPhraseGenerator::split(Self::SEED_PHRASE))
            .expect("reference phrase is valid");
        WalletId::from_seed(&seed)
    }

    /// [`TestFixtures::MATCHER_ADDRESSES`] as a set.
    pub fn address_set() -> BTreeSet<BitcoinAddress> {
        Self::MATCHER_ADDRESSES
            .iter()
            .map(|a| BitcoinAddress::new(*a).expect("fixture address is valid"))
            .collect()
    }
}
