//! BIP-39 seed phrases.
//!
//! A wallet's BRIT identity is derived from the 64-byte BIP-39 seed of its
//! mnemonic (empty passphrase). This module generates fresh mnemonics,
//! validates them and converts them to seed bytes.

use bip39::{Language, Mnemonic, Seed};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::{BritError, Result};

/// Length of a BIP-39 seed in bytes.
pub const SEED_LENGTH: usize = 64;

/// Supported mnemonic lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeedPhraseSize {
    Twelve,
    Fifteen,
    Eighteen,
    TwentyOne,
    TwentyFour,
}

impl SeedPhraseSize {
    /// Number of words in the phrase.
    pub fn word_count(self) -> usize {
        match self {
            Self::Twelve => 12,
            Self::Fifteen => 15,
            Self::Eighteen => 18,
            Self::TwentyOne => 21,
            Self::TwentyFour => 24,
        }
    }

    /// Entropy consumed to build a phrase of this size.
    pub fn entropy_bytes(self) -> usize {
        match self {
            Self::Twelve => 16,
            Self::Fifteen => 20,
            Self::Eighteen => 24,
            Self::TwentyOne => 28,
            Self::TwentyFour => 32,
        }
    }

    /// Map a word count back to a size, if supported.
    pub fn from_word_count(count: usize) -> Option<Self> {
        match count {
            12 => Some(Self::Twelve),
            15 => Some(Self::Fifteen),
            18 => Some(Self::Eighteen),
            21 => Some(Self::TwentyOne),
            24 => Some(Self::TwentyFour),
            _ => None,
        }
    }
}

impl Default for SeedPhraseSize {
    fn default() -> Self {
        Self::Twelve
    }
}

/// Source of mnemonics and mnemonic-to-seed conversion.
pub trait SeedPhraseGenerator {
    /// Generate a new random mnemonic of the given size.
    fn new_seed_phrase(&self, size: SeedPhraseSize) -> Result<Vec<String>>;

    /// Validate a mnemonic and convert it to seed bytes.
    fn convert_to_seed(&self, words: &[String]) -> Result<Zeroizing<Vec<u8>>>;

    /// Returns true if the phrase has a supported length and a valid checksum.
    fn is_valid(&self, words: &[String]) -> bool;
}

/// English-wordlist BIP-39 generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bip39SeedPhraseGenerator;

impl Bip39SeedPhraseGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Split a phrase on runs of whitespace.
    pub fn split(words: &str) -> Vec<String> {
        words.split_whitespace().map(str::to_owned).collect()
    }

    fn parse(words: &[String]) -> Result<Mnemonic> {
        let phrase = Zeroizing::new(words.join(" "));
        Mnemonic::from_phrase(&phrase, Language::English)
            .map_err(|e| BritError::InvalidSeedPhrase(e.to_string()))
    }
}

impl SeedPhraseGenerator for Bip39SeedPhraseGenerator {
    fn new_seed_phrase(&self, size: SeedPhraseSize) -> Result<Vec<String>> {
        let mut entropy = Zeroizing::new(vec![0u8; size.entropy_bytes()]);
        rand::rngs::OsRng.fill_bytes(&mut entropy);

        let mnemonic = Mnemonic::from_entropy(&entropy, Language::English)
            .map_err(|e| BritError::InvalidSeedPhrase(e.to_string()))?;
        Ok(Self::split(mnemonic.phrase()))
    }

    fn convert_to_seed(&self, words: &[String]) -> Result<Zeroizing<Vec<u8>>> {
        if SeedPhraseSize::from_word_count(words.len()).is_none() {
            return Err(BritError::InvalidSeedPhrase(format!(
                "unsupported word count {}",
                words.len()
            )));
        }
        let mnemonic = Self::parse(words)?;
        let seed = Seed::new(&mnemonic, "");
        Ok(Zeroizing::new(seed.as_bytes().to_vec()))
    }

    fn is_valid(&self, words: &[String]) -> bool {
        SeedPhraseSize::from_word_count(words.len()).is_some() && Self::parse(words).is_ok()
    }
}
