//! BIP-39 recovery phrases
//!
//! The system's own keys are backed by a 24-word phrase that encodes the raw
//! 32 master-key bytes directly as BIP-39 entropy (no KDF in between), so the
//! phrase and the key round-trip exactly. The phrase is shown to the user once
//! and never stored; it can be re-derived from the key on demand.

use bip39::{Language, Mnemonic};
use rand::RngCore;
use zeroize::Zeroize;

use crate::error::{CryptoError, CryptoResult};
use crate::keys::MasterKey;
use crate::KEY_SIZE;

/// Word counts accepted from user input
pub const VALID_WORD_COUNTS: [usize; 5] = [12, 15, 18, 21, 24];

/// Entropy for [`RecoveryPhrase::generate`]: 128 bits → 12 words
const GENERATED_ENTROPY_BYTES: usize = 16;

/// A checksum-validated BIP-39 English phrase. Words are lowercase.
#[derive(Clone, PartialEq, Eq)]
pub struct RecoveryPhrase {
    words: Vec<String>,
}

impl RecoveryPhrase {
    fn new(words: Vec<String>) -> CryptoResult<Self> {
        let phrase = Self { words };
        if !phrase.is_valid() {
            return Err(CryptoError::InvalidRecoveryPhrase(
                "checksum validation failed".into(),
            ));
        }
        Ok(phrase)
    }

    fn from_mnemonic(mnemonic: &Mnemonic) -> CryptoResult<Self> {
        Self::new(
            mnemonic
                .to_string()
                .split_whitespace()
                .map(str::to_owned)
                .collect(),
        )
    }

    /// Generate a 12-word phrase from 128 bits of fresh entropy.
    ///
    /// Not used for master keys; see [`RecoveryPhrase::from_master_key`].
    pub fn generate() -> CryptoResult<Self> {
        let mut entropy = [0u8; GENERATED_ENTROPY_BYTES];
        rand::thread_rng().fill_bytes(&mut entropy);

        let mnemonic = Mnemonic::from_entropy_in(Language::English, &entropy)
            .map_err(|e| CryptoError::InvalidMnemonic(format!("mnemonic generation failed: {e}")));
        entropy.zeroize();

        Self::from_mnemonic(&mnemonic?)
    }

    /// Parse user-supplied words: whitespace-split, lowercased, then checked
    /// for word count and BIP-39 checksum.
    pub fn from_words(text: &str) -> CryptoResult<Self> {
        let words: Vec<String> = text.split_whitespace().map(str::to_lowercase).collect();

        if !VALID_WORD_COUNTS.contains(&words.len()) {
            return Err(CryptoError::InvalidRecoveryPhrase(format!(
                "recovery phrase must have 12, 15, 18, 21, or 24 words, got {}",
                words.len()
            )));
        }

        Self::new(words)
    }

    /// Encode the key's 32 raw bytes as a 24-word phrase.
    pub fn from_master_key(key: &MasterKey) -> CryptoResult<Self> {
        let mnemonic = Mnemonic::from_entropy_in(Language::English, key.as_bytes())
            .map_err(|e| CryptoError::InvalidMnemonic(format!("encoding key as mnemonic: {e}")))?;
        Self::from_mnemonic(&mnemonic)
    }

    /// Decode the phrase back to a master key.
    ///
    /// A 24-word phrase yields exactly 32 bytes. Shorter phrases are
    /// zero-padded on the right and longer entropy is truncated; both cases
    /// are logged because they produce a weaker or lossy key.
    pub fn to_master_key(&self) -> CryptoResult<MasterKey> {
        let mnemonic = self
            .parse()
            .map_err(|e| CryptoError::InvalidMnemonic(format!("failed to derive key from mnemonic: {e}")))?;

        let mut entropy = mnemonic.to_entropy();
        if entropy.len() != KEY_SIZE {
            tracing::warn!(
                entropy_bytes = entropy.len(),
                words = self.words.len(),
                "recovery phrase entropy is not 256 bits; padding/truncating to key size"
            );
            entropy.resize(KEY_SIZE, 0);
        }

        let key = MasterKey::from_bytes(&entropy);
        entropy.zeroize();
        key
    }

    /// Re-run checksum validation on the stored words.
    pub fn is_valid(&self) -> bool {
        self.parse().is_ok()
    }

    /// First `n` words, space-joined, for low-risk partial display.
    pub fn hint(&self, n: usize) -> String {
        self.words
            .iter()
            .take(n)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    fn parse(&self) -> Result<Mnemonic, bip39::Error> {
        Mnemonic::parse_in_normalized(Language::English, &self.words.join(" "))
    }
}

impl std::fmt::Display for RecoveryPhrase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.words.join(" "))
    }
}

impl std::fmt::Debug for RecoveryPhrase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let first = self.words.first().map(String::as_str).unwrap_or_default();
        let last = self.words.last().map(String::as_str).unwrap_or_default();
        write!(f, "RecoveryPhrase('{first} ... {last}')")
    }
}

impl Drop for RecoveryPhrase {
    fn drop(&mut self) {
        self.words.zeroize();
    }
}
