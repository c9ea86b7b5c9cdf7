//! Cryptographically random password generation.
//!
//! [`PasswordGenerator`] draws every character independently and uniformly
//! from the union of its enabled [`PasswordContent`] classes, using the
//! system CSPRNG via `ring`. It is used both for user-facing generated
//! passwords and for the random passphrases that encrypt new stores.

use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};

use crate::error::{KeyringError, Result};

/// Default length for generated passwords and store passphrases.
pub const DEFAULT_PASSWORD_LENGTH: usize = 16;

/// A class of characters that may appear in a generated password.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PasswordContent {
    /// Digits `0-9`.
    Numeric,
    /// Letters `A-Z`.
    Uppercase,
    /// Letters `a-z`.
    Lowercase,
    /// Printable ASCII punctuation.
    Special,
}

impl PasswordContent {
    /// Every character class.
    pub const ALL: [PasswordContent; 4] = [
        PasswordContent::Numeric,
        PasswordContent::Uppercase,
        PasswordContent::Lowercase,
        PasswordContent::Special,
    ];

    fn alphabet(self) -> &'static [u8] {
        match self {
            Self::Numeric => b"0123456789",
            Self::Uppercase => b"ABCDEFGHIJKLMNOPQRSTUVWXYZ",
            Self::Lowercase => b"abcdefghijklmnopqrstuvwxyz",
            Self::Special => b"!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~",
        }
    }
}

/// Random password generator backed by the system CSPRNG.
///
/// # Example
///
/// ```rust,no_run
/// use latchkey::password::{PasswordContent, PasswordGenerator};
///
/// # fn example() -> latchkey::error::Result<()> {
/// let generator = PasswordGenerator::new(&[PasswordContent::Numeric, PasswordContent::Lowercase]);
/// let pin = generator.next(8)?;
/// assert_eq!(pin.len(), 8);
/// # Ok(())
/// # }
/// ```
pub struct PasswordGenerator {
    pool: Vec<u8>,
    rng: SystemRandom,
}

impl PasswordGenerator {
    /// Create a generator drawing from the given character classes.
    ///
    /// Listing a class more than once contributes its alphabet once.
    pub fn new(classes: &[PasswordContent]) -> Self {
        let mut generator = Self {
            pool: Vec::new(),
            rng: SystemRandom::new(),
        };
        generator.set_content(classes);
        generator
    }

    /// Replace the enabled character classes of an existing generator.
    pub fn set_content(&mut self, classes: &[PasswordContent]) {
        self.pool.clear();
        for class in PasswordContent::ALL {
            if classes.contains(&class) {
                self.pool.extend_from_slice(class.alphabet());
            }
        }
    }

    /// Generate a random password of exactly `length` characters.
    ///
    /// # Errors
    ///
    /// Returns [`KeyringError::InvalidArgument`] if no character class is
    /// enabled — an empty pool can never produce a meaningful password.
    pub fn next(&self, length: usize) -> Result<String> {
        if self.pool.is_empty() {
            return Err(KeyringError::InvalidArgument {
                reason: "at least one character class must be enabled".into(),
            });
        }

        let mut password = String::with_capacity(length);
        for _ in 0..length {
            password.push(self.pool[self.next_index()?] as char);
        }
        Ok(password)
    }

    /// Unbiased index into the character pool.
    ///
    /// Rejection sampling over 32-bit draws: values past the largest multiple
    /// of the pool size are discarded to avoid modulo bias.
    fn next_index(&self) -> Result<usize> {
        let n = self.pool.len() as u32;
        let zone = u32::MAX - u32::MAX % n;
        loop {
            let mut buf = [0u8; 4];
            self.rng
                .fill(&mut buf)
                .map_err(|_| KeyringError::Internal("system CSPRNG failure".into()))?;
            let draw = u32::from_le_bytes(buf);
            if draw < zone {
                return Ok((draw % n) as usize);
            }
        }
    }
}

impl Default for PasswordGenerator {
    /// A generator with every character class enabled.
    fn default() -> Self {
        Self::new(&PasswordContent::ALL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_exact_length() {
        let generator = PasswordGenerator::default();
        for length in [0, 1, 4, 16, 42, 256] {
            assert_eq!(generator.next(length).unwrap().chars().count(), length);
        }
    }

    #[test]
    fn respects_enabled_classes() {
        let generator = PasswordGenerator::new(&[PasswordContent::Numeric]);
        let password = generator.next(64).unwrap();
        assert!(password.chars().all(|c| c.is_ascii_digit()));

        let generator = PasswordGenerator::new(&[
            PasswordContent::Uppercase,
            PasswordContent::Lowercase,
        ]);
        let password = generator.next(64).unwrap();
        assert!(password.chars().all(|c| c.is_ascii_alphabetic()));
    }

    #[test]
    fn consecutive_outputs_differ() {
        let generator = PasswordGenerator::default();
        // 16 chars over a 94-char pool: a repeat would be astronomical.
        assert_ne!(generator.next(16).unwrap(), generator.next(16).unwrap());
    }

    #[test]
    fn empty_class_set_is_rejected() {
        let generator = PasswordGenerator::new(&[]);
        assert!(matches!(
            generator.next(8),
            Err(KeyringError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn duplicate_classes_contribute_once() {
        let generator = PasswordGenerator::new(&[PasswordContent::Numeric, PasswordContent::Numeric]);
        assert_eq!(generator.pool.len(), 10);
    }

    #[test]
    fn reconfiguration_replaces_pool() {
        let mut generator = PasswordGenerator::new(&[PasswordContent::Numeric]);
        generator.set_content(&[PasswordContent::Lowercase]);
        let password = generator.next(32).unwrap();
        assert!(password.chars().all(|c| c.is_ascii_lowercase()));
    }
}
