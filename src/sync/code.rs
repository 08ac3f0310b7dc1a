//! Shareable sync codes
//!
//! A sync code is five symbols from a 32-symbol alphabet that leaves out
//! the look-alikes `0`, `1`, `I` and `O`. Codes are case-insensitive and
//! always stored in uppercase.

use std::fmt;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

/// Symbols a code is drawn from
pub const ALPHABET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Number of symbols in a code
pub const CODE_LEN: usize = 5;

/// Identifier of one shared record, normalized to uppercase
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncId(String);

impl SyncId {
    /// Normalize a client-supplied code.
    ///
    /// No format check is done: an unknown or malformed code simply
    /// addresses a record that does not exist.
    pub fn normalize(raw: &str) -> Self {
        Self(raw.to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this code could have been produced by [`generate_with`]
    pub fn is_well_formed(&self) -> bool {
        self.0.len() == CODE_LEN && self.0.bytes().all(|b| ALPHABET.contains(&b))
    }
}

impl fmt::Display for SyncId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Draw a code from the given randomness source.
///
/// Each position is sampled independently and uniformly. Uniqueness against
/// stored records is not checked.
pub fn generate_with<R: Rng + ?Sized>(rng: &mut R) -> SyncId {
    let code = (0..CODE_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    SyncId(code)
}

/// Source of fresh sync codes
pub trait CodeSource: Send + Sync {
    fn generate(&self) -> SyncId;
}

/// Code generator over a replaceable random source
pub struct CodeGenerator {
    rng: Mutex<Box<dyn RngCore + Send>>,
}

impl CodeGenerator {
    /// Generator seeded from OS entropy
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic generator, for tests and reproducible runs
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    pub fn with_rng<R: RngCore + Send + 'static>(rng: R) -> Self {
        Self {
            rng: Mutex::new(Box::new(rng)),
        }
    }
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeSource for CodeGenerator {
    fn generate(&self) -> SyncId {
        let mut rng = self.rng.lock();
        generate_with(&mut *rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;
    use std::collections::HashSet;

    #[test]
    fn test_generated_codes_are_well_formed() {
        let generator = CodeGenerator::new();
        for _ in 0..500 {
            let id = generator.generate();
            assert_eq!(id.as_str().len(), CODE_LEN);
            assert!(id.is_well_formed(), "bad code {}", id);
        }
    }

    #[test]
    fn test_alphabet_excludes_ambiguous_symbols() {
        for ambiguous in [b'0', b'1', b'I', b'O'] {
            assert!(!ALPHABET.contains(&ambiguous));
        }
        let distinct: HashSet<_> = ALPHABET.iter().collect();
        assert_eq!(distinct.len(), 32);
    }

    #[test]
    fn test_alphabet_coverage() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut seen = HashSet::new();
        for _ in 0..400 {
            seen.extend(generate_with(&mut rng).as_str().chars());
        }
        assert_eq!(seen.len(), ALPHABET.len());
    }

    #[test]
    fn test_same_seed_collides() {
        let a = CodeGenerator::seeded(42);
        let b = CodeGenerator::seeded(42);
        assert_eq!(a.generate(), b.generate());
        assert_eq!(a.generate(), b.generate());
    }

    #[test]
    fn test_constant_source_repeats() {
        let generator = CodeGenerator::with_rng(StepRng::new(0, 0));
        let first = generator.generate();
        assert!(first.is_well_formed());
        assert_eq!(first, generator.generate());
    }

    #[test]
    fn test_normalize() {
        assert_eq!(SyncId::normalize("ab3k9").as_str(), "AB3K9");
        assert_eq!(SyncId::normalize("xyz22"), SyncId::normalize("XYZ22"));
        // Only case is normalized; padded codes address a different key
        assert_ne!(SyncId::normalize(" xyz22"), SyncId::normalize("XYZ22"));
        assert_eq!(SyncId::normalize(" ab3k9").as_str(), " AB3K9");
        assert!(!SyncId::normalize("AB0K9").is_well_formed());
        assert!(!SyncId::normalize("ABCD").is_well_formed());
    }
}
