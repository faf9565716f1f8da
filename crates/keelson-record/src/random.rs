//! Randomness for explicit CBC IVs.
//!
//! Only the `ExplicitRandom` nonce mode draws from here. The source is
//! injected so simulations can replace OS entropy with a seeded generator.

use crate::error::RecordError;

/// Source of fresh random bytes.
///
/// # Invariants
///
/// - Production implementations use cryptographically secure entropy
/// - A failure is reported, never papered over with predictable bytes
pub trait RandomSource: Send + Sync {
    /// Fill `dest` with random bytes.
    ///
    /// # Errors
    ///
    /// - `RandomUnavailable` if no entropy could be obtained
    fn fill(&self, dest: &mut [u8]) -> Result<(), RecordError>;
}

/// Operating system entropy via `getrandom`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill(&self, dest: &mut [u8]) -> Result<(), RecordError> {
        getrandom::fill(dest).map_err(|_| RecordError::RandomUnavailable)
    }
}
