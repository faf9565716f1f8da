//! Test doubles. Only compiled with the `testing` feature.
//!
//! Nothing here protects anything. [`PassthroughProtector`] lets fuzzers and
//! simulations drive the layers above the record layer with plaintext on
//! the wire; [`SeededRandom`] makes CBC explicit IVs reproducible.

#![allow(clippy::disallowed_types, reason = "Locking simple RNG state")]

use std::sync::Mutex;

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::{
    error::RecordError,
    layer::RecordLayer,
    protector::{Direction, MAX_RECORD_LEN, RecordContext},
    random::RandomSource,
    suite::{CipherIdentity, ProtocolVersion},
};

/// Record layer that copies records verbatim with zero overhead.
///
/// Reports the cipher it stands in for, but performs no cryptography.
/// A separate type so it can never be confused with a configured
/// [`crate::RecordProtector`].
#[derive(Debug, Clone, Copy)]
pub struct PassthroughProtector {
    direction: Direction,
    identity: CipherIdentity,
}

impl PassthroughProtector {
    /// Stand in for `identity` in `direction`.
    pub fn new(direction: Direction, identity: CipherIdentity) -> Self {
        Self { direction, identity }
    }

    /// Cipher this double stands in for.
    pub fn identity(&self) -> CipherIdentity {
        self.identity
    }

    fn require(&self, direction: Direction) -> Result<(), RecordError> {
        if self.direction != direction {
            return Err(RecordError::WrongDirection { direction: self.direction });
        }
        Ok(())
    }
}

impl RecordLayer for PassthroughProtector {
    fn direction(&self) -> Direction {
        self.direction
    }

    fn record_version(&self) -> ProtocolVersion {
        self.identity.version.legacy_record_version()
    }

    fn explicit_nonce_len(&self) -> usize {
        0
    }

    fn max_overhead(&self) -> usize {
        0
    }

    fn suffix_len(&self, _plaintext_len: usize) -> usize {
        0
    }

    fn seal(&self, _ctx: &RecordContext<'_>, plaintext: &[u8]) -> Result<Vec<u8>, RecordError> {
        self.require(Direction::Write)?;
        if plaintext.len() > MAX_RECORD_LEN {
            return Err(RecordError::RecordTooLarge { len: plaintext.len(), max: MAX_RECORD_LEN });
        }
        Ok(plaintext.to_vec())
    }

    fn open<'a>(
        &self,
        _ctx: &RecordContext<'_>,
        record: &'a mut [u8],
    ) -> Result<&'a mut [u8], RecordError> {
        self.require(Direction::Read)?;
        Ok(record)
    }
}

/// Deterministic random source seeded from a `u64`.
pub struct SeededRandom {
    rng: Mutex<ChaCha20Rng>,
}

impl SeededRandom {
    /// Seeded generator; equal seeds yield equal byte streams.
    pub fn new(seed: u64) -> Self {
        Self { rng: Mutex::new(ChaCha20Rng::seed_from_u64(seed)) }
    }
}

impl RandomSource for SeededRandom {
    fn fill(&self, dest: &mut [u8]) -> Result<(), RecordError> {
        let mut rng = self.rng.lock().map_err(|_| RecordError::RandomUnavailable)?;
        rng.fill_bytes(dest);
        Ok(())
    }
}

impl std::fmt::Debug for SeededRandom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeededRandom").finish_non_exhaustive()
    }
}
