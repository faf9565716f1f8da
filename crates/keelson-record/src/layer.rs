//! The seam transports program against.

use crate::{
    error::RecordError,
    protector::{Direction, MAX_RECORD_LEN, RecordContext, RecordProtector},
    suite::ProtocolVersion,
};

/// Seal/open over one direction of a record stream.
///
/// Implemented by [`RecordProtector`] and, behind the `testing` feature, by
/// the pass-through double used when fuzzing the layers above.
pub trait RecordLayer: Send + Sync {
    /// Direction this layer was built for.
    fn direction(&self) -> Direction;

    /// Version written in the outer record header.
    fn record_version(&self) -> ProtocolVersion;

    /// Bytes of explicit nonce in front of each record.
    fn explicit_nonce_len(&self) -> usize;

    /// Largest difference between a sealed record and its plaintext.
    fn max_overhead(&self) -> usize;

    /// Exact suffix length for a plaintext of `plaintext_len` bytes.
    fn suffix_len(&self, plaintext_len: usize) -> usize;

    /// Sealed record length for a plaintext of `plaintext_len` bytes.
    ///
    /// # Errors
    ///
    /// - `RecordTooLarge` if the record would exceed [`MAX_RECORD_LEN`]
    fn ciphertext_len(&self, plaintext_len: usize) -> Result<usize, RecordError> {
        let len = self.explicit_nonce_len() + plaintext_len + self.suffix_len(plaintext_len);
        if len > MAX_RECORD_LEN {
            return Err(RecordError::RecordTooLarge { len, max: MAX_RECORD_LEN });
        }
        Ok(len)
    }

    /// Seal `plaintext` into a new record.
    fn seal(&self, ctx: &RecordContext<'_>, plaintext: &[u8]) -> Result<Vec<u8>, RecordError>;

    /// Open `record` in place, returning the plaintext subslice.
    fn open<'a>(
        &self,
        ctx: &RecordContext<'_>,
        record: &'a mut [u8],
    ) -> Result<&'a mut [u8], RecordError>;
}

impl RecordLayer for RecordProtector {
    fn direction(&self) -> Direction {
        RecordProtector::direction(self)
    }

    fn record_version(&self) -> ProtocolVersion {
        RecordProtector::record_version(self)
    }

    fn explicit_nonce_len(&self) -> usize {
        RecordProtector::explicit_nonce_len(self)
    }

    fn max_overhead(&self) -> usize {
        RecordProtector::max_overhead(self)
    }

    fn suffix_len(&self, plaintext_len: usize) -> usize {
        RecordProtector::suffix_len(self, plaintext_len)
    }

    fn ciphertext_len(&self, plaintext_len: usize) -> Result<usize, RecordError> {
        RecordProtector::ciphertext_len(self, plaintext_len)
    }

    fn seal(&self, ctx: &RecordContext<'_>, plaintext: &[u8]) -> Result<Vec<u8>, RecordError> {
        RecordProtector::seal(self, ctx, plaintext)
    }

    fn open<'a>(
        &self,
        ctx: &RecordContext<'_>,
        record: &'a mut [u8],
    ) -> Result<&'a mut [u8], RecordError> {
        RecordProtector::open(self, ctx, record)
    }
}
