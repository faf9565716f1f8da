//! AEAD primitives behind the record protector.
//!
//! The protector only sees [`RecordAead`]: a nonce-in, seal/open-in-place
//! interface with a detached suffix. Real AEADs put their tag in the suffix;
//! the CBC adapter puts MAC and padding there.

mod cbc;
mod gcm;

use aes_gcm::{Aes128Gcm, Aes256Gcm};
use chacha20poly1305::ChaCha20Poly1305;

use crate::{error::RecordError, suite::BulkCipher};

/// Opaque primitive failure. Carries no cause on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PrimitiveError;

/// Seal/open-in-place interface over a keyed primitive.
pub(crate) trait RecordAead: Send + Sync {
    /// Nonce length the primitive consumes.
    fn nonce_len(&self) -> usize;

    /// Largest suffix any plaintext length produces.
    fn max_overhead(&self) -> usize;

    /// Exact suffix length for `plaintext_len` bytes of input.
    fn suffix_len(&self, plaintext_len: usize) -> usize;

    /// Encrypt `body` in place and write the suffix.
    ///
    /// `suffix.len()` must equal `suffix_len(body.len())`.
    fn seal_in_place(
        &self,
        nonce: &[u8],
        ad: &[u8],
        body: &mut [u8],
        suffix: &mut [u8],
    ) -> Result<(), PrimitiveError>;

    /// Authenticate and decrypt `record` (ciphertext followed by suffix) in
    /// place, returning the plaintext prefix of `record`.
    fn open_in_place<'a>(
        &self,
        nonce: &[u8],
        ad: &[u8],
        record: &'a mut [u8],
    ) -> Result<&'a mut [u8], PrimitiveError>;
}

/// Key the primitive for `bulk`.
///
/// AEAD ciphers take the bare encryption key; CBC ciphers take the merged
/// `mac_key ∥ enc_key ∥ fixed_iv` key.
pub(crate) fn new_primitive(
    bulk: BulkCipher,
    key: &[u8],
) -> Result<Box<dyn RecordAead>, RecordError> {
    let primitive: Box<dyn RecordAead> = match bulk {
        BulkCipher::Aes128Gcm => Box::new(gcm::AeadCipher::<Aes128Gcm>::new(bulk, key)?),
        BulkCipher::Aes256Gcm => Box::new(gcm::AeadCipher::<Aes256Gcm>::new(bulk, key)?),
        BulkCipher::ChaCha20Poly1305 => {
            Box::new(gcm::AeadCipher::<ChaCha20Poly1305>::new(bulk, key)?)
        },
        BulkCipher::Aes128CbcSha1 | BulkCipher::Aes256CbcSha1 | BulkCipher::Aes128CbcSha256 => {
            Box::new(cbc::CbcHmac::new(bulk, key)?)
        },
    };
    Ok(primitive)
}
