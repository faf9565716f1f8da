//! Real AEADs: AES-GCM and ChaCha20-Poly1305.

use aes_gcm::aead::{AeadInPlace, KeyInit, generic_array::GenericArray};

use super::{PrimitiveError, RecordAead};
use crate::{
    error::{KeyPart, RecordError},
    suite::{AEAD_NONCE_LEN, BulkCipher},
};

/// GCM and Poly1305 tag size (16 bytes)
pub(crate) const TAG_LEN: usize = 16;

/// Any RustCrypto in-place AEAD with 12-byte nonces and 16-byte tags.
pub(crate) struct AeadCipher<A> {
    cipher: A,
}

impl<A: AeadInPlace + KeyInit> AeadCipher<A> {
    pub(crate) fn new(bulk: BulkCipher, key: &[u8]) -> Result<Self, RecordError> {
        let cipher = A::new_from_slice(key).map_err(|_| RecordError::KeySizeMismatch {
            part: KeyPart::EncKey,
            expected: bulk.enc_key_len(),
            actual: key.len(),
        })?;
        Ok(Self { cipher })
    }
}

impl<A> RecordAead for AeadCipher<A>
where
    A: AeadInPlace + Send + Sync,
{
    fn nonce_len(&self) -> usize {
        AEAD_NONCE_LEN
    }

    fn max_overhead(&self) -> usize {
        TAG_LEN
    }

    fn suffix_len(&self, _plaintext_len: usize) -> usize {
        TAG_LEN
    }

    fn seal_in_place(
        &self,
        nonce: &[u8],
        ad: &[u8],
        body: &mut [u8],
        suffix: &mut [u8],
    ) -> Result<(), PrimitiveError> {
        if nonce.len() != AEAD_NONCE_LEN || suffix.len() != TAG_LEN {
            return Err(PrimitiveError);
        }

        let tag = self
            .cipher
            .encrypt_in_place_detached(GenericArray::from_slice(nonce), ad, body)
            .map_err(|_| PrimitiveError)?;
        suffix.copy_from_slice(&tag);
        Ok(())
    }

    fn open_in_place<'a>(
        &self,
        nonce: &[u8],
        ad: &[u8],
        record: &'a mut [u8],
    ) -> Result<&'a mut [u8], PrimitiveError> {
        if nonce.len() != AEAD_NONCE_LEN || record.len() < TAG_LEN {
            return Err(PrimitiveError);
        }

        let body_len = record.len() - TAG_LEN;
        let (body, tag) = record.split_at_mut(body_len);
        self.cipher
            .decrypt_in_place_detached(
                GenericArray::from_slice(nonce),
                ad,
                body,
                GenericArray::from_slice(tag),
            )
            .map_err(|_| PrimitiveError)?;
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use aes_gcm::Aes128Gcm;
    use chacha20poly1305::ChaCha20Poly1305;

    use super::*;

    #[test]
    fn seal_open_in_place_roundtrip() {
        let cipher = AeadCipher::<ChaCha20Poly1305>::new(BulkCipher::ChaCha20Poly1305, &[7; 32])
            .unwrap();
        let nonce = [1u8; 12];
        let mut record = b"in place".to_vec();
        record.resize(8 + TAG_LEN, 0);

        let (body, suffix) = record.split_at_mut(8);
        cipher.seal_in_place(&nonce, b"ad", body, suffix).unwrap();
        assert_ne!(&record[..8], b"in place");

        let plaintext = cipher.open_in_place(&nonce, b"ad", &mut record).unwrap();
        assert_eq!(plaintext, b"in place");
    }

    #[test]
    fn wrong_ad_fails() {
        let cipher = AeadCipher::<Aes128Gcm>::new(BulkCipher::Aes128Gcm, &[9; 16]).unwrap();
        let nonce = [0u8; 12];
        let mut record = vec![0u8; 4 + TAG_LEN];
        let (body, suffix) = record.split_at_mut(4);
        cipher.seal_in_place(&nonce, b"one", body, suffix).unwrap();

        assert_eq!(cipher.open_in_place(&nonce, b"two", &mut record), Err(PrimitiveError));
    }

    #[test]
    fn short_record_fails_without_panicking() {
        let cipher = AeadCipher::<Aes128Gcm>::new(BulkCipher::Aes128Gcm, &[9; 16]).unwrap();
        let mut record = vec![0u8; TAG_LEN - 1];
        assert_eq!(cipher.open_in_place(&[0; 12], &[], &mut record), Err(PrimitiveError));
    }

    #[test]
    fn wrong_key_length_is_rejected() {
        let result = AeadCipher::<Aes128Gcm>::new(BulkCipher::Aes128Gcm, &[0; 15]);
        assert!(matches!(
            result,
            Err(RecordError::KeySizeMismatch { part: KeyPart::EncKey, expected: 16, actual: 15 })
        ));
    }
}
