//! AES-CBC with HMAC, MAC-then-encrypt (RFC 5246 §6.2.3.2).
//!
//! The AD handed in is `seqnum ∥ type ∥ version`; the MAC input appends the
//! 16-bit plaintext length. Padding and MAC are checked without branching on
//! secret data: a bad pad is treated as zero padding, the MAC is still
//! computed, and both failures report the same error.
//!
//! The MAC input length depends on the secret pad byte. To keep that length
//! out of the timing, `open_in_place` tops up the hash work with dummy
//! compressions so every record of a given size runs the same number of
//! compression-function calls. Memory access patterns inside the hash still
//! follow the real MAC input length; this is not a full constant-time HMAC.

use aes::{
    Aes128, Aes256, Block,
    cipher::{BlockDecrypt, BlockEncrypt, KeyInit},
};
use hmac::{Hmac, Mac};
use sha1::{Digest, Sha1};
use sha2::Sha256;
use subtle::{ConditionallySelectable, ConstantTimeEq, ConstantTimeGreater};
use zeroize::Zeroizing;

use super::{PrimitiveError, RecordAead};
use crate::{
    error::{KeyPart, RecordError},
    suite::{AES_BLOCK_LEN, BulkCipher},
};

type HmacSha1 = Hmac<Sha1>;
type HmacSha256 = Hmac<Sha256>;

/// Longest padding run a TLS record can carry (length byte included).
const MAX_PADDING: usize = 256;

/// Input block size of SHA-1 and SHA-256.
const HASH_BLOCK_LEN: usize = 64;

/// Compression-function calls spent hashing `len` message bytes, the
/// 0x80 terminator and the 8-byte length field included.
const fn compressions(len: usize) -> usize {
    (len + 9).div_ceil(HASH_BLOCK_LEN)
}

/// Dummy compressions that bring a MAC over `mac_input_len` bytes up to the
/// cost of one over `longest_input_len` bytes.
const fn dummy_compressions(mac_input_len: usize, longest_input_len: usize) -> usize {
    compressions(longest_input_len).saturating_sub(compressions(mac_input_len))
}

enum BlockCipher {
    Aes128(Aes128),
    Aes256(Aes256),
}

impl BlockCipher {
    fn encrypt(&self, block: &mut Block) {
        match self {
            Self::Aes128(cipher) => cipher.encrypt_block(block),
            Self::Aes256(cipher) => cipher.encrypt_block(block),
        }
    }

    fn decrypt(&self, block: &mut Block) {
        match self {
            Self::Aes128(cipher) => cipher.decrypt_block(block),
            Self::Aes256(cipher) => cipher.decrypt_block(block),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum MacHash {
    Sha1,
    Sha256,
}

impl MacHash {
    const fn output_len(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 => 32,
        }
    }

    /// Run `blocks` compressions whose result is discarded.
    fn burn(self, blocks: usize) {
        let block = [0u8; HASH_BLOCK_LEN];
        match self {
            Self::Sha1 => {
                let mut hash = <Sha1 as Digest>::new();
                for _ in 0..blocks {
                    Digest::update(&mut hash, block);
                }
                std::hint::black_box(Digest::finalize(hash));
            },
            Self::Sha256 => {
                let mut hash = <Sha256 as Digest>::new();
                for _ in 0..blocks {
                    Digest::update(&mut hash, block);
                }
                std::hint::black_box(Digest::finalize(hash));
            },
        }
    }
}

/// CBC + HMAC adapter keyed from the merged `mac_key ∥ enc_key ∥ fixed_iv`.
pub(crate) struct CbcHmac {
    cipher: BlockCipher,
    hash: MacHash,
    mac_key: Zeroizing<Vec<u8>>,
}

impl CbcHmac {
    pub(crate) fn new(bulk: BulkCipher, merged_key: &[u8]) -> Result<Self, RecordError> {
        let hash = match bulk {
            BulkCipher::Aes128CbcSha256 => MacHash::Sha256,
            _ => MacHash::Sha1,
        };
        let mac_len = bulk.mac_key_len();
        let enc_len = bulk.enc_key_len();

        if merged_key.len() < mac_len + enc_len {
            return Err(RecordError::KeySizeMismatch {
                part: KeyPart::EncKey,
                expected: mac_len + enc_len,
                actual: merged_key.len(),
            });
        }
        let (mac_key, rest) = merged_key.split_at(mac_len);
        let enc_key = &rest[..enc_len];

        let bad_key = |_| RecordError::KeySizeMismatch {
            part: KeyPart::EncKey,
            expected: enc_len,
            actual: enc_key.len(),
        };
        let cipher = match bulk {
            BulkCipher::Aes256CbcSha1 => {
                BlockCipher::Aes256(Aes256::new_from_slice(enc_key).map_err(bad_key)?)
            },
            _ => BlockCipher::Aes128(Aes128::new_from_slice(enc_key).map_err(bad_key)?),
        };

        Ok(Self { cipher, hash, mac_key: Zeroizing::new(mac_key.to_vec()) })
    }

    fn compute_mac(&self, ad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, PrimitiveError> {
        let len = u16::try_from(plaintext.len()).map_err(|_| PrimitiveError)?.to_be_bytes();

        let tag = match self.hash {
            MacHash::Sha1 => {
                let Ok(mut mac) = <HmacSha1 as Mac>::new_from_slice(&self.mac_key) else {
                    unreachable!("HMAC accepts keys of any length")
                };
                mac.update(ad);
                mac.update(&len);
                mac.update(plaintext);
                mac.finalize().into_bytes().to_vec()
            },
            MacHash::Sha256 => {
                let Ok(mut mac) = <HmacSha256 as Mac>::new_from_slice(&self.mac_key) else {
                    unreachable!("HMAC accepts keys of any length")
                };
                mac.update(ad);
                mac.update(&len);
                mac.update(plaintext);
                mac.finalize().into_bytes().to_vec()
            },
        };
        Ok(tag)
    }
}

impl RecordAead for CbcHmac {
    fn nonce_len(&self) -> usize {
        AES_BLOCK_LEN
    }

    fn max_overhead(&self) -> usize {
        self.hash.output_len() + AES_BLOCK_LEN
    }

    fn suffix_len(&self, plaintext_len: usize) -> usize {
        let mac_len = self.hash.output_len();
        mac_len + (AES_BLOCK_LEN - (plaintext_len + mac_len) % AES_BLOCK_LEN)
    }

    fn seal_in_place(
        &self,
        nonce: &[u8],
        ad: &[u8],
        body: &mut [u8],
        suffix: &mut [u8],
    ) -> Result<(), PrimitiveError> {
        if nonce.len() != AES_BLOCK_LEN || suffix.len() != self.suffix_len(body.len()) {
            return Err(PrimitiveError);
        }

        let mac = self.compute_mac(ad, body)?;
        let (mac_out, padding) = suffix.split_at_mut(mac.len());
        mac_out.copy_from_slice(&mac);
        // suffix_len guarantees 1..=16 padding bytes
        let pad = u8::try_from(padding.len() - 1).map_err(|_| PrimitiveError)?;
        padding.fill(pad);

        cbc_encrypt(&self.cipher, nonce, body, suffix);
        Ok(())
    }

    fn open_in_place<'a>(
        &self,
        nonce: &[u8],
        ad: &[u8],
        record: &'a mut [u8],
    ) -> Result<&'a mut [u8], PrimitiveError> {
        let mac_len = self.hash.output_len();
        let min_len = (mac_len + 1).div_ceil(AES_BLOCK_LEN) * AES_BLOCK_LEN;
        if nonce.len() != AES_BLOCK_LEN
            || record.len() < min_len
            || !record.len().is_multiple_of(AES_BLOCK_LEN)
        {
            return Err(PrimitiveError);
        }

        cbc_decrypt(&self.cipher, nonce, record);

        let total = record.len();
        let pad = record[total - 1];
        let pad_len = u64::from(pad) + 1;

        let mut good = !(pad_len + mac_len as u64).ct_gt(&(total as u64));
        for i in 0..total.min(MAX_PADDING) {
            let in_padding = !(i as u64 + 1).ct_gt(&pad_len);
            good &= !in_padding | record[total - 1 - i].ct_eq(&pad);
        }

        let strip = u64::conditional_select(&0, &pad_len, good) as usize;
        let plaintext_len = total - mac_len - strip;

        let (plaintext, rest) = record.split_at_mut(plaintext_len);
        let expected = self.compute_mac(ad, plaintext)?;
        let mac_ok = expected.as_slice().ct_eq(&rest[..mac_len]);

        // MAC input is ad ∥ len16 ∥ plaintext; pad to the zero-strip length
        let header_len = ad.len() + 2;
        let longest = header_len + total - mac_len;
        self.hash.burn(dummy_compressions(header_len + plaintext_len, longest));

        if bool::from(good & mac_ok) { Ok(plaintext) } else { Err(PrimitiveError) }
    }
}

fn byte_at(head: &[u8], tail: &[u8], at: usize) -> u8 {
    if at < head.len() { head[at] } else { tail[at - head.len()] }
}

fn byte_at_mut<'a>(head: &'a mut [u8], tail: &'a mut [u8], at: usize) -> &'a mut u8 {
    if at < head.len() { &mut head[at] } else { &mut tail[at - head.len()] }
}

/// CBC-encrypt `head ∥ tail` in place without joining the two regions.
///
/// The combined length must be a whole number of blocks.
fn cbc_encrypt(cipher: &BlockCipher, iv: &[u8], head: &mut [u8], tail: &mut [u8]) {
    let total = head.len() + tail.len();
    let mut chain = Block::clone_from_slice(iv);

    for offset in (0..total).step_by(AES_BLOCK_LEN) {
        let mut block = Block::default();
        for (i, byte) in block.iter_mut().enumerate() {
            *byte = byte_at(head, tail, offset + i) ^ chain[i];
        }
        cipher.encrypt(&mut block);
        for (i, byte) in block.iter().enumerate() {
            *byte_at_mut(head, tail, offset + i) = *byte;
        }
        chain = block;
    }
}

fn cbc_decrypt(cipher: &BlockCipher, iv: &[u8], data: &mut [u8]) {
    let mut chain = Block::clone_from_slice(iv);

    for chunk in data.chunks_exact_mut(AES_BLOCK_LEN) {
        let ciphertext = Block::clone_from_slice(chunk);
        let mut block = ciphertext;
        cipher.decrypt(&mut block);
        for ((out, plain), prev) in chunk.iter_mut().zip(block.iter()).zip(chain.iter()) {
            *out = plain ^ prev;
        }
        chain = ciphertext;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter(bulk: BulkCipher) -> CbcHmac {
        let key = vec![0x42; bulk.mac_key_len() + bulk.enc_key_len()];
        CbcHmac::new(bulk, &key).unwrap()
    }

    fn seal(cipher: &CbcHmac, iv: &[u8], ad: &[u8], plaintext: &[u8]) -> Vec<u8> {
        let mut record = plaintext.to_vec();
        record.resize(plaintext.len() + cipher.suffix_len(plaintext.len()), 0);
        let (body, suffix) = record.split_at_mut(plaintext.len());
        cipher.seal_in_place(iv, ad, body, suffix).unwrap();
        record
    }

    #[test]
    fn suffix_pads_to_block_boundary() {
        let cipher = adapter(BulkCipher::Aes128CbcSha1);
        for len in 0..64 {
            let suffix = cipher.suffix_len(len);
            assert!((len + suffix).is_multiple_of(AES_BLOCK_LEN));
            assert!(suffix > 20 && suffix <= cipher.max_overhead());
        }
        // 0 + 20 + 1 = 21 rounds up to 32: twelve bytes of value 11
        assert_eq!(cipher.suffix_len(0), 32);
    }

    #[test]
    fn roundtrip_all_cbc_ciphers() {
        let all = [BulkCipher::Aes128CbcSha1, BulkCipher::Aes256CbcSha1, BulkCipher::Aes128CbcSha256];
        for bulk in all {
            let cipher = adapter(bulk);
            let iv = [0x11; 16];
            let ad = [0, 0, 0, 0, 0, 0, 0, 3, 0x17, 0x03, 0x03];
            for len in [0usize, 1, 15, 16, 17, 100] {
                let plaintext = vec![0xA5; len];
                let mut record = seal(&cipher, &iv, &ad, &plaintext);
                let opened = cipher.open_in_place(&iv, &ad, &mut record).unwrap();
                assert_eq!(opened, plaintext.as_slice(), "{bulk:?} len {len}");
            }
        }
    }

    #[test]
    fn padding_bytes_carry_pad_value() {
        let cipher = adapter(BulkCipher::Aes128CbcSha1);
        let iv = [0u8; 16];
        let record = seal(&cipher, &iv, &[], b"hello");
        let mut plain = record.clone();
        cbc_decrypt(&cipher.cipher, &iv, &mut plain);

        // 5 + 20 = 25; 7 padding bytes of value 6
        assert_eq!(record.len(), 32);
        assert_eq!(&plain[25..], &[6; 7]);
    }

    #[test]
    fn tampered_record_fails() {
        let cipher = adapter(BulkCipher::Aes128CbcSha256);
        let iv = [0x22; 16];
        let mut record = seal(&cipher, &iv, b"ad", b"attack at dawn");
        record[0] ^= 1;
        assert_eq!(cipher.open_in_place(&iv, b"ad", &mut record), Err(PrimitiveError));
    }

    #[test]
    fn misaligned_or_short_records_fail() {
        let cipher = adapter(BulkCipher::Aes128CbcSha1);
        assert_eq!(cipher.open_in_place(&[0; 16], &[], &mut [0u8; 31]), Err(PrimitiveError));
        assert_eq!(cipher.open_in_place(&[0; 16], &[], &mut [0u8; 16]), Err(PrimitiveError));
    }

    #[test]
    fn bad_padding_reports_same_error_as_bad_mac() {
        let cipher = adapter(BulkCipher::Aes128CbcSha1);
        let iv = [0u8; 16];
        let mut plain = vec![0u8; 48];
        plain[47] = 200;
        let mut record = plain.clone();
        cbc_encrypt(&cipher.cipher, &iv, &mut record, &mut []);

        assert_eq!(cipher.open_in_place(&iv, &[], &mut record), Err(PrimitiveError));
    }

    #[test]
    fn compressions_follow_sha_padding() {
        assert_eq!(compressions(0), 1);
        assert_eq!(compressions(55), 1);
        assert_eq!(compressions(56), 2);
        assert_eq!(compressions(119), 2);
        assert_eq!(compressions(120), 3);
    }

    #[test]
    fn hash_work_is_independent_of_pad_byte() {
        let mac_len = 20;
        let header_len = 13;
        for total in [32usize, 48, 64, 160, 288, 1024] {
            let longest = header_len + total - mac_len;
            let expected = compressions(longest);
            for pad in 0..=255usize {
                let strip = if pad + 1 + mac_len <= total { pad + 1 } else { 0 };
                let real = header_len + total - mac_len - strip;
                let spent = compressions(real) + dummy_compressions(real, longest);
                assert_eq!(spent, expected, "total {total} pad {pad}");
            }
        }
    }

    #[test]
    fn split_encrypt_matches_contiguous() {
        let cipher = adapter(BulkCipher::Aes256CbcSha1);
        let iv = [9u8; 16];
        let data: Vec<u8> = (0..48).collect();

        let mut whole = data.clone();
        cbc_encrypt(&cipher.cipher, &iv, &mut whole, &mut []);

        let mut split = data;
        let (head, tail) = split.split_at_mut(21);
        cbc_encrypt(&cipher.cipher, &iv, head, tail);

        assert_eq!(whole, split);
    }
}
