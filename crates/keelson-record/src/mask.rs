//! Record number masking (DTLS 1.3 record number encryption, RFC 9147 §4.2.3).
//!
//! A mask is a pseudorandom function of a ciphertext sample, keyed with the
//! record number key. The caller XORs the mask over the on-wire sequence
//! number bytes; the masker never sees them.

use std::fmt;

use aes::{
    Aes128, Aes256, Block,
    cipher::{BlockEncrypt, KeyInit},
};
use chacha20::{
    ChaChaCore,
    cipher::{
        Block as ChaChaBlock, KeyIvInit, StreamCipherCore, StreamCipherSeekCore, consts::U10,
    },
};
use zeroize::Zeroizing;

use crate::{
    error::{KeyPart, RecordError},
    suite::CipherSuite,
};

/// Minimum sample length, and the length of one mask block.
pub const MASK_SAMPLE_LEN: usize = 16;

/// ChaCha20 keystream block size.
const CHACHA_BLOCK_LEN: usize = 64;

/// Block-level ChaCha20 (10 double rounds). Unlike the stream wrapper it can
/// produce block `u32::MAX`.
type ChaCha20Core = ChaChaCore<U10>;

/// Mask algorithm keyed alongside an AEAD cipher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaskAlgorithm {
    /// AES-128 single-block encryption of the sample
    Aes128,
    /// AES-256 single-block encryption of the sample
    Aes256,
    /// ChaCha20 keystream with counter and nonce taken from the sample
    ChaCha20,
}

impl MaskAlgorithm {
    /// Record number key length for this algorithm.
    pub const fn key_len(self) -> usize {
        match self {
            Self::Aes128 => 16,
            Self::Aes256 | Self::ChaCha20 => 32,
        }
    }

    /// Human-readable algorithm name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Aes128 => "AES-128-ECB",
            Self::Aes256 => "AES-256-ECB",
            Self::ChaCha20 => "ChaCha20",
        }
    }
}

/// One keyed mask capability.
trait MaskGenerator: Send + Sync {
    fn generate_mask(&self, sample: &[u8], out: &mut [u8]) -> Result<(), RecordError>;

    fn algorithm(&self) -> Option<MaskAlgorithm>;
}

fn check_sample(sample: &[u8]) -> Result<(), RecordError> {
    if sample.len() < MASK_SAMPLE_LEN {
        return Err(RecordError::SampleTooShort { len: sample.len(), min: MASK_SAMPLE_LEN });
    }
    Ok(())
}

fn aes_block_mask(
    sample: &[u8],
    out: &mut [u8],
    encrypt: impl FnOnce(&mut Block),
) -> Result<(), RecordError> {
    check_sample(sample)?;
    if out.len() > MASK_SAMPLE_LEN {
        return Err(RecordError::MaskTooLong { requested: out.len(), max: MASK_SAMPLE_LEN });
    }

    let mut block = Block::clone_from_slice(&sample[..MASK_SAMPLE_LEN]);
    encrypt(&mut block);
    out.copy_from_slice(&block[..out.len()]);
    Ok(())
}

struct Aes128Mask(Aes128);

impl MaskGenerator for Aes128Mask {
    fn generate_mask(&self, sample: &[u8], out: &mut [u8]) -> Result<(), RecordError> {
        aes_block_mask(sample, out, |block| self.0.encrypt_block(block))
    }

    fn algorithm(&self) -> Option<MaskAlgorithm> {
        Some(MaskAlgorithm::Aes128)
    }
}

struct Aes256Mask(Aes256);

impl MaskGenerator for Aes256Mask {
    fn generate_mask(&self, sample: &[u8], out: &mut [u8]) -> Result<(), RecordError> {
        aes_block_mask(sample, out, |block| self.0.encrypt_block(block))
    }

    fn algorithm(&self) -> Option<MaskAlgorithm> {
        Some(MaskAlgorithm::Aes256)
    }
}

struct ChaCha20Mask {
    key: Zeroizing<[u8; 32]>,
}

impl MaskGenerator for ChaCha20Mask {
    fn generate_mask(&self, sample: &[u8], out: &mut [u8]) -> Result<(), RecordError> {
        check_sample(sample)?;

        let counter = u32::from_le_bytes([sample[0], sample[1], sample[2], sample[3]]);
        // blocks counter..=u32::MAX are usable
        let available = (u64::from(u32::MAX - counter) + 1) * CHACHA_BLOCK_LEN as u64;
        if out.len() as u64 > available {
            return Err(RecordError::MaskTooLong {
                requested: out.len(),
                max: usize::try_from(available).unwrap_or(usize::MAX),
            });
        }

        let mut core = ChaCha20Core::new(
            chacha20::Key::from_slice(self.key.as_slice()),
            chacha20::Nonce::from_slice(&sample[4..MASK_SAMPLE_LEN]),
        );
        core.set_block_pos(counter);

        let mut block = ChaChaBlock::<ChaCha20Core>::default();
        for chunk in out.chunks_mut(CHACHA_BLOCK_LEN) {
            core.write_keystream_block(&mut block);
            chunk.copy_from_slice(&block[..chunk.len()]);
        }
        Ok(())
    }

    fn algorithm(&self) -> Option<MaskAlgorithm> {
        Some(MaskAlgorithm::ChaCha20)
    }
}

struct NoMask;

impl MaskGenerator for NoMask {
    fn generate_mask(&self, _sample: &[u8], _out: &mut [u8]) -> Result<(), RecordError> {
        Err(RecordError::MaskUnavailable)
    }

    fn algorithm(&self) -> Option<MaskAlgorithm> {
        None
    }
}

/// Keyed record number masker, or the "none" variant.
///
/// Selected once at construction; holds nothing but the key schedule.
pub struct RecordNumberMasker {
    inner: Box<dyn MaskGenerator>,
}

impl RecordNumberMasker {
    /// Key a masker for `algorithm`.
    ///
    /// # Errors
    ///
    /// - `KeySizeMismatch` if `key` is not [`MaskAlgorithm::key_len`] bytes
    pub fn new(algorithm: MaskAlgorithm, key: &[u8]) -> Result<Self, RecordError> {
        let mismatch = || RecordError::KeySizeMismatch {
            part: KeyPart::RecordNumberKey,
            expected: algorithm.key_len(),
            actual: key.len(),
        };

        let inner: Box<dyn MaskGenerator> = match algorithm {
            MaskAlgorithm::Aes128 => {
                Box::new(Aes128Mask(Aes128::new_from_slice(key).map_err(|_| mismatch())?))
            },
            MaskAlgorithm::Aes256 => {
                Box::new(Aes256Mask(Aes256::new_from_slice(key).map_err(|_| mismatch())?))
            },
            MaskAlgorithm::ChaCha20 => {
                let key: [u8; 32] = key.try_into().map_err(|_| mismatch())?;
                Box::new(ChaCha20Mask { key: Zeroizing::new(key) })
            },
        };
        Ok(Self { inner })
    }

    /// The masker that produces nothing.
    pub fn none() -> Self {
        Self { inner: Box::new(NoMask) }
    }

    /// Key the masker that goes with `suite`'s bulk cipher.
    ///
    /// Suites without a mask algorithm (CBC) yield the "none" masker.
    ///
    /// # Errors
    ///
    /// - `KeySizeMismatch` if `key` has the wrong length for the algorithm
    pub fn for_suite(suite: CipherSuite, key: &[u8]) -> Result<Self, RecordError> {
        match suite.bulk().mask_algorithm() {
            Some(algorithm) => Self::new(algorithm, key),
            None => Ok(Self::none()),
        }
    }

    /// Algorithm in use, `None` for the "none" masker.
    pub fn algorithm(&self) -> Option<MaskAlgorithm> {
        self.inner.algorithm()
    }

    /// True unless this is the "none" masker.
    pub fn is_available(&self) -> bool {
        self.algorithm().is_some()
    }

    /// Fill `out` with mask bytes derived from `sample`.
    ///
    /// # Errors
    ///
    /// - `SampleTooShort` if `sample` is under [`MASK_SAMPLE_LEN`] bytes
    /// - `MaskTooLong` if `out` exceeds one AES block, or would run the
    ///   ChaCha20 block counter past its end
    /// - `MaskUnavailable` on the "none" masker
    pub fn generate_mask(&self, sample: &[u8], out: &mut [u8]) -> Result<(), RecordError> {
        self.inner.generate_mask(sample, out)
    }

    /// Full 16-byte mask block for `sample`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::generate_mask`].
    pub fn mask_block(&self, sample: &[u8]) -> Result<[u8; MASK_SAMPLE_LEN], RecordError> {
        let mut block = [0u8; MASK_SAMPLE_LEN];
        self.generate_mask(sample, &mut block)?;
        Ok(block)
    }
}

impl fmt::Debug for RecordNumberMasker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordNumberMasker").field("algorithm", &self.algorithm()).finish()
    }
}
