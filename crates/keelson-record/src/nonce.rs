//! Per-record nonce construction.
//!
//! Any change here must be checked against the known-answer vectors in
//! `tests/known_answer.rs`; a wrong nonce is a nonce reuse.

use zeroize::Zeroizing;

use crate::error::{KeyPart, RecordError};

/// Longest nonce any supported primitive takes (CBC explicit IV).
pub const MAX_NONCE_LEN: usize = 16;

/// Length of the big-endian sequence number in nonces and AD.
pub const SEQUENCE_LEN: usize = 8;

/// How the variable half of the nonce is produced and carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonceMode {
    /// Zero-padded sequence number XORed into the fixed IV; nothing on the wire.
    XorSequence,
    /// `fixed ∥ sequence number`, the variable part sent as a record prefix.
    ExplicitSequence,
    /// `fixed ∥ random`, the random part sent as a record prefix.
    ExplicitRandom,
}

impl NonceMode {
    /// True if the variable part is transmitted in front of the ciphertext.
    pub const fn in_record(self) -> bool {
        matches!(self, Self::ExplicitSequence | Self::ExplicitRandom)
    }
}

/// Fixed nonce bytes plus the shape of the variable part.
///
/// # Invariants
///
/// - `XorSequence`: `fixed.len()` is the full nonce length and
///   `variable_len` is [`SEQUENCE_LEN`]
/// - otherwise `fixed.len() + variable_len` is the full nonce length
pub struct NonceLayout {
    mode: NonceMode,
    fixed: Zeroizing<Vec<u8>>,
    variable_len: usize,
}

impl NonceLayout {
    /// Build a layout for a primitive taking `nonce_len`-byte nonces.
    pub fn new(
        mode: NonceMode,
        fixed: &[u8],
        nonce_len: usize,
    ) -> Result<Self, RecordError> {
        let variable_len = match mode {
            NonceMode::XorSequence => {
                if fixed.len() != nonce_len || nonce_len < SEQUENCE_LEN {
                    return Err(RecordError::KeySizeMismatch {
                        part: KeyPart::FixedIv,
                        expected: nonce_len,
                        actual: fixed.len(),
                    });
                }
                SEQUENCE_LEN
            },
            NonceMode::ExplicitSequence | NonceMode::ExplicitRandom => {
                let Some(variable_len) = nonce_len.checked_sub(fixed.len()) else {
                    return Err(RecordError::KeySizeMismatch {
                        part: KeyPart::FixedIv,
                        expected: nonce_len,
                        actual: fixed.len(),
                    });
                };
                if mode == NonceMode::ExplicitSequence && variable_len != SEQUENCE_LEN {
                    return Err(RecordError::KeySizeMismatch {
                        part: KeyPart::FixedIv,
                        expected: nonce_len - SEQUENCE_LEN,
                        actual: fixed.len(),
                    });
                }
                variable_len
            },
        };

        if nonce_len > MAX_NONCE_LEN {
            return Err(RecordError::KeySizeMismatch {
                part: KeyPart::FixedIv,
                expected: MAX_NONCE_LEN,
                actual: nonce_len,
            });
        }

        Ok(Self { mode, fixed: Zeroizing::new(fixed.to_vec()), variable_len })
    }

    /// Nonce mode.
    pub fn mode(&self) -> NonceMode {
        self.mode
    }

    /// Length of the variable part.
    pub fn variable_len(&self) -> usize {
        self.variable_len
    }

    /// Bytes of nonce prefix carried in each record.
    pub fn explicit_len(&self) -> usize {
        if self.mode.in_record() { self.variable_len } else { 0 }
    }

    /// Length of the nonce handed to the primitive.
    pub fn nonce_len(&self) -> usize {
        match self.mode {
            NonceMode::XorSequence => self.fixed.len(),
            NonceMode::ExplicitSequence | NonceMode::ExplicitRandom => {
                self.fixed.len() + self.variable_len
            },
        }
    }
}

/// Nonce bytes on the stack, sized for the longest supported primitive.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Nonce {
    bytes: [u8; MAX_NONCE_LEN],
    len: usize,
}

impl Nonce {
    /// Nonce as a slice.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

impl std::fmt::Debug for Nonce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Nonce").field("len", &self.len).finish_non_exhaustive()
    }
}

/// Derive the nonce for one record.
///
/// In XOR mode `variable` is ignored and the sequence number is used:
/// `fixed XOR (0^(fixed_len - 8) ∥ seqnum_be)`. Otherwise the nonce is
/// `fixed ∥ variable`, where `variable` holds the wire prefix (open), fresh
/// random bytes, or the big-endian sequence number (seal).
///
/// `variable` must be exactly [`NonceLayout::variable_len`] bytes outside XOR
/// mode; the protector guarantees this.
pub fn build_nonce(layout: &NonceLayout, seqnum: u64, variable: &[u8]) -> Nonce {
    let mut nonce = Nonce { bytes: [0u8; MAX_NONCE_LEN], len: layout.nonce_len() };

    match layout.mode {
        NonceMode::XorSequence => {
            let len = layout.fixed.len();
            nonce.bytes[len - SEQUENCE_LEN..len].copy_from_slice(&seqnum.to_be_bytes());
            for (byte, fixed) in nonce.bytes[..len].iter_mut().zip(layout.fixed.iter()) {
                *byte ^= fixed;
            }
        },
        NonceMode::ExplicitSequence | NonceMode::ExplicitRandom => {
            let fixed_len = layout.fixed.len();
            nonce.bytes[..fixed_len].copy_from_slice(&layout.fixed);
            nonce.bytes[fixed_len..nonce.len].copy_from_slice(variable);
        },
    }

    nonce
}
