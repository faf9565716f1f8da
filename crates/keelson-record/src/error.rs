//! Error types for record protection

use std::fmt;

use thiserror::Error;

use crate::protector::Direction;

/// Which piece of key material failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPart {
    /// Bulk encryption key
    EncKey,
    /// HMAC key (CBC suites only)
    MacKey,
    /// Fixed IV / implicit nonce
    FixedIv,
    /// Record-number mask key
    RecordNumberKey,
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::EncKey => "encryption key",
            Self::MacKey => "MAC key",
            Self::FixedIv => "fixed IV",
            Self::RecordNumberKey => "record number key",
        };
        f.write_str(name)
    }
}

/// Coarse classification of a [`RecordError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad construction input. Fatal to session setup, never retried.
    Configuration,
    /// Public length or layout violation detected before touching secrets.
    PublicInput,
    /// Record failed authentication. Cause is deliberately not reported.
    Cryptographic,
    /// The platform could not supply randomness.
    Environment,
}

/// Errors from record protection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// Key material length does not match the resolved primitive
    #[error("{part} size mismatch: expected {expected} bytes, got {actual}")]
    KeySizeMismatch {
        /// Offending piece of key material
        part: KeyPart,
        /// Length the primitive requires
        expected: usize,
        /// Length supplied
        actual: usize,
    },

    /// No primitive exists for this (version, suite) pair
    #[error("unsupported cipher suite {suite:#06x} for protocol version {version:#06x}")]
    UnsupportedCipher {
        /// IANA cipher suite id
        suite: u16,
        /// Wire protocol version
        version: u16,
    },

    /// Record is shorter than the fixed overhead of the cipher
    #[error("record too short: {len} bytes, need at least {min}")]
    RecordTooShort {
        /// Length received
        len: usize,
        /// Minimum acceptable length
        min: usize,
    },

    /// Sealed record would not fit in the 16-bit length field
    #[error("record too large: {len} bytes exceeds {max}")]
    RecordTooLarge {
        /// Length the sealed record would have
        len: usize,
        /// Ceiling
        max: usize,
    },

    /// An output region partially overlaps the plaintext or another output
    #[error("output region overlaps input plaintext")]
    OutputAliasesInput,

    /// A caller-supplied output region has the wrong size or is out of bounds
    #[error("{region} buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch {
        /// Which region (`prefix`, `body`, `suffix`)
        region: &'static str,
        /// Required length
        expected: usize,
        /// Supplied length
        actual: usize,
    },

    /// Record failed authentication
    #[error("record authentication failed")]
    AuthenticationFailed,

    /// Mask sample is shorter than one block
    #[error("mask sample too short: {len} bytes, need at least {min}")]
    SampleTooShort {
        /// Sample length supplied
        len: usize,
        /// Minimum sample length
        min: usize,
    },

    /// Requested mask is longer than the algorithm can produce
    #[error("requested mask of {requested} bytes exceeds {max}")]
    MaskTooLong {
        /// Requested mask length
        requested: usize,
        /// Longest mask available
        max: usize,
    },

    /// The cipher has no record-number mask algorithm or no key was supplied
    #[error("no record number mask available")]
    MaskUnavailable,

    /// Seal on a read protector or open on a write protector
    #[error("operation not permitted on a {direction:?} protector")]
    WrongDirection {
        /// Direction the protector was built for
        direction: Direction,
    },

    /// The random source failed to produce an explicit nonce
    #[error("random source unavailable")]
    RandomUnavailable,
}

impl RecordError {
    /// Classify this error.
    ///
    /// Every class terminates the connection; the class only tells the caller
    /// which layer is at fault.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::KeySizeMismatch { .. }
            | Self::UnsupportedCipher { .. }
            | Self::MaskUnavailable
            | Self::WrongDirection { .. } => ErrorClass::Configuration,

            Self::RecordTooShort { .. }
            | Self::RecordTooLarge { .. }
            | Self::OutputAliasesInput
            | Self::BufferSizeMismatch { .. }
            | Self::SampleTooShort { .. }
            | Self::MaskTooLong { .. } => ErrorClass::PublicInput,

            Self::AuthenticationFailed => ErrorClass::Cryptographic,

            Self::RandomUnavailable => ErrorClass::Environment,
        }
    }
}
