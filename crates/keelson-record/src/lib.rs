//! Keelson Record Protection
//!
//! The record-layer cryptographic core of a TLS/DTLS stack. Given a
//! negotiated cipher suite and derived key material, a [`RecordProtector`]
//! seals outgoing records and opens incoming ones after the handshake.
//!
//! # Constructions
//!
//! Three wire constructions sit behind one interface:
//!
//! ```text
//! TLS 1.3, ChaCha20 (1.2)   nonce = fixed_iv XOR seqnum       nothing on the wire
//! AES-GCM (TLS 1.2)         nonce = fixed_iv(4) ∥ seqnum(8)   seqnum sent as prefix
//! AES-CBC + HMAC (1.1/1.2)  IV = random(16)                   IV sent as prefix
//! ```
//!
//! The additional data is the outer record header under TLS 1.3, and
//! `seqnum ∥ type ∥ version ∥ length` before that (CBC leaves out the length
//! and folds it into the MAC).
//!
//! # Lifecycle
//!
//! One protector per (connection, direction, epoch). Protectors are
//! immutable; key rotation builds a new one and drops the old, which wipes
//! its keys. Sequence numbers belong to the caller and must never repeat
//! under one key.
//!
//! # Security
//!
//! - Authentication failures carry no detail beyond
//!   [`RecordError::AuthenticationFailed`]
//! - CBC padding and MAC checks never branch on secret data and spend a
//!   fixed number of hash compressions per record length
//! - Key bytes never appear in `Debug` output or logs

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod additional_data;
pub mod error;
pub mod key;
pub mod layer;
pub mod mask;
pub mod nonce;
mod primitive;
pub mod protector;
pub mod random;
pub mod suite;
#[cfg(feature = "testing")]
pub mod testing;

pub use additional_data::{AdMode, AdditionalData, build_additional_data};
pub use error::{ErrorClass, KeyPart, RecordError};
pub use key::KeyMaterial;
pub use layer::RecordLayer;
pub use mask::{MASK_SAMPLE_LEN, MaskAlgorithm, RecordNumberMasker};
pub use nonce::{Nonce, NonceLayout, NonceMode, build_nonce};
pub use protector::{Direction, MAX_RECORD_LEN, RecordContext, RecordProtector, ScatterLayout};
pub use random::{OsRandom, RandomSource};
pub use suite::{
    BulkCipher, CipherIdentity, CipherSuite, PrimitiveParams, ProtocolVersion, Transport,
};
