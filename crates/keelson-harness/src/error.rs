//! Harness errors.

use keelson_record::{ProtocolVersion, RecordError, Transport};
use thiserror::Error;

/// Errors raised while framing, sending or receiving simulated records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HarnessError {
    /// The record layer refused the record.
    #[error("record layer: {0}")]
    Record(#[from] RecordError),

    /// Fewer bytes than a record header.
    #[error("malformed header: {len} bytes, need {expected}")]
    MalformedHeader {
        /// Bytes received
        len: usize,
        /// Header length for this transport
        expected: usize,
    },

    /// The header's length field disagrees with the bytes that follow it.
    #[error("length field says {declared} bytes, {actual} present")]
    LengthMismatch {
        /// Value of the length field
        declared: usize,
        /// Bytes after the header
        actual: usize,
    },

    /// Datagram from an epoch other than the current one.
    #[error("record from epoch {epoch}, current epoch is {current}")]
    StaleEpoch {
        /// Epoch in the header
        epoch: u16,
        /// Epoch the reader is keyed for
        current: u16,
    },

    /// Datagram sequence number already seen or left behind by the window.
    #[error("sequence number {seq} rejected by replay window")]
    Replayed {
        /// Rejected sequence number
        seq: u64,
    },

    /// The write sequence number would overflow its wire field.
    #[error("sequence numbers exhausted for this epoch")]
    SequenceExhausted,

    /// The epoch counter would overflow.
    #[error("epochs exhausted")]
    EpochExhausted,

    /// Configured transport does not match the protocol version.
    #[error("{version:?} does not run over {transport:?}")]
    TransportMismatch {
        /// Configured version
        version: ProtocolVersion,
        /// Configured transport
        transport: Transport,
    },
}

impl HarnessError {
    /// True if the record layer rejected the record as forged or misrouted.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, Self::Record(RecordError::AuthenticationFailed))
    }
}
