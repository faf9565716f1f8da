//! Operations for model-based testing.
//!
//! Operations are generated randomly (by proptest or a fuzzer) and applied
//! to both the reference model and a real [`crate::RecordChannel`].

use arbitrary::Arbitrary;

/// Things that can happen to a channel.
#[derive(Debug, Clone, Arbitrary)]
pub enum ChannelOp {
    /// Writer seals a record and puts it in flight.
    Send {
        /// Record content.
        payload: SmallPayload,
    },

    /// Deliver the oldest record in flight.
    DeliverNext,

    /// Deliver the newest record in flight, overtaking the others.
    DeliverLatest,

    /// Deliver the last accepted record a second time.
    Replay,

    /// Lose the oldest record in flight.
    Drop,

    /// Rotate both ends to the next epoch.
    Rotate,
}

/// Compact payload description, expanded by [`SmallPayload::bytes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Arbitrary)]
pub struct SmallPayload {
    /// First byte; later bytes count up from it.
    pub seed: u8,
    /// Payload length.
    pub len: u8,
}

impl SmallPayload {
    /// Expand to the payload bytes.
    pub fn bytes(&self) -> Vec<u8> {
        (0..self.len).map(|i| self.seed.wrapping_add(i)).collect()
    }
}

/// Observable result of one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A record went into flight.
    Sent,
    /// The reader accepted a record with this payload.
    Delivered(Vec<u8>),
    /// The reader dropped the record.
    Rejected,
    /// Keys rotated.
    Rotated,
    /// Nothing to act on (empty flight queue, nothing to replay).
    Idle,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_expands_deterministically() {
        let payload = SmallPayload { seed: 254, len: 4 };
        assert_eq!(payload.bytes(), vec![254, 255, 0, 1]);
        assert!(SmallPayload { seed: 9, len: 0 }.bytes().is_empty());
    }
}
