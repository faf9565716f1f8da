//! Reference model of a record channel.
//!
//! Tracks only what the real channel's acceptance decisions depend on:
//! epochs, sequence numbers and which records have been accepted. No
//! cryptography is involved; a record is accepted exactly when its epoch
//! is current and its sequence number is the one the reader may take.

use std::collections::{BTreeSet, VecDeque};

use keelson_record::Transport;

use super::operation::{ChannelOp, Outcome};
use crate::replay::WINDOW_SIZE;

/// A record in flight, as the model sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRecord {
    /// Epoch it was sent in.
    pub epoch: u16,
    /// Sequence number within the epoch.
    pub seq: u64,
    /// Payload it carries.
    pub payload: Vec<u8>,
}

/// Oracle for [`crate::RecordChannel`] behavior.
#[derive(Debug, Clone)]
pub struct ChannelModel {
    transport: Transport,
    epoch: u16,
    write_seq: u64,
    read_seq: u64,
    accepted: BTreeSet<u64>,
    in_flight: VecDeque<ModelRecord>,
    last_accepted: Option<ModelRecord>,
}

impl ChannelModel {
    /// Fresh model at epoch zero.
    pub fn new(transport: Transport) -> Self {
        Self {
            transport,
            epoch: 0,
            write_seq: 0,
            read_seq: 0,
            accepted: BTreeSet::new(),
            in_flight: VecDeque::new(),
            last_accepted: None,
        }
    }

    /// Current epoch.
    pub fn epoch(&self) -> u16 {
        self.epoch
    }

    /// Sequence number the next send will use.
    pub fn write_seq(&self) -> u64 {
        self.write_seq
    }

    /// Records sent but not yet delivered or dropped, oldest first.
    pub fn in_flight(&self) -> &VecDeque<ModelRecord> {
        &self.in_flight
    }

    /// Apply `op` and return the outcome the real channel must produce.
    pub fn apply(&mut self, op: &ChannelOp) -> Outcome {
        match op {
            ChannelOp::Send { payload } => {
                self.in_flight.push_back(ModelRecord {
                    epoch: self.epoch,
                    seq: self.write_seq,
                    payload: payload.bytes(),
                });
                self.write_seq += 1;
                Outcome::Sent
            },
            ChannelOp::DeliverNext => match self.in_flight.pop_front() {
                Some(record) => self.deliver(record),
                None => Outcome::Idle,
            },
            ChannelOp::DeliverLatest => match self.in_flight.pop_back() {
                Some(record) => self.deliver(record),
                None => Outcome::Idle,
            },
            ChannelOp::Replay => match self.last_accepted.clone() {
                Some(record) => self.deliver(record),
                None => Outcome::Idle,
            },
            ChannelOp::Drop => {
                self.in_flight.pop_front();
                Outcome::Idle
            },
            ChannelOp::Rotate => {
                self.epoch += 1;
                self.write_seq = 0;
                self.read_seq = 0;
                self.accepted.clear();
                Outcome::Rotated
            },
        }
    }

    fn deliver(&mut self, record: ModelRecord) -> Outcome {
        if record.epoch != self.epoch || !self.acceptable(record.seq) {
            return Outcome::Rejected;
        }

        match self.transport {
            Transport::Stream => self.read_seq += 1,
            Transport::Datagram => {
                self.accepted.insert(record.seq);
            },
        }
        let payload = record.payload.clone();
        self.last_accepted = Some(record);
        Outcome::Delivered(payload)
    }

    fn acceptable(&self, seq: u64) -> bool {
        match self.transport {
            Transport::Stream => seq == self.read_seq,
            Transport::Datagram => {
                let behind =
                    self.accepted.last().is_some_and(|&highest| seq + WINDOW_SIZE <= highest);
                !behind && !self.accepted.contains(&seq)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SmallPayload;

    fn send(seed: u8) -> ChannelOp {
        ChannelOp::Send { payload: SmallPayload { seed, len: 1 } }
    }

    #[test]
    fn stream_rejects_overtaking() {
        let mut model = ChannelModel::new(Transport::Stream);
        model.apply(&send(1));
        model.apply(&send(2));

        assert_eq!(model.apply(&ChannelOp::DeliverLatest), Outcome::Rejected);
        assert_eq!(model.apply(&ChannelOp::DeliverNext), Outcome::Delivered(vec![1]));
    }

    #[test]
    fn datagram_accepts_overtaking_once() {
        let mut model = ChannelModel::new(Transport::Datagram);
        model.apply(&send(1));
        model.apply(&send(2));

        assert_eq!(model.apply(&ChannelOp::DeliverLatest), Outcome::Delivered(vec![2]));
        assert_eq!(model.apply(&ChannelOp::DeliverNext), Outcome::Delivered(vec![1]));
        assert_eq!(model.apply(&ChannelOp::Replay), Outcome::Rejected);
    }

    #[test]
    fn rotation_strands_old_records() {
        let mut model = ChannelModel::new(Transport::Stream);
        model.apply(&send(1));
        model.apply(&ChannelOp::Rotate);

        assert_eq!(model.epoch(), 1);
        assert_eq!(model.write_seq(), 0);
        assert_eq!(model.apply(&ChannelOp::DeliverNext), Outcome::Rejected);
    }
}
