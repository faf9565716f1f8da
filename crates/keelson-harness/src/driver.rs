//! Drives a real [`RecordChannel`] with [`ChannelOp`]s.
//!
//! The driver owns the simulated network: the queue of framed records in
//! flight and the last record the reader accepted. It mirrors
//! [`crate::ChannelModel`] so the two can be compared step by step.

use std::collections::VecDeque;

use crate::{
    channel::RecordChannel,
    error::HarnessError,
    model::{ChannelOp, Outcome},
};

/// Content type used for every simulated record.
pub const APPLICATION_DATA: u8 = 0x17;

/// Real-side counterpart of [`crate::ChannelModel`].
#[derive(Debug)]
pub struct ChannelDriver {
    channel: RecordChannel,
    in_flight: VecDeque<Vec<u8>>,
    last_accepted: Option<Vec<u8>>,
    rejections: Vec<HarnessError>,
}

impl ChannelDriver {
    /// Drive `channel`.
    pub fn new(channel: RecordChannel) -> Self {
        Self { channel, in_flight: VecDeque::new(), last_accepted: None, rejections: Vec::new() }
    }

    /// The channel under test.
    pub fn channel(&self) -> &RecordChannel {
        &self.channel
    }

    /// Framed records currently in flight, oldest first.
    pub fn in_flight(&self) -> &VecDeque<Vec<u8>> {
        &self.in_flight
    }

    /// Every error the reader returned, in order.
    pub fn rejections(&self) -> &[HarnessError] {
        &self.rejections
    }

    /// Apply `op` to the real channel.
    ///
    /// Reader-side failures become [`Outcome::Rejected`]; only writer-side
    /// failures are returned as errors.
    ///
    /// # Errors
    ///
    /// - Any error from [`RecordChannel::send`] or [`RecordChannel::rotate`]
    pub fn apply(&mut self, op: &ChannelOp) -> Result<Outcome, HarnessError> {
        let outcome = match op {
            ChannelOp::Send { payload } => {
                let wire = self.channel.send(APPLICATION_DATA, &payload.bytes())?;
                self.in_flight.push_back(wire);
                Outcome::Sent
            },
            ChannelOp::DeliverNext => match self.in_flight.pop_front() {
                Some(wire) => self.deliver(wire),
                None => Outcome::Idle,
            },
            ChannelOp::DeliverLatest => match self.in_flight.pop_back() {
                Some(wire) => self.deliver(wire),
                None => Outcome::Idle,
            },
            ChannelOp::Replay => match self.last_accepted.clone() {
                Some(wire) => self.deliver(wire),
                None => Outcome::Idle,
            },
            ChannelOp::Drop => {
                self.in_flight.pop_front();
                Outcome::Idle
            },
            ChannelOp::Rotate => {
                self.channel.rotate()?;
                Outcome::Rotated
            },
        };
        Ok(outcome)
    }

    fn deliver(&mut self, wire: Vec<u8>) -> Outcome {
        match self.channel.receive(&wire) {
            Ok(delivered) => {
                self.last_accepted = Some(wire);
                Outcome::Delivered(delivered.payload)
            },
            Err(error) => {
                tracing::debug!(error = %error, "Record rejected");
                self.rejections.push(error);
                Outcome::Rejected
            },
        }
    }
}
