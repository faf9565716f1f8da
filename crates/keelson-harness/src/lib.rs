//! Deterministic simulation harness for keelson record protection.
//!
//! A [`RecordChannel`] plays the transport around a pair of record layers:
//! it frames records with stream or datagram headers, owns the sequence
//! numbers, masks DTLS 1.3 record numbers and rotates epochs. Keys come
//! from a seeded RNG, so every run is reproducible from its
//! [`ChannelConfig`].
//!
//! # Model-Based Testing
//!
//! The `model` module provides a reference implementation. Operations are
//! applied to both the model and a real channel through [`ChannelDriver`],
//! and their outcomes are compared.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod channel;
pub mod config;
pub mod driver;
pub mod error;
pub mod model;
pub mod replay;

pub use channel::{
    DATAGRAM_HEADER_LEN, Delivered, MAX_DATAGRAM_SEQ, RecordChannel, STREAM_HEADER_LEN, header_len,
};
pub use config::ChannelConfig;
pub use driver::{APPLICATION_DATA, ChannelDriver};
pub use error::HarnessError;
pub use model::{ChannelModel, ChannelOp, ModelRecord, Outcome, SmallPayload};
pub use replay::{ReplayWindow, WINDOW_SIZE};
