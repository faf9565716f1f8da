//! Model-based testing support.
//!
//! [`ChannelModel`] is the reference implementation; [`ChannelOp`] is the
//! operation alphabet. Operations are applied to both the model and a real
//! channel (through [`crate::ChannelDriver`]) and the outcomes compared.

mod channel;
mod operation;

pub use channel::{ChannelModel, ModelRecord};
pub use operation::{ChannelOp, Outcome, SmallPayload};
