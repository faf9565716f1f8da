//! Model-based property tests.
//!
//! These tests generate random operation sequences and verify that the real
//! channel accepts and rejects exactly the records the reference model says
//! it should.
//!
//! # Architecture
//!
//! ```text
//! proptest generates: Vec<ChannelOp>
//!                          │
//!           ┌──────────────┼──────────────┐
//!           ▼              ▼              ▼
//!     ChannelModel   ChannelDriver     Compare
//!     (reference)    (real channel)    Outcomes
//! ```

use keelson_harness::{
    ChannelConfig, ChannelDriver, ChannelModel, ChannelOp, Outcome, RecordChannel, SmallPayload,
};
use keelson_record::{CipherSuite, ProtocolVersion};
use proptest::prelude::*;

fn payload_strategy() -> impl Strategy<Value = SmallPayload> {
    (any::<u8>(), any::<u8>()).prop_map(|(seed, len)| SmallPayload { seed, len })
}

fn operation_strategy() -> impl Strategy<Value = ChannelOp> {
    prop_oneof![
        // Weight towards traffic so queues build up
        4 => payload_strategy().prop_map(|payload| ChannelOp::Send { payload }),
        3 => Just(ChannelOp::DeliverNext),
        1 => Just(ChannelOp::DeliverLatest),
        1 => Just(ChannelOp::Replay),
        1 => Just(ChannelOp::Drop),
        1 => Just(ChannelOp::Rotate),
    ]
}

fn config_strategy() -> impl Strategy<Value = ChannelConfig> {
    let pairs = vec![
        (ProtocolVersion::Tls12, CipherSuite::EcdheRsaAes128GcmSha256),
        (ProtocolVersion::Tls12, CipherSuite::RsaAes128CbcSha256),
        (ProtocolVersion::Tls13, CipherSuite::Tls13ChaCha20Poly1305Sha256),
        (ProtocolVersion::Dtls12, CipherSuite::EcdheEcdsaAes256GcmSha384),
        (ProtocolVersion::Dtls12, CipherSuite::EcdheRsaAes128CbcSha),
        (ProtocolVersion::Dtls13, CipherSuite::Tls13Aes128GcmSha256),
        (ProtocolVersion::Dtls13, CipherSuite::Tls13ChaCha20Poly1305Sha256),
    ];
    (prop::sample::select(pairs), any::<u64>())
        .prop_map(|((version, suite), seed)| ChannelConfig::new(version, suite, seed))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Verify that outcomes match between model and real channel.
    #[test]
    fn prop_model_matches_channel(
        config in config_strategy(),
        ops in prop::collection::vec(operation_strategy(), 0..60),
    ) {
        let mut model = ChannelModel::new(config.transport);
        let mut driver = ChannelDriver::new(RecordChannel::new(config).unwrap());

        for (step, op) in ops.iter().enumerate() {
            let expected = model.apply(op);
            let actual = driver.apply(op).unwrap();
            prop_assert_eq!(
                &actual, &expected,
                "step {} ({:?}) diverged; rejections so far: {:?}", step, op, driver.rejections()
            );
        }

        prop_assert_eq!(driver.channel().epoch(), model.epoch());
        prop_assert_eq!(driver.channel().write_seq(), model.write_seq());
        prop_assert_eq!(driver.in_flight().len(), model.in_flight().len());
    }

    /// With nothing but sends and in-order deliveries, every record arrives.
    #[test]
    fn prop_in_order_traffic_is_never_rejected(
        config in config_strategy(),
        payloads in prop::collection::vec(payload_strategy(), 1..20),
    ) {
        let mut driver = ChannelDriver::new(RecordChannel::new(config).unwrap());

        for payload in &payloads {
            driver.apply(&ChannelOp::Send { payload: *payload }).unwrap();
        }
        for payload in &payloads {
            prop_assert_eq!(
                driver.apply(&ChannelOp::DeliverNext).unwrap(),
                Outcome::Delivered(payload.bytes())
            );
        }
        prop_assert!(driver.rejections().is_empty());
    }
}

#[test]
fn stream_replay_scenario() {
    let config = ChannelConfig::new(ProtocolVersion::Tls12, CipherSuite::RsaAes128GcmSha256, 7);
    let mut model = ChannelModel::new(config.transport);
    let mut driver = ChannelDriver::new(RecordChannel::new(config).unwrap());

    let script = [
        ChannelOp::Send { payload: SmallPayload { seed: 1, len: 5 } },
        ChannelOp::Send { payload: SmallPayload { seed: 2, len: 5 } },
        ChannelOp::DeliverNext,
        ChannelOp::Replay,
        ChannelOp::DeliverNext,
        ChannelOp::Rotate,
        ChannelOp::Replay,
    ];
    let outcomes: Vec<Outcome> = script.iter().map(|op| driver.apply(op).unwrap()).collect();
    let expected: Vec<Outcome> = script.iter().map(|op| model.apply(op)).collect();

    assert_eq!(outcomes, expected);
    assert_eq!(outcomes[3], Outcome::Rejected);
    assert_eq!(outcomes[6], Outcome::Rejected);
    assert_eq!(driver.rejections().len(), 2);
}
