//! Fuzz target comparing a record channel against its reference model
//!
//! # Strategy
//!
//! - Fuzz-chosen (suite, version) pair and key seed
//! - Arbitrary sequences of sends, in-order and overtaking deliveries,
//!   replays, drops and rotations
//!
//! # Invariants
//!
//! - The channel never panics
//! - Every operation has the outcome the model predicts
//! - Epoch and write sequence number agree with the model at the end

#![no_main]

use arbitrary::Arbitrary;
use keelson_harness::{ChannelConfig, ChannelDriver, ChannelModel, ChannelOp, RecordChannel};
use keelson_record::{CipherSuite, ProtocolVersion};
use libfuzzer_sys::fuzz_target;

const PAIRS: [(ProtocolVersion, CipherSuite); 6] = [
    (ProtocolVersion::Tls12, CipherSuite::EcdheRsaAes128GcmSha256),
    (ProtocolVersion::Tls12, CipherSuite::RsaAes256CbcSha),
    (ProtocolVersion::Tls13, CipherSuite::Tls13Aes256GcmSha384),
    (ProtocolVersion::Dtls12, CipherSuite::EcdheRsaChaCha20Poly1305Sha256),
    (ProtocolVersion::Dtls13, CipherSuite::Tls13Aes128GcmSha256),
    (ProtocolVersion::Dtls13, CipherSuite::Tls13ChaCha20Poly1305Sha256),
];

#[derive(Debug, Arbitrary)]
struct ChannelScenario {
    pair: u8,
    seed: u64,
    ops: Vec<ChannelOp>,
}

fuzz_target!(|scenario: ChannelScenario| {
    let (version, suite) = PAIRS[usize::from(scenario.pair) % PAIRS.len()];
    let config = ChannelConfig::new(version, suite, scenario.seed);

    let mut model = ChannelModel::new(config.transport);
    let mut driver = ChannelDriver::new(RecordChannel::new(config).expect("supported pair"));

    for op in scenario.ops.iter().take(256) {
        let expected = model.apply(op);
        let actual = driver.apply(op).expect("writer side never fails here");
        assert_eq!(actual, expected, "diverged on {op:?}");
    }

    assert_eq!(driver.channel().epoch(), model.epoch());
    assert_eq!(driver.channel().write_seq(), model.write_seq());
});
