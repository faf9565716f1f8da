//! Property-based tests for the record channel.
//!
//! Properties:
//! - In-order delivery returns every payload unchanged, for every suite
//! - A stream record delivered out of order or twice fails authentication
//! - A datagram record delivered twice is caught by the replay window
//! - Rotation restarts sequence numbers; old-epoch records never open
//! - Any flipped bit in a framed record is rejected

use keelson_harness::{APPLICATION_DATA, ChannelConfig, HarnessError, RecordChannel, header_len};
use keelson_record::{CipherIdentity, CipherSuite, ProtocolVersion, RecordError, Transport};
use proptest::prelude::*;

const SUITES: [CipherSuite; 9] = [
    CipherSuite::Tls13Aes128GcmSha256,
    CipherSuite::Tls13Aes256GcmSha384,
    CipherSuite::Tls13ChaCha20Poly1305Sha256,
    CipherSuite::EcdheRsaAes128GcmSha256,
    CipherSuite::EcdheEcdsaAes256GcmSha384,
    CipherSuite::EcdheRsaChaCha20Poly1305Sha256,
    CipherSuite::RsaAes128CbcSha,
    CipherSuite::EcdheRsaAes256CbcSha,
    CipherSuite::RsaAes128CbcSha256,
];

const VERSIONS: [ProtocolVersion; 5] = [
    ProtocolVersion::Tls11,
    ProtocolVersion::Tls12,
    ProtocolVersion::Tls13,
    ProtocolVersion::Dtls12,
    ProtocolVersion::Dtls13,
];

fn supported() -> Vec<(ProtocolVersion, CipherSuite)> {
    VERSIONS
        .iter()
        .flat_map(|&version| SUITES.iter().map(move |&suite| (version, suite)))
        .filter(|&(version, suite)| CipherIdentity::new(suite, version).resolve().is_ok())
        .collect()
}

fn config_strategy() -> impl Strategy<Value = ChannelConfig> {
    (prop::sample::select(supported()), any::<u64>())
        .prop_map(|((version, suite), seed)| ChannelConfig::new(version, suite, seed))
}

fn stream_config_strategy() -> impl Strategy<Value = ChannelConfig> {
    config_strategy().prop_filter("stream framing", |c| c.transport == Transport::Stream)
}

fn datagram_config_strategy() -> impl Strategy<Value = ChannelConfig> {
    config_strategy().prop_filter("datagram framing", |c| c.transport == Transport::Datagram)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_in_order_delivery_round_trips(
        config in config_strategy(),
        payloads in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..300), 1..8),
    ) {
        let mut channel = RecordChannel::new(config).unwrap();
        for (seq, payload) in payloads.iter().enumerate() {
            let wire = channel.send(APPLICATION_DATA, payload).unwrap();
            let delivered = channel.receive(&wire).unwrap();
            prop_assert_eq!(&delivered.payload, payload);
            prop_assert_eq!(delivered.seq, seq as u64);
            prop_assert_eq!(delivered.content_type, APPLICATION_DATA);
        }
    }

    #[test]
    fn prop_stream_reorder_fails_authentication(config in stream_config_strategy()) {
        let mut channel = RecordChannel::new(config).unwrap();
        let first = channel.send(APPLICATION_DATA, b"first").unwrap();
        let second = channel.send(APPLICATION_DATA, b"second").unwrap();

        prop_assert_eq!(
            channel.receive(&second),
            Err(HarnessError::Record(RecordError::AuthenticationFailed))
        );
        prop_assert_eq!(channel.receive(&first).unwrap().payload, b"first".to_vec());
        prop_assert_eq!(channel.receive(&second).unwrap().payload, b"second".to_vec());
    }

    #[test]
    fn prop_stream_replay_fails_authentication(config in stream_config_strategy()) {
        let mut channel = RecordChannel::new(config).unwrap();
        let wire = channel.send(APPLICATION_DATA, b"once").unwrap();

        channel.receive(&wire).unwrap();
        prop_assert_eq!(
            channel.receive(&wire),
            Err(HarnessError::Record(RecordError::AuthenticationFailed))
        );
    }

    #[test]
    fn prop_datagram_replay_is_rejected(config in datagram_config_strategy()) {
        let mut channel = RecordChannel::new(config).unwrap();
        let first = channel.send(APPLICATION_DATA, b"first").unwrap();
        let second = channel.send(APPLICATION_DATA, b"second").unwrap();

        prop_assert_eq!(channel.receive(&second).unwrap().payload, b"second".to_vec());
        prop_assert_eq!(channel.receive(&first).unwrap().payload, b"first".to_vec());
        prop_assert_eq!(channel.receive(&first), Err(HarnessError::Replayed { seq: 0 }));
    }

    #[test]
    fn prop_rotation_resets_sequence_and_strands_old_records(config in config_strategy()) {
        let mut channel = RecordChannel::new(config).unwrap();
        channel.send(APPLICATION_DATA, b"a").unwrap();
        let stale = channel.send(APPLICATION_DATA, b"b").unwrap();

        channel.rotate().unwrap();
        prop_assert_eq!(channel.epoch(), 1);
        prop_assert_eq!(channel.write_seq(), 0);

        let result = channel.receive(&stale);
        prop_assert!(matches!(
            result,
            Err(HarnessError::Record(RecordError::AuthenticationFailed))
                | Err(HarnessError::StaleEpoch { epoch: 0, current: 1 })
        ), "old-epoch record gave {:?}", result);

        let fresh = channel.send(APPLICATION_DATA, b"c").unwrap();
        let delivered = channel.receive(&fresh).unwrap();
        prop_assert_eq!(delivered.seq, 0);
        prop_assert_eq!(delivered.epoch, 1);
    }

    #[test]
    fn prop_flipped_bit_is_rejected(
        config in config_strategy(),
        payload in prop::collection::vec(any::<u8>(), 1..64),
        position in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let mut channel = RecordChannel::new(config).unwrap();
        let mut wire = channel.send(APPLICATION_DATA, &payload).unwrap();

        let at = position.index(wire.len());
        wire[at] ^= 1 << bit;
        prop_assert!(channel.receive(&wire).is_err(), "flip at {} accepted", at);
    }
}

#[test]
fn datagram_records_behind_window_are_rejected() {
    let config = ChannelConfig::new(ProtocolVersion::Dtls12, CipherSuite::RsaAes128GcmSha256, 3);
    let mut channel = RecordChannel::new(config).unwrap();

    let old = channel.send(APPLICATION_DATA, b"old").unwrap();
    channel.skip_write_seq(100);
    let new = channel.send(APPLICATION_DATA, b"new").unwrap();

    channel.receive(&new).unwrap();
    assert_eq!(channel.receive(&old), Err(HarnessError::Replayed { seq: 0 }));
}

#[test]
fn passthrough_channel_frames_like_a_real_one() {
    let config = ChannelConfig::new(ProtocolVersion::Dtls12, CipherSuite::RsaAes128GcmSha256, 3);
    let mut real = RecordChannel::new(config).unwrap();
    let mut passthrough = RecordChannel::passthrough(config).unwrap();

    let sealed = real.send(APPLICATION_DATA, b"payload").unwrap();
    let plain = passthrough.send(APPLICATION_DATA, b"payload").unwrap();

    let header = header_len(config.transport);
    assert_eq!(&sealed[..header - 2], &plain[..header - 2]);
    assert_eq!(&plain[header..], b"payload");
    assert_eq!(passthrough.receive(&plain).unwrap().payload, b"payload");
}

#[test]
fn epochs_are_bounded() {
    let config = ChannelConfig::new(ProtocolVersion::Tls13, CipherSuite::Tls13Aes128GcmSha256, 3);
    let mut channel = RecordChannel::passthrough(config).unwrap();
    for _ in 0..u16::MAX {
        channel.rotate().unwrap();
    }
    assert_eq!(channel.rotate(), Err(HarnessError::EpochExhausted));
}
