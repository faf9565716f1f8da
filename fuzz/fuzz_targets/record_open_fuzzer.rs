//! Fuzz target for opening attacker-supplied records
//!
//! # Strategy
//!
//! - Every supported (suite, version) pair, keys derived from fuzz bytes
//! - Arbitrary record bytes, header, content type and sequence number
//! - Records shorter than the overhead, misaligned CBC bodies, bad padding
//!
//! # Invariants
//!
//! - Open never panics
//! - A record shorter than the overhead is `RecordTooShort`
//! - Any other failure is `AuthenticationFailed`, with no further detail
//! - Accepted plaintext is never longer than the record

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use keelson_record::{
    CipherIdentity, CipherSuite, Direction, KeyMaterial, ProtocolVersion, RecordContext,
    RecordError, RecordProtector,
};

const SUITES: [CipherSuite; 8] = [
    CipherSuite::Tls13Aes128GcmSha256,
    CipherSuite::Tls13Aes256GcmSha384,
    CipherSuite::Tls13ChaCha20Poly1305Sha256,
    CipherSuite::EcdheRsaAes128GcmSha256,
    CipherSuite::EcdheEcdsaChaCha20Poly1305Sha256,
    CipherSuite::RsaAes128CbcSha,
    CipherSuite::RsaAes256CbcSha,
    CipherSuite::RsaAes128CbcSha256,
];

const VERSIONS: [ProtocolVersion; 5] = [
    ProtocolVersion::Tls11,
    ProtocolVersion::Tls12,
    ProtocolVersion::Tls13,
    ProtocolVersion::Dtls12,
    ProtocolVersion::Dtls13,
];

#[derive(Debug, Arbitrary)]
struct OpenScenario {
    suite: u8,
    version: u8,
    key_byte: u8,
    content_type: u8,
    record_version: u16,
    seqnum: u64,
    header: Vec<u8>,
    record: Vec<u8>,
}

fuzz_target!(|scenario: OpenScenario| {
    let suite = SUITES[usize::from(scenario.suite) % SUITES.len()];
    let version = VERSIONS[usize::from(scenario.version) % VERSIONS.len()];
    let Ok(params) = CipherIdentity::new(suite, version).resolve() else {
        return;
    };

    let keys = KeyMaterial::new(
        &vec![scenario.key_byte; params.enc_key_len],
        &vec![scenario.key_byte ^ 0x5c; params.mac_key_len],
        &vec![scenario.key_byte ^ 0x36; params.fixed_iv_len],
    );
    let reader = RecordProtector::create(Direction::Read, version, suite, keys)
        .expect("keys sized from resolved parameters");

    let ctx = RecordContext::new(
        scenario.content_type,
        scenario.record_version,
        scenario.seqnum,
        &scenario.header,
    );
    let mut record = scenario.record.clone();
    let record_len = record.len();

    // INVARIANT 1: open never panics, and fails only in the two public ways
    match reader.open(&ctx, &mut record) {
        Ok(plaintext) => {
            // INVARIANT 2: plaintext fits inside the record
            assert!(plaintext.len() <= record_len);
        },
        Err(RecordError::RecordTooShort { len, .. }) => {
            // INVARIANT 3: only reported for records under the overhead
            assert_eq!(len, record_len);
            assert!(record_len < reader.max_overhead());
        },
        Err(RecordError::AuthenticationFailed) => {},
        Err(other) => panic!("unexpected open error: {other}"),
    }
});
