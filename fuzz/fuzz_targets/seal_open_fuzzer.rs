//! Fuzz target for seal/open round trips across every entry point
//!
//! # Strategy
//!
//! - Every supported (suite, version) pair with fuzz-chosen key bytes
//! - Arbitrary plaintext, header, content type and sequence number
//! - Seal through `seal`, `seal_scatter` and `seal_scatter_within`
//! - A single corrupted byte at a fuzz-chosen position
//!
//! # Invariants
//!
//! - Sealed length is exactly `ciphertext_len(plaintext)`
//! - All three seal paths produce records that open to the plaintext
//! - Deterministic nonce modes make the three paths byte-identical
//! - Any corrupted byte fails with `AuthenticationFailed`
//! - A different sequence number fails with `AuthenticationFailed`

#![no_main]

use std::sync::Arc;

use arbitrary::Arbitrary;
use keelson_record::{
    CipherIdentity, CipherSuite, Direction, KeyMaterial, NonceMode, ProtocolVersion,
    RecordContext, RecordError, RecordProtector, ScatterLayout, testing::SeededRandom,
};
use libfuzzer_sys::fuzz_target;

const SUITES: [CipherSuite; 8] = [
    CipherSuite::Tls13Aes128GcmSha256,
    CipherSuite::Tls13Aes256GcmSha384,
    CipherSuite::Tls13ChaCha20Poly1305Sha256,
    CipherSuite::EcdheRsaAes256GcmSha384,
    CipherSuite::EcdheRsaChaCha20Poly1305Sha256,
    CipherSuite::EcdheRsaAes128CbcSha,
    CipherSuite::EcdheEcdsaAes256CbcSha,
    CipherSuite::EcdheRsaAes128CbcSha256,
];

const VERSIONS: [ProtocolVersion; 5] = [
    ProtocolVersion::Tls11,
    ProtocolVersion::Tls12,
    ProtocolVersion::Tls13,
    ProtocolVersion::Dtls12,
    ProtocolVersion::Dtls13,
];

#[derive(Debug, Arbitrary)]
struct RoundTrip {
    suite: u8,
    version: u8,
    key_seed: u64,
    content_type: u8,
    seqnum: u64,
    header: Vec<u8>,
    plaintext: Vec<u8>,
    corrupt_at: u16,
    corrupt_with: u8,
}

fn key_bytes(seed: u64, salt: u8, len: usize) -> Vec<u8> {
    (0..len).map(|i| (seed >> ((i % 8) * 8)) as u8 ^ salt ^ i as u8).collect()
}

fuzz_target!(|input: RoundTrip| {
    let suite = SUITES[usize::from(input.suite) % SUITES.len()];
    let version = VERSIONS[usize::from(input.version) % VERSIONS.len()];
    let Ok(params) = CipherIdentity::new(suite, version).resolve() else {
        return;
    };

    let keys = || {
        KeyMaterial::new(
            &key_bytes(input.key_seed, 0x11, params.enc_key_len),
            &key_bytes(input.key_seed, 0x22, params.mac_key_len),
            &key_bytes(input.key_seed, 0x33, params.fixed_iv_len),
        )
    };
    let writer = RecordProtector::create_with_random(
        Direction::Write,
        version,
        suite,
        keys(),
        Arc::new(SeededRandom::new(input.key_seed)),
    )
    .expect("keys sized from resolved parameters");
    let reader = RecordProtector::create(Direction::Read, version, suite, keys())
        .expect("keys sized from resolved parameters");

    let ctx = RecordContext::new(input.content_type, 0x0303, input.seqnum, &input.header);

    let Ok(expected_len) = writer.ciphertext_len(input.plaintext.len()) else {
        // INVARIANT 1: oversized plaintext is refused by seal too
        assert!(matches!(
            writer.seal(&ctx, &input.plaintext),
            Err(RecordError::RecordTooLarge { .. })
        ));
        return;
    };

    // INVARIANT 2: sealed length is predicted exactly
    let sealed = writer.seal(&ctx, &input.plaintext).expect("seal within limits");
    assert_eq!(sealed.len(), expected_len);

    let prefix_len = writer.explicit_nonce_len();
    let body_len = input.plaintext.len();
    let suffix_len = writer.suffix_len(body_len);

    let mut prefix = vec![0u8; prefix_len];
    let mut body = vec![0u8; body_len];
    let mut suffix = vec![0u8; suffix_len];
    writer
        .seal_scatter(&mut prefix, &mut body, &mut suffix, &ctx, &input.plaintext)
        .expect("seal_scatter within limits");
    let scattered = [prefix, body, suffix].concat();

    let mut buffer = vec![0u8; expected_len];
    buffer[prefix_len..prefix_len + body_len].copy_from_slice(&input.plaintext);
    let layout = ScatterLayout {
        prefix: 0..prefix_len,
        body: prefix_len..prefix_len + body_len,
        suffix: prefix_len + body_len..expected_len,
        plaintext: prefix_len..prefix_len + body_len,
    };
    writer.seal_scatter_within(&mut buffer, &layout, &ctx).expect("in-place seal within limits");

    // INVARIANT 3: deterministic nonces give identical records on every path
    if writer.nonce_mode() != Some(NonceMode::ExplicitRandom) {
        assert_eq!(sealed, scattered);
        assert_eq!(sealed, buffer);
    }

    // INVARIANT 4: every path opens back to the plaintext
    for record in [&sealed, &scattered, &buffer] {
        let mut record = record.clone();
        let opened = reader.open(&ctx, &mut record).expect("valid record must open");
        assert_eq!(opened, input.plaintext.as_slice());
    }

    // INVARIANT 5: a corrupted byte fails authentication
    if input.corrupt_with != 0 {
        let mut corrupted = sealed.clone();
        let at = usize::from(input.corrupt_at) % corrupted.len();
        corrupted[at] ^= input.corrupt_with;
        assert_eq!(
            reader.open(&ctx, &mut corrupted).map(|p| p.len()),
            Err(RecordError::AuthenticationFailed)
        );
    }

    // INVARIANT 6: the sequence number is bound into every record
    let other = RecordContext::new(input.content_type, 0x0303, input.seqnum ^ 1, &input.header);
    let mut record = sealed.clone();
    assert_eq!(
        reader.open(&other, &mut record).map(|p| p.len()),
        Err(RecordError::AuthenticationFailed)
    );
});
