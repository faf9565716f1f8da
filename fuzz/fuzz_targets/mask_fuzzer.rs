//! Fuzz target for record number mask generation
//!
//! # Invariants
//!
//! - Mask generation never panics for any sample or output length
//! - Samples under 16 bytes are `SampleTooShort`
//! - Requests over 16 bytes are `MaskTooLong` for the AES maskers
//! - Successful masks are a prefix of `mask_block`
//! - The none masker always reports `MaskUnavailable`

#![no_main]

use arbitrary::Arbitrary;
use keelson_record::{MASK_SAMPLE_LEN, MaskAlgorithm, RecordError, RecordNumberMasker};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Algorithm {
    Aes128,
    Aes256,
    ChaCha20,
    Unavailable,
}

#[derive(Debug, Arbitrary)]
struct MaskRequest {
    algorithm: Algorithm,
    key: [u8; 32],
    sample: Vec<u8>,
    out_len: u8,
}

fuzz_target!(|request: MaskRequest| {
    let masker = match request.algorithm {
        Algorithm::Aes128 => RecordNumberMasker::new(MaskAlgorithm::Aes128, &request.key[..16]),
        Algorithm::Aes256 => RecordNumberMasker::new(MaskAlgorithm::Aes256, &request.key),
        Algorithm::ChaCha20 => RecordNumberMasker::new(MaskAlgorithm::ChaCha20, &request.key),
        Algorithm::Unavailable => Ok(RecordNumberMasker::none()),
    }
    .expect("key sized for algorithm");

    let mut out = vec![0u8; usize::from(request.out_len)];
    let result = masker.generate_mask(&request.sample, &mut out);

    match masker.algorithm() {
        None => assert_eq!(result, Err(RecordError::MaskUnavailable)),
        Some(_) if request.sample.len() < MASK_SAMPLE_LEN => {
            assert!(matches!(result, Err(RecordError::SampleTooShort { .. })));
        },
        Some(MaskAlgorithm::Aes128 | MaskAlgorithm::Aes256) if out.len() > MASK_SAMPLE_LEN => {
            assert!(matches!(result, Err(RecordError::MaskTooLong { .. })));
        },
        Some(_) => {
            // ChaCha20 only fails at the very end of its block counter
            if let (Ok(()), Ok(block)) = (result, masker.mask_block(&request.sample)) {
                let shared = out.len().min(MASK_SAMPLE_LEN);
                assert_eq!(&out[..shared], &block[..shared]);
            }
        },
    }
});
