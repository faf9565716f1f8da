//! Per-direction record protection.
//!
//! A [`RecordProtector`] is built once per (connection, direction, epoch)
//! from the negotiated suite and the derived keys, and is immutable
//! afterwards. Key rotation replaces the instance wholesale. The sequence
//! number and the outer record header are owned by the caller and passed in
//! with every record.
//!
//! # Wire layout
//!
//! ```text
//! ┌─────────────────┬───────────────────────┬──────────────────┐
//! │ explicit nonce  │ ciphertext            │ suffix           │
//! │ (0, 8 or 16 B)  │ (plaintext length)    │ (tag or MAC+pad) │
//! └─────────────────┴───────────────────────┴──────────────────┘
//! ```
//!
//! # Security
//!
//! - Open never reveals why authentication failed
//! - Nonces are unique per record as long as sequence numbers are (the
//!   caller's obligation; not checked here)
//! - Key material is wiped when the protector is dropped

use std::{fmt, ops::Range, sync::Arc};

use crate::{
    additional_data::{AdMode, build_additional_data},
    error::{KeyPart, RecordError},
    key::KeyMaterial,
    mask::RecordNumberMasker,
    nonce::{MAX_NONCE_LEN, NonceLayout, NonceMode, build_nonce},
    primitive::{RecordAead, new_primitive},
    random::{OsRandom, RandomSource},
    suite::{BulkCipher, CipherIdentity, CipherSuite, ProtocolVersion, Transport},
};

/// Largest sealed record, bounded by the 16-bit length field.
pub const MAX_RECORD_LEN: usize = 0xFFFF;

/// Which way records flow through a protector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Opens received records
    Read,
    /// Seals outgoing records
    Write,
}

/// Per-record inputs supplied by the transport.
#[derive(Debug, Clone, Copy)]
pub struct RecordContext<'a> {
    /// Record content type
    pub content_type: u8,
    /// Version field written into the record header
    pub record_version: u16,
    /// Record sequence number (DTLS: epoch-qualified)
    pub seqnum: u64,
    /// Outer record header; only authenticated under TLS 1.3
    pub header: &'a [u8],
}

impl<'a> RecordContext<'a> {
    /// Bundle the per-record inputs.
    pub const fn new(content_type: u8, record_version: u16, seqnum: u64, header: &'a [u8]) -> Self {
        Self { content_type, record_version, seqnum, header }
    }
}

/// Regions of a single buffer for [`RecordProtector::seal_scatter_within`].
///
/// `body` may coincide exactly with `plaintext` (sealing in place); any other
/// overlap between regions is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScatterLayout {
    /// Where the explicit nonce goes
    pub prefix: Range<usize>,
    /// Where the ciphertext goes
    pub body: Range<usize>,
    /// Where the tag (or MAC and padding) goes
    pub suffix: Range<usize>,
    /// Where the plaintext is read from
    pub plaintext: Range<usize>,
}

enum Cipher {
    Null,
    Protected { primitive: Box<dyn RecordAead>, nonce: NonceLayout, ad_mode: AdMode },
}

/// Record protection state for one direction of one epoch.
pub struct RecordProtector {
    direction: Direction,
    version: ProtocolVersion,
    suite: Option<CipherSuite>,
    cipher: Cipher,
    masker: RecordNumberMasker,
    random: Arc<dyn RandomSource>,
}

fn check_key_len(part: KeyPart, expected: usize, actual: usize) -> Result<(), RecordError> {
    if expected != actual {
        return Err(RecordError::KeySizeMismatch { part, expected, actual });
    }
    Ok(())
}

impl RecordProtector {
    /// Build a protector for `suite` under `version`, drawing explicit IVs
    /// from the operating system.
    ///
    /// # Errors
    ///
    /// - `UnsupportedCipher` if no primitive exists for the pair
    /// - `KeySizeMismatch` if any key part has the wrong length
    pub fn create(
        direction: Direction,
        version: ProtocolVersion,
        suite: CipherSuite,
        keys: KeyMaterial,
    ) -> Result<Self, RecordError> {
        Self::create_with_random(direction, version, suite, keys, Arc::new(OsRandom))
    }

    /// Same as [`Self::create`] with an injected random source.
    ///
    /// # Errors
    ///
    /// Same as [`Self::create`].
    pub fn create_with_random(
        direction: Direction,
        version: ProtocolVersion,
        suite: CipherSuite,
        keys: KeyMaterial,
        random: Arc<dyn RandomSource>,
    ) -> Result<Self, RecordError> {
        let params = CipherIdentity::new(suite, version).resolve()?;

        check_key_len(KeyPart::EncKey, params.enc_key_len, keys.enc_key().len())?;
        check_key_len(KeyPart::MacKey, params.mac_key_len, keys.mac_key().len())?;
        check_key_len(KeyPart::FixedIv, params.fixed_iv_len, keys.fixed_iv().len())?;

        let (primitive, nonce_mode, ad_mode) = if keys.mac_key().is_empty() {
            let nonce_mode =
                if version.is_tls13_or_later() || params.bulk == BulkCipher::ChaCha20Poly1305 {
                    NonceMode::XorSequence
                } else {
                    NonceMode::ExplicitSequence
                };
            let ad_mode = if version.is_tls13_or_later() {
                AdMode::HeaderAsAd
            } else {
                AdMode::SeqTypeVersionLength
            };
            (new_primitive(params.bulk, keys.enc_key())?, nonce_mode, ad_mode)
        } else {
            let merged = keys.merged();
            let primitive = new_primitive(params.bulk, &merged)?;
            (primitive, NonceMode::ExplicitRandom, AdMode::SeqTypeVersion)
        };

        let nonce = NonceLayout::new(nonce_mode, keys.fixed_iv(), primitive.nonce_len())?;

        let masker = match (params.bulk.mask_algorithm(), keys.record_number_key()) {
            (Some(algorithm), Some(key)) => RecordNumberMasker::new(algorithm, key)?,
            _ => RecordNumberMasker::none(),
        };

        tracing::debug!(
            suite = ?suite,
            version = ?version,
            direction = ?direction,
            nonce_mode = ?nonce_mode,
            ad_mode = ?ad_mode,
            masked = masker.is_available(),
            "Created record protector"
        );

        Ok(Self {
            direction,
            version,
            suite: Some(suite),
            cipher: Cipher::Protected { primitive, nonce, ad_mode },
            masker,
            random,
        })
    }

    /// Pre-handshake protector: records pass through verbatim.
    pub fn null(direction: Direction, transport: Transport) -> Self {
        let version = match transport {
            Transport::Stream => ProtocolVersion::Tls10,
            Transport::Datagram => ProtocolVersion::Dtls10,
        };
        Self {
            direction,
            version,
            suite: None,
            cipher: Cipher::Null,
            masker: RecordNumberMasker::none(),
            random: Arc::new(OsRandom),
        }
    }

    /// Negotiated protocol version (TLS 1.0 or DTLS 1.0 for the null cipher).
    pub fn protocol_version(&self) -> ProtocolVersion {
        self.version
    }

    /// Version written in the outer record header.
    ///
    /// TLS 1.3 freezes the wire version at TLS 1.2 (DTLS 1.3 at DTLS 1.2).
    pub fn record_version(&self) -> ProtocolVersion {
        self.version.legacy_record_version()
    }

    /// True for the pre-handshake pass-through instance.
    pub fn is_null_cipher(&self) -> bool {
        matches!(self.cipher, Cipher::Null)
    }

    /// Suite and version, `None` for the null cipher.
    pub fn cipher(&self) -> Option<CipherIdentity> {
        self.suite.map(|suite| CipherIdentity::new(suite, self.version))
    }

    /// Direction this protector was built for.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Nonce mode, `None` for the null cipher.
    pub fn nonce_mode(&self) -> Option<NonceMode> {
        match &self.cipher {
            Cipher::Null => None,
            Cipher::Protected { nonce, .. } => Some(nonce.mode()),
        }
    }

    /// AD mode, `None` for the null cipher.
    pub fn ad_mode(&self) -> Option<AdMode> {
        match &self.cipher {
            Cipher::Null => None,
            Cipher::Protected { ad_mode, .. } => Some(*ad_mode),
        }
    }

    /// Record number masker keyed with this epoch's record number key.
    pub fn record_number_masker(&self) -> &RecordNumberMasker {
        &self.masker
    }

    /// Bytes of explicit nonce in front of each record.
    pub fn explicit_nonce_len(&self) -> usize {
        match &self.cipher {
            Cipher::Null => 0,
            Cipher::Protected { nonce, .. } => nonce.explicit_len(),
        }
    }

    /// Largest difference between a sealed record and its plaintext.
    pub fn max_overhead(&self) -> usize {
        match &self.cipher {
            Cipher::Null => 0,
            Cipher::Protected { primitive, nonce, .. } => {
                nonce.explicit_len() + primitive.max_overhead()
            },
        }
    }

    /// Exact suffix length for a plaintext of `plaintext_len` bytes.
    pub fn suffix_len(&self, plaintext_len: usize) -> usize {
        match &self.cipher {
            Cipher::Null => 0,
            Cipher::Protected { primitive, .. } => primitive.suffix_len(plaintext_len),
        }
    }

    /// Sealed record length for a plaintext of `plaintext_len` bytes.
    ///
    /// # Errors
    ///
    /// - `RecordTooLarge` if the record would exceed [`MAX_RECORD_LEN`]
    pub fn ciphertext_len(&self, plaintext_len: usize) -> Result<usize, RecordError> {
        let len = self
            .explicit_nonce_len()
            .checked_add(plaintext_len)
            .and_then(|len| len.checked_add(self.suffix_len(plaintext_len)))
            .unwrap_or(usize::MAX);

        if len > MAX_RECORD_LEN {
            tracing::trace!(len, max = MAX_RECORD_LEN, "Rejected oversized record");
            return Err(RecordError::RecordTooLarge { len, max: MAX_RECORD_LEN });
        }
        Ok(len)
    }

    fn require(&self, direction: Direction) -> Result<(), RecordError> {
        if self.direction != direction {
            return Err(RecordError::WrongDirection { direction: self.direction });
        }
        Ok(())
    }

    /// Authenticate and decrypt `record` in place.
    ///
    /// Returns the plaintext as a subslice of `record`. The null cipher
    /// returns `record` unchanged.
    ///
    /// # Errors
    ///
    /// - `WrongDirection` on a write protector
    /// - `RecordTooShort` if `record` cannot hold the cipher's overhead or
    ///   explicit nonce
    /// - `AuthenticationFailed` for any cryptographic failure, with no detail
    pub fn open<'a>(
        &self,
        ctx: &RecordContext<'_>,
        record: &'a mut [u8],
    ) -> Result<&'a mut [u8], RecordError> {
        self.require(Direction::Read)?;

        let Cipher::Protected { primitive, nonce: layout, ad_mode } = &self.cipher else {
            return Ok(record);
        };

        let mut plaintext_len = 0;
        if *ad_mode != AdMode::SeqTypeVersion {
            let overhead = self.max_overhead();
            if record.len() < overhead {
                tracing::trace!(len = record.len(), min = overhead, "Rejected short record");
                return Err(RecordError::RecordTooShort { len: record.len(), min: overhead });
            }
            plaintext_len = record.len() - overhead;
        }

        let explicit_len = layout.explicit_len();
        if record.len() < explicit_len {
            tracing::trace!(len = record.len(), min = explicit_len, "Rejected short record");
            return Err(RecordError::RecordTooShort { len: record.len(), min: explicit_len });
        }
        let (explicit, sealed) = record.split_at_mut(explicit_len);

        let nonce = build_nonce(layout, ctx.seqnum, explicit);
        let ad = build_additional_data(
            *ad_mode,
            ctx.content_type,
            ctx.record_version,
            ctx.seqnum,
            plaintext_len,
            ctx.header,
        );

        primitive
            .open_in_place(nonce.as_slice(), ad.as_bytes(), sealed)
            .map_err(|_| RecordError::AuthenticationFailed)
    }

    /// Seal `plaintext` into a freshly allocated `prefix ∥ ciphertext ∥
    /// suffix` record.
    ///
    /// # Errors
    ///
    /// - `WrongDirection` on a read protector
    /// - `RecordTooLarge` if the record would exceed [`MAX_RECORD_LEN`]
    /// - `RandomUnavailable` if a random explicit IV could not be drawn
    pub fn seal(&self, ctx: &RecordContext<'_>, plaintext: &[u8]) -> Result<Vec<u8>, RecordError> {
        self.require(Direction::Write)?;

        let total = self.ciphertext_len(plaintext.len())?;
        let mut out = vec![0u8; total];
        let (prefix, rest) = out.split_at_mut(self.explicit_nonce_len());
        let (body, suffix) = rest.split_at_mut(plaintext.len());
        body.copy_from_slice(plaintext);

        self.seal_regions(ctx, prefix, body, suffix)?;
        Ok(out)
    }

    /// Seal `plaintext` into three caller-owned regions.
    ///
    /// The regions must be exactly [`Self::explicit_nonce_len`],
    /// `plaintext.len()` and [`Self::suffix_len`] bytes long.
    ///
    /// # Errors
    ///
    /// - `WrongDirection` on a read protector
    /// - `RecordTooLarge` if the record would exceed [`MAX_RECORD_LEN`]
    /// - `BufferSizeMismatch` naming the first region with the wrong size
    /// - `RandomUnavailable` if a random explicit IV could not be drawn
    pub fn seal_scatter(
        &self,
        out_prefix: &mut [u8],
        out_body: &mut [u8],
        out_suffix: &mut [u8],
        ctx: &RecordContext<'_>,
        plaintext: &[u8],
    ) -> Result<(), RecordError> {
        self.require(Direction::Write)?;
        self.ciphertext_len(plaintext.len())?;
        self.check_regions(out_prefix.len(), out_body.len(), out_suffix.len(), plaintext.len())?;

        out_body.copy_from_slice(plaintext);
        self.seal_regions(ctx, out_prefix, out_body, out_suffix)
    }

    /// Scatter-seal within one buffer, reading the plaintext from
    /// `layout.plaintext` and writing the three output regions.
    ///
    /// # Errors
    ///
    /// - `WrongDirection` on a read protector
    /// - `BufferSizeMismatch` if a region falls outside `buf` or has the
    ///   wrong size
    /// - `OutputAliasesInput` if an output partially overlaps the plaintext
    ///   or another output
    /// - `RecordTooLarge` if the record would exceed [`MAX_RECORD_LEN`]
    /// - `RandomUnavailable` if a random explicit IV could not be drawn
    pub fn seal_scatter_within(
        &self,
        buf: &mut [u8],
        layout: &ScatterLayout,
        ctx: &RecordContext<'_>,
    ) -> Result<(), RecordError> {
        self.require(Direction::Write)?;

        for (region, range) in [
            ("prefix", &layout.prefix),
            ("body", &layout.body),
            ("suffix", &layout.suffix),
            ("plaintext", &layout.plaintext),
        ] {
            if range.start > range.end || range.end > buf.len() {
                return Err(RecordError::BufferSizeMismatch {
                    region,
                    expected: range.end,
                    actual: buf.len(),
                });
            }
        }

        let plaintext_len = layout.plaintext.len();
        self.ciphertext_len(plaintext_len)?;
        self.check_regions(
            layout.prefix.len(),
            layout.body.len(),
            layout.suffix.len(),
            plaintext_len,
        )?;

        let outputs = [&layout.prefix, &layout.body, &layout.suffix];
        let outputs_overlap = overlaps(outputs[0], outputs[1])
            || overlaps(outputs[0], outputs[2])
            || overlaps(outputs[1], outputs[2]);
        let input_aliased = overlaps(&layout.prefix, &layout.plaintext)
            || overlaps(&layout.suffix, &layout.plaintext)
            || (layout.body != layout.plaintext && overlaps(&layout.body, &layout.plaintext));
        if outputs_overlap || input_aliased {
            return Err(RecordError::OutputAliasesInput);
        }

        if layout.body != layout.plaintext {
            buf.copy_within(layout.plaintext.clone(), layout.body.start);
        }

        let [prefix, body, suffix] = disjoint_regions(
            buf,
            [layout.prefix.clone(), layout.body.clone(), layout.suffix.clone()],
        );
        self.seal_regions(ctx, prefix, body, suffix)
    }

    fn check_regions(
        &self,
        prefix_len: usize,
        body_len: usize,
        suffix_len: usize,
        plaintext_len: usize,
    ) -> Result<(), RecordError> {
        for (region, expected, actual) in [
            ("prefix", self.explicit_nonce_len(), prefix_len),
            ("body", plaintext_len, body_len),
            ("suffix", self.suffix_len(plaintext_len), suffix_len),
        ] {
            if expected != actual {
                return Err(RecordError::BufferSizeMismatch { region, expected, actual });
            }
        }
        Ok(())
    }

    /// Seal `body` (already holding the plaintext) in place, writing the
    /// explicit nonce into `prefix` and the tag into `suffix`.
    fn seal_regions(
        &self,
        ctx: &RecordContext<'_>,
        prefix: &mut [u8],
        body: &mut [u8],
        suffix: &mut [u8],
    ) -> Result<(), RecordError> {
        let Cipher::Protected { primitive, nonce: layout, ad_mode } = &self.cipher else {
            return Ok(());
        };

        let mut variable = [0u8; MAX_NONCE_LEN];
        let variable = &mut variable[..layout.variable_len()];
        match layout.mode() {
            NonceMode::XorSequence => {},
            NonceMode::ExplicitSequence => variable.copy_from_slice(&ctx.seqnum.to_be_bytes()),
            NonceMode::ExplicitRandom => self.random.fill(variable)?,
        }
        if layout.mode().in_record() {
            prefix.copy_from_slice(variable);
        }

        let nonce = build_nonce(layout, ctx.seqnum, variable);
        let ad = build_additional_data(
            *ad_mode,
            ctx.content_type,
            ctx.record_version,
            ctx.seqnum,
            body.len(),
            ctx.header,
        );

        primitive
            .seal_in_place(nonce.as_slice(), ad.as_bytes(), body, suffix)
            .map_err(|_| RecordError::AuthenticationFailed)
    }
}

impl fmt::Debug for RecordProtector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordProtector")
            .field("direction", &self.direction)
            .field("version", &self.version)
            .field("suite", &self.suite)
            .field("nonce_mode", &self.nonce_mode())
            .field("ad_mode", &self.ad_mode())
            .field("masker", &self.masker)
            .finish_non_exhaustive()
    }
}

fn overlaps(a: &Range<usize>, b: &Range<usize>) -> bool {
    !a.is_empty() && !b.is_empty() && a.start < b.end && b.start < a.end
}

/// Split `buf` into the three (pairwise disjoint) `ranges`, returned in the
/// order given.
fn disjoint_regions(mut buf: &mut [u8], ranges: [Range<usize>; 3]) -> [&mut [u8]; 3] {
    let mut order = [0usize, 1, 2];
    order.sort_by_key(|&i| ranges[i].start);

    let mut regions: [&mut [u8]; 3] = Default::default();
    let mut consumed = 0;
    for i in order {
        let range = &ranges[i];
        if range.is_empty() {
            continue;
        }
        let rest = std::mem::take(&mut buf);
        let (_, tail) = rest.split_at_mut(range.start - consumed);
        let (region, tail) = tail.split_at_mut(range.len());
        regions[i] = region;
        buf = tail;
        consumed = range.end;
    }
    regions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tls13_pair(suite: CipherSuite) -> (RecordProtector, RecordProtector) {
        let bulk = suite.bulk();
        let keys = || KeyMaterial::aead(&vec![0x11; bulk.enc_key_len()], &[0x22; 12]);
        (
            RecordProtector::create(Direction::Write, ProtocolVersion::Tls13, suite, keys())
                .unwrap(),
            RecordProtector::create(Direction::Read, ProtocolVersion::Tls13, suite, keys())
                .unwrap(),
        )
    }

    fn ctx(seqnum: u64) -> RecordContext<'static> {
        RecordContext::new(0x17, 0x0303, seqnum, &[0x17, 0x03, 0x03, 0x00, 0x00])
    }

    #[test]
    fn protector_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RecordProtector>();
    }

    #[test]
    fn tls13_uses_xor_nonce_and_header_ad() {
        let (writer, _) = tls13_pair(CipherSuite::Tls13Aes128GcmSha256);
        assert_eq!(writer.nonce_mode(), Some(NonceMode::XorSequence));
        assert_eq!(writer.ad_mode(), Some(AdMode::HeaderAsAd));
        assert_eq!(writer.explicit_nonce_len(), 0);
        assert_eq!(writer.max_overhead(), 16);
        assert_eq!(writer.record_version(), ProtocolVersion::Tls12);
    }

    #[test]
    fn tls12_chacha_uses_xor_nonce() {
        let keys = KeyMaterial::aead(&[0; 32], &[0; 12]);
        let protector = RecordProtector::create(
            Direction::Write,
            ProtocolVersion::Tls12,
            CipherSuite::EcdheRsaChaCha20Poly1305Sha256,
            keys,
        )
        .unwrap();
        assert_eq!(protector.nonce_mode(), Some(NonceMode::XorSequence));
        assert_eq!(protector.ad_mode(), Some(AdMode::SeqTypeVersionLength));
    }

    #[test]
    fn tls12_gcm_uses_explicit_sequence_nonce() {
        let keys = KeyMaterial::aead(&[0; 16], &[0; 4]);
        let protector = RecordProtector::create(
            Direction::Write,
            ProtocolVersion::Tls12,
            CipherSuite::EcdheEcdsaAes128GcmSha256,
            keys,
        )
        .unwrap();
        assert_eq!(protector.nonce_mode(), Some(NonceMode::ExplicitSequence));
        assert_eq!(protector.explicit_nonce_len(), 8);
        assert_eq!(protector.max_overhead(), 24);

        let record = protector.seal(&ctx(0x0102), b"hi").unwrap();
        assert_eq!(&record[..8], &0x0102u64.to_be_bytes());
    }

    #[test]
    fn cbc_uses_random_nonce_and_short_ad() {
        let keys = KeyMaterial::new(&[1; 16], &[2; 20], &[]);
        let protector = RecordProtector::create(
            Direction::Write,
            ProtocolVersion::Tls11,
            CipherSuite::RsaAes128CbcSha,
            keys,
        )
        .unwrap();
        assert_eq!(protector.nonce_mode(), Some(NonceMode::ExplicitRandom));
        assert_eq!(protector.ad_mode(), Some(AdMode::SeqTypeVersion));
        assert_eq!(protector.explicit_nonce_len(), 16);
        assert_eq!(protector.max_overhead(), 16 + 20 + 16);
    }

    #[test]
    fn key_size_mismatch_names_part() {
        let keys = KeyMaterial::aead(&[0; 16], &[0; 11]);
        let result = RecordProtector::create(
            Direction::Read,
            ProtocolVersion::Tls13,
            CipherSuite::Tls13Aes128GcmSha256,
            keys,
        );
        assert!(matches!(
            result,
            Err(RecordError::KeySizeMismatch { part: KeyPart::FixedIv, expected: 12, actual: 11 })
        ));

        let keys = KeyMaterial::new(&[0; 16], &[0; 32], &[]);
        let result = RecordProtector::create(
            Direction::Read,
            ProtocolVersion::Tls12,
            CipherSuite::RsaAes128CbcSha,
            keys,
        );
        assert!(matches!(
            result,
            Err(RecordError::KeySizeMismatch { part: KeyPart::MacKey, expected: 20, actual: 32 })
        ));
    }

    #[test]
    fn direction_is_enforced() {
        let (writer, reader) = tls13_pair(CipherSuite::Tls13ChaCha20Poly1305Sha256);
        assert_eq!(
            reader.seal(&ctx(0), b"x"),
            Err(RecordError::WrongDirection { direction: Direction::Read })
        );
        let mut record = vec![0u8; 32];
        assert_eq!(
            writer.open(&ctx(0), &mut record).map(|p| p.len()),
            Err(RecordError::WrongDirection { direction: Direction::Write })
        );
    }

    #[test]
    fn open_rejects_records_shorter_than_overhead() {
        let (_, reader) = tls13_pair(CipherSuite::Tls13Aes256GcmSha384);
        let mut record = vec![0u8; 15];
        assert_eq!(
            reader.open(&ctx(0), &mut record).map(|p| p.len()),
            Err(RecordError::RecordTooShort { len: 15, min: 16 })
        );
    }

    #[test]
    fn masker_attached_only_with_record_number_key() {
        let plain = KeyMaterial::aead(&[0; 16], &[0; 12]);
        let protector = RecordProtector::create(
            Direction::Read,
            ProtocolVersion::Dtls13,
            CipherSuite::Tls13Aes128GcmSha256,
            plain,
        )
        .unwrap();
        assert!(!protector.record_number_masker().is_available());

        let keyed = KeyMaterial::aead(&[0; 16], &[0; 12]).with_record_number_key(&[0; 16]);
        let protector = RecordProtector::create(
            Direction::Read,
            ProtocolVersion::Dtls13,
            CipherSuite::Tls13Aes128GcmSha256,
            keyed,
        )
        .unwrap();
        assert!(protector.record_number_masker().is_available());
        assert_eq!(protector.record_version(), ProtocolVersion::Dtls12);
    }

    #[test]
    fn null_cipher_copies_verbatim() {
        let writer = RecordProtector::null(Direction::Write, Transport::Stream);
        let reader = RecordProtector::null(Direction::Read, Transport::Stream);
        assert!(writer.is_null_cipher());
        assert_eq!(writer.max_overhead(), 0);
        assert_eq!(writer.cipher(), None);
        assert_eq!(writer.record_version(), ProtocolVersion::Tls10);

        let mut record = writer.seal(&ctx(9), b"client hello").unwrap();
        assert_eq!(record, b"client hello");
        assert_eq!(reader.open(&ctx(9), &mut record).unwrap(), b"client hello");

        let datagram = RecordProtector::null(Direction::Read, Transport::Datagram);
        assert_eq!(datagram.record_version(), ProtocolVersion::Dtls10);
    }

    #[test]
    fn seal_scatter_matches_seal() {
        let (writer, reader) = tls13_pair(CipherSuite::Tls13Aes128GcmSha256);
        let plaintext = b"scattered plaintext";

        let mut prefix = [];
        let mut body = vec![0u8; plaintext.len()];
        let mut suffix = vec![0u8; writer.suffix_len(plaintext.len())];
        writer.seal_scatter(&mut prefix, &mut body, &mut suffix, &ctx(3), plaintext).unwrap();

        let joined = [body.as_slice(), suffix.as_slice()].concat();
        assert_eq!(joined, writer.seal(&ctx(3), plaintext).unwrap());

        let mut record = joined;
        assert_eq!(reader.open(&ctx(3), &mut record).unwrap(), plaintext);
    }

    #[test]
    fn seal_scatter_rejects_wrong_suffix_size() {
        let (writer, _) = tls13_pair(CipherSuite::Tls13Aes128GcmSha256);
        let mut body = [0u8; 4];
        let mut suffix = [0u8; 15];
        assert_eq!(
            writer.seal_scatter(&mut [], &mut body, &mut suffix, &ctx(0), b"abcd"),
            Err(RecordError::BufferSizeMismatch { region: "suffix", expected: 16, actual: 15 })
        );
    }

    #[test]
    fn scatter_within_seals_in_place() {
        let (writer, reader) = tls13_pair(CipherSuite::Tls13Aes128GcmSha256);
        let mut buf = vec![0u8; 5 + 16];
        buf[..5].copy_from_slice(b"hello");
        let layout =
            ScatterLayout { prefix: 0..0, body: 0..5, suffix: 5..21, plaintext: 0..5 };
        writer.seal_scatter_within(&mut buf, &layout, &ctx(1)).unwrap();

        assert_eq!(buf, writer.seal(&ctx(1), b"hello").unwrap());
        assert_eq!(reader.open(&ctx(1), &mut buf).unwrap(), b"hello");
    }

    #[test]
    fn scatter_within_moves_disjoint_plaintext() {
        let keys = KeyMaterial::aead(&[5; 16], &[6; 4]);
        let writer = RecordProtector::create(
            Direction::Write,
            ProtocolVersion::Tls12,
            CipherSuite::RsaAes128GcmSha256,
            keys,
        )
        .unwrap();
        let mut buf = vec![0u8; 64];
        buf[40..45].copy_from_slice(b"hello");
        let layout =
            ScatterLayout { prefix: 0..8, body: 8..13, suffix: 13..29, plaintext: 40..45 };
        writer.seal_scatter_within(&mut buf, &layout, &ctx(2)).unwrap();

        assert_eq!(&buf[..29], writer.seal(&ctx(2), b"hello").unwrap().as_slice());
    }

    #[test]
    fn scatter_within_rejects_partial_overlap() {
        let (writer, _) = tls13_pair(CipherSuite::Tls13Aes128GcmSha256);
        let mut buf = vec![0u8; 64];

        let shifted = ScatterLayout { prefix: 0..0, body: 2..7, suffix: 7..23, plaintext: 0..5 };
        assert_eq!(
            writer.seal_scatter_within(&mut buf, &shifted, &ctx(0)),
            Err(RecordError::OutputAliasesInput)
        );

        let suffix_on_input =
            ScatterLayout { prefix: 0..0, body: 30..35, suffix: 20..36, plaintext: 30..35 };
        assert_eq!(
            writer.seal_scatter_within(&mut buf, &suffix_on_input, &ctx(0)),
            Err(RecordError::OutputAliasesInput)
        );
    }

    #[test]
    fn scatter_within_rejects_out_of_bounds_region() {
        let (writer, _) = tls13_pair(CipherSuite::Tls13Aes128GcmSha256);
        let mut buf = vec![0u8; 16];
        let layout = ScatterLayout { prefix: 0..0, body: 0..5, suffix: 5..21, plaintext: 0..5 };
        assert_eq!(
            writer.seal_scatter_within(&mut buf, &layout, &ctx(0)),
            Err(RecordError::BufferSizeMismatch { region: "suffix", expected: 21, actual: 16 })
        );
    }

    #[test]
    fn ciphertext_len_enforces_ceiling() {
        let (writer, _) = tls13_pair(CipherSuite::Tls13Aes128GcmSha256);
        assert_eq!(writer.ciphertext_len(MAX_RECORD_LEN - 16), Ok(MAX_RECORD_LEN));
        assert_eq!(
            writer.ciphertext_len(MAX_RECORD_LEN - 15),
            Err(RecordError::RecordTooLarge { len: MAX_RECORD_LEN + 1, max: MAX_RECORD_LEN })
        );
    }
}
