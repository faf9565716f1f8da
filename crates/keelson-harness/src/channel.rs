//! Simulated record channel.
//!
//! One direction of a connection: a writer that seals and frames records
//! and a reader that parses and opens them. Both ends are keyed from the
//! same seeded RNG, so a `(config, operations)` pair always produces the
//! same bytes on the wire.
//!
//! # Framing
//!
//! ```text
//! stream:   type(1) ∥ version(2) ∥ length(2)
//! datagram: type(1) ∥ version(2) ∥ epoch(2) ∥ seq(6) ∥ length(2)
//! ```
//!
//! Under DTLS 1.3 the six sequence bytes are masked with the record number
//! masker after sealing, sampling the first 16 bytes of the record. The
//! authenticated header is always the unmasked one.

use std::{fmt, sync::Arc};

use keelson_record::{
    Direction, KeyMaterial, RecordContext, RecordLayer, RecordNumberMasker, RecordProtector,
    Transport,
    testing::{PassthroughProtector, SeededRandom},
};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::{config::ChannelConfig, error::HarnessError, replay::ReplayWindow};

/// Header length for stream framing.
pub const STREAM_HEADER_LEN: usize = 5;

/// Header length for datagram framing.
pub const DATAGRAM_HEADER_LEN: usize = 13;

/// Largest sequence number a datagram header can carry.
pub const MAX_DATAGRAM_SEQ: u64 = (1 << 48) - 1;

const SEQ_FIELD: std::ops::Range<usize> = 5..11;

/// Header length for `transport`.
pub const fn header_len(transport: Transport) -> usize {
    match transport {
        Transport::Stream => STREAM_HEADER_LEN,
        Transport::Datagram => DATAGRAM_HEADER_LEN,
    }
}

/// A record the reader accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivered {
    /// Content type from the header
    pub content_type: u8,
    /// Epoch the record was sealed in
    pub epoch: u16,
    /// Sequence number within the epoch
    pub seq: u64,
    /// Opened plaintext
    pub payload: Vec<u8>,
}

struct Endpoint {
    layer: Box<dyn RecordLayer>,
    masker: RecordNumberMasker,
}

/// Deterministic record channel over one protected direction.
pub struct RecordChannel {
    config: ChannelConfig,
    rng: ChaCha20Rng,
    passthrough: bool,
    epoch: u16,
    writer: Endpoint,
    reader: Endpoint,
    write_seq: u64,
    read_seq: u64,
    replay: ReplayWindow,
}

impl RecordChannel {
    /// Channel with both ends keyed from `config.seed`.
    ///
    /// # Errors
    ///
    /// - `TransportMismatch` or `Record(UnsupportedCipher)` from validation
    /// - `Record(_)` if a protector cannot be built
    pub fn new(config: ChannelConfig) -> Result<Self, HarnessError> {
        Self::build(config, false)
    }

    /// Channel whose ends copy records verbatim.
    ///
    /// Framing, sequencing and epochs behave as in [`Self::new`]; nothing
    /// is authenticated.
    ///
    /// # Errors
    ///
    /// Same validation errors as [`Self::new`].
    pub fn passthrough(config: ChannelConfig) -> Result<Self, HarnessError> {
        Self::build(config, true)
    }

    fn build(config: ChannelConfig, passthrough: bool) -> Result<Self, HarnessError> {
        config.validate()?;

        let mut rng = ChaCha20Rng::seed_from_u64(config.seed);
        let (writer, reader) = endpoints(&config, &mut rng, passthrough)?;

        tracing::debug!(
            suite = ?config.suite,
            version = ?config.version,
            seed = config.seed,
            passthrough,
            "Created record channel"
        );

        Ok(Self {
            config,
            rng,
            passthrough,
            epoch: 0,
            writer,
            reader,
            write_seq: 0,
            read_seq: 0,
            replay: ReplayWindow::new(),
        })
    }

    /// Configuration the channel was built from.
    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Whether the ends copy records verbatim.
    pub fn is_passthrough(&self) -> bool {
        self.passthrough
    }

    /// Current epoch, starting at zero.
    pub fn epoch(&self) -> u16 {
        self.epoch
    }

    /// Sequence number the next sent record will carry.
    pub fn write_seq(&self) -> u64 {
        self.write_seq
    }

    /// Sequence number the stream reader expects next.
    pub fn read_seq(&self) -> u64 {
        self.read_seq
    }

    /// Datagram replay state for the current epoch.
    pub fn replay_window(&self) -> &ReplayWindow {
        &self.replay
    }

    /// Skip `count` write sequence numbers, as if those records were lost.
    pub fn skip_write_seq(&mut self, count: u64) {
        self.write_seq = self.write_seq.saturating_add(count);
    }

    /// Seal and frame `payload`, returning the bytes to put on the wire.
    ///
    /// # Errors
    ///
    /// - `SequenceExhausted` once the sequence space of the epoch is used up
    /// - `Record(RecordTooLarge)` if the sealed record exceeds the length
    ///   field
    pub fn send(&mut self, content_type: u8, payload: &[u8]) -> Result<Vec<u8>, HarnessError> {
        let seq = self.write_seq;
        let max_seq = match self.config.transport {
            Transport::Stream => u64::MAX,
            Transport::Datagram => MAX_DATAGRAM_SEQ,
        };
        if seq >= max_seq {
            return Err(HarnessError::SequenceExhausted);
        }

        let layer = &self.writer.layer;
        let version = layer.record_version().wire();
        let len = layer.ciphertext_len(payload.len())?;
        let mut header = self.header(content_type, version, seq, len);

        let ctx = RecordContext::new(content_type, version, self.seqnum(self.epoch, seq), &header);
        let sealed = layer.seal(&ctx, payload)?;
        debug_assert_eq!(sealed.len(), len);

        if self.config.transport == Transport::Datagram && self.writer.masker.is_available() {
            apply_mask(&self.writer.masker, &sealed, &mut header)?;
        }

        self.write_seq = seq + 1;
        tracing::trace!(epoch = self.epoch, seq, len, "Sent record");

        let mut wire = header;
        wire.extend_from_slice(&sealed);
        Ok(wire)
    }

    /// Parse and open one framed record.
    ///
    /// State advances only when the record authenticates: the stream reader
    /// moves to the next sequence number and the datagram reader marks the
    /// number in its replay window.
    ///
    /// # Errors
    ///
    /// - `MalformedHeader` or `LengthMismatch` for bad framing
    /// - `StaleEpoch` or `Replayed` for datagrams the reader must drop
    /// - `Record(AuthenticationFailed)` for forged, reordered or replayed
    ///   stream records
    pub fn receive(&mut self, wire: &[u8]) -> Result<Delivered, HarnessError> {
        let transport = self.config.transport;
        let header_len = header_len(transport);
        if wire.len() < header_len {
            return Err(HarnessError::MalformedHeader { len: wire.len(), expected: header_len });
        }

        let (header, body) = wire.split_at(header_len);
        let mut header = header.to_vec();
        let content_type = header[0];
        let version = u16::from_be_bytes([header[1], header[2]]);
        let declared =
            usize::from(u16::from_be_bytes([header[header_len - 2], header[header_len - 1]]));
        if declared != body.len() {
            return Err(HarnessError::LengthMismatch { declared, actual: body.len() });
        }

        let seq = match transport {
            Transport::Stream => self.read_seq,
            Transport::Datagram => {
                let epoch = u16::from_be_bytes([header[3], header[4]]);
                if epoch != self.epoch {
                    return Err(HarnessError::StaleEpoch { epoch, current: self.epoch });
                }
                if self.reader.masker.is_available() {
                    apply_mask(&self.reader.masker, body, &mut header)?;
                }
                let mut seq = [0u8; 8];
                seq[2..].copy_from_slice(&header[SEQ_FIELD]);
                let seq = u64::from_be_bytes(seq);
                if !self.replay.check(seq) {
                    return Err(HarnessError::Replayed { seq });
                }
                seq
            },
        };

        let mut record = body.to_vec();
        let ctx = RecordContext::new(content_type, version, self.seqnum(self.epoch, seq), &header);
        let payload = self.reader.layer.open(&ctx, &mut record)?.to_vec();

        match transport {
            Transport::Stream => self.read_seq += 1,
            Transport::Datagram => self.replay.mark(seq),
        }
        tracing::trace!(epoch = self.epoch, seq, len = payload.len(), "Received record");

        Ok(Delivered { content_type, epoch: self.epoch, seq, payload })
    }

    /// Move both ends to the next epoch with fresh keys.
    ///
    /// Sequence numbers restart at zero and the replay window is cleared.
    /// Records still in flight from the previous epoch no longer open.
    ///
    /// # Errors
    ///
    /// - `EpochExhausted` if the epoch counter is at its maximum
    pub fn rotate(&mut self) -> Result<(), HarnessError> {
        let epoch = self.epoch.checked_add(1).ok_or(HarnessError::EpochExhausted)?;
        let (writer, reader) = endpoints(&self.config, &mut self.rng, self.passthrough)?;

        self.writer = writer;
        self.reader = reader;
        self.epoch = epoch;
        self.write_seq = 0;
        self.read_seq = 0;
        self.replay = ReplayWindow::new();

        tracing::debug!(epoch, "Rotated channel keys");
        Ok(())
    }

    fn seqnum(&self, epoch: u16, seq: u64) -> u64 {
        match self.config.transport {
            Transport::Stream => seq,
            Transport::Datagram => (u64::from(epoch) << 48) | seq,
        }
    }

    fn header(&self, content_type: u8, version: u16, seq: u64, len: usize) -> Vec<u8> {
        let mut header = Vec::with_capacity(DATAGRAM_HEADER_LEN);
        header.push(content_type);
        header.extend_from_slice(&version.to_be_bytes());
        if self.config.transport == Transport::Datagram {
            header.extend_from_slice(&self.epoch.to_be_bytes());
            header.extend_from_slice(&seq.to_be_bytes()[2..]);
        }
        header.extend_from_slice(&(len as u16).to_be_bytes());
        header
    }
}

impl fmt::Debug for RecordChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordChannel")
            .field("config", &self.config)
            .field("passthrough", &self.passthrough)
            .field("epoch", &self.epoch)
            .field("write_seq", &self.write_seq)
            .field("read_seq", &self.read_seq)
            .finish_non_exhaustive()
    }
}

/// XOR the sequence field of a datagram header with the mask for `sample`.
fn apply_mask(
    masker: &RecordNumberMasker,
    sample: &[u8],
    header: &mut [u8],
) -> Result<(), HarnessError> {
    let mut mask = [0u8; 6];
    masker.generate_mask(sample, &mut mask)?;
    for (byte, m) in header[SEQ_FIELD].iter_mut().zip(mask) {
        *byte ^= m;
    }
    Ok(())
}

fn random_bytes(rng: &mut ChaCha20Rng, len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    rng.fill_bytes(&mut bytes);
    bytes
}

/// Writer and reader keyed for one epoch.
fn endpoints(
    config: &ChannelConfig,
    rng: &mut ChaCha20Rng,
    passthrough: bool,
) -> Result<(Endpoint, Endpoint), HarnessError> {
    let identity = config.identity();

    if passthrough {
        let end = |direction| Endpoint {
            layer: Box::new(PassthroughProtector::new(direction, identity)),
            masker: RecordNumberMasker::none(),
        };
        return Ok((end(Direction::Write), end(Direction::Read)));
    }

    let params = identity.resolve()?;
    let enc_key = random_bytes(rng, params.enc_key_len);
    let mac_key = random_bytes(rng, params.mac_key_len);
    let fixed_iv = random_bytes(rng, params.fixed_iv_len);
    let record_number_key = match params.bulk.mask_algorithm() {
        Some(algorithm)
            if config.version.is_tls13_or_later() && config.transport == Transport::Datagram =>
        {
            Some(random_bytes(rng, algorithm.key_len()))
        },
        _ => None,
    };
    let iv_seed = rng.next_u64();

    let keys = || {
        let keys = KeyMaterial::new(&enc_key, &mac_key, &fixed_iv);
        match &record_number_key {
            Some(key) => keys.with_record_number_key(key),
            None => keys,
        }
    };
    let masker = || match &record_number_key {
        Some(key) => RecordNumberMasker::for_suite(config.suite, key),
        None => Ok(RecordNumberMasker::none()),
    };

    let writer = Endpoint {
        layer: Box::new(RecordProtector::create_with_random(
            Direction::Write,
            config.version,
            config.suite,
            keys(),
            Arc::new(SeededRandom::new(iv_seed)),
        )?),
        masker: masker()?,
    };
    let reader = Endpoint {
        layer: Box::new(RecordProtector::create(
            Direction::Read,
            config.version,
            config.suite,
            keys(),
        )?),
        masker: masker()?,
    };
    Ok((writer, reader))
}
