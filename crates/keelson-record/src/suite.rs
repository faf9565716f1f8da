//! Cipher identity: protocol versions, cipher suites and primitive resolution.
//!
//! The resolution table decides, once per protector, which primitive backs a
//! (version, suite) pair and how long each piece of key material must be.
//! Everything downstream (nonce mode, AD mode, masker) is derived from the
//! result and never re-derived.

use crate::{error::RecordError, mask::MaskAlgorithm};

/// Record transport the protocol version runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transport {
    /// TLS over a reliable stream
    Stream,
    /// DTLS over datagrams
    Datagram,
}

/// Negotiated protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolVersion {
    /// TLS 1.0 (0x0301)
    Tls10,
    /// TLS 1.1 (0x0302)
    Tls11,
    /// TLS 1.2 (0x0303)
    Tls12,
    /// TLS 1.3 (0x0304)
    Tls13,
    /// DTLS 1.0 (0xfeff), record layer of TLS 1.1
    Dtls10,
    /// DTLS 1.2 (0xfefd)
    Dtls12,
    /// DTLS 1.3 (0xfefc)
    Dtls13,
}

impl ProtocolVersion {
    /// Two-byte wire encoding.
    pub const fn wire(self) -> u16 {
        match self {
            Self::Tls10 => 0x0301,
            Self::Tls11 => 0x0302,
            Self::Tls12 => 0x0303,
            Self::Tls13 => 0x0304,
            Self::Dtls10 => 0xfeff,
            Self::Dtls12 => 0xfefd,
            Self::Dtls13 => 0xfefc,
        }
    }

    /// Parse a wire version.
    pub const fn from_wire(value: u16) -> Option<Self> {
        match value {
            0x0301 => Some(Self::Tls10),
            0x0302 => Some(Self::Tls11),
            0x0303 => Some(Self::Tls12),
            0x0304 => Some(Self::Tls13),
            0xfeff => Some(Self::Dtls10),
            0xfefd => Some(Self::Dtls12),
            0xfefc => Some(Self::Dtls13),
            _ => None,
        }
    }

    /// Stream or datagram.
    pub const fn transport(self) -> Transport {
        match self {
            Self::Dtls10 | Self::Dtls12 | Self::Dtls13 => Transport::Datagram,
            Self::Tls10 | Self::Tls11 | Self::Tls12 | Self::Tls13 => Transport::Stream,
        }
    }

    /// The TLS version whose record protection this version uses.
    ///
    /// DTLS wire numbers count downwards, so comparisons go through this
    /// mapping instead of the raw wire value.
    pub const fn tls_equivalent(self) -> Self {
        match self {
            Self::Dtls10 => Self::Tls11,
            Self::Dtls12 => Self::Tls12,
            Self::Dtls13 => Self::Tls13,
            other => other,
        }
    }

    const fn rank(self) -> u8 {
        match self.tls_equivalent() {
            Self::Tls10 => 0,
            Self::Tls11 => 1,
            Self::Tls12 => 2,
            _ => 3,
        }
    }

    /// True if this version's record protection is at least `other`'s.
    pub const fn at_least(self, other: Self) -> bool {
        self.rank() >= other.rank()
    }

    /// TLS 1.3 or DTLS 1.3.
    pub const fn is_tls13_or_later(self) -> bool {
        self.at_least(Self::Tls13)
    }

    /// Version carried in the outer record header once this version is in
    /// use. TLS 1.3 freezes it at TLS 1.2, DTLS 1.3 at DTLS 1.2.
    pub const fn legacy_record_version(self) -> Self {
        match self {
            Self::Tls13 => Self::Tls12,
            Self::Dtls13 => Self::Dtls12,
            other => other,
        }
    }
}

/// Bulk record-protection algorithm a suite maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BulkCipher {
    /// AES-128 in GCM mode
    Aes128Gcm,
    /// AES-256 in GCM mode
    Aes256Gcm,
    /// ChaCha20-Poly1305 (RFC 8439)
    ChaCha20Poly1305,
    /// AES-128-CBC with HMAC-SHA1
    Aes128CbcSha1,
    /// AES-256-CBC with HMAC-SHA1
    Aes256CbcSha1,
    /// AES-128-CBC with HMAC-SHA256
    Aes128CbcSha256,
}

impl BulkCipher {
    /// Encryption key length in bytes.
    pub const fn enc_key_len(self) -> usize {
        match self {
            Self::Aes128Gcm | Self::Aes128CbcSha1 | Self::Aes128CbcSha256 => 16,
            Self::Aes256Gcm | Self::ChaCha20Poly1305 | Self::Aes256CbcSha1 => 32,
        }
    }

    /// HMAC key length in bytes, zero for AEAD ciphers.
    pub const fn mac_key_len(self) -> usize {
        match self {
            Self::Aes128Gcm | Self::Aes256Gcm | Self::ChaCha20Poly1305 => 0,
            Self::Aes128CbcSha1 | Self::Aes256CbcSha1 => 20,
            Self::Aes128CbcSha256 => 32,
        }
    }

    /// True for the legacy CBC + HMAC construction.
    pub const fn is_cbc(self) -> bool {
        self.mac_key_len() != 0
    }

    /// Record-number mask algorithm keyed alongside this cipher, if any.
    pub const fn mask_algorithm(self) -> Option<MaskAlgorithm> {
        match self {
            Self::Aes128Gcm => Some(MaskAlgorithm::Aes128),
            Self::Aes256Gcm => Some(MaskAlgorithm::Aes256),
            Self::ChaCha20Poly1305 => Some(MaskAlgorithm::ChaCha20),
            Self::Aes128CbcSha1 | Self::Aes256CbcSha1 | Self::Aes128CbcSha256 => None,
        }
    }
}

/// Cipher suites with a record-protection primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CipherSuite {
    /// `TLS_AES_128_GCM_SHA256`
    Tls13Aes128GcmSha256,
    /// `TLS_AES_256_GCM_SHA384`
    Tls13Aes256GcmSha384,
    /// `TLS_CHACHA20_POLY1305_SHA256`
    Tls13ChaCha20Poly1305Sha256,
    /// `TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256`
    EcdheEcdsaAes128GcmSha256,
    /// `TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256`
    EcdheRsaAes128GcmSha256,
    /// `TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384`
    EcdheEcdsaAes256GcmSha384,
    /// `TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384`
    EcdheRsaAes256GcmSha384,
    /// `TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256`
    EcdheEcdsaChaCha20Poly1305Sha256,
    /// `TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256`
    EcdheRsaChaCha20Poly1305Sha256,
    /// `TLS_RSA_WITH_AES_128_GCM_SHA256`
    RsaAes128GcmSha256,
    /// `TLS_RSA_WITH_AES_256_GCM_SHA384`
    RsaAes256GcmSha384,
    /// `TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA`
    EcdheEcdsaAes128CbcSha,
    /// `TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA`
    EcdheEcdsaAes256CbcSha,
    /// `TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA`
    EcdheRsaAes128CbcSha,
    /// `TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA`
    EcdheRsaAes256CbcSha,
    /// `TLS_RSA_WITH_AES_128_CBC_SHA`
    RsaAes128CbcSha,
    /// `TLS_RSA_WITH_AES_256_CBC_SHA`
    RsaAes256CbcSha,
    /// `TLS_RSA_WITH_AES_128_CBC_SHA256`
    RsaAes128CbcSha256,
    /// `TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA256`
    EcdheRsaAes128CbcSha256,
}

impl CipherSuite {
    /// Every suite, in IANA id order within each family.
    pub const ALL: [Self; 19] = [
        Self::Tls13Aes128GcmSha256,
        Self::Tls13Aes256GcmSha384,
        Self::Tls13ChaCha20Poly1305Sha256,
        Self::EcdheEcdsaAes128GcmSha256,
        Self::EcdheRsaAes128GcmSha256,
        Self::EcdheEcdsaAes256GcmSha384,
        Self::EcdheRsaAes256GcmSha384,
        Self::EcdheEcdsaChaCha20Poly1305Sha256,
        Self::EcdheRsaChaCha20Poly1305Sha256,
        Self::RsaAes128GcmSha256,
        Self::RsaAes256GcmSha384,
        Self::EcdheEcdsaAes128CbcSha,
        Self::EcdheEcdsaAes256CbcSha,
        Self::EcdheRsaAes128CbcSha,
        Self::EcdheRsaAes256CbcSha,
        Self::RsaAes128CbcSha,
        Self::RsaAes256CbcSha,
        Self::RsaAes128CbcSha256,
        Self::EcdheRsaAes128CbcSha256,
    ];

    /// IANA cipher suite id.
    pub const fn id(self) -> u16 {
        match self {
            Self::Tls13Aes128GcmSha256 => 0x1301,
            Self::Tls13Aes256GcmSha384 => 0x1302,
            Self::Tls13ChaCha20Poly1305Sha256 => 0x1303,
            Self::EcdheEcdsaAes128GcmSha256 => 0xC02B,
            Self::EcdheRsaAes128GcmSha256 => 0xC02F,
            Self::EcdheEcdsaAes256GcmSha384 => 0xC02C,
            Self::EcdheRsaAes256GcmSha384 => 0xC030,
            Self::EcdheEcdsaChaCha20Poly1305Sha256 => 0xCCA9,
            Self::EcdheRsaChaCha20Poly1305Sha256 => 0xCCA8,
            Self::RsaAes128GcmSha256 => 0x009C,
            Self::RsaAes256GcmSha384 => 0x009D,
            Self::EcdheEcdsaAes128CbcSha => 0xC009,
            Self::EcdheEcdsaAes256CbcSha => 0xC00A,
            Self::EcdheRsaAes128CbcSha => 0xC013,
            Self::EcdheRsaAes256CbcSha => 0xC014,
            Self::RsaAes128CbcSha => 0x002F,
            Self::RsaAes256CbcSha => 0x0035,
            Self::RsaAes128CbcSha256 => 0x003C,
            Self::EcdheRsaAes128CbcSha256 => 0xC027,
        }
    }

    /// Look up a suite by IANA id.
    pub fn from_id(id: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|suite| suite.id() == id)
    }

    /// Bulk algorithm behind this suite.
    pub const fn bulk(self) -> BulkCipher {
        match self {
            Self::Tls13Aes128GcmSha256
            | Self::EcdheEcdsaAes128GcmSha256
            | Self::EcdheRsaAes128GcmSha256
            | Self::RsaAes128GcmSha256 => BulkCipher::Aes128Gcm,
            Self::Tls13Aes256GcmSha384
            | Self::EcdheEcdsaAes256GcmSha384
            | Self::EcdheRsaAes256GcmSha384
            | Self::RsaAes256GcmSha384 => BulkCipher::Aes256Gcm,
            Self::Tls13ChaCha20Poly1305Sha256
            | Self::EcdheEcdsaChaCha20Poly1305Sha256
            | Self::EcdheRsaChaCha20Poly1305Sha256 => BulkCipher::ChaCha20Poly1305,
            Self::EcdheEcdsaAes128CbcSha | Self::EcdheRsaAes128CbcSha | Self::RsaAes128CbcSha => {
                BulkCipher::Aes128CbcSha1
            },
            Self::EcdheEcdsaAes256CbcSha | Self::EcdheRsaAes256CbcSha | Self::RsaAes256CbcSha => {
                BulkCipher::Aes256CbcSha1
            },
            Self::RsaAes128CbcSha256 | Self::EcdheRsaAes128CbcSha256 => BulkCipher::Aes128CbcSha256,
        }
    }

    /// TLS 1.3 suites carry no key exchange or MAC in their name and are only
    /// valid under TLS 1.3.
    pub const fn is_tls13(self) -> bool {
        matches!(
            self,
            Self::Tls13Aes128GcmSha256
                | Self::Tls13Aes256GcmSha384
                | Self::Tls13ChaCha20Poly1305Sha256
        )
    }
}

/// Negotiated suite plus protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CipherIdentity {
    /// Negotiated cipher suite
    pub suite: CipherSuite,
    /// Negotiated protocol version
    pub version: ProtocolVersion,
}

/// Sizes dictated by the primitive a (version, suite) pair resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimitiveParams {
    /// Bulk algorithm
    pub bulk: BulkCipher,
    /// Nonce length the primitive consumes per record
    pub nonce_len: usize,
    /// Required `fixed_iv` length
    pub fixed_iv_len: usize,
    /// Required `enc_key` length
    pub enc_key_len: usize,
    /// Required `mac_key` length (zero for AEAD)
    pub mac_key_len: usize,
}

/// AEAD nonce length for GCM and ChaCha20-Poly1305.
pub const AEAD_NONCE_LEN: usize = 12;

/// Fixed (implicit) part of the TLS 1.2 AES-GCM nonce, RFC 5288.
pub const GCM_TLS12_FIXED_IV_LEN: usize = 4;

/// AES block size, which is also the CBC explicit IV length.
pub const AES_BLOCK_LEN: usize = 16;

impl CipherIdentity {
    /// Build an identity.
    pub const fn new(suite: CipherSuite, version: ProtocolVersion) -> Self {
        Self { suite, version }
    }

    /// Resolve to primitive parameters.
    ///
    /// # Errors
    ///
    /// - `UnsupportedCipher` if the suite is not defined for this version
    pub fn resolve(&self) -> Result<PrimitiveParams, RecordError> {
        let unsupported =
            RecordError::UnsupportedCipher { suite: self.suite.id(), version: self.version.wire() };

        let version = self.version;
        if self.suite.is_tls13() != version.is_tls13_or_later() {
            return Err(unsupported);
        }

        let bulk = self.suite.bulk();
        let (nonce_len, fixed_iv_len) = match bulk {
            BulkCipher::Aes128Gcm | BulkCipher::Aes256Gcm => {
                if !version.at_least(ProtocolVersion::Tls12) {
                    return Err(unsupported);
                }
                let fixed = if version.is_tls13_or_later() {
                    AEAD_NONCE_LEN
                } else {
                    GCM_TLS12_FIXED_IV_LEN
                };
                (AEAD_NONCE_LEN, fixed)
            },
            BulkCipher::ChaCha20Poly1305 => {
                if !version.at_least(ProtocolVersion::Tls12) {
                    return Err(unsupported);
                }
                (AEAD_NONCE_LEN, AEAD_NONCE_LEN)
            },
            BulkCipher::Aes128CbcSha1 | BulkCipher::Aes256CbcSha1 => {
                // TLS 1.0 chains the IV across records; only explicit IVs here.
                if !version.at_least(ProtocolVersion::Tls11) {
                    return Err(unsupported);
                }
                (AES_BLOCK_LEN, 0)
            },
            BulkCipher::Aes128CbcSha256 => {
                if !version.at_least(ProtocolVersion::Tls12) {
                    return Err(unsupported);
                }
                (AES_BLOCK_LEN, 0)
            },
        };

        Ok(PrimitiveParams {
            bulk,
            nonce_len,
            fixed_iv_len,
            enc_key_len: bulk.enc_key_len(),
            mac_key_len: bulk.mac_key_len(),
        })
    }
}
