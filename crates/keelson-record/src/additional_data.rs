//! Additional authenticated data for each record.

/// What the AEAD authenticates alongside the ciphertext.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdMode {
    /// The caller's outer record header, verbatim (TLS 1.3, DTLS 1.3).
    HeaderAsAd,
    /// `seqnum ∥ type ∥ version ∥ length` (TLS 1.2 AEAD, RFC 5246 §6.2.3.3).
    SeqTypeVersionLength,
    /// `seqnum ∥ type ∥ version`; the CBC construction adds the length itself.
    SeqTypeVersion,
}

/// Longest constructed AD: 8 + 1 + 2 + 2.
pub const MAX_CONSTRUCTED_AD_LEN: usize = 13;

/// AD for one record, borrowed from the header or built on the stack.
#[derive(Debug, Clone, Copy)]
pub enum AdditionalData<'a> {
    /// The header passed through untouched
    Header(&'a [u8]),
    /// Constructed from the record fields
    Constructed {
        /// Backing storage
        bytes: [u8; MAX_CONSTRUCTED_AD_LEN],
        /// Bytes in use
        len: usize,
    },
}

impl AdditionalData<'_> {
    /// AD bytes.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Header(header) => *header,
            Self::Constructed { bytes, len } => &bytes[..*len],
        }
    }
}

/// Build the additional data for one record.
///
/// `plaintext_len` is only read in `SeqTypeVersionLength` mode, and is
/// truncated to 16 bits there; record lengths never exceed that.
pub fn build_additional_data<'a>(
    mode: AdMode,
    content_type: u8,
    record_version: u16,
    seqnum: u64,
    plaintext_len: usize,
    header: &'a [u8],
) -> AdditionalData<'a> {
    if mode == AdMode::HeaderAsAd {
        return AdditionalData::Header(header);
    }

    let mut bytes = [0u8; MAX_CONSTRUCTED_AD_LEN];
    bytes[0..8].copy_from_slice(&seqnum.to_be_bytes());
    bytes[8] = content_type;
    bytes[9..11].copy_from_slice(&record_version.to_be_bytes());

    let len = if mode == AdMode::SeqTypeVersionLength {
        bytes[11..13].copy_from_slice(&(plaintext_len as u16).to_be_bytes());
        13
    } else {
        11
    };

    AdditionalData::Constructed { bytes, len }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_mode_passes_header_through() {
        let header = [0x17, 0x03, 0x03, 0x00, 0x20];
        let ad = build_additional_data(AdMode::HeaderAsAd, 0x16, 0x0303, 5, 99, &header);
        assert_eq!(ad.as_bytes(), &header);
    }

    #[test]
    fn tls12_ad_layout() {
        let ad = build_additional_data(
            AdMode::SeqTypeVersionLength,
            0x17,
            0x0303,
            0x0102_0304_0506_0708,
            0x0A0B,
            &[],
        );
        assert_eq!(
            ad.as_bytes(),
            &[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x17, 0x03, 0x03, 0x0A, 0x0B]
        );
    }

    #[test]
    fn cbc_ad_omits_length() {
        let ad = build_additional_data(AdMode::SeqTypeVersion, 0x15, 0xFEFD, 1, 500, &[0xFF]);
        assert_eq!(ad.as_bytes(), &[0, 0, 0, 0, 0, 0, 0, 1, 0x15, 0xFE, 0xFD]);
    }
}
