//! Key material handed over by the key schedule.
//!
//! Every buffer lives in [`Zeroizing`] so it is wiped when the owning
//! protector is dropped or replaced.

use std::fmt;

use zeroize::Zeroizing;

/// Derived traffic keys for one direction of one epoch.
///
/// Ownership moves into [`crate::RecordProtector::create`]; the caller keeps
/// no copy.
pub struct KeyMaterial {
    enc_key: Zeroizing<Vec<u8>>,
    mac_key: Zeroizing<Vec<u8>>,
    fixed_iv: Zeroizing<Vec<u8>>,
    record_number_key: Option<Zeroizing<Vec<u8>>>,
}

impl KeyMaterial {
    /// Key material for a pure AEAD suite (no MAC key).
    pub fn aead(enc_key: &[u8], fixed_iv: &[u8]) -> Self {
        Self::new(enc_key, &[], fixed_iv)
    }

    /// Key material in key-block order. `mac_key` is empty for AEAD suites.
    pub fn new(enc_key: &[u8], mac_key: &[u8], fixed_iv: &[u8]) -> Self {
        Self {
            enc_key: Zeroizing::new(enc_key.to_vec()),
            mac_key: Zeroizing::new(mac_key.to_vec()),
            fixed_iv: Zeroizing::new(fixed_iv.to_vec()),
            record_number_key: None,
        }
    }

    /// Attach the key used to mask record sequence numbers (DTLS 1.3).
    #[must_use]
    pub fn with_record_number_key(mut self, key: &[u8]) -> Self {
        self.record_number_key = Some(Zeroizing::new(key.to_vec()));
        self
    }

    pub(crate) fn enc_key(&self) -> &[u8] {
        &self.enc_key
    }

    pub(crate) fn mac_key(&self) -> &[u8] {
        &self.mac_key
    }

    pub(crate) fn fixed_iv(&self) -> &[u8] {
        &self.fixed_iv
    }

    pub(crate) fn record_number_key(&self) -> Option<&[u8]> {
        self.record_number_key.as_deref().map(Vec::as_slice)
    }

    /// `mac_key ∥ enc_key ∥ fixed_iv`, the single key the CBC adapter takes.
    pub(crate) fn merged(&self) -> Zeroizing<Vec<u8>> {
        let mut merged = Zeroizing::new(Vec::with_capacity(
            self.mac_key.len() + self.enc_key.len() + self.fixed_iv.len(),
        ));
        merged.extend_from_slice(&self.mac_key);
        merged.extend_from_slice(&self.enc_key);
        merged.extend_from_slice(&self.fixed_iv);
        merged
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("enc_key_len", &self.enc_key.len())
            .field("mac_key_len", &self.mac_key.len())
            .field("fixed_iv_len", &self.fixed_iv.len())
            .field("record_number_key", &self.record_number_key.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merged_key_orders_mac_enc_iv() {
        let keys = KeyMaterial::new(&[1, 2], &[3], &[4, 5, 6]);
        assert_eq!(keys.merged().as_slice(), &[3, 1, 2, 4, 5, 6]);
    }

    #[test]
    fn debug_never_prints_key_bytes() {
        let keys = KeyMaterial::aead(&[0xAB; 16], &[0xCD; 12]).with_record_number_key(&[0xEF; 16]);
        let rendered = format!("{keys:?}");
        assert!(!rendered.contains("171"));
        assert!(!rendered.contains("205"));
        assert!(rendered.contains("enc_key_len: 16"));
    }
}
