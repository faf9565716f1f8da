//! Channel configuration.

use keelson_record::{CipherIdentity, CipherSuite, ProtocolVersion, Transport};

use crate::error::HarnessError;

/// Everything needed to build a reproducible [`crate::RecordChannel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Negotiated protocol version
    pub version: ProtocolVersion,
    /// Negotiated cipher suite
    pub suite: CipherSuite,
    /// Seed for key generation; equal seeds give equal keys
    pub seed: u64,
    /// Framing used on the simulated wire
    pub transport: Transport,
}

impl ChannelConfig {
    /// Configuration with the transport implied by `version`.
    pub const fn new(version: ProtocolVersion, suite: CipherSuite, seed: u64) -> Self {
        Self { version, suite, seed, transport: version.transport() }
    }

    /// Cipher identity the channel negotiates.
    pub const fn identity(&self) -> CipherIdentity {
        CipherIdentity::new(self.suite, self.version)
    }

    /// Check that the configuration describes a channel that can exist.
    ///
    /// # Errors
    ///
    /// - `TransportMismatch` if `transport` disagrees with `version`
    /// - `Record(UnsupportedCipher)` if the suite is not defined for the
    ///   version
    pub fn validate(&self) -> Result<(), HarnessError> {
        if self.transport != self.version.transport() {
            return Err(HarnessError::TransportMismatch {
                version: self.version,
                transport: self.transport,
            });
        }
        self.identity().resolve()?;
        Ok(())
    }
}
