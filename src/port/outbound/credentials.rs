//! Credential provider port.
//!
//! The router never stores secrets. Execution and probe adapters ask a
//! provider for them when they need to authenticate.

use std::fmt;

use crate::domain::VenueId;

/// Per-venue API authentication material.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
    pub passphrase: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"[REDACTED]")
            .field("api_secret", &"[REDACTED]")
            .field("passphrase", &self.passphrase.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Source of venue credentials.
pub trait CredentialProvider: Send + Sync {
    /// Credentials for `venue`, if any are configured.
    fn credentials(&self, venue: &VenueId) -> Option<Credentials>;
}
