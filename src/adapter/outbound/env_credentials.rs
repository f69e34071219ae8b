//! Credential provider backed by environment variables.
//!
//! For a venue `okx` the provider reads `OKX_API_KEY`, `OKX_API_SECRET` and
//! the optional `OKX_PASSPHRASE`. A `.env` file loaded at startup works the
//! same way.

use crate::domain::VenueId;
use crate::port::{CredentialProvider, Credentials};

/// Reads `<VENUE>_API_KEY` style variables.
#[derive(Debug, Clone, Default)]
pub struct EnvCredentials {
    prefix: Option<String>,
}

impl EnvCredentials {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend `prefix_` to every variable name.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }

    fn var_name(&self, venue: &VenueId, suffix: &str) -> String {
        let venue: String = venue
            .as_str()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect();
        match &self.prefix {
            Some(prefix) => format!("{prefix}_{venue}_{suffix}"),
            None => format!("{venue}_{suffix}"),
        }
    }

    fn read(&self, venue: &VenueId, suffix: &str) -> Option<String> {
        std::env::var(self.var_name(venue, suffix))
            .ok()
            .filter(|v| !v.trim().is_empty())
    }
}

impl CredentialProvider for EnvCredentials {
    fn credentials(&self, venue: &VenueId) -> Option<Credentials> {
        Some(Credentials {
            api_key: self.read(venue, "API_KEY")?,
            api_secret: self.read(venue, "API_SECRET")?,
            passphrase: self.read(venue, "PASSPHRASE"),
        })
    }
}
