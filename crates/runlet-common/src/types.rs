//! Domain primitive types used across the runlet workspace.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::SHA256_HEX_LENGTH;
use crate::error::{Result, RunletError};

/// SHA-256 hash digest used for content verification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sha256Hash(String);

impl Sha256Hash {
    /// Creates a hash from a hex-encoded string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a valid 64-character hex string.
    pub fn from_hex(hex: impl Into<String>) -> Result<Self> {
        let hex = hex.into();
        if hex.len() != SHA256_HEX_LENGTH || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(RunletError::Config {
                message: format!("invalid SHA-256 hex string: {hex}"),
            });
        }
        Ok(Self(hex.to_ascii_lowercase()))
    }

    /// Parses an OCI content digest of the form `sha256:<hex>`.
    ///
    /// # Errors
    ///
    /// Returns an error for other algorithms or malformed hex.
    pub fn from_digest(digest: &str) -> Result<Self> {
        let Some(hex) = digest.strip_prefix("sha256:") else {
            return Err(RunletError::Config {
                message: format!("unsupported digest algorithm: {digest}"),
            });
        };
        Self::from_hex(hex)
    }

    /// Returns the hex-encoded hash string.
    #[must_use]
    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sha256Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sha256:{}", self.0)
    }
}
