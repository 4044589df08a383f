//! Reversible XOR + base64 obfuscation for remembered passwords.
//!
//! This is NOT encryption. It keeps a password from being readable at a
//! glance in client storage; anyone holding the application secret (which
//! ships with the client) can reverse it.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use thiserror::Error;

/// Secret baked into the client. Changing it invalidates every stored
/// password, which then decodes to garbage and gets purged.
pub const DEFAULT_SECRET: &str = "cvforge-remember-me-v1";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ObfuscationError {
    #[error("Obfuscation secret must not be empty")]
    EmptySecret,

    #[error("Stored value is not valid base64: {0}")]
    Base64(String),

    #[error("Decoded value is not valid UTF-8")]
    Utf8,
}

#[derive(Clone)]
pub struct Obfuscator {
    key: Vec<u8>,
}

impl std::fmt::Debug for Obfuscator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Obfuscator")
            .field("key_len", &self.key.len())
            .finish()
    }
}

impl Default for Obfuscator {
    fn default() -> Self {
        Self {
            key: DEFAULT_SECRET.as_bytes().to_vec(),
        }
    }
}

impl Obfuscator {
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, ObfuscationError> {
        let key = secret.as_ref().to_vec();
        if key.is_empty() {
            return Err(ObfuscationError::EmptySecret);
        }
        Ok(Self { key })
    }

    pub fn encode(&self, plain: &str) -> String {
        STANDARD.encode(self.xor(plain.as_bytes()))
    }

    pub fn decode(&self, encoded: &str) -> Result<String, ObfuscationError> {
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| ObfuscationError::Base64(e.to_string()))?;
        String::from_utf8(self.xor(&bytes)).map_err(|_| ObfuscationError::Utf8)
    }

    fn xor(&self, data: &[u8]) -> Vec<u8> {
        data.iter()
            .zip(self.key.iter().cycle())
            .map(|(b, k)| b ^ k)
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
