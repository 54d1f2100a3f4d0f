//! Session passphrases and their URL fragment encoding.
//!
//! The passphrase rides in the fragment of the room link (`#...`), which
//! browsers and HTTP clients never send to a server. It is encoded as
//! unpadded base64url so that arbitrary UTF-8 survives copy/paste.

use base64::{
    Engine,
    engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD},
};
use thiserror::Error;
use zeroize::Zeroizing;

/// Length of generated passphrases.
pub const PASSPHRASE_LENGTH: usize = 64;

const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Errors from passphrase handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PassphraseError {
    /// The passphrase was empty.
    #[error("passphrase must not be empty")]
    Empty,

    /// The fragment is not valid base64url.
    #[error("invalid passphrase encoding: {reason}")]
    Encoding {
        /// Decoder diagnostic.
        reason: String,
    },

    /// The decoded bytes are not UTF-8.
    #[error("passphrase is not valid UTF-8")]
    InvalidUtf8,
}

/// Shared E2EE passphrase.
///
/// # Security
///
/// - **Debug Redaction**: the `Debug` impl prints only the length.
/// - **Zeroize**: the backing string is wiped on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct Passphrase(Zeroizing<String>);

impl Passphrase {
    /// Wrap a passphrase. Empty passphrases are rejected.
    pub fn new(passphrase: impl Into<String>) -> Result<Self, PassphraseError> {
        let passphrase = passphrase.into();
        if passphrase.is_empty() {
            return Err(PassphraseError::Empty);
        }
        Ok(Self(Zeroizing::new(passphrase)))
    }

    /// Decode a passphrase from a URL fragment.
    ///
    /// A leading `#` is ignored. An empty fragment means the room is not
    /// encrypted and yields `Ok(None)`.
    pub fn from_fragment(fragment: &str) -> Result<Option<Self>, PassphraseError> {
        let encoded = fragment.strip_prefix('#').unwrap_or(fragment);
        if encoded.is_empty() {
            return Ok(None);
        }

        let decoded = if encoded.ends_with('=') {
            URL_SAFE.decode(encoded)
        } else {
            URL_SAFE_NO_PAD.decode(encoded)
        }
        .map_err(|e| PassphraseError::Encoding { reason: e.to_string() })?;

        let passphrase = String::from_utf8(decoded).map_err(|_| PassphraseError::InvalidUtf8)?;
        Self::new(passphrase).map(Some)
    }

    /// Encode for use as a URL fragment (without the leading `#`).
    pub fn to_fragment(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.0.as_bytes())
    }

    /// Raw passphrase bytes, as fed into key derivation.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Passphrase length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; empty passphrases cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Passphrase(<redacted {} bytes>)", self.0.len())
    }
}

/// Map random bytes onto `[A-Za-z0-9]`, one character per byte.
pub fn random_alphanumeric(random: &[u8]) -> String {
    random.iter().map(|b| char::from(ALPHANUMERIC[usize::from(*b) % ALPHANUMERIC.len()])).collect()
}

/// Generate a fresh passphrase from caller-provided randomness.
pub fn generate_passphrase(random: &[u8; PASSPHRASE_LENGTH]) -> Passphrase {
    Passphrase(Zeroizing::new(random_alphanumeric(random)))
}
