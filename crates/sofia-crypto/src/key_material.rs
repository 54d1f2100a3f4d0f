//! Passphrase-derived key material.
//!
//! A session's media key is derived from the shared passphrase with
//! HKDF-SHA256. Every participant holding the same passphrase derives the
//! same key, so no key exchange is needed beyond sharing the room link.

use hkdf::Hkdf;
use sha2::Sha256;
use thiserror::Error;
use zeroize::Zeroizing;

/// Size of the derived frame key in bytes.
pub const KEY_SIZE: usize = 32;

/// Salt for passphrase extraction (domain separation).
const KEY_SALT: &[u8] = b"sofia e2ee salt v1";

/// Info label for frame key expansion.
const KEY_INFO: &[u8] = b"sofia e2ee frame key v1";

/// Errors from key derivation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// The passphrase was empty.
    #[error("passphrase must not be empty")]
    EmptyPassphrase,

    /// HKDF refused the requested output length.
    #[error("key derivation failed")]
    Derivation,
}

/// Symmetric key derived from a session passphrase.
///
/// The key bytes are only reachable inside this crate. The `Debug` impl
/// redacts them and the buffer is zeroized on drop.
pub struct KeyMaterial {
    key: Zeroizing<[u8; KEY_SIZE]>,
}

impl KeyMaterial {
    /// Derive key material from raw passphrase bytes.
    pub fn derive(passphrase: &[u8]) -> Result<Self, KeyError> {
        if passphrase.is_empty() {
            return Err(KeyError::EmptyPassphrase);
        }

        let hkdf = Hkdf::<Sha256>::new(Some(KEY_SALT), passphrase);
        let mut key = Zeroizing::new([0u8; KEY_SIZE]);
        hkdf.expand(KEY_INFO, key.as_mut_slice()).map_err(|_| KeyError::Derivation)?;

        Ok(Self { key })
    }

    pub(crate) fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.key
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial").field("key", &"<redacted>").finish()
    }
}
