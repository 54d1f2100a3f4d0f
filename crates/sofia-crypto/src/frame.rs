//! Media frame encryption.
//!
//! Frames are sealed with XChaCha20-Poly1305 under the session key. The
//! 24-byte nonce is supplied by the caller and is large enough to be drawn at
//! random per frame without tracking counters.

use chacha20poly1305::{
    Key, XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit},
};
use thiserror::Error;

use crate::key_material::KeyMaterial;

/// Size of the XChaCha20 nonce in bytes.
pub const NONCE_SIZE: usize = 24;

/// Errors from frame sealing and opening.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Encryption failed.
    #[error("frame encryption failed")]
    Seal,

    /// Authentication failed (wrong key or tampered frame).
    #[error("frame authentication failed")]
    Open,
}

/// An encrypted media frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedFrame {
    /// Nonce used for this frame.
    pub nonce: [u8; NONCE_SIZE],
    /// Ciphertext with the Poly1305 tag appended.
    pub ciphertext: Vec<u8>,
}

/// Seals and opens frames under one session key.
pub struct FrameCryptor {
    cipher: XChaCha20Poly1305,
}

impl FrameCryptor {
    /// Create a cryptor bound to the given key material.
    pub fn new(key: &KeyMaterial) -> Self {
        Self { cipher: XChaCha20Poly1305::new(Key::from_slice(key.as_bytes())) }
    }

    /// Encrypt a frame payload.
    pub fn seal(
        &self,
        plaintext: &[u8],
        nonce: [u8; NONCE_SIZE],
    ) -> Result<EncryptedFrame, FrameError> {
        let ciphertext = self
            .cipher
            .encrypt(XNonce::from_slice(&nonce), plaintext)
            .map_err(|_| FrameError::Seal)?;

        Ok(EncryptedFrame { nonce, ciphertext })
    }

    /// Decrypt and authenticate a frame.
    pub fn open(&self, frame: &EncryptedFrame) -> Result<Vec<u8>, FrameError> {
        self.cipher
            .decrypt(XNonce::from_slice(&frame.nonce), frame.ciphertext.as_slice())
            .map_err(|_| FrameError::Open)
    }
}

impl std::fmt::Debug for FrameCryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameCryptor").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn cryptor(passphrase: &[u8]) -> FrameCryptor {
        FrameCryptor::new(&KeyMaterial::derive(passphrase).expect("derive"))
    }

    #[test]
    fn ciphertext_differs_from_plaintext() {
        let frame = cryptor(b"room secret").seal(b"keyframe", [7u8; NONCE_SIZE]).expect("seal");
        assert_ne!(frame.ciphertext.as_slice(), b"keyframe");
    }

    #[test]
    fn wrong_passphrase_cannot_open() {
        let frame = cryptor(b"room secret").seal(b"keyframe", [7u8; NONCE_SIZE]).expect("seal");
        assert_eq!(cryptor(b"other secret").open(&frame), Err(FrameError::Open));
    }

    #[test]
    fn tampered_frame_rejected() {
        let sealer = cryptor(b"room secret");
        let mut frame = sealer.seal(b"keyframe", [1u8; NONCE_SIZE]).expect("seal");
        frame.ciphertext[0] ^= 0xff;
        assert_eq!(sealer.open(&frame), Err(FrameError::Open));
    }

    proptest! {
        #[test]
        fn participants_sharing_a_passphrase_interoperate(
            passphrase in proptest::collection::vec(any::<u8>(), 1..64),
            payload in proptest::collection::vec(any::<u8>(), 0..512),
            nonce in any::<[u8; NONCE_SIZE]>(),
        ) {
            let sender = cryptor(&passphrase);
            let receiver = cryptor(&passphrase);

            let frame = sender.seal(&payload, nonce).expect("seal");
            prop_assert_eq!(receiver.open(&frame).expect("open"), payload);
        }
    }
}
