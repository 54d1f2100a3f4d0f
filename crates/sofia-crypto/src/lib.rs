//! Sofia Cryptographic Primitives
//!
//! This crate provides the end-to-end encryption building blocks for Sofia
//! media sessions.
//!
//! # Design
//!
//! All functions in this crate are pure - they have no side effects and
//! produce deterministic outputs given the same inputs. Random bytes required
//! for nonces or generated passphrases must be provided by the caller,
//! enabling:
//!
//! - Deterministic testing with seeded RNG
//! - Sans-IO architecture compatibility
//! - No coupling to application-level abstractions
//!
//! # Security Properties
//!
//! - Write-only keys: [`KeyMaterial`] never hands its bytes back out; callers
//!   seal and open frames through a [`FrameCryptor`]
//! - Key hygiene: key bytes and passphrases are zeroized on drop
//! - Passphrase secrecy: passphrases travel in URL fragments, which are never
//!   sent to a server

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod frame;
pub mod key_material;
pub mod passphrase;

pub use frame::{EncryptedFrame, FrameCryptor, FrameError, NONCE_SIZE};
pub use key_material::{KEY_SIZE, KeyError, KeyMaterial};
pub use passphrase::{
    PASSPHRASE_LENGTH, Passphrase, PassphraseError, generate_passphrase, random_alphanumeric,
};
