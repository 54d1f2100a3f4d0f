//! Fuzz target for media frame authentication
//!
//! Frames from remote participants are attacker-controlled bytes.
//!
//! # Invariants
//!
//! - `FrameCryptor::open` NEVER panics on arbitrary input
//! - A frame sealed under one passphrase NEVER opens under another
//! - Any single-bit change to a sealed frame is rejected

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sofia_crypto::{EncryptedFrame, FrameCryptor, KeyMaterial, NONCE_SIZE};

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    passphrase: Vec<u8>,
    other_passphrase: Vec<u8>,
    nonce: [u8; NONCE_SIZE],
    plaintext: Vec<u8>,
    /// Raw frame as it might arrive off the wire.
    garbage: Vec<u8>,
    /// Bit to flip in the sealed frame.
    flip: u16,
}

fuzz_target!(|input: FuzzInput| {
    let Ok(key) = KeyMaterial::derive(&input.passphrase) else {
        return;
    };
    let cryptor = FrameCryptor::new(&key);

    let _ = cryptor.open(&EncryptedFrame { nonce: input.nonce, ciphertext: input.garbage });

    let Ok(sealed) = cryptor.seal(&input.plaintext, input.nonce) else {
        return;
    };
    assert_eq!(cryptor.open(&sealed).as_deref(), Ok(input.plaintext.as_slice()));

    if input.other_passphrase != input.passphrase {
        if let Ok(other) = KeyMaterial::derive(&input.other_passphrase) {
            assert!(FrameCryptor::new(&other).open(&sealed).is_err(), "opened under wrong key");
        }
    }

    let mut tampered = sealed;
    let bit = usize::from(input.flip) % (tampered.ciphertext.len() * 8);
    tampered.ciphertext[bit / 8] ^= 1 << (bit % 8);
    assert!(cryptor.open(&tampered).is_err(), "tampered frame accepted");
});
