//! Clock and randomness seen by the session controller.
//!
//! The controller never reads the system clock or the OS entropy pool
//! directly. The runtime hands it a [`Environment`]; the harness hands it a
//! seeded one, so a failing event sequence replays byte for byte.

use std::time::Instant;

/// Time and randomness source for one session.
///
/// `now()` must not go backwards. Production randomness feeds generated
/// passphrases and must come from the OS.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Current time.
    fn now(&self) -> Instant;

    /// Fill `buffer` with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Random `u64`, used as the session id in log spans.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }
}
