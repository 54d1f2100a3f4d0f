//! [`Environment`] backed by the host.

use std::time::Instant;

use sofia_core::Environment;

/// Host clock and OS randomness.
///
/// Randomness comes from `getrandom`; generated room ids and passphrases
/// depend on it, so a failing entropy source aborts instead of degrading.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a host environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        if let Err(e) = getrandom::fill(buffer) {
            tracing::error!(error = %e, "OS entropy unavailable");
            std::process::abort();
        }
    }
}
