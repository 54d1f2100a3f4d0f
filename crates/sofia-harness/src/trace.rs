//! Shared call trace for simulated collaborators.
//!
//! Every simulated collaborator records the calls it receives into one
//! trace, so tests can assert on cross-collaborator ordering (for example,
//! that `connect` never happens before the key is installed).

use std::sync::{Arc, Mutex, PoisonError};

use sofia_core::MediaDevice;

/// One call received by a simulated collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// Connection details requested.
    Resolve {
        /// Room name.
        room_name: String,
        /// Participant name.
        participant_name: String,
    },
    /// Key provider `set_key` started.
    SetKeyStarted,
    /// Key provider `set_key` resolved successfully.
    SetKeyResolved,
    /// Transport event subscription registered.
    Subscribe,
    /// Transport encryption toggled.
    SetE2eeEnabled(bool),
    /// Transport connect.
    Connect {
        /// Server URL.
        server_url: String,
        /// Whether the room was built with encryption.
        e2ee: bool,
    },
    /// Device publish.
    Publish(MediaDevice),
    /// Transport disconnect.
    Disconnect,
    /// Statistics sample.
    PublishStats,
    /// Quality profile staged.
    StageQualityProfile,
}

/// Ordered record of collaborator calls.
#[derive(Debug, Clone, Default)]
pub struct CallTrace {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl CallTrace {
    /// Create an empty trace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a call.
    pub fn record(&self, call: Call) {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(call);
    }

    /// Snapshot of all calls so far.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of calls matching a predicate.
    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|call| predicate(call)).count()
    }

    /// Index of the first call matching a predicate.
    pub fn position(&self, predicate: impl Fn(&Call) -> bool) -> Option<usize> {
        self.calls().iter().position(predicate)
    }

    /// Whether any connect call was made.
    pub fn connected(&self) -> bool {
        self.position(|call| matches!(call, Call::Connect { .. })).is_some()
    }

    /// Whether the key provider was touched at all.
    pub fn key_provider_used(&self) -> bool {
        self.position(|call| matches!(call, Call::SetKeyStarted)).is_some()
    }
}
