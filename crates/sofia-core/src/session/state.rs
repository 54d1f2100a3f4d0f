//! Session lifecycle states.

use std::fmt;

/// Why a session attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminationReason {
    /// The user left.
    UserLeft,
    /// The media server closed the connection.
    Disconnected,
    /// The connect call failed.
    ConnectError,
    /// The runtime cannot encrypt media.
    EncryptionUnsupported,
    /// Key installation or frame encryption failed.
    EncryptionError,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::UserLeft => "user left",
            Self::Disconnected => "disconnected",
            Self::ConnectError => "connect error",
            Self::EncryptionUnsupported => "encryption unsupported",
            Self::EncryptionError => "encryption error",
        };
        f.write_str(reason)
    }
}

/// Lifecycle state of one session attempt.
///
/// ```text
/// AwaitingChoices ─submit─> AwaitingConnectionDetails ─resolved─> PreparingEncryption
///                                 ▲        │ fail                        │ ready
///                                 └────────┘                             ▼
///           Active <─(always)─ Publishing <─ok─ Connecting <────────────┘
///             │                                   │ fail
///             ▼                                   ▼
///        Terminating ──teardown complete──> Terminated(reason)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Waiting for the pre-join form.
    AwaitingChoices,
    /// Fetching server URL and token.
    AwaitingConnectionDetails,
    /// Installing key material and enabling transport encryption.
    PreparingEncryption,
    /// Transport connect in flight.
    Connecting,
    /// Connected; local tracks being published.
    Publishing,
    /// In the call.
    Active,
    /// Transport disconnect in flight.
    Terminating(TerminationReason),
    /// Attempt over. Terminal.
    Terminated(TerminationReason),
}

impl SessionState {
    /// Whether no further transitions can happen.
    pub fn is_terminated(&self) -> bool {
        matches!(self, Self::Terminated(_))
    }

    /// Whether teardown has started or finished.
    pub fn is_ending(&self) -> bool {
        matches!(self, Self::Terminating(_) | Self::Terminated(_))
    }

    /// Whether a transport connection has been established.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Publishing | Self::Active)
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AwaitingChoices => "awaiting_choices",
            Self::AwaitingConnectionDetails => "awaiting_connection_details",
            Self::PreparingEncryption => "preparing_encryption",
            Self::Connecting => "connecting",
            Self::Publishing => "publishing",
            Self::Active => "active",
            Self::Terminating(_) => "terminating",
            Self::Terminated(_) => "terminated",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Terminating(reason) | Self::Terminated(reason) => {
                write!(f, "{} ({reason})", self.name())
            },
            _ => f.write_str(self.name()),
        }
    }
}
