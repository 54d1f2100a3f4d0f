//! Events fed into the controller and actions it produces.

use sofia_crypto::Passphrase;

use super::{
    error::{ErrorKind, SessionError},
    types::{
        ConnectOptions, ConnectionDetails, ConnectionDetailsRequest, MediaDevice,
        ParticipantChoices, RequestId, RoomOptions,
    },
};
use crate::{monitor::PublishStats, quality::QualityProfile};

/// Asynchronous events raised by the media transport.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The connection closed.
    Disconnected {
        /// Server-supplied reason, if any.
        reason: Option<String>,
    },
    /// Frame encryption or decryption failed.
    EncryptionError {
        /// Raw diagnostic.
        diagnostic: String,
    },
    /// A capture device failed (permission denied, device busy, ...).
    MediaDevicesError {
        /// Raw diagnostic.
        diagnostic: String,
    },
    /// Server-side recording started or stopped.
    RecordingStatusChanged {
        /// Whether the room is being recorded now.
        recording: bool,
    },
    /// The local encoder reported CPU pressure.
    CpuConstrained,
}

/// Why enabling transport encryption failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncryptionSetupError {
    /// The runtime has no support for encrypted media.
    Unsupported(String),
    /// Any other failure.
    Failed(String),
}

/// Events fed into the [`SessionController`](super::SessionController).
///
/// Intents come from the UI; completions report the outcome of an action
/// the controller asked for earlier.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Pre-join form submitted.
    SubmitChoices(ParticipantChoices),
    /// Connection-details request completed.
    ConnectionDetailsResolved {
        /// Request being answered.
        request: RequestId,
        /// Details, or a diagnostic.
        result: Result<ConnectionDetails, String>,
    },
    /// Key provider finished installing the key.
    KeyInstalled(Result<(), String>),
    /// Transport finished enabling encryption.
    EncryptionEnabled(Result<(), EncryptionSetupError>),
    /// Transport connect finished.
    Connected(Result<(), String>),
    /// A publish call finished.
    Published {
        /// Device that was published.
        device: MediaDevice,
        /// Outcome.
        result: Result<(), String>,
    },
    /// Transport event delivered through the subscription.
    Transport(TransportEvent),
    /// Publishing statistics sample; `None` when the sample failed.
    StatsSampled(Option<PublishStats>),
    /// Transport disconnect finished.
    TeardownComplete,
    /// User left.
    Leave,
}

/// How prominently a notification is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// Informational notice.
    Info,
    /// Correctable message next to the form.
    Inline,
    /// Non-blocking warning.
    Warning,
    /// Blocking dialog; the user returns to the entry screen.
    Blocking,
}

/// User-visible notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Presentation.
    pub severity: Severity,
    /// Error class, for error notifications.
    pub kind: Option<ErrorKind>,
    /// Text for the participant.
    pub message: String,
}

impl Notification {
    /// Informational notice.
    pub fn info(message: impl Into<String>) -> Self {
        Self { severity: Severity::Info, kind: None, message: message.into() }
    }
}

impl From<&SessionError> for Notification {
    fn from(error: &SessionError) -> Self {
        let severity = if error.is_blocking() {
            Severity::Blocking
        } else if error.is_retryable() {
            Severity::Inline
        } else {
            Severity::Warning
        };

        Self { severity, kind: Some(error.kind()), message: error.user_message() }
    }
}

/// Actions for the caller to execute.
#[derive(Debug, Clone)]
pub enum SessionAction {
    /// Fetch connection details.
    ResolveConnectionDetails(ConnectionDetailsRequest),
    /// Register transport event handlers. Always precedes `Connect`.
    Subscribe,
    /// Install the passphrase into the key provider.
    InstallKey(Passphrase),
    /// Ask the transport to encrypt media.
    EnableEncryption,
    /// Open the transport connection.
    Connect {
        /// Media server URL.
        server_url: String,
        /// Authorization token.
        participant_token: String,
        /// Connect options.
        options: ConnectOptions,
        /// Room construction options.
        room: RoomOptions,
    },
    /// Publish a local device.
    Publish {
        /// Device to publish.
        device: MediaDevice,
        /// Selected device id, if not the default.
        device_id: Option<String>,
    },
    /// Close the transport connection.
    Disconnect,
    /// Dispose the event subscription.
    Unsubscribe,
    /// Show a notification.
    Notify(Notification),
    /// A recomputed quality profile for the next renegotiation.
    StageQualityProfile(QualityProfile),
    /// Navigate back to the entry screen.
    ReturnToEntry,
}
