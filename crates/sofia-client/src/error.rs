//! Client error types.
//!
//! Raw collaborator failures are converted to these at the runtime boundary;
//! the controller only ever sees their diagnostics.

use sofia_core::{EncryptionSetupError, ParseCodecError};
use sofia_crypto::{FrameError, KeyError, PassphraseError};
use thiserror::Error;

/// Errors raised by a media transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The runtime lacks the requested capability.
    #[error("not supported: {0}")]
    Unsupported(String),

    /// Connecting to the media server failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// A capture device could not be used.
    #[error("device error: {0}")]
    Device(String),

    /// The transport has been closed.
    #[error("transport closed")]
    Closed,

    /// Any other failure.
    #[error("{0}")]
    Other(String),
}

impl From<TransportError> for EncryptionSetupError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Unsupported(diagnostic) => Self::Unsupported(diagnostic),
            other => Self::Failed(other.to_string()),
        }
    }
}

/// Errors raised by a key provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyProviderError {
    /// No key has been installed yet.
    #[error("no key installed")]
    NoKey,

    /// Deriving the key failed.
    #[error(transparent)]
    Key(#[from] KeyError),

    /// Sealing or opening a frame failed.
    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Errors fetching connection details.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The endpoint URL could not be built.
    #[error("invalid endpoint: {0}")]
    Endpoint(String),

    /// The request did not complete.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("endpoint returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },
}

/// Errors controlling server-side recording.
#[derive(Debug, Error)]
pub enum RecordingError {
    /// Recording of encrypted rooms is refused locally.
    #[error("recording of encrypted meetings is currently not supported")]
    EncryptedRoom,

    /// A start or stop request is already in flight.
    #[error("a recording request is already in progress")]
    InProgress,

    /// The recording endpoint URL could not be built.
    #[error("invalid recording endpoint: {0}")]
    Endpoint(String),

    /// The request did not complete.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The endpoint rejected the request.
    #[error("recording request rejected with status {status}")]
    Rejected {
        /// HTTP status code.
        status: u16,
    },
}

/// Errors parsing or building room links.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntryError {
    /// Not a URL.
    #[error("invalid url: {0}")]
    Url(String),

    /// The path is not `/rooms/{room}`.
    #[error("not a room link: {0}")]
    NotARoom(String),

    /// The room segment does not decode to UTF-8.
    #[error("room name is not valid UTF-8: {0}")]
    RoomName(String),

    /// Unknown `codec` query value.
    #[error(transparent)]
    Codec(#[from] ParseCodecError),

    /// The fragment is not a valid passphrase.
    #[error(transparent)]
    Passphrase(#[from] PassphraseError),
}

impl EntryError {
    /// Returns true if the problem is in the link the user supplied, as
    /// opposed to the application origin.
    pub fn is_user_input(&self) -> bool {
        !matches!(self, Self::Url(_))
    }
}

/// Errors in process configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The application origin is not an absolute URL.
    #[error("invalid origin {origin:?}: {reason}")]
    Origin {
        /// Configured value.
        origin: String,
        /// Parse diagnostic.
        reason: String,
    },

    /// An endpoint could not be resolved against the origin.
    #[error("invalid endpoint {endpoint:?}: {reason}")]
    Endpoint {
        /// Configured value.
        endpoint: String,
        /// Parse diagnostic.
        reason: String,
    },

    /// The recording endpoint is not configured.
    #[error("no recording endpoint configured")]
    NoRecordingEndpoint,
}

/// Errors driving a session.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The session task is gone.
    #[error("session runtime stopped")]
    Stopped,

    /// The controller rejected an input.
    #[error(transparent)]
    Session(#[from] sofia_core::SessionError),

    /// Configuration problem.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
