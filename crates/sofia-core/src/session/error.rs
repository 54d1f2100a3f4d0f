//! Session error types.

use thiserror::Error;

use super::types::MediaDevice;

/// How an error is presented and whether the user can fix it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad input the user can correct and resubmit.
    RecoverableInput,
    /// Network failure; surfaced, not retried automatically.
    TransientNetwork,
    /// The runtime lacks a capability (encryption, device access).
    DeviceCapability,
    /// The session cannot continue.
    ProtocolFatal,
}

/// Errors surfaced by the session controller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Pre-join choices were rejected.
    #[error("invalid choices: {reason}")]
    InvalidChoices {
        /// What is wrong with the choices.
        reason: String,
    },

    /// The endpoint answered with unusable connection details.
    #[error("invalid connection details: {reason}")]
    InvalidConnectionDetails {
        /// What is wrong with the details.
        reason: String,
    },

    /// Fetching connection details failed.
    #[error("connection details unavailable: {reason}")]
    ConnectionDetails {
        /// Transport or HTTP diagnostic.
        reason: String,
    },

    /// The transport connect call failed.
    #[error("connect failed: {reason}")]
    Connect {
        /// Transport diagnostic.
        reason: String,
    },

    /// The runtime cannot encrypt media.
    #[error("encryption unsupported: {diagnostic}")]
    EncryptionUnsupported {
        /// Transport diagnostic.
        diagnostic: String,
    },

    /// Installing the passphrase-derived key failed.
    #[error("key installation failed: {reason}")]
    KeyInstall {
        /// Key provider diagnostic.
        reason: String,
    },

    /// The transport refused to enable encryption.
    #[error("enabling encryption failed: {reason}")]
    EncryptionSetup {
        /// Transport diagnostic.
        reason: String,
    },

    /// Frame encryption failed after connecting.
    #[error("encryption error: {diagnostic}")]
    Encryption {
        /// Raw diagnostic from the transport.
        diagnostic: String,
    },

    /// A capture device reported an error.
    #[error("media device error: {diagnostic}")]
    MediaDevice {
        /// Raw diagnostic from the transport.
        diagnostic: String,
    },

    /// Publishing a local track failed.
    #[error("publishing {device} failed: {reason}")]
    Publish {
        /// Device that failed.
        device: MediaDevice,
        /// Transport diagnostic.
        reason: String,
    },
}

impl SessionError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidChoices { .. } | Self::InvalidConnectionDetails { .. } => {
                ErrorKind::RecoverableInput
            },
            Self::ConnectionDetails { .. } | Self::Connect { .. } => ErrorKind::TransientNetwork,
            Self::EncryptionUnsupported { .. } | Self::MediaDevice { .. } | Self::Publish { .. } => {
                ErrorKind::DeviceCapability
            },
            Self::KeyInstall { .. } | Self::EncryptionSetup { .. } | Self::Encryption { .. } => {
                ErrorKind::ProtocolFatal
            },
        }
    }

    /// Returns true if the error blocks the session and returns the user to
    /// the entry screen.
    ///
    /// Capability errors block only when they concern encryption; a missing
    /// camera or microphone is a soft warning.
    pub fn is_blocking(&self) -> bool {
        match self.kind() {
            ErrorKind::ProtocolFatal => true,
            ErrorKind::DeviceCapability => matches!(self, Self::EncryptionUnsupported { .. }),
            ErrorKind::RecoverableInput | ErrorKind::TransientNetwork => false,
        }
    }

    /// Returns true if the user can correct the problem and resubmit.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::RecoverableInput | ErrorKind::TransientNetwork)
    }

    /// Message for the participant.
    pub fn user_message(&self) -> String {
        match self {
            Self::EncryptionUnsupported { .. } => "You're trying to join an encrypted meeting, but \
                                                  your runtime does not support it. Please update \
                                                  it to the latest version and try again."
                .to_string(),
            Self::Encryption { diagnostic } => format!(
                "Encountered an unexpected encryption error, check the logs for details: \
                 {diagnostic}"
            ),
            Self::InvalidChoices { reason } => format!("Please check your details: {reason}"),
            other => format!(
                "Encountered an unexpected error, check the logs for details: {other}"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_details_failure_is_retryable() {
        let err = SessionError::ConnectionDetails { reason: "timeout".to_string() };
        assert!(err.is_retryable());
        assert!(!err.is_blocking());
    }

    #[test]
    fn unsupported_encryption_blocks() {
        let err = SessionError::EncryptionUnsupported { diagnostic: "no insertable streams".into() };
        assert_eq!(err.kind(), ErrorKind::DeviceCapability);
        assert!(err.is_blocking());
    }

    #[test]
    fn media_device_error_is_soft() {
        let err = SessionError::MediaDevice { diagnostic: "permission denied".to_string() };
        assert_eq!(err.kind(), ErrorKind::DeviceCapability);
        assert!(!err.is_blocking());
    }

    #[test]
    fn encryption_error_keeps_raw_diagnostic() {
        let err = SessionError::Encryption { diagnostic: "decrypt failed: bad tag".to_string() };
        assert!(err.is_blocking());
        assert!(err.user_message().contains("decrypt failed: bad tag"));
    }

    #[test]
    fn error_display() {
        let err =
            SessionError::Publish { device: MediaDevice::Camera, reason: "busy".to_string() };
        assert_eq!(err.to_string(), "publishing camera failed: busy");
    }
}
