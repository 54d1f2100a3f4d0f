//! Session data model.

use std::fmt;

use serde::{Deserialize, Serialize};
use sofia_crypto::Passphrase;

use super::error::SessionError;
use crate::quality::QualityProfile;

/// URL schemes accepted for the media server.
const SERVER_URL_SCHEMES: [&str; 4] = ["wss://", "ws://", "https://", "http://"];

/// Choices made on the pre-join screen.
///
/// Immutable once submitted; a resubmission replaces the whole value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantChoices {
    /// Name shown to other participants.
    pub display_name: String,
    /// Publish the camera after connecting.
    pub video_enabled: bool,
    /// Publish the microphone after connecting.
    pub audio_enabled: bool,
    /// Selected camera, if not the default.
    pub video_device_id: Option<String>,
    /// Selected microphone, if not the default.
    pub audio_device_id: Option<String>,
}

impl ParticipantChoices {
    /// Choices with both devices enabled on their defaults.
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            video_enabled: true,
            audio_enabled: true,
            video_device_id: None,
            audio_device_id: None,
        }
    }

    /// Enable or disable the camera.
    #[must_use]
    pub fn with_video(mut self, enabled: bool) -> Self {
        self.video_enabled = enabled;
        self
    }

    /// Enable or disable the microphone.
    #[must_use]
    pub fn with_audio(mut self, enabled: bool) -> Self {
        self.audio_enabled = enabled;
        self
    }

    /// Check that the choices can start a session.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.display_name.trim().is_empty() {
            return Err(SessionError::InvalidChoices {
                reason: "display name must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Whether a device is enabled in these choices.
    pub fn enabled(&self, device: MediaDevice) -> bool {
        match device {
            MediaDevice::Camera => self.video_enabled,
            MediaDevice::Microphone => self.audio_enabled,
        }
    }

    /// Selected device id for a device, if any.
    pub fn device_id(&self, device: MediaDevice) -> Option<&str> {
        match device {
            MediaDevice::Camera => self.video_device_id.as_deref(),
            MediaDevice::Microphone => self.audio_device_id.as_deref(),
        }
    }
}

/// Media server coordinates returned by the connection-details endpoint.
///
/// # Security
///
/// - **Debug Redaction**: The `Debug` impl redacts `participant_token`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionDetails {
    /// Media server URL.
    pub server_url: String,
    /// Authorization token for this participant.
    pub participant_token: String,
    /// Room the token grants access to.
    pub room_name: String,
}

impl ConnectionDetails {
    /// Check that the details are usable for a connect attempt.
    pub fn validate(&self) -> Result<(), SessionError> {
        if !SERVER_URL_SCHEMES.iter().any(|scheme| self.server_url.starts_with(scheme)) {
            return Err(SessionError::InvalidConnectionDetails {
                reason: format!("unsupported server url: {:?}", self.server_url),
            });
        }
        if self.participant_token.is_empty() {
            return Err(SessionError::InvalidConnectionDetails {
                reason: "participant token is empty".to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for ConnectionDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDetails")
            .field("server_url", &self.server_url)
            .field(
                "participant_token",
                &format!("<redacted {} bytes>", self.participant_token.len()),
            )
            .field("room_name", &self.room_name)
            .finish()
    }
}

/// Identifies one connection-details request.
///
/// A resolution is only applied if it answers the request that is currently
/// outstanding; answers to superseded requests are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Request for the connection-details endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionDetailsRequest {
    /// Request identity.
    pub id: RequestId,
    /// Room to join.
    pub room_name: String,
    /// Participant display name.
    pub participant_name: String,
    /// Preferred media region.
    pub region: Option<String>,
}

/// End-to-end encryption settings for a session.
///
/// Derived from the room link's fragment. Fixed for the lifetime of the
/// session; a new passphrase needs a new session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EncryptionConfig {
    passphrase: Option<Passphrase>,
}

impl EncryptionConfig {
    /// Encryption disabled.
    pub fn disabled() -> Self {
        Self { passphrase: None }
    }

    /// Encryption enabled with the given passphrase.
    pub fn with_passphrase(passphrase: Passphrase) -> Self {
        Self { passphrase: Some(passphrase) }
    }

    /// Whether media must be encrypted.
    pub fn enabled(&self) -> bool {
        self.passphrase.is_some()
    }

    /// The shared passphrase, if encryption is enabled.
    pub fn passphrase(&self) -> Option<&Passphrase> {
        self.passphrase.as_ref()
    }
}

/// Local capture devices that can be published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaDevice {
    /// Camera track.
    Camera,
    /// Microphone track.
    Microphone,
}

impl MediaDevice {
    /// Both devices, camera first.
    pub const ALL: [Self; 2] = [Self::Camera, Self::Microphone];
}

impl fmt::Display for MediaDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Camera => f.write_str("camera"),
            Self::Microphone => f.write_str("microphone"),
        }
    }
}

/// Outcome of publishing one local device.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PublishStatus {
    /// Not requested (device disabled, or not yet connected).
    #[default]
    Skipped,
    /// Publish call in flight.
    Pending,
    /// Track is live.
    Published,
    /// Publish failed; the session continues without this track.
    Failed {
        /// Diagnostic from the transport.
        reason: String,
    },
}

impl PublishStatus {
    /// Whether the publish call has not completed yet.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// Options for the transport connect call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Subscribe to all remote media automatically.
    pub auto_subscribe: bool,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self { auto_subscribe: true }
    }
}

/// Room construction options handed to the transport with the connect call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomOptions {
    /// Capture and publish quality.
    pub quality: QualityProfile,
    /// Camera to capture from.
    pub video_device_id: Option<String>,
    /// Microphone to capture from.
    pub audio_device_id: Option<String>,
    /// Subscribe to remote video at the resolution it is rendered at.
    pub adaptive_stream: bool,
    /// Pause publishing layers nobody subscribes to.
    pub dynacast: bool,
    /// Media frames are end-to-end encrypted.
    pub e2ee: bool,
}
