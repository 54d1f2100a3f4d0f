//! Session configuration.
//!
//! Everything the controller needs to know about the room and the process is
//! passed in here at construction. Nothing is read from global state.

use crate::{
    monitor::MonitorConfig,
    quality::{QualityProfile, QualityRequest, VideoCodec},
    session::EncryptionConfig,
};

/// Configuration for one session attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Room to join.
    pub room_name: String,
    /// Preferred media region, forwarded to the connection-details endpoint.
    pub region: Option<String>,
    /// Room link asked for high quality capture.
    pub high_quality: bool,
    /// Codec requested by the room link.
    pub codec: Option<VideoCodec>,
    /// End-to-end encryption settings.
    pub encryption: EncryptionConfig,
    /// Whether the device settings panel is shown.
    pub show_settings_menu: bool,
    /// Performance monitor tuning.
    pub monitor: MonitorConfig,
}

impl SessionConfig {
    /// Configuration for an unencrypted room with default quality.
    pub fn new(room_name: impl Into<String>) -> Self {
        Self {
            room_name: room_name.into(),
            region: None,
            high_quality: false,
            codec: None,
            encryption: EncryptionConfig::disabled(),
            show_settings_menu: false,
            monitor: MonitorConfig::default(),
        }
    }

    /// Set the encryption settings.
    #[must_use]
    pub fn with_encryption(mut self, encryption: EncryptionConfig) -> Self {
        self.encryption = encryption;
        self
    }

    /// Set the preferred region.
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Quality profile for the given degrade signal.
    pub fn quality_profile(&self, degraded: bool) -> QualityProfile {
        QualityProfile::compute(&QualityRequest {
            high_quality: self.high_quality,
            codec: self.codec,
            encryption_enabled: self.encryption.enabled(),
            degraded,
        })
    }
}
