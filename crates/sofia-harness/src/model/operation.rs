//! Operations for model-based testing.
//!
//! Operations cover every input a session can see: user intents, collaborator
//! completions, transport events and statistics samples. They are generated
//! by proptest (or the fuzzer) in arbitrary order, so most of them arrive in
//! states where they do not apply.

use arbitrary::Arbitrary;
use sofia_core::{
    ConnectionDetails, EncryptionSetupError, MediaDevice, ParticipantChoices, PublishStats,
    QualityLimitation, RequestId, SessionEvent, TransportEvent,
};

/// Local device, as generated by the fuzzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Arbitrary)]
pub enum ModelDevice {
    /// Camera.
    Camera,
    /// Microphone.
    Microphone,
}

impl From<ModelDevice> for MediaDevice {
    fn from(device: ModelDevice) -> Self {
        match device {
            ModelDevice::Camera => Self::Camera,
            ModelDevice::Microphone => Self::Microphone,
        }
    }
}

/// Outcome of enabling transport encryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Arbitrary)]
pub enum EncryptionOutcome {
    /// Enabled.
    Ok,
    /// The runtime cannot encrypt media.
    Unsupported,
    /// Any other failure.
    Failed,
}

/// One statistics sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Arbitrary)]
pub enum StatsSample {
    /// Encoder is CPU bound.
    Constrained,
    /// Encoder keeps up.
    Healthy,
    /// Sampling failed.
    Failed,
}

/// Inputs that can be applied to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Arbitrary)]
pub enum Operation {
    /// Submit the pre-join form.
    Submit {
        /// Display name is blank.
        blank_name: bool,
        /// Camera enabled.
        video: bool,
        /// Microphone enabled.
        audio: bool,
    },

    /// Answer the most recently issued details request.
    ResolveDetails {
        /// Request succeeded.
        ok: bool,
        /// Returned details pass validation.
        valid: bool,
    },

    /// Answer a request that is no longer outstanding.
    ResolveStale,

    /// Key provider finished.
    KeyInstalled {
        /// Key installed.
        ok: bool,
    },

    /// Transport finished enabling encryption.
    EncryptionEnabled(EncryptionOutcome),

    /// Transport connect finished.
    Connected {
        /// Connected.
        ok: bool,
    },

    /// A publish call finished.
    Published {
        /// Device published.
        device: ModelDevice,
        /// Publish succeeded.
        ok: bool,
    },

    /// Remote disconnect.
    Disconnected,

    /// Frame encryption failure.
    EncryptionFailure,

    /// Capture device failure.
    MediaDevicesFailure,

    /// Recording status changed.
    RecordingChanged {
        /// Recording now.
        recording: bool,
    },

    /// Transport reported CPU pressure.
    CpuConstrained,

    /// Statistics sample taken.
    Stats(StatsSample),

    /// Transport disconnect finished.
    TeardownComplete,

    /// User left.
    Leave,
}

impl Operation {
    /// Controller event for this operation.
    ///
    /// `latest` is the id of the most recently issued details request, or
    /// `RequestId(0)` if none was issued.
    pub fn to_event(self, latest: RequestId) -> SessionEvent {
        match self {
            Self::Submit { blank_name, video, audio } => {
                let name = if blank_name { "  " } else { "Ana" };
                SessionEvent::SubmitChoices(
                    ParticipantChoices::new(name).with_video(video).with_audio(audio),
                )
            },
            Self::ResolveDetails { ok, valid } => SessionEvent::ConnectionDetailsResolved {
                request: latest,
                result: if ok { Ok(details(valid)) } else { Err("unreachable".to_string()) },
            },
            Self::ResolveStale => SessionEvent::ConnectionDetailsResolved {
                request: RequestId(latest.0.wrapping_sub(1)),
                result: Ok(details(true)),
            },
            Self::KeyInstalled { ok } => {
                SessionEvent::KeyInstalled(if ok { Ok(()) } else { Err("derivation".to_string()) })
            },
            Self::EncryptionEnabled(outcome) => SessionEvent::EncryptionEnabled(match outcome {
                EncryptionOutcome::Ok => Ok(()),
                EncryptionOutcome::Unsupported => {
                    Err(EncryptionSetupError::Unsupported("no insertable streams".to_string()))
                },
                EncryptionOutcome::Failed => {
                    Err(EncryptionSetupError::Failed("worker crashed".to_string()))
                },
            }),
            Self::Connected { ok } => {
                SessionEvent::Connected(if ok { Ok(()) } else { Err("refused".to_string()) })
            },
            Self::Published { device, ok } => SessionEvent::Published {
                device: device.into(),
                result: if ok { Ok(()) } else { Err("permission denied".to_string()) },
            },
            Self::Disconnected => {
                SessionEvent::Transport(TransportEvent::Disconnected { reason: None })
            },
            Self::EncryptionFailure => SessionEvent::Transport(TransportEvent::EncryptionError {
                diagnostic: "decrypt failed".to_string(),
            }),
            Self::MediaDevicesFailure => {
                SessionEvent::Transport(TransportEvent::MediaDevicesError {
                    diagnostic: "camera busy".to_string(),
                })
            },
            Self::RecordingChanged { recording } => {
                SessionEvent::Transport(TransportEvent::RecordingStatusChanged { recording })
            },
            Self::CpuConstrained => SessionEvent::Transport(TransportEvent::CpuConstrained),
            Self::Stats(sample) => SessionEvent::StatsSampled(match sample {
                StatsSample::Constrained => Some(PublishStats {
                    quality_limitation: QualityLimitation::Cpu,
                    ..PublishStats::default()
                }),
                StatsSample::Healthy => Some(PublishStats::default()),
                StatsSample::Failed => None,
            }),
            Self::TeardownComplete => SessionEvent::TeardownComplete,
            Self::Leave => SessionEvent::Leave,
        }
    }
}

fn details(valid: bool) -> ConnectionDetails {
    ConnectionDetails {
        server_url: if valid { "wss://media.sim" } else { "ftp://media.sim" }.to_string(),
        participant_token: "sim-token".to_string(),
        room_name: "sim-room".to_string(),
    }
}

/// Result of applying an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationResult {
    /// Applied or ignored.
    Ok,

    /// Rejected synchronously (invalid pre-join choices).
    Rejected,
}

impl OperationResult {
    /// Check if operation was accepted.
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Check if operation was rejected.
    pub fn is_err(&self) -> bool {
        !self.is_ok()
    }
}
