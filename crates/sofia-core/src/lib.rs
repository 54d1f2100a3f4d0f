//! Sofia Session Core
//!
//! Sans-IO orchestration of a media session: pre-join choices, connection
//! details, end-to-end encryption setup, connect, track publishing and
//! teardown.
//!
//! # Architecture
//!
//! The controller is a pure state machine that:
//! - Receives events from the caller (UI intents, operation completions,
//!   transport events, statistics samples)
//! - Produces actions for the caller to execute (fetch details, install key,
//!   connect, publish, disconnect, notify)
//! - Uses the [`Environment`] trait for time and randomness (deterministic
//!   testing)
//!
//! # Components
//!
//! - [`SessionController`]: lifecycle state machine
//! - [`EventBridge`]: transport event subscription and translation
//! - [`PerformanceMonitor`]: degrade signal from publishing statistics
//! - [`QualityProfile`]: capture and codec settings for a negotiation

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod bridge;
pub mod config;
pub mod env;
pub mod monitor;
pub mod quality;
pub mod session;

pub use bridge::{BridgeReaction, EventBridge, SubscriptionState};
pub use config::SessionConfig;
pub use env::Environment;
pub use monitor::{MonitorConfig, PerformanceMonitor, PublishStats, QualityLimitation};
pub use quality::{
    CodecPreference, ParseCodecError, QualityProfile, QualityRequest, ResolutionTier, VideoCodec,
    VideoPreset,
};
pub use session::{
    ConnectOptions, ConnectionDetails, ConnectionDetailsRequest, EncryptionConfig,
    EncryptionSetupError, ErrorKind, MediaDevice, Notification, ParticipantChoices, PublishStatus,
    RequestId, RoomOptions, SessionAction, SessionController, SessionError, SessionEvent,
    SessionState, Severity, TerminationReason, TransportEvent,
};
