//! Session connection and encryption orchestration.
//!
//! - [`SessionController`]: the lifecycle state machine
//! - [`SessionEvent`] / [`SessionAction`]: its inputs and outputs
//! - [`SessionError`]: surfaced failures, classified by [`ErrorKind`]

mod controller;
mod error;
mod event;
mod state;
mod types;

pub use controller::SessionController;
pub use error::{ErrorKind, SessionError};
pub use event::{
    EncryptionSetupError, Notification, SessionAction, SessionEvent, Severity, TransportEvent,
};
pub use state::{SessionState, TerminationReason};
pub use types::{
    ConnectOptions, ConnectionDetails, ConnectionDetailsRequest, EncryptionConfig, MediaDevice,
    ParticipantChoices, PublishStatus, RequestId, RoomOptions,
};
