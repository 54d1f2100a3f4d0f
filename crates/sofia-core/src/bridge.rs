//! Event bridge between the transport and the session controller.
//!
//! The bridge owns the session's event subscription bookkeeping and converts
//! raw [`TransportEvent`]s into controller reactions. No transport event
//! reaches presentation code without passing through here.
//!
//! # Invariants
//!
//! - The subscription is registered at most once and disposed at most once
//! - Events are only translated while the subscription is active
//! - Disposal is final; a disposed subscription is never re-registered

use crate::session::{
    Notification, SessionError, TerminationReason, TransportEvent,
};

/// Notice shown when the room starts recording.
const RECORDING_NOTICE: &str = "This session is being recorded";

/// Lifecycle of the session's event subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubscriptionState {
    /// Handlers not registered yet.
    #[default]
    Unregistered,
    /// Handlers registered; events are delivered.
    Active,
    /// Handlers removed. Terminal.
    Disposed,
}

/// Controller reaction to a transport event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeReaction {
    /// End the session.
    Terminate {
        /// Termination reason.
        reason: TerminationReason,
        /// Error to surface, if the termination is an error.
        error: Option<SessionError>,
    },
    /// Surface a non-fatal error; the session continues.
    Surface(SessionError),
    /// Show an informational notice.
    Notify(Notification),
    /// Feed CPU pressure into the performance monitor.
    CpuConstrained,
}

/// Translates transport events and tracks the subscription lifetime.
#[derive(Debug, Clone, Default)]
pub struct EventBridge {
    subscription: SubscriptionState,
    recording: bool,
}

impl EventBridge {
    /// Create a bridge with no subscription.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current subscription state.
    pub fn subscription(&self) -> SubscriptionState {
        self.subscription
    }

    /// Whether events are currently delivered.
    pub fn is_subscribed(&self) -> bool {
        self.subscription == SubscriptionState::Active
    }

    /// Whether the room is being recorded, as last reported.
    pub fn recording(&self) -> bool {
        self.recording
    }

    /// Register the subscription.
    ///
    /// Returns `true` if this call registered it; `false` if it was already
    /// active or has been disposed.
    pub fn subscribe(&mut self) -> bool {
        if self.subscription != SubscriptionState::Unregistered {
            return false;
        }
        self.subscription = SubscriptionState::Active;
        true
    }

    /// Dispose the subscription.
    ///
    /// Returns `true` exactly once, for the call that disposed an active
    /// subscription.
    pub fn unsubscribe(&mut self) -> bool {
        if self.subscription != SubscriptionState::Active {
            return false;
        }
        self.subscription = SubscriptionState::Disposed;
        true
    }

    /// Translate a transport event.
    ///
    /// Returns `None` if the event is dropped: no active subscription, or an
    /// event with no user-visible effect.
    pub fn translate(&mut self, event: TransportEvent) -> Option<BridgeReaction> {
        if !self.is_subscribed() {
            tracing::debug!(?event, "transport event dropped: not subscribed");
            return None;
        }

        match event {
            TransportEvent::Disconnected { reason } => {
                tracing::info!(reason = reason.as_deref().unwrap_or("none"), "remote disconnect");
                Some(BridgeReaction::Terminate { reason: TerminationReason::Disconnected, error: None })
            },
            TransportEvent::EncryptionError { diagnostic } => Some(BridgeReaction::Terminate {
                reason: TerminationReason::EncryptionError,
                error: Some(SessionError::Encryption { diagnostic }),
            }),
            TransportEvent::MediaDevicesError { diagnostic } => {
                Some(BridgeReaction::Surface(SessionError::MediaDevice { diagnostic }))
            },
            TransportEvent::RecordingStatusChanged { recording } => {
                let started = recording && !self.recording;
                self.recording = recording;
                started.then(|| BridgeReaction::Notify(Notification::info(RECORDING_NOTICE)))
            },
            TransportEvent::CpuConstrained => Some(BridgeReaction::CpuConstrained),
        }
    }
}
