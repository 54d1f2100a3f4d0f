//! Session controller state machine.
//!
//! The `SessionController` owns one session attempt from the pre-join form
//! to termination. It is a pure state machine: events go in, actions come
//! out, and the caller performs all I/O.
//!
//! # Invariants
//!
//! - `Connect` is only emitted after connection details are present and
//!   encryption is settled (disabled, or key installed and enabled)
//! - `Subscribe` is always emitted before `Connect`
//! - `Disconnect` and `Unsubscribe` are each emitted at most once
//! - Nothing leaves `Terminated`
//! - Completions that do not match the current state are ignored

use std::time::{Duration, Instant};

use super::{
    error::SessionError,
    event::{EncryptionSetupError, Notification, SessionAction, SessionEvent, TransportEvent},
    state::{SessionState, TerminationReason},
    types::{
        ConnectOptions, ConnectionDetails, ConnectionDetailsRequest, MediaDevice,
        ParticipantChoices, PublishStatus, RequestId, RoomOptions,
    },
};
use crate::{
    bridge::{BridgeReaction, EventBridge},
    config::SessionConfig,
    env::Environment,
    monitor::{PerformanceMonitor, PublishStats},
    quality::QualityProfile,
};

/// Progress of encryption preparation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EncryptionProgress {
    NotStarted,
    InstallingKey,
    EnablingTransport,
    Ready,
}

/// Whether there is a transport connection to tear down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Connection {
    None,
    Connecting,
    Established,
}

/// Publish status of both local devices.
#[derive(Debug, Clone, Default)]
struct Publications {
    camera: PublishStatus,
    microphone: PublishStatus,
}

impl Publications {
    fn get(&self, device: MediaDevice) -> &PublishStatus {
        match device {
            MediaDevice::Camera => &self.camera,
            MediaDevice::Microphone => &self.microphone,
        }
    }

    fn set(&mut self, device: MediaDevice, status: PublishStatus) {
        match device {
            MediaDevice::Camera => self.camera = status,
            MediaDevice::Microphone => self.microphone = status,
        }
    }

    fn any_pending(&self) -> bool {
        self.camera.is_pending() || self.microphone.is_pending()
    }
}

/// Session controller.
///
/// Drives one session attempt through the connection and encryption
/// sequence. Pure state machine - returns actions, caller handles I/O.
///
/// # Type Parameters
///
/// - `E`: Environment implementation for time/randomness
pub struct SessionController<E: Environment> {
    config: SessionConfig,
    state: SessionState,
    choices: Option<ParticipantChoices>,
    details: Option<ConnectionDetails>,
    /// Outstanding connection-details request, if any.
    pending_request: Option<RequestId>,
    next_request: u64,
    encryption: EncryptionProgress,
    connection: Connection,
    bridge: EventBridge,
    publications: Publications,
    monitor: PerformanceMonitor,
    last_error: Option<SessionError>,
    session_id: u64,
    entered_at: Instant,
    env: E,
}

impl<E: Environment> SessionController<E> {
    /// Create a controller waiting for the pre-join form.
    pub fn new(env: E, config: SessionConfig) -> Self {
        let session_id = env.random_u64();
        let entered_at = env.now();
        let monitor = PerformanceMonitor::new(config.monitor);

        tracing::debug!(
            session_id = format_args!("{session_id:016x}"),
            room = %config.room_name,
            e2ee = config.encryption.enabled(),
            "session created"
        );

        Self {
            config,
            state: SessionState::AwaitingChoices,
            choices: None,
            details: None,
            pending_request: None,
            next_request: 0,
            encryption: EncryptionProgress::NotStarted,
            connection: Connection::None,
            bridge: EventBridge::new(),
            publications: Publications::default(),
            monitor,
            last_error: None,
            session_id,
            entered_at,
            env,
        }
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Random identifier for log correlation.
    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    /// Submitted pre-join choices.
    pub fn choices(&self) -> Option<&ParticipantChoices> {
        self.choices.as_ref()
    }

    /// Resolved connection details.
    pub fn connection_details(&self) -> Option<&ConnectionDetails> {
        self.details.as_ref()
    }

    /// Publish status of a local device.
    pub fn publish_status(&self, device: MediaDevice) -> &PublishStatus {
        self.publications.get(device)
    }

    /// Current degrade signal from the performance monitor.
    pub fn degraded(&self) -> bool {
        self.monitor.degraded()
    }

    /// Quality profile for the current degrade signal.
    pub fn quality_profile(&self) -> QualityProfile {
        self.config.quality_profile(self.monitor.degraded())
    }

    /// Most recent surfaced error.
    pub fn last_error(&self) -> Option<&SessionError> {
        self.last_error.as_ref()
    }

    /// Whether transport events are currently delivered.
    pub fn is_subscribed(&self) -> bool {
        self.bridge.is_subscribed()
    }

    /// Time spent in the current state.
    pub fn time_in_state(&self) -> Duration {
        self.env.now().saturating_duration_since(self.entered_at)
    }

    /// Process an event and return resulting actions.
    ///
    /// Events that do not apply to the current state are ignored and
    /// produce no actions.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidChoices` if submitted choices are
    /// rejected. The state is unchanged in that case. All other failures are
    /// reported through `SessionAction::Notify`.
    pub fn handle(&mut self, event: SessionEvent) -> Result<Vec<SessionAction>, SessionError> {
        if self.state.is_terminated() {
            tracing::debug!(?event, "event ignored: session terminated");
            return Ok(Vec::new());
        }

        match event {
            SessionEvent::SubmitChoices(choices) => self.handle_submit_choices(choices),
            SessionEvent::ConnectionDetailsResolved { request, result } => {
                Ok(self.handle_details_resolved(request, result))
            },
            SessionEvent::KeyInstalled(result) => Ok(self.handle_key_installed(result)),
            SessionEvent::EncryptionEnabled(result) => Ok(self.handle_encryption_enabled(result)),
            SessionEvent::Connected(result) => Ok(self.handle_connected(result)),
            SessionEvent::Published { device, result } => Ok(self.handle_published(device, result)),
            SessionEvent::Transport(event) => Ok(self.handle_transport(event)),
            SessionEvent::StatsSampled(sample) => Ok(self.handle_stats(sample.as_ref())),
            SessionEvent::TeardownComplete => Ok(self.handle_teardown_complete()),
            SessionEvent::Leave => Ok(self.handle_leave()),
        }
    }

    fn handle_submit_choices(
        &mut self,
        choices: ParticipantChoices,
    ) -> Result<Vec<SessionAction>, SessionError> {
        let accepting = match self.state {
            SessionState::AwaitingChoices => true,
            SessionState::AwaitingConnectionDetails => self.pending_request.is_none(),
            _ => false,
        };
        if !accepting {
            tracing::debug!(state = %self.state, "choices ignored");
            return Ok(Vec::new());
        }

        choices.validate()?;

        self.next_request = self.next_request.wrapping_add(1);
        let id = RequestId(self.next_request);
        let request = ConnectionDetailsRequest {
            id,
            room_name: self.config.room_name.clone(),
            participant_name: choices.display_name.clone(),
            region: self.config.region.clone(),
        };

        self.choices = Some(choices);
        self.pending_request = Some(id);
        self.transition(SessionState::AwaitingConnectionDetails);

        Ok(vec![SessionAction::ResolveConnectionDetails(request)])
    }

    fn handle_details_resolved(
        &mut self,
        request: RequestId,
        result: Result<ConnectionDetails, String>,
    ) -> Vec<SessionAction> {
        if self.state != SessionState::AwaitingConnectionDetails
            || self.pending_request != Some(request)
        {
            tracing::debug!(%request, state = %self.state, "stale connection details ignored");
            return Vec::new();
        }
        self.pending_request = None;

        let details = match result
            .map_err(|reason| SessionError::ConnectionDetails { reason })
            .and_then(|details| details.validate().map(|()| details))
        {
            Ok(details) => details,
            Err(error) => return vec![self.surface(error)],
        };

        self.details = Some(details);
        self.transition(SessionState::PreparingEncryption);

        let mut actions = Vec::new();
        if self.bridge.subscribe() {
            actions.push(SessionAction::Subscribe);
        }

        match self.config.encryption.passphrase().cloned() {
            Some(passphrase) => {
                self.encryption = EncryptionProgress::InstallingKey;
                actions.push(SessionAction::InstallKey(passphrase));
            },
            None => {
                self.encryption = EncryptionProgress::Ready;
                actions.extend(self.connect());
            },
        }

        actions
    }

    fn handle_key_installed(&mut self, result: Result<(), String>) -> Vec<SessionAction> {
        if self.state != SessionState::PreparingEncryption
            || self.encryption != EncryptionProgress::InstallingKey
        {
            tracing::debug!(state = %self.state, "key installation result ignored");
            return Vec::new();
        }

        match result {
            Ok(()) => {
                self.encryption = EncryptionProgress::EnablingTransport;
                vec![SessionAction::EnableEncryption]
            },
            Err(reason) => self.terminate(
                TerminationReason::EncryptionError,
                Some(SessionError::KeyInstall { reason }),
            ),
        }
    }

    fn handle_encryption_enabled(
        &mut self,
        result: Result<(), EncryptionSetupError>,
    ) -> Vec<SessionAction> {
        if self.state != SessionState::PreparingEncryption
            || self.encryption != EncryptionProgress::EnablingTransport
        {
            tracing::debug!(state = %self.state, "encryption result ignored");
            return Vec::new();
        }

        match result {
            Ok(()) => {
                self.encryption = EncryptionProgress::Ready;
                self.connect()
            },
            Err(EncryptionSetupError::Unsupported(diagnostic)) => self.terminate(
                TerminationReason::EncryptionUnsupported,
                Some(SessionError::EncryptionUnsupported { diagnostic }),
            ),
            Err(EncryptionSetupError::Failed(reason)) => self.terminate(
                TerminationReason::EncryptionError,
                Some(SessionError::EncryptionSetup { reason }),
            ),
        }
    }

    /// Emit the connect call. Only reachable once encryption is ready.
    fn connect(&mut self) -> Vec<SessionAction> {
        debug_assert_eq!(self.encryption, EncryptionProgress::Ready);

        let Some(details) = self.details.as_ref() else {
            return Vec::new();
        };

        let choices = self.choices.as_ref();
        let room = RoomOptions {
            quality: self.quality_profile(),
            video_device_id: choices.and_then(|c| c.video_device_id.clone()),
            audio_device_id: choices.and_then(|c| c.audio_device_id.clone()),
            adaptive_stream: true,
            dynacast: true,
            e2ee: self.config.encryption.enabled(),
        };
        let action = SessionAction::Connect {
            server_url: details.server_url.clone(),
            participant_token: details.participant_token.clone(),
            options: ConnectOptions::default(),
            room,
        };

        self.connection = Connection::Connecting;
        self.transition(SessionState::Connecting);
        vec![action]
    }

    fn handle_connected(&mut self, result: Result<(), String>) -> Vec<SessionAction> {
        if self.state != SessionState::Connecting {
            tracing::debug!(state = %self.state, "connect result ignored");
            return Vec::new();
        }

        if let Err(reason) = result {
            self.connection = Connection::None;
            return self
                .terminate(TerminationReason::ConnectError, Some(SessionError::Connect { reason }));
        }

        self.connection = Connection::Established;
        self.transition(SessionState::Publishing);

        let mut actions = Vec::new();
        for device in MediaDevice::ALL {
            let enabled = self.choices.as_ref().is_some_and(|c| c.enabled(device));
            if enabled {
                let device_id =
                    self.choices.as_ref().and_then(|c| c.device_id(device)).map(str::to_string);
                self.publications.set(device, PublishStatus::Pending);
                actions.push(SessionAction::Publish { device, device_id });
            } else {
                self.publications.set(device, PublishStatus::Skipped);
            }
        }

        if !self.publications.any_pending() {
            self.transition(SessionState::Active);
        }

        actions
    }

    fn handle_published(
        &mut self,
        device: MediaDevice,
        result: Result<(), String>,
    ) -> Vec<SessionAction> {
        if self.state != SessionState::Publishing || !self.publications.get(device).is_pending() {
            tracing::debug!(%device, state = %self.state, "publish result ignored");
            return Vec::new();
        }

        let mut actions = Vec::new();
        match result {
            Ok(()) => {
                tracing::debug!(%device, "published");
                self.publications.set(device, PublishStatus::Published);
            },
            Err(reason) => {
                self.publications.set(device, PublishStatus::Failed { reason: reason.clone() });
                actions.push(self.surface(SessionError::Publish { device, reason }));
            },
        }

        if !self.publications.any_pending() {
            self.transition(SessionState::Active);
        }

        actions
    }

    fn handle_transport(&mut self, event: TransportEvent) -> Vec<SessionAction> {
        if self.state.is_ending() {
            return Vec::new();
        }

        match self.bridge.translate(event) {
            None => Vec::new(),
            Some(BridgeReaction::Terminate { reason, error }) => self.terminate(reason, error),
            Some(BridgeReaction::Surface(error)) => vec![self.surface(error)],
            Some(BridgeReaction::Notify(notification)) => vec![SessionAction::Notify(notification)],
            Some(BridgeReaction::CpuConstrained) => {
                if self.monitor.report_cpu_constrained() {
                    self.stage_quality_profile()
                } else {
                    Vec::new()
                }
            },
        }
    }

    fn handle_stats(&mut self, sample: Option<&PublishStats>) -> Vec<SessionAction> {
        if !self.state.is_connected() {
            return Vec::new();
        }

        if sample.is_none() {
            tracing::debug!("stats sample failed, degrade signal unchanged");
        }

        let now = self.env.now();
        if self.monitor.observe(sample, now) { self.stage_quality_profile() } else { Vec::new() }
    }

    fn stage_quality_profile(&self) -> Vec<SessionAction> {
        if self.monitor.degraded() {
            tracing::warn!(
                session_id = format_args!("{:016x}", self.session_id),
                "low power mode enabled"
            );
        } else {
            tracing::info!(
                session_id = format_args!("{:016x}", self.session_id),
                "low power mode disabled"
            );
        }
        vec![SessionAction::StageQualityProfile(self.quality_profile())]
    }

    fn handle_teardown_complete(&mut self) -> Vec<SessionAction> {
        if let SessionState::Terminating(reason) = self.state {
            self.transition(SessionState::Terminated(reason));
        }
        Vec::new()
    }

    fn handle_leave(&mut self) -> Vec<SessionAction> {
        if self.state.is_ending() {
            return Vec::new();
        }
        self.terminate(TerminationReason::UserLeft, None)
    }

    /// End the session.
    ///
    /// Emits the error notification (if any), then the teardown side effects
    /// that are still owed, then the return to the entry screen.
    fn terminate(
        &mut self,
        reason: TerminationReason,
        error: Option<SessionError>,
    ) -> Vec<SessionAction> {
        let mut actions = Vec::new();
        if let Some(error) = error {
            actions.push(self.surface(error));
        }

        let disconnect = self.connection != Connection::None;
        if disconnect {
            self.connection = Connection::None;
            actions.push(SessionAction::Disconnect);
        }
        if self.bridge.unsubscribe() {
            actions.push(SessionAction::Unsubscribe);
        }
        actions.push(SessionAction::ReturnToEntry);

        self.pending_request = None;
        if disconnect {
            self.transition(SessionState::Terminating(reason));
        } else {
            self.transition(SessionState::Terminated(reason));
        }

        actions
    }

    /// Record an error and turn it into a notification.
    fn surface(&mut self, error: SessionError) -> SessionAction {
        let session_id = format!("{:016x}", self.session_id);
        if error.is_blocking() {
            tracing::error!(%session_id, kind = ?error.kind(), %error, "session error");
        } else {
            tracing::warn!(%session_id, kind = ?error.kind(), %error, "session error");
        }

        let action = SessionAction::Notify(Notification::from(&error));
        self.last_error = Some(error);
        action
    }

    fn transition(&mut self, next: SessionState) {
        tracing::debug!(
            session_id = format_args!("{:016x}", self.session_id),
            from = %self.state,
            to = %next,
            "session transition"
        );
        self.state = next;
        self.entered_at = self.env.now();
    }
}
