//! Reference session model.

use sofia_core::{SessionState, TerminationReason};

use super::operation::{EncryptionOutcome, ModelDevice, Operation, OperationResult, StatsSample};

/// Consecutive constrained samples before the model degrades.
pub const CONSTRAINED_SAMPLES: u32 = 3;

/// Publish status as the model tracks it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelPublish {
    /// Not requested.
    #[default]
    Skipped,
    /// In flight.
    Pending,
    /// Live.
    Published,
    /// Failed.
    Failed,
}

/// Side effects requested so far, by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EffectCounts {
    /// Details requests.
    pub resolves: u32,
    /// Event subscriptions.
    pub subscribes: u32,
    /// Key installs.
    pub key_installs: u32,
    /// Transport encryption enables.
    pub encryption_enables: u32,
    /// Connect calls.
    pub connects: u32,
    /// Publish calls.
    pub publishes: u32,
    /// Disconnect calls.
    pub disconnects: u32,
    /// Subscription disposals.
    pub unsubscribes: u32,
    /// Notifications shown.
    pub notifications: u32,
    /// Quality profiles staged.
    pub staged_profiles: u32,
    /// Returns to the entry screen.
    pub returns_to_entry: u32,
}

/// Everything compared between model and controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservableState {
    /// Lifecycle state.
    pub state: SessionState,
    /// Camera publish status.
    pub camera: ModelPublish,
    /// Microphone publish status.
    pub microphone: ModelPublish,
    /// Low power mode.
    pub degraded: bool,
    /// Side effects requested so far.
    pub effects: EffectCounts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyStage {
    NotStarted,
    Installing,
    Enabling,
    Ready,
}

/// Obviously-correct session model.
///
/// Tracks the lifecycle with flat flags instead of the controller's
/// structured progress. Request ids are a plain counter.
#[derive(Debug, Clone)]
pub struct ModelSession {
    encrypted: bool,
    state: SessionState,
    issued: u64,
    outstanding: bool,
    video: bool,
    audio: bool,
    key: KeyStage,
    connection: bool,
    subscribed: bool,
    camera: ModelPublish,
    microphone: ModelPublish,
    degraded: bool,
    constrained_streak: u32,
    recording: bool,
    effects: EffectCounts,
}

impl ModelSession {
    /// Fresh session, encrypted or not.
    pub fn new(encrypted: bool) -> Self {
        Self {
            encrypted,
            state: SessionState::AwaitingChoices,
            issued: 0,
            outstanding: false,
            video: false,
            audio: false,
            key: KeyStage::NotStarted,
            connection: false,
            subscribed: false,
            camera: ModelPublish::Skipped,
            microphone: ModelPublish::Skipped,
            degraded: false,
            constrained_streak: 0,
            recording: false,
            effects: EffectCounts::default(),
        }
    }

    /// Current observable state.
    pub fn observable(&self) -> ObservableState {
        ObservableState {
            state: self.state,
            camera: self.camera,
            microphone: self.microphone,
            degraded: self.degraded,
            effects: self.effects,
        }
    }

    /// Apply one operation.
    pub fn apply(&mut self, op: Operation) -> OperationResult {
        if self.state.is_terminated() {
            return OperationResult::Ok;
        }

        match op {
            Operation::Submit { blank_name, video, audio } => {
                return self.submit(blank_name, video, audio);
            },
            Operation::ResolveDetails { ok, valid } => self.resolve(ok && valid),
            Operation::ResolveStale => {},
            Operation::KeyInstalled { ok } => self.key_installed(ok),
            Operation::EncryptionEnabled(outcome) => self.encryption_enabled(outcome),
            Operation::Connected { ok } => self.connected(ok),
            Operation::Published { device, ok } => self.published(device, ok),
            Operation::Disconnected if self.receives_events() => {
                self.terminate(TerminationReason::Disconnected, false);
            },
            Operation::EncryptionFailure if self.receives_events() => {
                self.terminate(TerminationReason::EncryptionError, true);
            },
            Operation::MediaDevicesFailure if self.receives_events() => {
                self.effects.notifications += 1;
            },
            Operation::RecordingChanged { recording } if self.receives_events() => {
                if recording && !self.recording {
                    self.effects.notifications += 1;
                }
                self.recording = recording;
            },
            Operation::CpuConstrained if self.receives_events() => {
                if !self.degraded {
                    self.degrade();
                }
            },
            Operation::Stats(sample) if self.state.is_connected() => self.stats(sample),
            Operation::TeardownComplete => {
                if let SessionState::Terminating(reason) = self.state {
                    self.state = SessionState::Terminated(reason);
                }
            },
            Operation::Leave if !self.state.is_ending() => {
                self.terminate(TerminationReason::UserLeft, false);
            },
            _ => {},
        }

        OperationResult::Ok
    }

    fn receives_events(&self) -> bool {
        self.subscribed && !self.state.is_ending()
    }

    fn submit(&mut self, blank_name: bool, video: bool, audio: bool) -> OperationResult {
        let accepting = self.state == SessionState::AwaitingChoices
            || (self.state == SessionState::AwaitingConnectionDetails && !self.outstanding);
        if !accepting {
            return OperationResult::Ok;
        }
        if blank_name {
            return OperationResult::Rejected;
        }

        self.issued += 1;
        self.outstanding = true;
        self.video = video;
        self.audio = audio;
        self.state = SessionState::AwaitingConnectionDetails;
        self.effects.resolves += 1;
        OperationResult::Ok
    }

    fn resolve(&mut self, usable: bool) {
        if self.state != SessionState::AwaitingConnectionDetails || !self.outstanding {
            return;
        }
        self.outstanding = false;

        if !usable {
            self.effects.notifications += 1;
            return;
        }

        self.state = SessionState::PreparingEncryption;
        self.subscribed = true;
        self.effects.subscribes += 1;

        if self.encrypted {
            self.key = KeyStage::Installing;
            self.effects.key_installs += 1;
        } else {
            self.key = KeyStage::Ready;
            self.connect();
        }
    }

    fn key_installed(&mut self, ok: bool) {
        if self.state != SessionState::PreparingEncryption || self.key != KeyStage::Installing {
            return;
        }
        if ok {
            self.key = KeyStage::Enabling;
            self.effects.encryption_enables += 1;
        } else {
            self.terminate(TerminationReason::EncryptionError, true);
        }
    }

    fn encryption_enabled(&mut self, outcome: EncryptionOutcome) {
        if self.state != SessionState::PreparingEncryption || self.key != KeyStage::Enabling {
            return;
        }
        match outcome {
            EncryptionOutcome::Ok => {
                self.key = KeyStage::Ready;
                self.connect();
            },
            EncryptionOutcome::Unsupported => {
                self.terminate(TerminationReason::EncryptionUnsupported, true);
            },
            EncryptionOutcome::Failed => self.terminate(TerminationReason::EncryptionError, true),
        }
    }

    fn connect(&mut self) {
        self.connection = true;
        self.state = SessionState::Connecting;
        self.effects.connects += 1;
    }

    fn connected(&mut self, ok: bool) {
        if self.state != SessionState::Connecting {
            return;
        }
        if !ok {
            self.connection = false;
            self.terminate(TerminationReason::ConnectError, true);
            return;
        }

        self.state = SessionState::Publishing;
        self.camera = self.start_publish(self.video);
        self.microphone = self.start_publish(self.audio);
        self.settle_publishing();
    }

    fn start_publish(&mut self, enabled: bool) -> ModelPublish {
        if enabled {
            self.effects.publishes += 1;
            ModelPublish::Pending
        } else {
            ModelPublish::Skipped
        }
    }

    fn published(&mut self, device: ModelDevice, ok: bool) {
        let status = match device {
            ModelDevice::Camera => &mut self.camera,
            ModelDevice::Microphone => &mut self.microphone,
        };
        if self.state != SessionState::Publishing || *status != ModelPublish::Pending {
            return;
        }

        if ok {
            *status = ModelPublish::Published;
        } else {
            *status = ModelPublish::Failed;
            self.effects.notifications += 1;
        }
        self.settle_publishing();
    }

    fn settle_publishing(&mut self) {
        if self.camera != ModelPublish::Pending && self.microphone != ModelPublish::Pending {
            self.state = SessionState::Active;
        }
    }

    fn stats(&mut self, sample: StatsSample) {
        match sample {
            StatsSample::Constrained => {
                self.constrained_streak += 1;
                if !self.degraded && self.constrained_streak >= CONSTRAINED_SAMPLES {
                    self.degrade();
                }
            },
            StatsSample::Healthy => self.constrained_streak = 0,
            StatsSample::Failed => {},
        }
    }

    fn degrade(&mut self) {
        self.degraded = true;
        self.effects.staged_profiles += 1;
    }

    fn terminate(&mut self, reason: TerminationReason, with_error: bool) {
        if with_error {
            self.effects.notifications += 1;
        }
        let disconnect = self.connection;
        if disconnect {
            self.connection = false;
            self.effects.disconnects += 1;
        }
        if self.subscribed {
            self.subscribed = false;
            self.effects.unsubscribes += 1;
        }
        self.effects.returns_to_entry += 1;
        self.outstanding = false;

        self.state = if disconnect {
            SessionState::Terminating(reason)
        } else {
            SessionState::Terminated(reason)
        };
    }
}
