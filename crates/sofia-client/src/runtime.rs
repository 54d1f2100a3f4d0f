//! Tokio session runtime.
//!
//! Executes the controller's actions against the collaborators and feeds
//! their completions back, one at a time. The runtime owns the transport
//! event subscription and the statistics timer.
//!
//! ```text
//!  SessionHandle ──commands──> SessionRuntime ──actions──> JoinSet<operation>
//!        ▲                        │   ▲                        │
//!        └──state/signals─────────┘   └───────completions──────┘
//! ```
//!
//! # Invariants
//!
//! - The subscription is registered before the connect operation is spawned
//! - Completions arriving after termination are dropped with the task set
//! - `Leave` is the only cancellation entry point

use std::sync::Arc;

use sofia_core::{
    Environment, Notification, ParticipantChoices, QualityProfile, SessionAction,
    SessionConfig, SessionController, SessionError, SessionEvent, SessionState, TransportEvent,
};
use tokio::{
    sync::{mpsc, oneshot, watch},
    task::{JoinHandle, JoinSet},
    time::MissedTickBehavior,
};
use tracing::Instrument;

use crate::{
    error::RuntimeError,
    key_provider::KeyProvider,
    resolver::ConnectionDetailResolver,
    transport::{EventSubscription, Transport},
};

/// Capacity of the command channel.
const COMMAND_CAPACITY: usize = 16;

/// External collaborators of one session.
#[derive(Clone)]
pub struct Collaborators {
    /// Media transport.
    pub transport: Arc<dyn Transport>,
    /// Key provider for end-to-end encryption.
    pub keys: Arc<dyn KeyProvider>,
    /// Connection-details resolver.
    pub resolver: Arc<dyn ConnectionDetailResolver>,
}

/// Output for presentation code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionSignal {
    /// Show a notification.
    Notify(Notification),
    /// Navigate back to the entry screen.
    ReturnToEntry,
    /// A new quality profile was staged.
    QualityProfileChanged(QualityProfile),
}

enum Command {
    Submit(ParticipantChoices, oneshot::Sender<Result<(), SessionError>>),
    Leave,
}

/// Handle to a running session.
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<SessionState>,
    low_power: watch::Receiver<bool>,
    signals: mpsc::UnboundedReceiver<SessionSignal>,
}

impl SessionHandle {
    /// Submit the pre-join form.
    ///
    /// # Errors
    ///
    /// - `RuntimeError::Session` if the choices were rejected
    /// - `RuntimeError::Stopped` if the session has ended
    pub async fn submit_choices(&self, choices: ParticipantChoices) -> Result<(), RuntimeError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Submit(choices, reply))
            .await
            .map_err(|_| RuntimeError::Stopped)?;
        response.await.map_err(|_| RuntimeError::Stopped)?.map_err(RuntimeError::Session)
    }

    /// Leave the session. Idempotent.
    pub async fn leave(&self) -> Result<(), RuntimeError> {
        self.commands.send(Command::Leave).await.map_err(|_| RuntimeError::Stopped)
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Watch state changes.
    pub fn state_changes(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Whether low power mode is on.
    pub fn low_power(&self) -> bool {
        *self.low_power.borrow()
    }

    /// Next signal, or `None` once the runtime has stopped.
    pub async fn next_signal(&mut self) -> Option<SessionSignal> {
        self.signals.recv().await
    }

    /// Wait until the session has terminated.
    pub async fn terminated(&self) -> SessionState {
        let mut state = self.state.clone();
        if let Ok(terminal) = state.wait_for(SessionState::is_terminated).await {
            return *terminal;
        }
        let last = *state.borrow();
        last
    }
}

/// Drives one session.
pub struct SessionRuntime<E: Environment> {
    controller: SessionController<E>,
    collaborators: Collaborators,
    subscription: Option<EventSubscription>,
    operations: JoinSet<SessionEvent>,
    sampling: bool,
    commands: mpsc::Receiver<Command>,
    commands_closed: bool,
    state: watch::Sender<SessionState>,
    low_power: watch::Sender<bool>,
    signals: mpsc::UnboundedSender<SessionSignal>,
}

impl<E: Environment> SessionRuntime<E> {
    /// Create a runtime and its handle.
    pub fn new(env: E, config: SessionConfig, collaborators: Collaborators) -> (Self, SessionHandle) {
        let controller = SessionController::new(env, config);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (state_tx, state_rx) = watch::channel(controller.state());
        let (low_power_tx, low_power_rx) = watch::channel(controller.degraded());
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();

        let runtime = Self {
            controller,
            collaborators,
            subscription: None,
            operations: JoinSet::new(),
            sampling: false,
            commands: command_rx,
            commands_closed: false,
            state: state_tx,
            low_power: low_power_tx,
            signals: signal_tx,
        };
        let handle = SessionHandle {
            commands: command_tx,
            state: state_rx,
            low_power: low_power_rx,
            signals: signal_rx,
        };
        (runtime, handle)
    }

    /// Spawn the runtime on the current Tokio runtime.
    pub fn spawn(self) -> JoinHandle<SessionState> {
        let span = tracing::info_span!(
            "session",
            session_id = format_args!("{:016x}", self.controller.session_id()),
            room = %self.controller.config().room_name,
        );
        tokio::spawn(self.run().instrument(span))
    }

    /// Run until the session terminates. Returns the terminal state.
    pub async fn run(mut self) -> SessionState {
        let mut stats = tokio::time::interval(self.controller.config().monitor.poll_interval);
        stats.set_missed_tick_behavior(MissedTickBehavior::Skip);

        while !self.controller.state().is_terminated() {
            tokio::select! {
                command = self.commands.recv(), if !self.commands_closed => {
                    self.handle_command(command);
                },
                Some(joined) = self.operations.join_next(), if !self.operations.is_empty() => {
                    match joined {
                        Ok(event) => {
                            if matches!(event, SessionEvent::StatsSampled(_)) {
                                self.sampling = false;
                            }
                            self.dispatch(event);
                        },
                        Err(err) => tracing::warn!(error = %err, "session operation failed to complete"),
                    }
                },
                event = next_transport_event(&mut self.subscription), if self.subscription.is_some() => {
                    match event {
                        Some(event) => self.dispatch(SessionEvent::Transport(event)),
                        None => {
                            tracing::warn!("transport event stream closed");
                            self.subscription = None;
                        },
                    }
                },
                _ = stats.tick(), if self.controller.state() == SessionState::Active && !self.sampling => {
                    self.sample_stats();
                },
            }
        }

        self.operations.abort_all();
        self.subscription = None;
        let terminal = self.controller.state();
        tracing::info!(state = %terminal, "session ended");
        terminal
    }

    fn handle_command(&mut self, command: Option<Command>) {
        match command {
            Some(Command::Submit(choices, reply)) => {
                let result = self.controller.handle(SessionEvent::SubmitChoices(choices));
                let outcome = match result {
                    Ok(actions) => {
                        self.execute(actions);
                        Ok(())
                    },
                    Err(err) => Err(err),
                };
                self.publish_state();
                let _ = reply.send(outcome);
            },
            Some(Command::Leave) => self.dispatch(SessionEvent::Leave),
            None => {
                tracing::debug!("session handle dropped, leaving");
                self.commands_closed = true;
                self.dispatch(SessionEvent::Leave);
            },
        }
    }

    fn dispatch(&mut self, event: SessionEvent) {
        match self.controller.handle(event) {
            Ok(actions) => self.execute(actions),
            Err(err) => tracing::warn!(error = %err, "event rejected"),
        }
        self.publish_state();
    }

    fn publish_state(&self) {
        let state = self.controller.state();
        self.state.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            *current = state;
            true
        });
    }

    fn sample_stats(&mut self) {
        let transport = Arc::clone(&self.collaborators.transport);
        self.sampling = true;
        self.operations.spawn(async move {
            match transport.publish_stats().await {
                Ok(stats) => SessionEvent::StatsSampled(Some(stats)),
                Err(err) => {
                    tracing::debug!(error = %err, "stats sample failed");
                    SessionEvent::StatsSampled(None)
                },
            }
        });
    }

    fn execute(&mut self, actions: Vec<SessionAction>) {
        for action in actions {
            self.execute_one(action);
        }
    }

    fn execute_one(&mut self, action: SessionAction) {
        let Collaborators { transport, keys, resolver } = self.collaborators.clone();

        match action {
            SessionAction::ResolveConnectionDetails(request) => {
                self.operations.spawn(async move {
                    let result = resolver.resolve(&request).await.map_err(|e| e.to_string());
                    SessionEvent::ConnectionDetailsResolved { request: request.id, result }
                });
            },
            SessionAction::Subscribe => {
                self.subscription = Some(transport.subscribe());
            },
            SessionAction::InstallKey(passphrase) => {
                self.operations.spawn(async move {
                    let result = keys.set_key(&passphrase).await.map_err(|e| e.to_string());
                    SessionEvent::KeyInstalled(result)
                });
            },
            SessionAction::EnableEncryption => {
                self.operations.spawn(async move {
                    let result = transport.set_e2ee_enabled(true).await.map_err(Into::into);
                    SessionEvent::EncryptionEnabled(result)
                });
            },
            SessionAction::Connect { server_url, participant_token, options, room } => {
                self.operations.spawn(async move {
                    let result = transport
                        .connect(&server_url, &participant_token, options, &room)
                        .await
                        .map_err(|e| e.to_string());
                    SessionEvent::Connected(result)
                });
            },
            SessionAction::Publish { device, device_id } => {
                self.operations.spawn(async move {
                    let result = transport
                        .set_device_enabled(device, device_id.as_deref())
                        .await
                        .map_err(|e| e.to_string());
                    SessionEvent::Published { device, result }
                });
            },
            SessionAction::Disconnect => {
                self.operations.spawn(async move {
                    if let Err(err) = transport.disconnect().await {
                        tracing::warn!(error = %err, "disconnect failed");
                    }
                    SessionEvent::TeardownComplete
                });
            },
            SessionAction::Unsubscribe => {
                self.subscription = None;
            },
            SessionAction::Notify(notification) => {
                self.signal(SessionSignal::Notify(notification));
            },
            SessionAction::StageQualityProfile(profile) => {
                transport.stage_quality_profile(&profile);
                self.low_power.send_replace(self.controller.degraded());
                self.signal(SessionSignal::QualityProfileChanged(profile));
            },
            SessionAction::ReturnToEntry => self.signal(SessionSignal::ReturnToEntry),
        }
    }

    fn signal(&self, signal: SessionSignal) {
        if self.signals.send(signal).is_err() {
            tracing::debug!("signal dropped: no receiver");
        }
    }
}

/// Next event from an optional subscription. Pending forever when there is
/// none.
async fn next_transport_event(subscription: &mut Option<EventSubscription>) -> Option<TransportEvent> {
    match subscription {
        Some(subscription) => subscription.recv().await,
        None => std::future::pending().await,
    }
}
