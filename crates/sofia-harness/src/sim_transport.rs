//! Scripted media transport.
//!
//! Every call is recorded in the shared [`CallTrace`] and answered from a
//! script the test sets up front. Transport events are injected with
//! [`SimTransport::emit`].

use std::{
    collections::VecDeque,
    sync::{Mutex, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use sofia_client::{EventSubscription, Transport, TransportError};
use sofia_core::{
    ConnectOptions, MediaDevice, PublishStats, QualityProfile, RoomOptions, TransportEvent,
};
use tokio::sync::broadcast;

use crate::trace::{Call, CallTrace};

/// Capacity of the event channel.
const EVENT_CAPACITY: usize = 64;

/// Scripted answers for transport calls.
#[derive(Debug, Clone, Default)]
pub struct TransportScript {
    /// Result of `set_e2ee_enabled`.
    pub e2ee: Option<TransportError>,
    /// Result of `connect`.
    pub connect: Option<TransportError>,
    /// How long `connect` takes.
    pub connect_delay: Duration,
    /// Result of publishing the camera.
    pub camera: Option<TransportError>,
    /// Result of publishing the microphone.
    pub microphone: Option<TransportError>,
    /// Statistics samples, served in order. Empty queue yields an error.
    pub stats: VecDeque<PublishStats>,
}

/// In-memory transport driven by a script.
#[derive(Debug)]
pub struct SimTransport {
    trace: CallTrace,
    events: broadcast::Sender<TransportEvent>,
    script: Mutex<TransportScript>,
    rooms: Mutex<Vec<RoomOptions>>,
    staged: Mutex<Vec<QualityProfile>>,
}

impl SimTransport {
    /// Transport where every call succeeds immediately.
    pub fn new(trace: CallTrace) -> Self {
        Self::with_script(trace, TransportScript::default())
    }

    /// Transport answering from `script`.
    pub fn with_script(trace: CallTrace, script: TransportScript) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            trace,
            events,
            script: Mutex::new(script),
            rooms: Mutex::new(Vec::new()),
            staged: Mutex::new(Vec::new()),
        }
    }

    /// Raise a transport event. Returns `false` if nobody is subscribed.
    pub fn emit(&self, event: TransportEvent) -> bool {
        self.events.send(event).is_ok()
    }

    /// Number of live subscriptions.
    pub fn subscribers(&self) -> usize {
        self.events.receiver_count()
    }

    /// Queue a statistics sample.
    pub fn push_stats(&self, stats: PublishStats) {
        self.script().stats.push_back(stats);
    }

    /// Room options passed to each connect call.
    pub fn rooms(&self) -> Vec<RoomOptions> {
        self.rooms.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Quality profiles staged so far.
    pub fn staged_profiles(&self) -> Vec<QualityProfile> {
        self.staged.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn script(&self) -> std::sync::MutexGuard<'_, TransportScript> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn outcome(error: Option<TransportError>) -> Result<(), TransportError> {
    error.map_or(Ok(()), Err)
}

#[async_trait]
impl Transport for SimTransport {
    fn subscribe(&self) -> EventSubscription {
        self.trace.record(Call::Subscribe);
        EventSubscription::new(self.events.subscribe())
    }

    async fn set_e2ee_enabled(&self, enabled: bool) -> Result<(), TransportError> {
        self.trace.record(Call::SetE2eeEnabled(enabled));
        let result = self.script().e2ee.clone();
        outcome(result)
    }

    async fn connect(
        &self,
        server_url: &str,
        _participant_token: &str,
        _options: ConnectOptions,
        room: &RoomOptions,
    ) -> Result<(), TransportError> {
        self.trace.record(Call::Connect { server_url: server_url.to_string(), e2ee: room.e2ee });
        self.rooms.lock().unwrap_or_else(PoisonError::into_inner).push(room.clone());

        let (delay, result) = {
            let script = self.script();
            (script.connect_delay, script.connect.clone())
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        outcome(result)
    }

    async fn set_device_enabled(
        &self,
        device: MediaDevice,
        _device_id: Option<&str>,
    ) -> Result<(), TransportError> {
        self.trace.record(Call::Publish(device));
        let result = match device {
            MediaDevice::Camera => self.script().camera.clone(),
            MediaDevice::Microphone => self.script().microphone.clone(),
        };
        outcome(result)
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.trace.record(Call::Disconnect);
        Ok(())
    }

    async fn publish_stats(&self) -> Result<PublishStats, TransportError> {
        self.trace.record(Call::PublishStats);
        self.script().stats.pop_front().ok_or_else(|| TransportError::Other("no sample".into()))
    }

    fn stage_quality_profile(&self, profile: &QualityProfile) {
        self.trace.record(Call::StageQualityProfile);
        self.staged.lock().unwrap_or_else(PoisonError::into_inner).push(profile.clone());
    }
}
