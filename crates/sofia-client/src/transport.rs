//! Media transport abstraction.
//!
//! The media engine (signaling, codecs, track capture) is an external
//! collaborator. The runtime drives it through [`Transport`] and receives its
//! asynchronous events through an [`EventSubscription`].

use async_trait::async_trait;
use sofia_core::{ConnectOptions, MediaDevice, PublishStats, QualityProfile, RoomOptions, TransportEvent};
use tokio::sync::broadcast;

use crate::error::TransportError;

/// Connection to a media room.
///
/// One transport serves exactly one session.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Register for transport events.
    ///
    /// Events raised before this call are not delivered. Dropping the
    /// returned subscription removes the registration.
    fn subscribe(&self) -> EventSubscription;

    /// Turn media frame encryption on or off.
    ///
    /// Returns [`TransportError::Unsupported`] if the runtime cannot encrypt
    /// media.
    async fn set_e2ee_enabled(&self, enabled: bool) -> Result<(), TransportError>;

    /// Connect to the media server.
    async fn connect(
        &self,
        server_url: &str,
        participant_token: &str,
        options: ConnectOptions,
        room: &RoomOptions,
    ) -> Result<(), TransportError>;

    /// Enable and publish a local capture device.
    async fn set_device_enabled(
        &self,
        device: MediaDevice,
        device_id: Option<&str>,
    ) -> Result<(), TransportError>;

    /// Close the connection. Safe to call while a connect is in flight.
    async fn disconnect(&self) -> Result<(), TransportError>;

    /// Sample local publishing statistics.
    async fn publish_stats(&self) -> Result<PublishStats, TransportError>;

    /// Stage capture settings for the next renegotiation. Active tracks keep
    /// their current settings.
    fn stage_quality_profile(&self, profile: &QualityProfile);
}

/// Registration for transport events.
///
/// Owned by the session; dropping it is the disposal.
#[derive(Debug)]
pub struct EventSubscription {
    receiver: broadcast::Receiver<TransportEvent>,
}

impl EventSubscription {
    /// Wrap a broadcast receiver.
    pub fn new(receiver: broadcast::Receiver<TransportEvent>) -> Self {
        Self { receiver }
    }

    /// Next event, or `None` once the transport has closed the channel.
    ///
    /// If the subscriber fell behind, the missed events are skipped and
    /// logged.
    pub async fn recv(&mut self) -> Option<TransportEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "transport events dropped: subscriber lagged");
                },
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        tracing::debug!("transport subscription disposed");
    }
}
