//! Server-side recording control.
//!
//! Recording is started and stopped through an HTTP endpoint. A request only
//! asks for the change; the room's actual recording status arrives later as
//! a transport event and is fed back through [`RecordingControl::observe`].

use reqwest::Url;

use crate::error::RecordingError;

/// Start or stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingAction {
    /// Start recording.
    Start,
    /// Stop recording.
    Stop,
}

impl RecordingAction {
    fn path(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
        }
    }
}

/// Recording toggle for one room.
#[derive(Debug, Clone)]
pub struct RecordingControl {
    client: reqwest::Client,
    endpoint: Url,
    recording: bool,
    processing: bool,
}

impl RecordingControl {
    /// Create a control for a recording endpoint.
    pub fn new(endpoint: Url) -> Self {
        Self { client: reqwest::Client::new(), endpoint, recording: false, processing: false }
    }

    /// Last observed recording status.
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Whether a request was accepted and the status change is still
    /// outstanding.
    pub fn is_processing(&self) -> bool {
        self.processing
    }

    /// URL for a start or stop request.
    pub fn request_url(&self, action: RecordingAction, room_name: &str) -> Result<Url, RecordingError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| RecordingError::Endpoint(self.endpoint.to_string()))?
            .pop_if_empty()
            .push(action.path());
        url.query_pairs_mut().append_pair("roomName", room_name);
        Ok(url)
    }

    /// Record a status reported by the room.
    pub fn observe(&mut self, recording: bool) {
        if recording != self.recording {
            self.processing = false;
        }
        self.recording = recording;
    }

    /// Flip recording for a room.
    ///
    /// Returns the requested status. On rejection the toggle reverts to its
    /// state before the request.
    pub async fn toggle(&mut self, room_name: &str, encrypted: bool) -> Result<bool, RecordingError> {
        let action = if self.recording { RecordingAction::Stop } else { RecordingAction::Start };
        self.request(action, room_name, encrypted).await?;
        Ok(action == RecordingAction::Start)
    }

    /// Send a start or stop request.
    pub async fn request(
        &mut self,
        action: RecordingAction,
        room_name: &str,
        encrypted: bool,
    ) -> Result<(), RecordingError> {
        if encrypted {
            return Err(RecordingError::EncryptedRoom);
        }
        if self.processing {
            return Err(RecordingError::InProgress);
        }

        let url = self.request_url(action, room_name)?;
        self.processing = true;

        let result = self.client.get(url).send().await;
        let response = match result {
            Ok(response) => response,
            Err(err) => {
                self.processing = false;
                return Err(err.into());
            },
        };

        let status = response.status();
        if !status.is_success() {
            tracing::error!(
                status = status.as_u16(),
                room = room_name,
                "error handling recording request, check server logs"
            );
            self.processing = false;
            return Err(RecordingError::Rejected { status: status.as_u16() });
        }

        tracing::info!(?action, room = room_name, "recording request accepted");
        Ok(())
    }
}
