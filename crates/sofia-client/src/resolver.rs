//! Connection detail resolution.
//!
//! Fetches the media server URL and participant token for a room from the
//! application's connection-details endpoint.

use async_trait::async_trait;
use reqwest::Url;
use sofia_core::{ConnectionDetails, ConnectionDetailsRequest};

use crate::error::ResolveError;

/// Fetches connection details for a session.
#[async_trait]
pub trait ConnectionDetailResolver: Send + Sync + 'static {
    /// Resolve details for a request.
    async fn resolve(
        &self,
        request: &ConnectionDetailsRequest,
    ) -> Result<ConnectionDetails, ResolveError>;
}

/// Resolver backed by an HTTP `GET` to the connection-details endpoint.
///
/// The endpoint takes `roomName`, `participantName` and an optional `region`
/// as query parameters and answers with
/// `{"serverUrl", "participantToken", "roomName"}`.
#[derive(Debug, Clone)]
pub struct HttpResolver {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpResolver {
    /// Create a resolver for an absolute endpoint URL.
    pub fn new(endpoint: Url) -> Self {
        Self { client: reqwest::Client::new(), endpoint }
    }

    /// Endpoint this resolver queries.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Full request URL for a request.
    pub fn request_url(&self, request: &ConnectionDetailsRequest) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("roomName", &request.room_name);
            query.append_pair("participantName", &request.participant_name);
            if let Some(region) = &request.region {
                query.append_pair("region", region);
            }
        }
        url
    }
}

#[async_trait]
impl ConnectionDetailResolver for HttpResolver {
    async fn resolve(
        &self,
        request: &ConnectionDetailsRequest,
    ) -> Result<ConnectionDetails, ResolveError> {
        let url = self.request_url(request);
        tracing::debug!(request = %request.id, room = %request.room_name, "fetching connection details");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ResolveError::Status { status: status.as_u16(), body });
        }

        Ok(response.json::<ConnectionDetails>().await?)
    }
}
