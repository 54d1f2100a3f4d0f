//! Scripted key provider and connection-details resolver.

use std::{
    collections::VecDeque,
    sync::{Mutex, PoisonError},
};

use async_trait::async_trait;
use sofia_client::{
    ConnectionDetailResolver, ExternalKeyProvider, KeyProvider, KeyProviderError, ResolveError,
};
use sofia_core::{ConnectionDetails, ConnectionDetailsRequest};
use sofia_crypto::{KeyError, Passphrase};

use crate::trace::{Call, CallTrace};

/// Key provider that records calls and can be told to fail.
///
/// Successful installs go to a real [`ExternalKeyProvider`], so frames can
/// be sealed with whatever key the session installed.
#[derive(Debug)]
pub struct SimKeyProvider {
    trace: CallTrace,
    fail: bool,
    inner: ExternalKeyProvider,
}

impl SimKeyProvider {
    /// Provider that installs keys normally.
    pub fn new(trace: CallTrace) -> Self {
        Self { trace, fail: false, inner: ExternalKeyProvider::new() }
    }

    /// Provider whose `set_key` always fails.
    pub fn failing(trace: CallTrace) -> Self {
        Self { fail: true, ..Self::new(trace) }
    }

    /// The provider holding the installed key.
    pub fn inner(&self) -> &ExternalKeyProvider {
        &self.inner
    }
}

#[async_trait]
impl KeyProvider for SimKeyProvider {
    async fn set_key(&self, passphrase: &Passphrase) -> Result<(), KeyProviderError> {
        self.trace.record(Call::SetKeyStarted);
        if self.fail {
            return Err(KeyProviderError::Key(KeyError::Derivation));
        }
        self.inner.set_key(passphrase).await?;
        self.trace.record(Call::SetKeyResolved);
        Ok(())
    }
}

/// Answer the simulated resolver gives to one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Return these details.
    Details(ConnectionDetails),
    /// Fail with this HTTP status.
    Status(u16),
}

/// Resolver answering from a queue. Once the queue is empty every request
/// gets [`SimResolver::default_details`].
#[derive(Debug)]
pub struct SimResolver {
    trace: CallTrace,
    answers: Mutex<VecDeque<Resolution>>,
}

impl SimResolver {
    /// Resolver that always succeeds.
    pub fn new(trace: CallTrace) -> Self {
        Self { trace, answers: Mutex::new(VecDeque::new()) }
    }

    /// Queue an answer for the next request.
    pub fn push(&self, answer: Resolution) {
        self.answers.lock().unwrap_or_else(PoisonError::into_inner).push_back(answer);
    }

    /// Details returned when no answer is queued.
    pub fn default_details() -> ConnectionDetails {
        ConnectionDetails {
            server_url: "wss://media.sim".to_string(),
            participant_token: "sim-token".to_string(),
            room_name: "sim-room".to_string(),
        }
    }
}

#[async_trait]
impl ConnectionDetailResolver for SimResolver {
    async fn resolve(
        &self,
        request: &ConnectionDetailsRequest,
    ) -> Result<ConnectionDetails, ResolveError> {
        self.trace.record(Call::Resolve {
            room_name: request.room_name.clone(),
            participant_name: request.participant_name.clone(),
        });

        let answer = self.answers.lock().unwrap_or_else(PoisonError::into_inner).pop_front();
        match answer {
            Some(Resolution::Details(details)) => Ok(details),
            Some(Resolution::Status(status)) => {
                Err(ResolveError::Status { status, body: "simulated failure".to_string() })
            },
            None => Ok(Self::default_details()),
        }
    }
}
