//! One simulated session with all of its collaborators.

use std::sync::Arc;

use sofia_client::{Collaborators, SessionHandle, SessionRuntime};
use sofia_core::{SessionConfig, SessionState};
use tokio::task::JoinHandle;

use crate::{
    sim_env::SimEnv,
    sim_services::{SimKeyProvider, SimResolver},
    sim_transport::{SimTransport, TransportScript},
    trace::CallTrace,
};

/// Simulated collaborators sharing one call trace.
#[derive(Debug, Clone)]
pub struct SimWorld {
    /// Shared call trace.
    pub trace: CallTrace,
    /// Simulated transport.
    pub transport: Arc<SimTransport>,
    /// Simulated key provider.
    pub keys: Arc<SimKeyProvider>,
    /// Simulated resolver.
    pub resolver: Arc<SimResolver>,
    /// Environment handed to the controller.
    pub env: SimEnv,
}

impl SimWorld {
    /// World where every collaborator succeeds.
    pub fn new(seed: u64) -> Self {
        Self::with_script(seed, TransportScript::default())
    }

    /// World with a scripted transport.
    pub fn with_script(seed: u64, script: TransportScript) -> Self {
        let trace = CallTrace::new();
        Self {
            transport: Arc::new(SimTransport::with_script(trace.clone(), script)),
            keys: Arc::new(SimKeyProvider::new(trace.clone())),
            resolver: Arc::new(SimResolver::new(trace.clone())),
            env: SimEnv::with_seed(seed),
            trace,
        }
    }

    /// Replace the key provider with one that always fails.
    #[must_use]
    pub fn with_failing_keys(mut self) -> Self {
        self.keys = Arc::new(SimKeyProvider::failing(self.trace.clone()));
        self
    }

    /// Collaborators for a runtime.
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            transport: Arc::clone(&self.transport) as _,
            keys: Arc::clone(&self.keys) as _,
            resolver: Arc::clone(&self.resolver) as _,
        }
    }

    /// Spawn a runtime for `config` on the current Tokio runtime.
    pub fn spawn(&self, config: SessionConfig) -> (SessionHandle, JoinHandle<SessionState>) {
        let (runtime, handle) = SessionRuntime::new(self.env.clone(), config, self.collaborators());
        (handle, runtime.spawn())
    }
}
