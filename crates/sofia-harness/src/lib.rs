//! Deterministic simulation harness for Sofia sessions.
//!
//! Scripted implementations of the Environment, Transport, key provider and
//! resolver seams. All collaborators record into one shared call trace, so
//! tests can assert on the order in which a session touches them.
//!
//! # Model-Based Testing
//!
//! The `model` module provides a reference implementation for model-based
//! testing. Operations are applied to both the model and the real
//! controller, and their observable states are compared.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod model;
pub mod sim_env;
pub mod sim_services;
pub mod sim_transport;
pub mod sim_world;
pub mod trace;

pub use model::{
    CONSTRAINED_SAMPLES, EffectCounts, EncryptionOutcome, ModelDevice, ModelPublish, ModelSession,
    ObservableState, Operation, OperationResult, StatsSample,
};
pub use sim_env::SimEnv;
pub use sim_services::{Resolution, SimKeyProvider, SimResolver};
pub use sim_transport::{SimTransport, TransportScript};
pub use sim_world::SimWorld;
pub use trace::{Call, CallTrace};
