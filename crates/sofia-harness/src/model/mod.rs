//! Reference model for model-based testing.
//!
//! The model is a flat re-statement of the session lifecycle: which inputs
//! are accepted in which state, and which side effects each accepted input
//! causes. It serves as the oracle the real controller is checked against.
//!
//! # Design Principles
//!
//! - Simplicity: The model should be obviously correct
//! - Effects are counted, not executed
//! - Deterministic: Same inputs produce same outputs

pub mod operation;
mod session;

pub use operation::{EncryptionOutcome, ModelDevice, Operation, OperationResult, StatsSample};
pub use session::{CONSTRAINED_SAMPLES, EffectCounts, ModelPublish, ModelSession, ObservableState};
