//! Model-based property tests.
//!
//! These tests generate random operation sequences and verify that the real
//! controller behaves identically to the reference model.
//!
//! # Architecture
//!
//! ```text
//! proptest generates: Vec<Operation>
//!                          │
//!           ┌──────────────┼──────────────┐
//!           ▼              ▼              ▼
//!     ModelSession    RealSession      Compare
//!     (reference)    (controller)     Observables
//! ```

#![allow(clippy::expect_used)]

use proptest::prelude::*;
use sofia_core::{
    EncryptionConfig, MediaDevice, PublishStatus, RequestId, SessionAction, SessionConfig,
    SessionController, SessionState,
};
use sofia_crypto::Passphrase;
use sofia_harness::{
    EffectCounts, EncryptionOutcome, ModelDevice, ModelPublish, ModelSession, ObservableState, Operation,
    OperationResult, SimEnv, StatsSample,
};

/// Real controller wrapper that mirrors ModelSession's interface.
struct RealSession {
    controller: SessionController<SimEnv>,
    latest: RequestId,
    effects: EffectCounts,
    /// Actions in emission order, for ordering invariants.
    log: Vec<SessionAction>,
}

impl RealSession {
    fn new(encrypted: bool, seed: u64) -> Self {
        let mut config = SessionConfig::new("sim-room");
        if encrypted {
            let passphrase = Passphrase::new("correct horse").expect("passphrase");
            config = config.with_encryption(EncryptionConfig::with_passphrase(passphrase));
        }
        Self {
            controller: SessionController::new(SimEnv::with_seed(seed), config),
            latest: RequestId(0),
            effects: EffectCounts::default(),
            log: Vec::new(),
        }
    }

    fn apply(&mut self, op: Operation) -> OperationResult {
        match self.controller.handle(op.to_event(self.latest)) {
            Ok(actions) => {
                for action in actions {
                    self.count(&action);
                    self.log.push(action);
                }
                OperationResult::Ok
            },
            Err(_) => OperationResult::Rejected,
        }
    }

    fn count(&mut self, action: &SessionAction) {
        let effects = &mut self.effects;
        match action {
            SessionAction::ResolveConnectionDetails(request) => {
                self.latest = request.id;
                effects.resolves += 1;
            },
            SessionAction::Subscribe => effects.subscribes += 1,
            SessionAction::InstallKey(_) => effects.key_installs += 1,
            SessionAction::EnableEncryption => effects.encryption_enables += 1,
            SessionAction::Connect { .. } => effects.connects += 1,
            SessionAction::Publish { .. } => effects.publishes += 1,
            SessionAction::Disconnect => effects.disconnects += 1,
            SessionAction::Unsubscribe => effects.unsubscribes += 1,
            SessionAction::Notify(_) => effects.notifications += 1,
            SessionAction::StageQualityProfile(_) => effects.staged_profiles += 1,
            SessionAction::ReturnToEntry => effects.returns_to_entry += 1,
        }
    }

    fn observable(&self) -> ObservableState {
        ObservableState {
            state: self.controller.state(),
            camera: publish(self.controller.publish_status(MediaDevice::Camera)),
            microphone: publish(self.controller.publish_status(MediaDevice::Microphone)),
            degraded: self.controller.degraded(),
            effects: self.effects,
        }
    }

    fn position(&self, predicate: impl Fn(&SessionAction) -> bool) -> Option<usize> {
        self.log.iter().position(predicate)
    }
}

fn publish(status: &PublishStatus) -> ModelPublish {
    match status {
        PublishStatus::Skipped => ModelPublish::Skipped,
        PublishStatus::Pending => ModelPublish::Pending,
        PublishStatus::Published => ModelPublish::Published,
        PublishStatus::Failed { .. } => ModelPublish::Failed,
    }
}

/// Operations weighted toward the happy path so long sequences get past
/// the pre-join form.
fn operation_strategy() -> impl Strategy<Value = Operation> {
    prop_oneof![
        4 => (prop::bool::weighted(0.2), any::<bool>(), any::<bool>())
            .prop_map(|(blank_name, video, audio)| Operation::Submit { blank_name, video, audio }),
        4 => (prop::bool::weighted(0.8), prop::bool::weighted(0.8))
            .prop_map(|(ok, valid)| Operation::ResolveDetails { ok, valid }),
        1 => Just(Operation::ResolveStale),
        3 => prop::bool::weighted(0.85).prop_map(|ok| Operation::KeyInstalled { ok }),
        3 => prop_oneof![
            6 => Just(EncryptionOutcome::Ok),
            1 => Just(EncryptionOutcome::Unsupported),
            1 => Just(EncryptionOutcome::Failed),
        ]
        .prop_map(Operation::EncryptionEnabled),
        3 => prop::bool::weighted(0.85).prop_map(|ok| Operation::Connected { ok }),
        3 => (prop_oneof![Just(ModelDevice::Camera), Just(ModelDevice::Microphone)], any::<bool>())
            .prop_map(|(device, ok)| Operation::Published { device, ok }),
        1 => Just(Operation::Disconnected),
        1 => Just(Operation::EncryptionFailure),
        1 => Just(Operation::MediaDevicesFailure),
        1 => any::<bool>().prop_map(|recording| Operation::RecordingChanged { recording }),
        1 => Just(Operation::CpuConstrained),
        3 => prop_oneof![
            3 => Just(StatsSample::Constrained),
            1 => Just(StatsSample::Healthy),
            1 => Just(StatsSample::Failed),
        ]
        .prop_map(Operation::Stats),
        2 => Just(Operation::TeardownComplete),
        1 => Just(Operation::Leave),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    /// Core model-based test: real controller matches the model.
    #[test]
    fn prop_controller_matches_model(
        encrypted in any::<bool>(),
        seed in any::<u64>(),
        ops in prop::collection::vec(operation_strategy(), 1..60)
    ) {
        let mut model = ModelSession::new(encrypted);
        let mut real = RealSession::new(encrypted, seed);

        for (i, op) in ops.iter().enumerate() {
            let model_result = model.apply(*op);
            let real_result = real.apply(*op);

            prop_assert_eq!(
                &model_result, &real_result,
                "Operation {} ({:?}) result mismatch", i, op
            );
            prop_assert_eq!(
                model.observable(), real.observable(),
                "Observable state mismatch after operation {} ({:?})", i, op
            );
        }
    }

    /// Safety properties hold for any sequence of inputs.
    #[test]
    fn prop_teardown_and_ordering_invariants(
        encrypted in any::<bool>(),
        ops in prop::collection::vec(any_operation(), 1..80)
    ) {
        let mut real = RealSession::new(encrypted, 7);
        let mut terminated_at = None;

        for (i, op) in ops.iter().enumerate() {
            real.apply(*op);

            let state = real.controller.state();
            if let Some(previous) = terminated_at {
                prop_assert_eq!(state, previous, "left Terminated at operation {}", i);
            } else if state.is_terminated() {
                terminated_at = Some(state);
            }
        }

        let effects = real.effects;
        prop_assert!(effects.disconnects <= 1, "disconnect emitted {} times", effects.disconnects);
        prop_assert!(effects.unsubscribes <= 1, "unsubscribe emitted {} times", effects.unsubscribes);
        prop_assert!(effects.connects <= 1, "connect emitted {} times", effects.connects);
        prop_assert!(effects.returns_to_entry <= 1);

        if let Some(connect) = real.position(|a| matches!(a, SessionAction::Connect { .. })) {
            let subscribe = real.position(|a| matches!(a, SessionAction::Subscribe));
            prop_assert!(subscribe.is_some_and(|s| s < connect), "connect before subscribe");

            if encrypted {
                let enable = real.position(|a| matches!(a, SessionAction::EnableEncryption));
                prop_assert!(enable.is_some_and(|e| e < connect), "connect before encryption");
            }
        }
        if !encrypted {
            prop_assert_eq!(effects.key_installs, 0);
            prop_assert_eq!(effects.encryption_enables, 0);
        }
    }
}

/// Unweighted operations, as the fuzzer generates them.
fn any_operation() -> impl Strategy<Value = Operation> {
    any::<[u8; 16]>().prop_map(|bytes| {
        let mut data = arbitrary::Unstructured::new(&bytes);
        data.arbitrary().unwrap_or(Operation::Leave)
    })
}

#[cfg(test)]
mod smoke_tests {
    use sofia_core::TerminationReason;

    use super::*;

    fn drive(real: &mut RealSession, model: &mut ModelSession, ops: &[Operation]) {
        for op in ops {
            assert_eq!(model.apply(*op), real.apply(*op), "{op:?}");
            assert_eq!(model.observable(), real.observable(), "{op:?}");
        }
    }

    #[test]
    fn encrypted_happy_path_matches() {
        let mut real = RealSession::new(true, 1);
        let mut model = ModelSession::new(true);

        drive(&mut real, &mut model, &[
            Operation::Submit { blank_name: false, video: true, audio: true },
            Operation::ResolveDetails { ok: true, valid: true },
            Operation::KeyInstalled { ok: true },
            Operation::EncryptionEnabled(EncryptionOutcome::Ok),
            Operation::Connected { ok: true },
            Operation::Published { device: ModelDevice::Camera, ok: true },
            Operation::Published { device: ModelDevice::Microphone, ok: false },
        ]);

        assert_eq!(real.controller.state(), SessionState::Active);
        assert_eq!(real.effects.notifications, 1);
    }

    #[test]
    fn stale_resolution_after_resubmit_is_ignored() {
        let mut real = RealSession::new(false, 2);
        let mut model = ModelSession::new(false);

        drive(&mut real, &mut model, &[
            Operation::Submit { blank_name: false, video: false, audio: false },
            Operation::ResolveDetails { ok: false, valid: true },
            Operation::Submit { blank_name: false, video: false, audio: false },
            Operation::ResolveStale,
        ]);

        assert_eq!(real.controller.state(), SessionState::AwaitingConnectionDetails);
        assert_eq!(real.effects.resolves, 2);
    }

    #[test]
    fn sustained_constraint_degrades_once() {
        let mut real = RealSession::new(false, 3);
        let mut model = ModelSession::new(false);

        drive(&mut real, &mut model, &[
            Operation::Submit { blank_name: false, video: false, audio: false },
            Operation::ResolveDetails { ok: true, valid: true },
            Operation::Connected { ok: true },
            Operation::Stats(StatsSample::Constrained),
            Operation::Stats(StatsSample::Constrained),
            Operation::Stats(StatsSample::Constrained),
            Operation::Stats(StatsSample::Constrained),
            Operation::CpuConstrained,
        ]);

        assert!(real.controller.degraded());
        assert_eq!(real.effects.staged_profiles, 1);
    }

    #[test]
    fn remote_disconnect_while_active_tears_down_once() {
        let mut real = RealSession::new(false, 4);
        let mut model = ModelSession::new(false);

        drive(&mut real, &mut model, &[
            Operation::Submit { blank_name: false, video: false, audio: false },
            Operation::ResolveDetails { ok: true, valid: true },
            Operation::Connected { ok: true },
            Operation::Disconnected,
            Operation::Leave,
            Operation::TeardownComplete,
        ]);

        assert_eq!(
            real.controller.state(),
            SessionState::Terminated(TerminationReason::Disconnected)
        );
        assert_eq!(real.effects.disconnects, 1);
    }
}
