//! Fuzz target for the [`SessionController`] state machine
//!
//! Media must never flow unencrypted in an encrypted room, and teardown must
//! happen exactly once.
//!
//! # Strategy
//!
//! - Event sequences: Arbitrary interleavings of intents, completions,
//!   transport events and statistics samples
//! - Stale completions: Answers to superseded details requests
//! - Late completions: Results arriving after teardown started
//!
//! # Invariants
//!
//! - `Connect` ONLY after `Subscribe`, and after `EnableEncryption` when the
//!   room is encrypted
//! - Unencrypted rooms NEVER touch the key provider
//! - No transition FROM `Terminated` (terminal invariant)
//! - `Disconnect` and `Unsubscribe` at most once each
//! - `Disconnect` only after `Connect`
//! - Controller matches the reference model after every event
//! - NEVER panic on an out-of-order event

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sofia_core::{
    EncryptionConfig, RequestId, SessionAction, SessionConfig, SessionController, SessionState,
};
use sofia_crypto::Passphrase;
use sofia_harness::{ModelSession, Operation, OperationResult, SimEnv};

#[derive(Debug, Clone, Arbitrary)]
struct FuzzInput {
    /// Room is end-to-end encrypted.
    encrypted: bool,
    /// Seed for the simulated environment.
    seed: u64,
    /// Operation sequence to process.
    operations: Vec<Operation>,
}

#[derive(Debug, Default)]
struct Seen {
    subscribe: bool,
    encryption_enabled: bool,
    connect: bool,
    disconnects: u32,
    unsubscribes: u32,
}

fuzz_target!(|input: FuzzInput| {
    let mut config = SessionConfig::new("fuzz-room");
    if input.encrypted {
        let Ok(passphrase) = Passphrase::new("fuzz passphrase") else {
            return;
        };
        config = config.with_encryption(EncryptionConfig::with_passphrase(passphrase));
    }

    let mut controller = SessionController::new(SimEnv::with_seed(input.seed), config);
    let mut model = ModelSession::new(input.encrypted);
    let mut latest = RequestId(0);
    let mut seen = Seen::default();

    for op in input.operations {
        let previous = controller.state();
        let result = controller.handle(op.to_event(latest));

        let real_result = match result {
            Ok(actions) => {
                for action in actions {
                    match action {
                        SessionAction::ResolveConnectionDetails(request) => latest = request.id,
                        SessionAction::Subscribe => seen.subscribe = true,
                        SessionAction::InstallKey(_) | SessionAction::EnableEncryption => {
                            assert!(input.encrypted, "key provider used in unencrypted room");
                            if matches!(action, SessionAction::EnableEncryption) {
                                seen.encryption_enabled = true;
                            }
                        },
                        SessionAction::Connect { ref room, .. } => {
                            assert!(seen.subscribe, "connect before subscribe");
                            assert!(
                                !input.encrypted || seen.encryption_enabled,
                                "connect before encryption was enabled"
                            );
                            assert_eq!(room.e2ee, input.encrypted);
                            seen.connect = true;
                        },
                        SessionAction::Disconnect => {
                            assert!(seen.connect, "disconnect without connect");
                            seen.disconnects += 1;
                        },
                        SessionAction::Unsubscribe => seen.unsubscribes += 1,
                        SessionAction::Publish { .. }
                        | SessionAction::Notify(_)
                        | SessionAction::StageQualityProfile(_)
                        | SessionAction::ReturnToEntry => {},
                    }
                }
                OperationResult::Ok
            },
            Err(_) => {
                assert_eq!(controller.state(), previous, "rejected event changed state");
                OperationResult::Rejected
            },
        };

        if let SessionState::Terminated(_) = previous {
            assert_eq!(controller.state(), previous, "transitioned FROM Terminated");
        }
        assert!(seen.disconnects <= 1, "disconnect emitted twice");
        assert!(seen.unsubscribes <= 1, "unsubscribe emitted twice");

        assert_eq!(model.apply(op), real_result, "result diverged on {op:?}");
        assert_eq!(model.observable().state, controller.state(), "state diverged on {op:?}");
    }
});
