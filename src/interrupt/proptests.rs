//! Property-based tests for the interrupt state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::*;
use proptest::prelude::*;
use serde_json::{Map, Value};

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_json_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
        "[a-zA-Z0-9 ]{0,12}".prop_map(Value::from),
        Just(Value::Null),
    ]
}

fn arb_args() -> impl Strategy<Value = Map<String, Value>> {
    proptest::collection::btree_map("[a-z]{1,6}", arb_json_leaf(), 0..6)
        .prop_map(|entries| entries.into_iter().collect())
}

fn arb_config() -> impl Strategy<Value = ResponseConfig> {
    (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
        |(approve, edit, ignore, respond)| ResponseConfig {
            approve,
            edit,
            ignore,
            respond,
        },
    )
}

fn arb_interrupt() -> impl Strategy<Value = Interrupt> {
    prop_oneof![
        ("[a-z0-9]{4}", "[a-zA-Z ?]{1,20}")
            .prop_map(|(id, prompt)| Interrupt::question(id, prompt)),
        ("[a-z0-9]{4}", "[a-z_]{3,10}", arb_args(), arb_config())
            .prop_map(|(id, action, args, config)| Interrupt::action(id, action, args, config)),
    ]
}

fn arb_response() -> impl Strategy<Value = InterruptResponse> {
    prop_oneof![
        arb_args().prop_map(InterruptResponse::Approve),
        Just(InterruptResponse::Ignore(Map::new())),
        "[a-z ]{1,20}".prop_map(InterruptResponse::Response),
    ]
}

fn arb_state() -> impl Strategy<Value = InterruptState> {
    prop_oneof![
        Just(InterruptState::Running),
        (arb_interrupt(), "[a-z ]{0,10}", proptest::option::of(arb_response())).prop_map(
            |(interrupt, draft, pending)| InterruptState::Interrupted {
                interrupt,
                draft,
                pending,
            }
        ),
        (arb_interrupt(), "[a-z ]{0,10}", arb_response()).prop_map(
            |(interrupt, draft, response)| InterruptState::Resuming {
                interrupt,
                draft,
                response,
            }
        ),
    ]
}

fn arb_decision() -> impl Strategy<Value = Decision> {
    prop_oneof![
        Just(Decision::Approve),
        arb_args().prop_map(Decision::Edit),
        Just(Decision::Ignore),
        "[a-z ]{0,20}".prop_map(Decision::Respond),
    ]
}

fn arb_event() -> impl Strategy<Value = InterruptEvent> {
    prop_oneof![
        arb_interrupt().prop_map(InterruptEvent::InterruptReceived),
        Just(InterruptEvent::StreamCompleted),
        "[a-z ]{1,20}".prop_map(|message| InterruptEvent::ResumeFailed { message }),
        "[a-z ]{0,10}".prop_map(InterruptEvent::DraftChanged),
        arb_decision().prop_map(InterruptEvent::Decide),
        arb_response().prop_map(InterruptEvent::Resume),
        Just(InterruptEvent::RetryResume),
        Just(InterruptEvent::Reset),
    ]
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_reset_always_returns_to_running(state in arb_state()) {
        let result = transition(&state, InterruptEvent::Reset).unwrap();
        prop_assert!(result.new_state.is_running());
        let submitted = result
            .effects
            .iter()
            .any(|e| matches!(e, Effect::SubmitResume { .. }));
        prop_assert!(!submitted);
    }

    #[test]
    fn prop_interrupt_frame_always_captured(state in arb_state(), interrupt in arb_interrupt()) {
        let event = InterruptEvent::InterruptReceived(interrupt.clone());
        let result = transition(&state, event).unwrap();
        prop_assert_eq!(result.new_state.active_interrupt(), Some(&interrupt));
    }

    #[test]
    fn prop_submit_effect_iff_resuming(state in arb_state(), event in arb_event()) {
        if let Ok(result) = transition(&state, event) {
            let submits = result
                .effects
                .iter()
                .filter(|e| matches!(e, Effect::SubmitResume { .. }))
                .count();
            if result.new_state.is_resuming() && !state.is_resuming() {
                prop_assert_eq!(submits, 1);
            } else {
                prop_assert_eq!(submits, 0);
            }
        }
    }

    #[test]
    fn prop_resume_payload_matches_state(state in arb_state(), event in arb_event()) {
        if let Ok(result) = transition(&state, event) {
            for effect in &result.effects {
                if let Effect::SubmitResume { response, .. } = effect {
                    match &result.new_state {
                        InterruptState::Resuming { response: held, .. } => {
                            prop_assert_eq!(held, response);
                        }
                        other => prop_assert!(false, "submit outside resuming: {:?}", other),
                    }
                }
            }
        }
    }

    #[test]
    fn prop_approve_round_trips_args(args in arb_args()) {
        let config = ResponseConfig { approve: true, ..ResponseConfig::default() };
        let interrupt = Interrupt::action("i", "act", args.clone(), config);
        let response = build_response(&interrupt, Decision::Approve).unwrap();
        prop_assert_eq!(response, InterruptResponse::Approve(args));
    }

    #[test]
    fn prop_edit_only_touches_changed_keys(args in arb_args(), changes in arb_args()) {
        let config = ResponseConfig { edit: true, ..ResponseConfig::default() };
        let interrupt = Interrupt::action("i", "act", args.clone(), config);
        let response = build_response(&interrupt, Decision::Edit(changes.clone())).unwrap();
        let InterruptResponse::Approve(merged) = response else {
            return Err(TestCaseError::fail("edit must produce approve"));
        };
        for (key, value) in &args {
            let expected = changes.get(key).unwrap_or(value);
            prop_assert_eq!(merged.get(key), Some(expected));
        }
        for (key, value) in &changes {
            prop_assert_eq!(merged.get(key), Some(value));
        }
        let keys: std::collections::HashSet<_> = args.keys().chain(changes.keys()).collect();
        prop_assert_eq!(merged.len(), keys.len());
    }

    #[test]
    fn prop_failed_resume_restores_same_interrupt(
        interrupt in arb_interrupt(),
        draft in "[a-z ]{0,10}",
        response in arb_response(),
    ) {
        let resuming = InterruptState::Resuming {
            interrupt: interrupt.clone(),
            draft: draft.clone(),
            response: response.clone(),
        };
        let failed = InterruptEvent::ResumeFailed { message: "boom".into() };
        let result = transition(&resuming, failed).unwrap();
        match result.new_state {
            InterruptState::Interrupted { interrupt: kept, draft: restored, pending } => {
                prop_assert_eq!(kept, interrupt);
                prop_assert_eq!(restored, draft);
                prop_assert_eq!(pending, Some(response));
            }
            other => prop_assert!(false, "expected interrupted, got {:?}", other),
        }
    }

    #[test]
    fn prop_event_sequences_never_panic(events in proptest::collection::vec(arb_event(), 0..30)) {
        let mut state = InterruptState::Running;
        for event in events {
            if let Ok(result) = transition(&state, event) {
                state = result.new_state;
            }
        }
        // Resuming always holds the interrupt it answers
        if let InterruptState::Resuming { interrupt, .. } = &state {
            prop_assert!(!interrupt.id.is_empty());
        }
    }
}
