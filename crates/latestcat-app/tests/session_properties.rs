//! Property-based tests for the Session state machine.
//!
//! Tests verify that invariants hold under arbitrary event sequences.
//! This ensures behavioral correctness across all possible execution paths.

use latestcat_app::{
    CloseReason, KeyInput, LookupError, Phase, Release, Session, SessionAction, SessionConfig,
    SessionEvent,
};
use proptest::prelude::*;

fn release_strategy() -> impl Strategy<Value = Release> {
    ("[a-z]{1,8}", "[0-9]\\.[0-9]{1,2}").prop_map(|(name, version)| Release {
        slug: name.clone(),
        name,
        version,
    })
}

fn key_strategy() -> impl Strategy<Value = KeyInput> {
    prop_oneof![
        8 => any::<char>().prop_map(KeyInput::Char),
        2 => Just(KeyInput::Enter),
        1 => Just(KeyInput::Backspace),
        1 => Just(KeyInput::Delete),
        1 => Just(KeyInput::Left),
        1 => Just(KeyInput::Right),
        1 => Just(KeyInput::Home),
        1 => Just(KeyInput::End),
        1 => Just(KeyInput::KillToStart),
        1 => Just(KeyInput::KillToEnd),
    ]
}

/// Generate random session events. Quit keys and cancellation are rare so
/// sequences get deep into the lifecycle.
fn event_strategy() -> impl Strategy<Value = SessionEvent> {
    let result = prop_oneof![
        release_strategy().prop_map(|r| Ok(Some(r))),
        Just(Ok(None)),
        Just(Err(LookupError::Timeout)),
        Just(Err(LookupError::Status(503))),
    ];

    prop_oneof![
        10 => key_strategy().prop_map(SessionEvent::Key),
        3 => (0u64..4, result).prop_map(|(generation, result)| SessionEvent::LookupCompleted {
            generation,
            result,
        }),
        3 => Just(SessionEvent::CountdownTick),
        2 => Just(SessionEvent::SpinnerTick),
        1 => Just(SessionEvent::BlinkTick),
        1 => (1u16..300, 1u16..100).prop_map(|(cols, rows)| SessionEvent::Resize { cols, rows }),
        1 => Just(SessionEvent::Key(KeyInput::Esc)),
        1 => Just(SessionEvent::Cancel(CloseReason::Disconnected)),
    ]
}

/// Invariants that must hold after every event.
fn check_invariants(session: &Session) -> Result<(), TestCaseError> {
    let phase = session.phase();

    let countdown_expected = matches!(
        phase,
        Phase::Found { .. }
            | Phase::NotFound { .. }
            | Phase::Closing { reason: CloseReason::CountdownElapsed }
    );
    prop_assert_eq!(session.countdown().is_some(), countdown_expected);
    prop_assert_eq!(session.release().is_some(), matches!(phase, Phase::Found { .. }));
    prop_assert!(session.input().len() <= session.config().char_limit);
    prop_assert!(session.input().cursor() <= session.input().len());
    prop_assert!(session.input_focused());

    if let Phase::Loading { generation, .. } = phase {
        prop_assert_eq!(*generation, session.generation());
    }
    if let Some(countdown) = session.countdown() {
        prop_assert!(countdown <= session.config().countdown_secs);
    }
    Ok(())
}

proptest! {
    #[test]
    fn prop_session_invariants_hold(events in prop::collection::vec(event_strategy(), 0..80)) {
        let mut session = Session::new(SessionConfig::default(), "xterm".into(), (80, 24));

        for event in events {
            let was_closed = session.is_closed();
            let before = session.phase().clone();
            let actions = session.handle(event);

            check_invariants(&session)?;

            // Closing is terminal and silent
            if was_closed {
                prop_assert_eq!(session.phase(), &before);
                prop_assert!(actions.is_empty());
            }
        }
    }

    #[test]
    fn prop_lookup_issued_once_per_loading_entry(
        events in prop::collection::vec(event_strategy(), 0..80)
    ) {
        let mut session = Session::new(SessionConfig::default(), "xterm".into(), (80, 24));
        let mut issued = 0u64;

        for event in events {
            let was_loading = matches!(session.phase(), Phase::Loading { .. });
            let actions = session.handle(event);
            let lookups: Vec<_> = actions
                .iter()
                .filter(|a| matches!(a, SessionAction::Lookup { .. }))
                .collect();

            prop_assert!(lookups.len() <= 1);
            if let Some(SessionAction::Lookup { generation, .. }) = lookups.first() {
                prop_assert!(!was_loading);
                issued += 1;
                prop_assert_eq!(*generation, issued);
            }
        }

        prop_assert_eq!(session.generation(), issued);
    }

    #[test]
    fn prop_close_action_emitted_exactly_once(
        events in prop::collection::vec(event_strategy(), 0..80)
    ) {
        let mut session = Session::new(SessionConfig::default(), "xterm".into(), (80, 24));
        let mut closes = 0;

        for event in events {
            closes += session
                .handle(event)
                .iter()
                .filter(|a| matches!(a, SessionAction::Close { .. }))
                .count();
        }

        prop_assert_eq!(closes, usize::from(session.is_closed()));
    }

    #[test]
    fn prop_resize_never_changes_phase(
        events in prop::collection::vec(event_strategy(), 0..40),
        cols in 1u16..500,
        rows in 1u16..200,
    ) {
        let mut session = Session::new(SessionConfig::default(), "xterm".into(), (80, 24));
        for event in events {
            let _ = session.handle(event);
        }

        let before = session.phase().clone();
        let _ = session.handle(SessionEvent::Resize { cols, rows });

        prop_assert_eq!(session.phase(), &before);
        prop_assert_eq!(session.terminal_size(), (cols, rows));
    }

    #[test]
    fn prop_countdown_closes_after_n_ticks(countdown_secs in 1u32..20, found in any::<bool>()) {
        let config = SessionConfig { countdown_secs, ..SessionConfig::default() };
        let mut session = Session::new(config, "xterm".into(), (80, 24));
        let _ = session.handle(SessionEvent::Key(KeyInput::Enter));

        let result = if found {
            Ok(Some(Release { slug: "go".into(), name: "Go".into(), version: "1.22".into() }))
        } else {
            Ok(None)
        };
        let _ = session.handle(SessionEvent::LookupCompleted { generation: 1, result });

        for remaining in (1..countdown_secs).rev() {
            prop_assert_eq!(session.handle(SessionEvent::CountdownTick), vec![SessionAction::Render]);
            prop_assert_eq!(session.countdown(), Some(remaining));
        }

        prop_assert_eq!(
            session.handle(SessionEvent::CountdownTick),
            vec![SessionAction::Close { reason: CloseReason::CountdownElapsed }]
        );
        prop_assert!(session.is_closed());
        prop_assert!(session.handle(SessionEvent::CountdownTick).is_empty());
        prop_assert!(session.handle(SessionEvent::Key(KeyInput::Enter)).is_empty());
    }
}
