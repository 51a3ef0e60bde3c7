//! Fuzz target for the Session state machine
//!
//! Ensure the reducer keeps its invariants under any event order (HIGH
//! priority)
//!
//! # Strategy
//!
//! - Keys: arbitrary characters and editing keys, including Enter mid-lookup
//! - Lookups: completions for current, stale and future generations
//! - Timers: countdown, spinner and blink ticks in every phase
//! - Cancellation: quit keys, disconnect and shutdown at any point
//!
//! # Invariants
//!
//! - Countdown exists only in Found/NotFound (or Closing after it elapsed)
//! - Release exists only in Found
//! - Input never exceeds its limit
//! - Closing is terminal: no further actions, no phase change
//! - Rendering never panics

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use latestcat_app::{
    CloseReason, KeyInput, LookupError, Phase, Release, Session, SessionConfig, SessionEvent,
    Theme, render,
};

#[derive(Debug, Clone, Arbitrary)]
enum Op {
    Char(char),
    Enter,
    Backspace,
    Delete,
    Left,
    Right,
    Home,
    End,
    KillToStart,
    KillToEnd,
    Esc,
    Found { generation_offset: i8, version: String },
    NotFound { generation_offset: i8 },
    Failed { generation_offset: i8 },
    CountdownTick,
    SpinnerTick,
    BlinkTick,
    Resize { cols: u16, rows: u16 },
    Disconnect,
    Render,
}

fn generation(session: &Session, offset: i8) -> u64 {
    session.generation().saturating_add_signed(i64::from(offset))
}

fuzz_target!(|input: (u8, Vec<Op>)| {
    let (countdown_secs, ops) = input;
    let config = SessionConfig { countdown_secs: u32::from(countdown_secs % 8), ..SessionConfig::default() };
    let mut session = Session::new(config, "xterm-256color".into(), (80, 24));
    let theme = Theme::default();

    for op in ops {
        let event = match op {
            Op::Char(c) => SessionEvent::Key(KeyInput::Char(c)),
            Op::Enter => SessionEvent::Key(KeyInput::Enter),
            Op::Backspace => SessionEvent::Key(KeyInput::Backspace),
            Op::Delete => SessionEvent::Key(KeyInput::Delete),
            Op::Left => SessionEvent::Key(KeyInput::Left),
            Op::Right => SessionEvent::Key(KeyInput::Right),
            Op::Home => SessionEvent::Key(KeyInput::Home),
            Op::End => SessionEvent::Key(KeyInput::End),
            Op::KillToStart => SessionEvent::Key(KeyInput::KillToStart),
            Op::KillToEnd => SessionEvent::Key(KeyInput::KillToEnd),
            Op::Esc => SessionEvent::Key(KeyInput::Esc),
            Op::Found { generation_offset, version } => SessionEvent::LookupCompleted {
                generation: generation(&session, generation_offset),
                result: Ok(Some(Release { slug: "x".into(), name: "X".into(), version })),
            },
            Op::NotFound { generation_offset } => SessionEvent::LookupCompleted {
                generation: generation(&session, generation_offset),
                result: Ok(None),
            },
            Op::Failed { generation_offset } => SessionEvent::LookupCompleted {
                generation: generation(&session, generation_offset),
                result: Err(LookupError::Transport("reset".into())),
            },
            Op::CountdownTick => SessionEvent::CountdownTick,
            Op::SpinnerTick => SessionEvent::SpinnerTick,
            Op::BlinkTick => SessionEvent::BlinkTick,
            Op::Resize { cols, rows } => SessionEvent::Resize { cols, rows },
            Op::Disconnect => SessionEvent::Cancel(CloseReason::Disconnected),
            Op::Render => {
                let _ = render::render(&session, &theme);
                continue;
            },
        };

        let was_closed = session.is_closed();
        let before = session.phase().clone();
        let actions = session.handle(event);

        if was_closed {
            assert!(actions.is_empty());
            assert_eq!(session.phase(), &before);
        }

        let phase = session.phase();
        assert_eq!(
            session.countdown().is_some(),
            matches!(
                phase,
                Phase::Found { .. }
                    | Phase::NotFound { .. }
                    | Phase::Closing { reason: CloseReason::CountdownElapsed }
            )
        );
        assert_eq!(session.release().is_some(), matches!(phase, Phase::Found { .. }));
        assert!(session.input().len() <= session.config().char_limit);
    }
});
