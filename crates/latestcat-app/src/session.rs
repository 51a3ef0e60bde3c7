//! Session state machine.
//!
//! This module defines [`Session`], which owns everything one connected user
//! sees: the input field, the lookup lifecycle, the countdown and the spinner.
//! It is completely decoupled from I/O and timers.
//!
//! This is a pure state machine: it consumes [`crate::SessionEvent`] inputs
//! one at a time and produces [`crate::SessionAction`] instructions for the
//! runtime to execute.
//!
//! # Lookup generations
//!
//! Every entry into `Loading` bumps a generation counter and tags the issued
//! [`SessionAction::Lookup`] with it. A completion is accepted only if the
//! session is still `Loading` under that same generation; anything else is a
//! stale answer and is dropped without touching the phase.

use latestcat_lookup::{LookupResult, Release};

use crate::{Banner, CloseReason, InputState, KeyInput, Phase, SessionAction, SessionEvent};

/// Per-session settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Seconds a result stays on screen before the session closes.
    pub countdown_secs: u32,
    /// Maximum characters in the input field.
    pub char_limit: usize,
    /// Visible width of the input field in characters.
    pub input_width: usize,
    /// Hint shown while the input field is empty.
    pub placeholder: String,
    /// Decorative banner.
    pub banner: Banner,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            countdown_secs: 5,
            char_limit: 156,
            input_width: 20,
            placeholder: "Python".to_string(),
            banner: Banner::cat(),
        }
    }
}

/// Session state machine.
///
/// Pure state machine that processes events and produces actions.
/// No I/O dependencies - fully testable without a network or terminal.
#[derive(Debug, Clone)]
pub struct Session {
    config: SessionConfig,
    /// Current phase.
    phase: Phase,
    /// Text field. Only editable while `Idle`.
    input: InputState,
    /// Negotiated terminal type.
    terminal_type: String,
    /// Terminal dimensions (columns, rows).
    terminal_size: (u16, u16),
    /// Generation of the most recent `Loading` entry. 0 before the first.
    generation: u64,
    /// Spinner frame index. Reset on every `Loading` entry.
    spinner_frame: usize,
    /// Cursor blink state.
    cursor_visible: bool,
}

impl Session {
    /// Create a session for a freshly accepted connection.
    pub fn new(config: SessionConfig, terminal_type: String, terminal_size: (u16, u16)) -> Self {
        let input = InputState::new(config.char_limit);
        Self {
            config,
            phase: Phase::Idle,
            input,
            terminal_type,
            terminal_size,
            generation: 0,
            spinner_frame: 0,
            cursor_visible: true,
        }
    }

    /// Initialisation hook, called once before the first event.
    pub fn init(&self) -> Vec<SessionAction> {
        vec![SessionAction::Render]
    }

    /// Process an event and return actions for the runtime.
    pub fn handle(&mut self, event: SessionEvent) -> Vec<SessionAction> {
        if let SessionEvent::Resize { cols, rows } = event {
            self.terminal_size = (cols, rows);
            return if self.is_closed() { vec![] } else { vec![SessionAction::Render] };
        }

        if self.is_closed() {
            return vec![];
        }

        match event {
            SessionEvent::Key(KeyInput::Esc | KeyInput::Interrupt) => self.close(CloseReason::Quit),
            SessionEvent::Key(key) => self.handle_key(key),
            SessionEvent::LookupCompleted { generation, result } => {
                self.handle_lookup(generation, result)
            },
            SessionEvent::CountdownTick => self.handle_countdown_tick(),
            SessionEvent::SpinnerTick => {
                if !matches!(self.phase, Phase::Loading { .. }) {
                    return vec![];
                }
                self.spinner_frame = self.spinner_frame.wrapping_add(1);
                vec![SessionAction::Render]
            },
            SessionEvent::BlinkTick => {
                if self.phase != Phase::Idle {
                    return vec![];
                }
                self.cursor_visible = !self.cursor_visible;
                vec![SessionAction::Render]
            },
            SessionEvent::Cancel(reason) => self.close(reason),
            SessionEvent::Resize { .. } => vec![],
        }
    }

    /// Handle a non-quit key.
    fn handle_key(&mut self, key: KeyInput) -> Vec<SessionAction> {
        if self.phase != Phase::Idle {
            return vec![];
        }

        if key == KeyInput::Enter {
            return self.submit();
        }

        let was_hidden = !self.cursor_visible;
        self.cursor_visible = true;
        if self.input.apply(key) || was_hidden { vec![SessionAction::Render] } else { vec![] }
    }

    /// Enter `Loading` with the current input.
    fn submit(&mut self) -> Vec<SessionAction> {
        let query = self.input.value().trim().to_string();
        self.generation += 1;
        self.spinner_frame = 0;
        self.phase = Phase::Loading { query: query.clone(), generation: self.generation };

        tracing::debug!(generation = self.generation, %query, "lookup issued");
        vec![SessionAction::Lookup { generation: self.generation, query }, SessionAction::Render]
    }

    fn handle_lookup(&mut self, generation: u64, result: LookupResult) -> Vec<SessionAction> {
        let query = match &mut self.phase {
            Phase::Loading { query, generation: current } if *current == generation => {
                std::mem::take(query)
            },
            _ => {
                tracing::debug!(
                    generation,
                    current = self.generation,
                    phase = self.phase.name(),
                    "dropping stale lookup result"
                );
                return vec![];
            },
        };

        let countdown = self.config.countdown_secs;
        self.phase = match result {
            Ok(Some(release)) => Phase::Found { query, release, countdown },
            Ok(None) => Phase::NotFound { query, countdown },
            Err(e) => {
                tracing::debug!(generation, kind = e.kind(), "lookup failed, showing not found");
                Phase::NotFound { query, countdown }
            },
        };

        if countdown == 0 {
            return self.close(CloseReason::CountdownElapsed);
        }
        vec![SessionAction::StartCountdown { seconds: countdown }, SessionAction::Render]
    }

    fn handle_countdown_tick(&mut self) -> Vec<SessionAction> {
        let remaining = match &mut self.phase {
            Phase::Found { countdown, .. } | Phase::NotFound { countdown, .. } => {
                *countdown = countdown.saturating_sub(1);
                *countdown
            },
            _ => return vec![],
        };

        if remaining == 0 {
            return self.close(CloseReason::CountdownElapsed);
        }
        vec![SessionAction::Render]
    }

    fn close(&mut self, reason: CloseReason) -> Vec<SessionAction> {
        self.phase = Phase::Closing { reason };
        vec![SessionAction::Close { reason }]
    }

    /// Current phase.
    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Session reached its terminal phase.
    pub fn is_closed(&self) -> bool {
        matches!(self.phase, Phase::Closing { .. })
    }

    /// Text field.
    pub fn input(&self) -> &InputState {
        &self.input
    }

    /// Seconds until auto-close. `None` outside `Found`/`NotFound` unless the
    /// countdown already ran out.
    pub fn countdown(&self) -> Option<u32> {
        match self.phase {
            Phase::Found { countdown, .. } | Phase::NotFound { countdown, .. } => Some(countdown),
            Phase::Closing { reason: CloseReason::CountdownElapsed } => Some(0),
            _ => None,
        }
    }

    /// Found release. `None` outside `Found`.
    pub fn release(&self) -> Option<&Release> {
        match &self.phase {
            Phase::Found { release, .. } => Some(release),
            _ => None,
        }
    }

    /// Submitted query. `None` while `Idle` or closed.
    pub fn query(&self) -> Option<&str> {
        match &self.phase {
            Phase::Loading { query, .. }
            | Phase::Found { query, .. }
            | Phase::NotFound { query, .. } => Some(query),
            Phase::Idle | Phase::Closing { .. } => None,
        }
    }

    /// Generation of the most recent `Loading` entry.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Spinner frame index.
    pub fn spinner_frame(&self) -> usize {
        self.spinner_frame
    }

    /// Cursor blink state.
    pub fn cursor_visible(&self) -> bool {
        self.cursor_visible
    }

    /// The input field always has focus; there is nothing else to focus.
    pub fn input_focused(&self) -> bool {
        true
    }

    /// Negotiated terminal type.
    pub fn terminal_type(&self) -> &str {
        &self.terminal_type
    }

    /// Terminal dimensions (columns, rows).
    pub fn terminal_size(&self) -> (u16, u16) {
        self.terminal_size
    }

    /// Session settings.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}
