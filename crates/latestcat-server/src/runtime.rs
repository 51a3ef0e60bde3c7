//! Per-connection runtime
//!
//! Event loop that drives one session and coordinates between the client
//! transport, the [`Session`] state machine, the lookup service and the
//! session timers. Uses `tokio::select!` so every source feeds the state
//! machine one event at a time.
//!
//! The loop does not know which protocol the client speaks. Telnet and SSH
//! each provide a [`Frontend`] that strips their framing from the input and
//! carries rendered bytes back out.
//!
//! Rendering goes through a ratatui [`Terminal`] with a fixed viewport the
//! size of the client window. The backend writes into a [`FrameSink`] that is
//! drained to the frontend after every draw.

use std::{
    future::Future,
    io::{self, Write},
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use crossterm::{
    cursor::{Hide, Show},
    queue,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen},
};
use latestcat_app::{
    CloseReason, LookupResult, Phase, Session, SessionAction, SessionConfig, SessionEvent, Theme,
    render, spinner,
};
use latestcat_lookup::VersionLookup;
use ratatui::{Terminal, TerminalOptions, Viewport, backend::CrosstermBackend, layout::Rect};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::{Instant, Interval, MissedTickBehavior},
};

use crate::{
    SessionError,
    keys::{self, KeyDecoder},
};

/// Cursor blink period.
pub const BLINK_INTERVAL: Duration = Duration::from_millis(530);

/// Window size assumed when the client never reports one.
pub const DEFAULT_SIZE: (u16, u16) = (80, 24);

/// Largest window the runtime renders; bigger reports are clamped.
///
/// The frame buffer is allocated from the client's numbers, so they must be
/// bounded before they reach the terminal.
pub const MAX_SIZE: (u16, u16) = (500, 200);

/// Terminal type assumed when the client never reports one.
pub const DEFAULT_TERMINAL_TYPE: &str = "unknown";

const COUNTDOWN_INTERVAL: Duration = Duration::from_secs(1);

/// Input from the client with the transport framing removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientInput {
    /// Raw bytes typed by the user.
    Keys(Vec<u8>),
    /// The client window changed size.
    Resize {
        /// Columns as reported.
        cols: u16,
        /// Rows as reported.
        rows: u16,
    },
    /// The client went away.
    Closed,
}

/// Transport a session runs over.
pub trait Frontend: Send + 'static {
    /// Next batch of client input, in arrival order.
    ///
    /// Must be cancel safe: the runtime polls it inside `select!`.
    fn recv(&mut self) -> impl Future<Output = Vec<ClientInput>> + Send;

    /// Write rendered bytes to the client.
    fn send(&mut self, bytes: &[u8]) -> impl Future<Output = io::Result<()>> + Send;

    /// Write anything the transport queued on its own, such as protocol
    /// replies produced while decoding input.
    fn flush(&mut self) -> impl Future<Output = io::Result<()>> + Send;

    /// Close the transport. Errors are irrelevant at this point.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// Shared byte buffer the crossterm backend writes frames into.
#[derive(Debug, Clone, Default)]
pub struct FrameSink(Arc<Mutex<Vec<u8>>>);

impl FrameSink {
    /// Drain everything written so far.
    pub fn take(&self) -> Vec<u8> {
        std::mem::take(&mut *self.0.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Write for FrameSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// What the client told us before the session started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    /// Terminal type, or [`DEFAULT_TERMINAL_TYPE`].
    pub terminal_type: String,
    /// Window size (columns, rows), within [`MAX_SIZE`].
    pub size: (u16, u16),
}

impl ClientInfo {
    /// Build from whatever the client reported, falling back to defaults for
    /// missing or empty values and clamping the size.
    pub fn new(terminal_type: Option<String>, size: Option<(u16, u16)>) -> Self {
        Self {
            terminal_type: terminal_type
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| DEFAULT_TERMINAL_TYPE.to_string()),
            size: size.and_then(|(cols, rows)| clamp_size(cols, rows)).unwrap_or(DEFAULT_SIZE),
        }
    }
}

/// Bound a reported window size to [`MAX_SIZE`].
///
/// `None` for a zero dimension, which clients send when they do not know.
pub fn clamp_size(cols: u16, rows: u16) -> Option<(u16, u16)> {
    if cols == 0 || rows == 0 {
        return None;
    }
    Some((cols.min(MAX_SIZE.0), rows.min(MAX_SIZE.1)))
}

/// Wake-up reason for one loop iteration.
enum Wake {
    Input(Vec<ClientInput>),
    Lookup(u64, LookupResult),
    Countdown,
    Spinner,
    Blink,
    Shutdown,
}

/// Run one session over `frontend` until it closes.
///
/// `early_keys` are bytes the client typed before the session started.
/// `shutdown` flipping to `true` (or its sender going away) cancels the
/// session with [`CloseReason::Shutdown`].
pub async fn run_session<F, L>(
    frontend: F,
    info: ClientInfo,
    early_keys: Vec<u8>,
    lookup: Arc<L>,
    config: &SessionConfig,
    shutdown: watch::Receiver<bool>,
) -> Result<CloseReason, SessionError>
where
    F: Frontend,
    L: VersionLookup,
{
    tracing::info!(
        terminal_type = %info.terminal_type,
        cols = info.size.0,
        rows = info.size.1,
        "session started"
    );

    let runtime = SessionRuntime::new(frontend, lookup, config, info)?;
    runtime.run(early_keys, shutdown).await
}

/// Runtime for one session.
///
/// Owns the state machine and everything that turns its actions into I/O.
struct SessionRuntime<F, L> {
    session: Session,
    theme: Theme,
    terminal: Terminal<CrosstermBackend<FrameSink>>,
    sink: FrameSink,
    frontend: F,
    key_decoder: KeyDecoder,
    lookup: Arc<L>,
    lookup_tx: mpsc::Sender<(u64, LookupResult)>,
    lookup_rx: mpsc::Receiver<(u64, LookupResult)>,
    lookup_task: Option<JoinHandle<()>>,
    countdown: Option<Interval>,
    spinner: Option<Interval>,
    blink: Option<Interval>,
}

impl<F, L> SessionRuntime<F, L>
where
    F: Frontend,
    L: VersionLookup,
{
    fn new(
        frontend: F,
        lookup: Arc<L>,
        config: &SessionConfig,
        info: ClientInfo,
    ) -> Result<Self, SessionError> {
        let theme = Theme::for_terminal(&info.terminal_type);
        let (cols, rows) = clamp_size(info.size.0, info.size.1).unwrap_or(DEFAULT_SIZE);
        let session = Session::new(config.clone(), info.terminal_type, (cols, rows));

        let sink = FrameSink::default();
        let terminal = Terminal::with_options(CrosstermBackend::new(sink.clone()), TerminalOptions {
            viewport: Viewport::Fixed(Rect::new(0, 0, cols, rows)),
        })?;
        let (lookup_tx, lookup_rx) = mpsc::channel(1);

        Ok(Self {
            session,
            theme,
            terminal,
            sink,
            frontend,
            key_decoder: KeyDecoder::new(),
            lookup,
            lookup_tx,
            lookup_rx,
            lookup_task: None,
            countdown: None,
            spinner: None,
            blink: None,
        })
    }

    /// Run the event loop.
    async fn run(
        mut self,
        early_keys: Vec<u8>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<CloseReason, SessionError> {
        let mut sink = self.sink.clone();
        queue!(sink, EnterAlternateScreen, Hide)?;

        let actions = self.session.init();
        self.process_actions(actions).await?;

        if !early_keys.is_empty() {
            self.handle_input(vec![ClientInput::Keys(early_keys)]).await?;
        }

        while !self.session.is_closed() {
            let wake = tokio::select! {
                input = self.frontend.recv() => Wake::Input(input),
                Some((generation, result)) = self.lookup_rx.recv() => Wake::Lookup(generation, result),
                _ = tick(&mut self.countdown) => Wake::Countdown,
                _ = tick(&mut self.spinner) => Wake::Spinner,
                _ = tick(&mut self.blink) => Wake::Blink,
                _ = shutdown.wait_for(|stop| *stop) => Wake::Shutdown,
            };

            match wake {
                Wake::Input(input) => self.handle_input(input).await?,
                Wake::Lookup(generation, result) => {
                    self.dispatch(SessionEvent::LookupCompleted { generation, result }).await?;
                },
                Wake::Countdown => self.dispatch(SessionEvent::CountdownTick).await?,
                Wake::Spinner => self.dispatch(SessionEvent::SpinnerTick).await?,
                Wake::Blink => self.dispatch(SessionEvent::BlinkTick).await?,
                Wake::Shutdown => {
                    self.dispatch(SessionEvent::Cancel(CloseReason::Shutdown)).await?;
                },
            }
        }

        match self.session.phase() {
            Phase::Closing { reason } => Ok(*reason),
            _ => Ok(CloseReason::Disconnected),
        }
    }

    async fn handle_input(&mut self, input: Vec<ClientInput>) -> Result<(), SessionError> {
        for item in input {
            if self.session.is_closed() {
                return Ok(());
            }
            match item {
                ClientInput::Keys(bytes) => {
                    for key in keys::decode(&mut self.key_decoder, &bytes) {
                        if self.session.is_closed() {
                            break;
                        }
                        self.dispatch(SessionEvent::Key(key)).await?;
                    }
                },
                ClientInput::Resize { cols, rows } => {
                    let Some((cols, rows)) = clamp_size(cols, rows) else {
                        continue;
                    };
                    self.terminal.resize(Rect::new(0, 0, cols, rows))?;
                    self.dispatch(SessionEvent::Resize { cols, rows }).await?;
                },
                ClientInput::Closed => {
                    self.dispatch(SessionEvent::Cancel(CloseReason::Disconnected)).await?;
                },
            }
        }

        if !self.session.is_closed()
            && let Err(e) = self.frontend.flush().await
        {
            tracing::debug!(error = %e, "write failed");
            self.dispatch(SessionEvent::Cancel(CloseReason::Disconnected)).await?;
        }
        Ok(())
    }

    /// Feed one event to the state machine and execute its actions.
    ///
    /// A failed write means the peer is gone, so it cancels the session
    /// instead of ending it with an error.
    async fn dispatch(&mut self, event: SessionEvent) -> Result<(), SessionError> {
        let actions = self.session.handle(event);
        match self.process_actions(actions).await {
            Err(SessionError::Io(e)) if !self.session.is_closed() => {
                tracing::debug!(error = %e, "write failed");
                let actions = self.session.handle(SessionEvent::Cancel(CloseReason::Disconnected));
                self.process_actions(actions).await
            },
            other => other,
        }
    }

    async fn process_actions(&mut self, actions: Vec<SessionAction>) -> Result<(), SessionError> {
        for action in actions {
            match action {
                SessionAction::Render => self.render().await?,
                SessionAction::Lookup { generation, query } => self.spawn_lookup(generation, query),
                SessionAction::StartCountdown { seconds } => {
                    tracing::debug!(seconds, "countdown started");
                    let mut countdown = tokio::time::interval_at(
                        Instant::now() + COUNTDOWN_INTERVAL,
                        COUNTDOWN_INTERVAL,
                    );
                    countdown.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    self.countdown = Some(countdown);
                },
                SessionAction::Close { reason } => self.close(reason).await?,
            }
        }
        self.sync_timers();
        Ok(())
    }

    /// Keep the animation timers running only in the phases that use them.
    fn sync_timers(&mut self) {
        let phase = self.session.phase();
        sync_interval(&mut self.spinner, matches!(phase, Phase::Loading { .. }), spinner::INTERVAL);
        sync_interval(&mut self.blink, *phase == Phase::Idle, BLINK_INTERVAL);
        if !matches!(phase, Phase::Found { .. } | Phase::NotFound { .. }) {
            self.countdown = None;
        }
    }

    fn spawn_lookup(&mut self, generation: u64, query: String) {
        if let Some(task) = self.lookup_task.take() {
            task.abort();
        }

        tracing::debug!(generation, %query, "lookup started");
        let lookup = Arc::clone(&self.lookup);
        let tx = self.lookup_tx.clone();
        self.lookup_task = Some(tokio::spawn(async move {
            let result = lookup.lookup(&query).await;
            tracing::debug!(generation, ok = result.is_ok(), "lookup finished");
            // Receiver gone means the session already closed
            let _ = tx.send((generation, result)).await;
        }));
    }

    async fn render(&mut self) -> Result<(), SessionError> {
        let session = &self.session;
        let theme = &self.theme;
        if let Err(e) = self.terminal.draw(|frame| render::draw(frame, session, theme)) {
            tracing::warn!(error = %e, "render failed");
        }
        self.flush_frame().await
    }

    async fn close(&mut self, reason: CloseReason) -> Result<(), SessionError> {
        tracing::debug!(%reason, "closing session");
        if let Some(task) = self.lookup_task.take() {
            task.abort();
        }
        self.countdown = None;

        let mut sink = self.sink.clone();
        queue!(sink, Show, LeaveAlternateScreen)?;

        // The peer may already be gone; restoring its terminal is best effort
        if let Err(e) = self.flush_frame().await {
            tracing::debug!(error = %e, "could not restore client terminal");
        }
        self.frontend.close().await;
        Ok(())
    }

    async fn flush_frame(&mut self) -> Result<(), SessionError> {
        let bytes = self.sink.take();
        if bytes.is_empty() {
            return Ok(());
        }
        self.frontend.send(&bytes).await?;
        Ok(())
    }
}

fn sync_interval(slot: &mut Option<Interval>, active: bool, period: Duration) {
    match (slot.is_some(), active) {
        (false, true) => {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            *slot = Some(interval);
        },
        (true, false) => *slot = None,
        _ => {},
    }
}

/// Next tick of an optional interval; pends forever when there is none.
async fn tick(interval: &mut Option<Interval>) -> Instant {
    match interval {
        Some(interval) => interval.tick().await,
        None => std::future::pending().await,
    }
}
