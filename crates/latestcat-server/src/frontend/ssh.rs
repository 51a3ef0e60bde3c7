//! SSH transport.
//!
//! Any user name is accepted without credentials. A client must request a
//! PTY before its shell: the PTY request carries the terminal type and window
//! size the session renders for, and window-change requests become resizes.
//! A shell without a PTY gets a one-line refusal and the channel is closed.
//!
//! Only the first session channel of a connection runs a session.

use std::{
    fs,
    io::{self, Write},
    path::Path,
    sync::Arc,
    time::Duration,
};

use latestcat_app::CloseReason;
use latestcat_lookup::VersionLookup;
use russh::{
    Channel, ChannelId, CryptoVec, Disconnect, Pty,
    keys::{
        PrivateKey,
        ssh_key::{Algorithm, HashAlg, LineEnding, rand_core::OsRng},
    },
    server::{self, Auth, Handle, Msg, Session},
};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::{mpsc, oneshot, watch},
};

use crate::{
    ServerConfig, ServerError, SessionError,
    runtime::{self, ClientInfo, ClientInput, Frontend},
};

/// Sent to clients that open a shell without a PTY.
pub const NO_PTY_MESSAGE: &str = "no active terminal, skipping\r\n";

/// How long a finished session waits for the connection to wind down.
const CLOSE_LINGER: Duration = Duration::from_secs(1);

/// Client input buffered between the protocol task and the session.
const INPUT_QUEUE: usize = 64;

/// Idle connections are dropped after this long.
const INACTIVITY_TIMEOUT: Duration = Duration::from_secs(600);

/// Load the host key at `path`, creating a new Ed25519 key there if the file
/// does not exist.
///
/// # Errors
///
/// [`ServerError::HostKey`] if the key cannot be read, generated or saved.
pub fn load_or_create_host_key(path: &Path) -> Result<PrivateKey, ServerError> {
    let host_key_error = |message: String| ServerError::HostKey { path: path.to_path_buf(), message };

    if path.exists() {
        let key = russh::keys::load_secret_key(path, None)
            .map_err(|e| host_key_error(e.to_string()))?;
        tracing::info!(
            path = %path.display(),
            fingerprint = %key.public_key().fingerprint(HashAlg::Sha256),
            "host key loaded"
        );
        return Ok(key);
    }

    let key = PrivateKey::random(&mut OsRng, Algorithm::Ed25519)
        .map_err(|e| host_key_error(e.to_string()))?;
    let encoded = key.to_openssh(LineEnding::LF).map_err(|e| host_key_error(e.to_string()))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| host_key_error(e.to_string()))?;
    }
    write_private(path, encoded.as_bytes()).map_err(|e| host_key_error(e.to_string()))?;

    tracing::info!(
        path = %path.display(),
        fingerprint = %key.public_key().fingerprint(HashAlg::Sha256),
        "host key generated"
    );
    Ok(key)
}

fn write_private(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)?.write_all(contents)
}

/// Protocol configuration shared by every SSH connection.
pub fn protocol_config(host_key: PrivateKey) -> server::Config {
    server::Config {
        keys: vec![host_key],
        inactivity_timeout: Some(INACTIVITY_TIMEOUT),
        auth_rejection_time: Duration::from_secs(1),
        ..server::Config::default()
    }
}

/// Serve one SSH connection until its session closes.
pub async fn serve<S, L>(
    stream: S,
    protocol: Arc<server::Config>,
    lookup: Arc<L>,
    config: Arc<ServerConfig>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<CloseReason, SessionError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    L: VersionLookup,
{
    let (start_tx, start_rx) = oneshot::channel();
    let running = server::run_stream(protocol, stream, ConnectionHandler::new(start_tx)).await?;
    let handle = running.handle();
    tokio::pin!(running);

    let start = tokio::select! {
        start = start_rx => start.ok(),
        result = &mut running => {
            tracing::debug!(?result, "connection ended before a shell started");
            return Ok(CloseReason::Disconnected);
        },
        () = async { let _ = shutdown.wait_for(|stop| *stop).await; } => {
            disconnect(&handle).await;
            return Ok(CloseReason::Shutdown);
        },
    };

    let Some(start) = start else {
        // Handler gave up on the channel, e.g. no PTY
        disconnect(&handle).await;
        let _ = tokio::time::timeout(CLOSE_LINGER, &mut running).await;
        return Ok(CloseReason::Disconnected);
    };

    let frontend = SshFrontend { handle, channel: start.channel, input: start.input };
    let session = runtime::run_session(
        frontend,
        start.info,
        Vec::new(),
        lookup,
        &config.session,
        shutdown,
    );
    tokio::pin!(session);

    tokio::select! {
        reason = &mut session => {
            let _ = tokio::time::timeout(CLOSE_LINGER, &mut running).await;
            reason
        },
        result = &mut running => {
            tracing::debug!(?result, "connection ended");
            session.await
        },
    }
}

async fn disconnect(handle: &Handle) {
    let _ = handle
        .disconnect(Disconnect::ByApplication, "session closed".to_string(), String::new())
        .await;
}

/// Everything the session needs once the client asked for a shell.
struct ShellStart {
    channel: ChannelId,
    info: ClientInfo,
    input: mpsc::Receiver<ClientInput>,
}

/// PTY bookkeeping for the session channel, kept apart from the protocol
/// callbacks.
#[derive(Debug, Default)]
struct PtyState {
    terminal_type: Option<String>,
    size: Option<(u16, u16)>,
    requested: bool,
}

impl PtyState {
    fn request(&mut self, term: &str, cols: u32, rows: u32) {
        self.terminal_type = Some(term.to_string());
        self.size = Some(size_from(cols, rows));
        self.requested = true;
    }

    fn resize(&mut self, cols: u32, rows: u32) {
        if self.requested {
            self.size = Some(size_from(cols, rows));
        }
    }

    /// Client info for a shell, or `None` if no PTY was requested.
    fn shell(&self) -> Option<ClientInfo> {
        self.requested.then(|| ClientInfo::new(self.terminal_type.clone(), self.size))
    }
}

fn size_from(cols: u32, rows: u32) -> (u16, u16) {
    (u16::try_from(cols).unwrap_or(u16::MAX), u16::try_from(rows).unwrap_or(u16::MAX))
}

/// russh callbacks for one connection.
struct ConnectionHandler {
    start: Option<oneshot::Sender<ShellStart>>,
    channel: Option<ChannelId>,
    pty: PtyState,
    input: Option<mpsc::Sender<ClientInput>>,
}

impl ConnectionHandler {
    fn new(start: oneshot::Sender<ShellStart>) -> Self {
        Self { start: Some(start), channel: None, pty: PtyState::default(), input: None }
    }

    fn is_session_channel(&self, channel: ChannelId) -> bool {
        self.channel == Some(channel)
    }

    async fn forward(&mut self, input: ClientInput) {
        if let Some(tx) = &self.input
            && tx.send(input).await.is_err()
        {
            self.input = None;
        }
    }

    fn start_shell(&mut self, channel: ChannelId, session: &mut Session) -> Result<(), russh::Error> {
        if !self.is_session_channel(channel) || self.input.is_some() {
            session.channel_failure(channel)?;
            return Ok(());
        }

        let Some(info) = self.pty.shell() else {
            tracing::info!("no active terminal, skipping");
            session.channel_failure(channel)?;
            session.data(channel, CryptoVec::from_slice(NO_PTY_MESSAGE.as_bytes()))?;
            session.exit_status_request(channel, 1)?;
            session.close(channel)?;
            self.start = None;
            return Ok(());
        };

        let Some(start) = self.start.take() else {
            session.channel_failure(channel)?;
            return Ok(());
        };
        session.channel_success(channel)?;

        let (tx, rx) = mpsc::channel(INPUT_QUEUE);
        self.input = Some(tx);
        let _ = start.send(ShellStart { channel, info, input: rx });
        Ok(())
    }
}

impl server::Handler for ConnectionHandler {
    type Error = russh::Error;

    async fn auth_none(&mut self, user: &str) -> Result<Auth, Self::Error> {
        tracing::debug!(user, "client authenticated");
        Ok(Auth::Accept)
    }

    async fn channel_open_session(
        &mut self,
        channel: Channel<Msg>,
        _session: &mut Session,
    ) -> Result<bool, Self::Error> {
        if self.channel.is_some() {
            tracing::debug!("extra session channel refused");
            return Ok(false);
        }
        self.channel = Some(channel.id());
        Ok(true)
    }

    async fn pty_request(
        &mut self,
        channel: ChannelId,
        term: &str,
        col_width: u32,
        row_height: u32,
        _pix_width: u32,
        _pix_height: u32,
        _modes: &[(Pty, u32)],
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        if !self.is_session_channel(channel) {
            session.channel_failure(channel)?;
            return Ok(());
        }
        tracing::debug!(term, col_width, row_height, "pty requested");
        self.pty.request(term, col_width, row_height);
        session.channel_success(channel)?;
        Ok(())
    }

    async fn shell_request(
        &mut self,
        channel: ChannelId,
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        self.start_shell(channel, session)
    }

    async fn exec_request(
        &mut self,
        channel: ChannelId,
        _data: &[u8],
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        // Commands are ignored; `ssh -t host anything` still gets the session
        self.start_shell(channel, session)
    }

    async fn window_change_request(
        &mut self,
        channel: ChannelId,
        col_width: u32,
        row_height: u32,
        _pix_width: u32,
        _pix_height: u32,
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        if !self.is_session_channel(channel) {
            return Ok(());
        }
        if self.input.is_some() {
            let (cols, rows) = size_from(col_width, row_height);
            self.forward(ClientInput::Resize { cols, rows }).await;
        } else {
            self.pty.resize(col_width, row_height);
        }
        Ok(())
    }

    async fn data(
        &mut self,
        channel: ChannelId,
        data: &[u8],
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        if self.is_session_channel(channel) {
            self.forward(ClientInput::Keys(data.to_vec())).await;
        }
        Ok(())
    }

    async fn channel_eof(
        &mut self,
        channel: ChannelId,
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        if self.is_session_channel(channel) {
            self.forward(ClientInput::Closed).await;
            self.input = None;
        }
        Ok(())
    }

    async fn channel_close(
        &mut self,
        channel: ChannelId,
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        if self.is_session_channel(channel) {
            self.forward(ClientInput::Closed).await;
            self.input = None;
            self.start = None;
        }
        Ok(())
    }
}

/// SSH side of a running session.
struct SshFrontend {
    handle: Handle,
    channel: ChannelId,
    input: mpsc::Receiver<ClientInput>,
}

impl Frontend for SshFrontend {
    async fn recv(&mut self) -> Vec<ClientInput> {
        vec![self.input.recv().await.unwrap_or(ClientInput::Closed)]
    }

    async fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.handle
            .data(self.channel, CryptoVec::from_slice(bytes))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "ssh channel closed"))
    }

    async fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    async fn close(&mut self) {
        let _ = self.handle.exit_status_request(self.channel, 0).await;
        let _ = self.handle.eof(self.channel).await;
        let _ = self.handle.close(self.channel).await;
    }
}
