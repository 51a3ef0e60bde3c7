//! Telnet transport.
//!
//! Sends the option preamble, waits briefly for the client's window size and
//! terminal type, then runs the session with telnet framing stripped from the
//! input and IAC escaped in the output.

use std::{io, sync::Arc, time::Duration};

use latestcat_app::CloseReason;
use latestcat_lookup::VersionLookup;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf},
    sync::watch,
    time::Instant,
};

use crate::{
    ServerConfig, SessionError,
    runtime::{self, ClientInfo, ClientInput, Frontend},
    telnet::{self, Negotiation, TelnetDecoder, TelnetEvent, option},
};

const READ_BUFFER: usize = 1024;

/// Serve one telnet connection until its session closes.
pub async fn serve<S, L>(
    stream: S,
    lookup: Arc<L>,
    config: Arc<ServerConfig>,
    shutdown: watch::Receiver<bool>,
) -> Result<CloseReason, SessionError>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
    L: VersionLookup,
{
    let (mut reader, mut writer) = tokio::io::split(stream);
    writer.write_all(&telnet::preamble()).await?;
    writer.flush().await?;

    let mut decoder = TelnetDecoder::new();
    let mut pending = Vec::new();
    let Some(info) = negotiate(
        &mut reader,
        &mut writer,
        &mut decoder,
        &mut pending,
        config.negotiation_timeout,
    )
    .await?
    else {
        tracing::debug!("client left during negotiation");
        return Ok(CloseReason::Disconnected);
    };

    let frontend = TelnetFrontend {
        reader,
        writer,
        decoder,
        outbox: Vec::new(),
        buf: vec![0; READ_BUFFER],
    };
    runtime::run_session(frontend, info, pending, lookup, &config.session, shutdown).await
}

/// Wait for the client's window size and terminal type.
///
/// Returns `None` if the client disconnects. Data bytes that arrive early are
/// kept in `pending` for the session.
async fn negotiate<R, W>(
    reader: &mut R,
    writer: &mut W,
    decoder: &mut TelnetDecoder,
    pending: &mut Vec<u8>,
    timeout: Duration,
) -> Result<Option<ClientInfo>, SessionError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let deadline = Instant::now() + timeout;
    let mut terminal_type = None;
    let mut size = None;
    let (mut naws_open, mut ttype_open) = (true, true);
    let mut buf = [0u8; READ_BUFFER];

    while naws_open || ttype_open {
        let read = match tokio::time::timeout_at(deadline, reader.read(&mut buf)).await {
            Ok(read) => read?,
            Err(_) => {
                tracing::debug!(naws_open, ttype_open, "negotiation timed out");
                break;
            },
        };
        if read == 0 {
            return Ok(None);
        }

        for event in decoder.decode(&buf[..read]) {
            match event {
                TelnetEvent::Data(byte) => pending.push(byte),
                TelnetEvent::WindowSize { cols, rows } => {
                    size = Some((cols, rows));
                    naws_open = false;
                },
                TelnetEvent::TerminalType(name) => {
                    terminal_type = Some(name);
                    ttype_open = false;
                },
                TelnetEvent::Negotiate(verb, opt) => {
                    match (verb, opt) {
                        (Negotiation::Wont, option::NAWS) => naws_open = false,
                        (Negotiation::Wont, option::TERMINAL_TYPE) => ttype_open = false,
                        _ => {},
                    }
                    if let Some(reply) = telnet::reply(verb, opt) {
                        writer.write_all(&reply).await?;
                    }
                },
            }
        }
        writer.flush().await?;
    }

    Ok(Some(ClientInfo::new(terminal_type, size)))
}

/// Telnet side of a running session.
struct TelnetFrontend<S> {
    reader: ReadHalf<S>,
    writer: WriteHalf<S>,
    decoder: TelnetDecoder,
    /// Negotiation replies waiting for the next flush.
    outbox: Vec<u8>,
    buf: Vec<u8>,
}

impl<S> TelnetFrontend<S> {
    fn decode(&mut self, read: usize) -> Vec<ClientInput> {
        let mut input = Vec::new();
        let mut keys = Vec::new();

        for event in self.decoder.decode(&self.buf[..read]) {
            match event {
                TelnetEvent::Data(byte) => keys.push(byte),
                TelnetEvent::WindowSize { cols, rows } => {
                    if !keys.is_empty() {
                        input.push(ClientInput::Keys(std::mem::take(&mut keys)));
                    }
                    input.push(ClientInput::Resize { cols, rows });
                },
                TelnetEvent::TerminalType(name) => {
                    tracing::debug!(terminal_type = %name, "late terminal type ignored");
                },
                TelnetEvent::Negotiate(verb, opt) => {
                    if let Some(reply) = telnet::reply(verb, opt) {
                        self.outbox.extend_from_slice(&reply);
                    }
                },
            }
        }

        if !keys.is_empty() {
            input.push(ClientInput::Keys(keys));
        }
        input
    }
}

impl<S> Frontend for TelnetFrontend<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    async fn recv(&mut self) -> Vec<ClientInput> {
        match self.reader.read(&mut self.buf).await {
            Ok(0) => vec![ClientInput::Closed],
            Ok(n) => self.decode(n),
            Err(e) => {
                tracing::debug!(error = %e, "read failed");
                vec![ClientInput::Closed]
            },
        }
    }

    async fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut out = std::mem::take(&mut self.outbox);
        out.extend_from_slice(&telnet::escape(bytes));
        self.writer.write_all(&out).await?;
        self.writer.flush().await
    }

    async fn flush(&mut self) -> io::Result<()> {
        if self.outbox.is_empty() {
            return Ok(());
        }
        self.send(&[]).await
    }

    async fn close(&mut self) {
        let _ = self.writer.shutdown().await;
    }
}
