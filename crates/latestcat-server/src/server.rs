//! Accept loop and graceful shutdown.
//!
//! Every accepted connection gets its own task running the serve function of
//! its transport; sessions share nothing but the read-only configuration and
//! the lookup client. On shutdown the listeners are dropped, running sessions
//! get a grace period to finish on their own, then the stragglers are told to
//! close and finally aborted.

use std::{fmt, future::Future, io, net::SocketAddr, sync::Arc, time::Duration};

use latestcat_app::{CloseReason, SessionConfig};
use latestcat_lookup::VersionLookup;
use russh::keys::PrivateKey;
use tokio::{
    net::{TcpListener, TcpStream},
    sync::watch,
    task::JoinSet,
};
use tracing::Instrument;

use crate::{
    ServerError, SessionError,
    frontend::{ssh, telnet},
};

/// How long force-closed sessions get to restore their client terminal
/// before they are aborted.
const FORCE_CLOSE_WAIT: Duration = Duration::from_secs(1);

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Telnet listen address; `None` disables telnet.
    pub telnet_address: Option<String>,
    /// SSH listener; `None` disables SSH.
    pub ssh: Option<SshConfig>,
    /// Time running sessions get to finish after shutdown starts.
    pub grace_period: Duration,
    /// Time to wait for the telnet client's window size and terminal type.
    pub negotiation_timeout: Duration,
    /// Settings for every session.
    pub session: SessionConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            telnet_address: Some("0.0.0.0:2323".to_string()),
            ssh: None,
            grace_period: Duration::from_secs(30),
            negotiation_timeout: Duration::from_millis(500),
            session: SessionConfig::default(),
        }
    }
}

/// SSH listener settings.
#[derive(Clone)]
pub struct SshConfig {
    /// Listen address.
    pub bind_address: String,
    /// Host key presented to clients.
    pub host_key: PrivateKey,
}

impl fmt::Debug for SshConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SshConfig")
            .field("bind_address", &self.bind_address)
            .finish_non_exhaustive()
    }
}

struct SshListener {
    listener: TcpListener,
    protocol: Arc<russh::server::Config>,
}

/// latest.cat server: SSH and telnet listeners sharing one lookup client.
pub struct Server<L> {
    telnet: Option<TcpListener>,
    ssh: Option<SshListener>,
    lookup: Arc<L>,
    config: Arc<ServerConfig>,
}

impl<L: VersionLookup> Server<L> {
    /// Bind the configured listeners.
    ///
    /// # Errors
    ///
    /// - [`ServerError::Config`] if no listener is configured
    /// - [`ServerError::Bind`] if an address is invalid or in use
    pub async fn bind(config: ServerConfig, lookup: L) -> Result<Self, ServerError> {
        if config.telnet_address.is_none() && config.ssh.is_none() {
            return Err(ServerError::Config("no listener enabled".to_string()));
        }

        let telnet = match &config.telnet_address {
            Some(addr) => Some(bind(addr).await?),
            None => None,
        };
        let ssh = match &config.ssh {
            Some(ssh_config) => Some(SshListener {
                listener: bind(&ssh_config.bind_address).await?,
                protocol: Arc::new(ssh::protocol_config(ssh_config.host_key.clone())),
            }),
            None => None,
        };

        Ok(Self { telnet, ssh, lookup: Arc::new(lookup), config: Arc::new(config) })
    }

    /// Address the telnet listener is bound to.
    pub fn telnet_addr(&self) -> Option<SocketAddr> {
        self.telnet.as_ref().and_then(|l| l.local_addr().ok())
    }

    /// Address the SSH listener is bound to.
    pub fn ssh_addr(&self) -> Option<SocketAddr> {
        self.ssh.as_ref().and_then(|s| s.listener.local_addr().ok())
    }

    /// Accept connections until `shutdown` resolves, then drain sessions.
    ///
    /// # Errors
    ///
    /// Currently none after a successful bind; accept failures are logged and
    /// the loop keeps going.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<(), ServerError> {
        if let Some(addr) = self.telnet_addr() {
            tracing::info!(%addr, transport = "telnet", "accepting connections");
        }
        if let Some(addr) = self.ssh_addr() {
            tracing::info!(%addr, transport = "ssh", "accepting connections");
        }

        let (force_tx, force_rx) = watch::channel(false);
        let mut sessions = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => break,

                accepted = accept(self.telnet.as_ref()) => match accepted {
                    Ok((stream, peer)) => {
                        let session = telnet::serve(
                            stream,
                            Arc::clone(&self.lookup),
                            Arc::clone(&self.config),
                            force_rx.clone(),
                        );
                        spawn_session(&mut sessions, peer, "telnet", session);
                    },
                    Err(e) => tracing::error!(error = %e, transport = "telnet", "accept failed"),
                },

                accepted = accept(self.ssh.as_ref().map(|s| &s.listener)) => match (accepted, &self.ssh) {
                    (Ok((stream, peer)), Some(listener)) => {
                        let session = ssh::serve(
                            stream,
                            Arc::clone(&listener.protocol),
                            Arc::clone(&self.lookup),
                            Arc::clone(&self.config),
                            force_rx.clone(),
                        );
                        spawn_session(&mut sessions, peer, "ssh", session);
                    },
                    (Ok(_), None) => {},
                    (Err(e), _) => tracing::error!(error = %e, transport = "ssh", "accept failed"),
                },

                Some(joined) = sessions.join_next(), if !sessions.is_empty() => {
                    if let Err(e) = joined {
                        tracing::warn!(error = %e, "session task failed");
                    }
                },
            }
        }

        drop(self.telnet);
        drop(self.ssh);
        tracing::info!(
            sessions = sessions.len(),
            grace_secs = self.config.grace_period.as_secs_f64(),
            "shutting down"
        );

        if tokio::time::timeout(self.config.grace_period, drain(&mut sessions)).await.is_err() {
            tracing::warn!(sessions = sessions.len(), "grace period over, closing sessions");
            let _ = force_tx.send(true);

            if tokio::time::timeout(FORCE_CLOSE_WAIT, drain(&mut sessions)).await.is_err() {
                tracing::warn!(sessions = sessions.len(), "aborting sessions");
                sessions.abort_all();
                drain(&mut sessions).await;
            }
        }

        tracing::info!("shutdown complete");
        Ok(())
    }
}

async fn bind(addr: &str) -> Result<TcpListener, ServerError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr: addr.to_string(), source })
}

/// Next connection on `listener`; pends forever when there is none.
async fn accept(listener: Option<&TcpListener>) -> io::Result<(TcpStream, SocketAddr)> {
    let Some(listener) = listener else {
        return std::future::pending().await;
    };
    let (stream, peer) = listener.accept().await?;
    if let Err(e) = stream.set_nodelay(true) {
        tracing::debug!(%peer, error = %e, "set_nodelay failed");
    }
    Ok((stream, peer))
}

fn spawn_session<F>(
    sessions: &mut JoinSet<()>,
    peer: SocketAddr,
    transport: &'static str,
    session: F,
) where
    F: Future<Output = Result<CloseReason, SessionError>> + Send + 'static,
{
    tracing::info!(%peer, transport, "connection accepted");
    sessions.spawn(
        async move {
            match session.await {
                Ok(reason) => tracing::info!(%reason, "connection closed"),
                Err(e) => tracing::warn!(error = %e, "session failed"),
            }
        }
        .instrument(tracing::info_span!("session", %peer, transport)),
    );
}

async fn drain(sessions: &mut JoinSet<()>) {
    while let Some(joined) = sessions.join_next().await {
        if let Err(e) = joined
            && !e.is_cancelled()
        {
            tracing::warn!(error = %e, "session task failed");
        }
    }
}
