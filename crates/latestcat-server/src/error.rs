//! Server error types.

use std::{io, path::PathBuf};

use latestcat_app::BannerError;
use latestcat_lookup::LookupError;
use thiserror::Error;

/// Errors that stop the whole process.
///
/// No session can exist without a bound listener, a usable lookup client and
/// the startup material, so all of these are fatal.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Could not bind the listening address.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Requested address.
        addr: String,
        /// Underlying error.
        source: io::Error,
    },

    /// Could not read the banner file.
    #[error("failed to read banner {}: {source}", path.display())]
    BannerRead {
        /// Banner path.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },

    /// Banner file has no usable art.
    #[error("invalid banner {}: {source}", path.display())]
    BannerInvalid {
        /// Banner path.
        path: PathBuf,
        /// Underlying error.
        source: BannerError,
    },

    /// SSH host key could not be loaded or created.
    #[error("host key {}: {message}", path.display())]
    HostKey {
        /// Key path.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },

    /// Settings that cannot work together.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Lookup client could not be built (e.g. bad endpoint URL).
    #[error("lookup client: {0}")]
    Lookup(#[from] LookupError),

    /// I/O error on the listener.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Errors that end a single session.
///
/// Logged by the accept loop and never propagated further; other sessions
/// are unaffected.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Socket read or write failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// SSH protocol failure before the session started.
    #[error("ssh: {0}")]
    Ssh(#[from] russh::Error),
}
