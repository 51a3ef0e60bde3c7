//! Observable session state types.
//!
//! [`Phase`] carries the data that is only meaningful inside a given phase,
//! so a result can only exist while `Found` and a countdown only while a
//! result (or its absence) is being shown.

use latestcat_lookup::Release;

/// Session phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the user to submit a query.
    Idle,

    /// A lookup is in flight.
    Loading {
        /// Submitted query (trimmed).
        query: String,
        /// Generation of this `Loading` entry.
        generation: u64,
    },

    /// The lookup found a release.
    Found {
        /// Submitted query (trimmed).
        query: String,
        /// The release the service returned.
        release: Release,
        /// Seconds until the session closes.
        countdown: u32,
    },

    /// The lookup found nothing or failed.
    NotFound {
        /// Submitted query (trimmed).
        query: String,
        /// Seconds until the session closes.
        countdown: u32,
    },

    /// Terminal phase. No further phase changes are accepted.
    Closing {
        /// Why the session ended.
        reason: CloseReason,
    },
}

impl Phase {
    /// Short stable label for structured logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading { .. } => "loading",
            Self::Found { .. } => "found",
            Self::NotFound { .. } => "not_found",
            Self::Closing { .. } => "closing",
        }
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloseReason {
    /// User pressed Esc or Ctrl+C.
    Quit,
    /// Countdown after a result reached zero.
    CountdownElapsed,
    /// The connection dropped.
    Disconnected,
    /// The server is shutting down.
    Shutdown,
}

impl CloseReason {
    /// Short stable label for structured logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quit => "quit",
            Self::CountdownElapsed => "countdown_elapsed",
            Self::Disconnected => "disconnected",
            Self::Shutdown => "shutdown",
        }
    }
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
