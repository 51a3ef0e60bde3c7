//! Session side-effects.
//!
//! This module defines the [`SessionAction`] enum, which represents
//! instructions produced by the [`crate::Session`] state machine for the
//! runtime to execute.

use crate::CloseReason;

/// Actions produced by the Session state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Redraw the frame.
    Render,

    /// Issue one version lookup.
    ///
    /// The runtime must deliver its outcome back as
    /// [`crate::SessionEvent::LookupCompleted`] carrying the same generation.
    Lookup {
        /// Generation of the `Loading` entry that issued the lookup.
        generation: u64,
        /// Trimmed user query.
        query: String,
    },

    /// Start delivering one countdown tick per second.
    StartCountdown {
        /// Ticks until the session closes.
        seconds: u32,
    },

    /// End the session and release the connection.
    Close {
        /// Why the session ended.
        reason: CloseReason,
    },
}
