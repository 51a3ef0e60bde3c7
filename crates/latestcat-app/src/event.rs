//! Session input events.
//!
//! This module defines [`SessionEvent`], the complete set of inputs that drive
//! the [`crate::Session`] state machine.
//!
//! Events originate from three sources:
//! - The connected terminal (keys, resize, disconnect).
//! - Timers owned by the runtime (countdown, spinner, cursor blink).
//! - Lookup tasks reporting their single outcome.

use latestcat_lookup::LookupResult;

use crate::{CloseReason, KeyInput};

/// Events processed by the Session state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Keyboard input.
    Key(KeyInput),

    /// Terminal resize.
    Resize {
        /// Columns.
        cols: u16,
        /// Rows.
        rows: u16,
    },

    /// A lookup task finished.
    LookupCompleted {
        /// Generation the lookup was issued for.
        generation: u64,
        /// The lookup outcome.
        result: LookupResult,
    },

    /// One second of countdown elapsed.
    CountdownTick,

    /// Advance the busy spinner.
    SpinnerTick,

    /// Toggle the input cursor.
    BlinkTick,

    /// Stop the session immediately (disconnect, server shutdown).
    Cancel(CloseReason),
}
