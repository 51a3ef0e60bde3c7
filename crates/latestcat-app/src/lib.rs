//! Session core for latest.cat
//!
//! Pure state machine and renderer for one interactive terminal session,
//! enabling deterministic tests with the same code that runs behind the
//! network transport.
//!
//! # Components
//!
//! - [`Session`]: State machine (input, lookup lifecycle, countdown, spinner)
//! - [`SessionEvent`] / [`SessionAction`]: Inputs and effects of the machine
//! - [`render`](render::render): Pure mapping from session state to a frame
//! - [`color::ramp`]: Perceptual color ramp used by the banner gradient
//! - [`Theme`]: Per-session styling, derived from the negotiated terminal

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod action;
mod banner;
pub mod color;
mod event;
mod input;
pub mod render;
mod session;
pub mod spinner;
mod state;
mod theme;

pub use action::SessionAction;
pub use banner::{Banner, BannerError};
pub use event::SessionEvent;
pub use input::{InputState, InputWindow, KeyInput};
pub use latestcat_lookup::{LookupError, LookupResult, Release};
pub use session::{Session, SessionConfig};
pub use state::{CloseReason, Phase};
pub use theme::{ColorProfile, Theme};
