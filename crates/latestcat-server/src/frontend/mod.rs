//! Client transports.
//!
//! Each transport accepts a connection, learns the client's terminal type and
//! window size, and then hands a [`Frontend`](crate::runtime::Frontend) to
//! [`run_session`](crate::runtime::run_session).
//!
//! # Components
//!
//! - [`ssh`]: SSH server; sessions need a PTY
//! - [`telnet`]: Plain telnet with NAWS and TERMINAL-TYPE negotiation

pub mod ssh;
pub mod telnet;
