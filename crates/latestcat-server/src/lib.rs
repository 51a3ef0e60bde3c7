//! SSH and telnet front end for latest.cat
//!
//! Accepts SSH and telnet connections, learns each client's window size and
//! terminal type, and runs one [`latestcat_app::Session`] per connection.
//!
//! # Components
//!
//! - [`Server`]: Accept loop with graceful shutdown
//! - [`frontend`]: SSH and telnet transports
//! - [`runtime::run_session`]: Per-session event loop over any transport
//! - [`telnet`]: Incremental telnet decoder and option negotiation
//! - [`keys`]: Byte stream to key decoding

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod error;
pub mod frontend;
pub mod keys;
pub mod runtime;
mod server;
pub mod telnet;

pub use error::{ServerError, SessionError};
pub use server::{Server, ServerConfig, SshConfig};
