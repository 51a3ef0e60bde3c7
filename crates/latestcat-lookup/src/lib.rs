//! Version lookup for latest.cat
//!
//! Resolves a software slug to its latest released version by querying the
//! latest.cat GraphQL endpoint.
//!
//! # Components
//!
//! - [`VersionLookup`]: Trait the session runtime drives; one call, one outcome
//! - [`Release`]: A resolved software release
//! - [`LookupError`]: Transport and decoding failures
//! - [`HttpLookup`]: reqwest-backed implementation (`http` feature)
//!
//! The wire types and response decoding are always available so the pure
//! session core can depend on this crate without pulling in an HTTP stack.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod error;
#[cfg(feature = "http")]
mod http;
pub mod wire;

use std::future::Future;

pub use error::LookupError;
#[cfg(feature = "http")]
pub use http::{HttpLookup, LookupConfig};

/// Default public endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://latest-cat.fly.dev/graphql";

/// A resolved software release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    /// Canonical slug the service matched.
    pub slug: String,
    /// Display name of the software.
    pub name: String,
    /// Latest released version string.
    pub version: String,
}

/// Outcome of a single lookup.
///
/// `Ok(None)` means the service answered and knows no such software.
pub type LookupResult = Result<Option<Release>, LookupError>;

/// Resolves software identifiers to their latest release.
///
/// Implementations must produce exactly one outcome per call and must not
/// hang indefinitely; transport timeouts surface as
/// [`LookupError::Timeout`].
pub trait VersionLookup: Send + Sync + 'static {
    /// Look up the latest release for `slug`.
    ///
    /// The slug is sent as given. Empty input is a valid query.
    fn lookup(&self, slug: &str) -> impl Future<Output = LookupResult> + Send;
}
