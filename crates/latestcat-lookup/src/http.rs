//! HTTP transport for lookups.
//!
//! [`HttpLookup`] posts the `FindVersion` operation with reqwest and decodes
//! the reply with [`crate::wire::decode_response`]. Every failure is mapped to
//! a [`LookupError`]; the call never panics and never outlives its timeout.

use std::time::Duration;

use reqwest::{Client, Url};

use crate::{DEFAULT_ENDPOINT, LookupError, LookupResult, VersionLookup, wire};

/// HTTP lookup configuration.
#[derive(Debug, Clone)]
pub struct LookupConfig {
    /// GraphQL endpoint URL.
    pub endpoint: String,
    /// Total request timeout (connect + send + read).
    pub timeout: Duration,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self { endpoint: DEFAULT_ENDPOINT.to_string(), timeout: Duration::from_secs(10) }
    }
}

/// reqwest-backed [`VersionLookup`].
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct HttpLookup {
    client: Client,
    endpoint: Url,
}

impl HttpLookup {
    /// Build a client for the configured endpoint.
    ///
    /// Fails if the endpoint is not a valid URL or the TLS backend cannot be
    /// initialised.
    pub fn new(config: LookupConfig) -> Result<Self, LookupError> {
        let endpoint = Url::parse(&config.endpoint)
            .map_err(|e| LookupError::InvalidEndpoint(format!("{}: {e}", config.endpoint)))?;

        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .user_agent(concat!("latestcat/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(transport_error)?;

        Ok(Self { client, endpoint })
    }

    /// Endpoint this client posts to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn find_version(&self, slug: &str) -> LookupResult {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&wire::Operation::find_version(slug))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(transport_error)?;
        wire::decode_response(&body)
    }
}

impl VersionLookup for HttpLookup {
    async fn lookup(&self, slug: &str) -> LookupResult {
        let result = self.find_version(slug).await;
        match &result {
            Ok(Some(release)) => {
                tracing::debug!(slug, version = %release.version, "lookup found release");
            },
            Ok(None) => tracing::debug!(slug, "lookup found nothing"),
            Err(e) => tracing::warn!(slug, kind = e.kind(), error = %e, "lookup failed"),
        }
        result
    }
}

fn transport_error(err: reqwest::Error) -> LookupError {
    if err.is_timeout() {
        LookupError::Timeout
    } else if err.is_decode() {
        LookupError::Decode(err.to_string())
    } else {
        LookupError::Transport(err.to_string())
    }
}
