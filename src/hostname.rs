//! Public hostname resolution.
//!
//! The server needs a publicly reachable URL to hand to Trello as the
//! webhook callback. How that URL comes to exist (a configured host, a
//! tunnel, a load balancer) is outside the core; the [`HostnameProvider`]
//! trait is the seam, and [`StaticHostname`] is the production
//! implementation for deployments with a known external host.

use std::future::Future;

use thiserror::Error;

/// Errors from hostname resolution.
#[derive(Debug, Error)]
pub enum HostnameError {
    /// No host is configured and no tunnel is available.
    #[error("HOST is not set and no tunnel is configured")]
    Unconfigured,

    /// The provider failed to produce a reachable hostname.
    #[error("hostname resolution failed: {0}")]
    Provider(String),
}

/// Resolves the publicly reachable URL the server will be called back on.
///
/// `port` is the local listen port, for providers that need it to build a
/// tunnel or URL.
pub trait HostnameProvider {
    fn resolve(&self, port: u16) -> impl Future<Output = Result<String, HostnameError>> + Send;
}

/// A provider backed by a fixed, pre-configured hostname.
#[derive(Debug, Clone)]
pub struct StaticHostname {
    host: String,
}

impl StaticHostname {
    pub fn new(host: impl Into<String>) -> Self {
        StaticHostname { host: host.into() }
    }

    /// Reads the hostname from the `HOST` environment variable.
    pub fn from_env() -> Result<Self, HostnameError> {
        match std::env::var("HOST") {
            Ok(host) if !host.is_empty() => Ok(StaticHostname::new(host)),
            _ => Err(HostnameError::Unconfigured),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

impl HostnameProvider for StaticHostname {
    async fn resolve(&self, _port: u16) -> Result<String, HostnameError> {
        Ok(self.host.clone())
    }
}
