//! Bridge discovery through Moat, Tor's domain-fronted circumvention
//! settings API.
//!
//! Censored users cannot reach the bridge distribution service directly, so
//! the request is tunneled through a meek pluggable transport that disguises
//! it as traffic to a CDN front domain.
//!
//! # How it works
//!
//! 1. Spawn the transport helper (lyrebird / obfs4proxy) and wait for it to
//!    announce a local SOCKS proxy
//! 2. POST to the settings endpoint through that proxy, handing the
//!    transport a `url=...;front=...` descriptor as its SOCKS credential
//! 3. Parse the JSON response into [`BridgeConfig`] records
//! 4. Kill the helper, on every exit path
//!
//! # Example
//!
//! ```no_run
//! use moat_client::MoatClient;
//!
//! # async fn example() -> Result<(), moat_client::MoatError> {
//! let client = MoatClient::new("/usr/bin/lyrebird", "/var/lib/moat/state");
//! for bridge in client.fetch_bridges_for_country("cn").await? {
//!     println!("{} ({})", bridge.transport_type, bridge.source);
//! }
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

mod bridges;
mod client;
mod config;
mod error;
mod transport;

pub use bridges::{parse_settings, BridgeConfig};
pub use client::DiscoveryClient;
pub use config::{Fronting, MoatConfig, DEFAULT_MOAT_URL, DEFAULT_TIMEOUT};
pub use error::{LaunchError, MoatError, ParseError, RequestError};
pub use transport::{ProxyEndpoint, TransportHandle, TransportLauncher};

/// Discovers bridge configurations over a domain-fronted transport.
///
/// Each fetch owns one complete helper-process lifecycle: the transport is
/// spawned, used for a single request, and terminated before the call
/// returns, whether the call succeeded or not.
pub struct MoatClient {
    config: MoatConfig,
}

impl MoatClient {
    /// Client with default settings for the given helper executable and
    /// state directory.
    pub fn new(executable: impl Into<PathBuf>, state_dir: impl Into<PathBuf>) -> Self {
        Self::with_config(MoatConfig::new(executable, state_dir))
    }

    pub fn with_config(config: MoatConfig) -> Self {
        Self { config }
    }

    /// Fetch bridge configurations without a country filter.
    pub async fn fetch_bridges(&self) -> Result<Vec<BridgeConfig>, MoatError> {
        self.fetch(None).await
    }

    /// Fetch bridge configurations for a two-letter country code.
    ///
    /// The service returns an empty list for countries where Tor is not
    /// blocked.
    pub async fn fetch_bridges_for_country(
        &self,
        country: &str,
    ) -> Result<Vec<BridgeConfig>, MoatError> {
        self.fetch(Some(country)).await
    }

    async fn fetch(&self, country: Option<&str>) -> Result<Vec<BridgeConfig>, MoatError> {
        let launcher = TransportLauncher::new(&self.config.executable, &self.config.state_dir)
            .handshake_timeout(self.config.handshake_timeout)
            .transport_log(self.config.transport_log);
        let (mut transport, endpoint) = launcher.launch().await?;

        // The helper must be torn down no matter how the request or the
        // parse turns out.
        let result = self.fetch_through(&endpoint, country).await;
        transport.terminate().await;
        result
    }

    async fn fetch_through(
        &self,
        endpoint: &ProxyEndpoint,
        country: Option<&str>,
    ) -> Result<Vec<BridgeConfig>, MoatError> {
        let client = DiscoveryClient::new(
            self.config.base_url.clone(),
            self.config.fronting.clone(),
            self.config.request_timeout,
        );
        let body = client.fetch(endpoint, country).await?;
        Ok(parse_settings(&body)?)
    }
}
