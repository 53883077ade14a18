//! Configuration for bridge discovery.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

/// Default Moat discovery service base URL.
pub const DEFAULT_MOAT_URL: &str = "https://bridges.torproject.org/moat";

/// Default timeout for each network leg and for the transport handshake.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// A domain-fronting descriptor: the real service URL and the front domain
/// presented in the outer TLS handshake.
///
/// The pair is passed to the transport as its SOCKS username, so the values
/// must match what the meek bridge expects. These are fixed protocol
/// parameters, not secrets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fronting {
    url: String,
    front: String,
}

impl Fronting {
    /// Front through a custom CDN endpoint.
    pub fn new(url: impl Into<String>, front: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            front: front.into(),
        }
    }

    /// Moat's Fastly endpoint, fronted by cdn.sstatic.net.
    pub fn fastly() -> Self {
        Self::new(
            "https://moat.torproject.org.global.prod.fastly.net/",
            "cdn.sstatic.net",
        )
    }

    /// Moat's Azure endpoint, fronted by ajax.aspnetcdn.com.
    pub fn azure() -> Self {
        Self::new("https://onion.azureedge.net/", "ajax.aspnetcdn.com")
    }

    /// Moat's CDN77 endpoint, fronted by www.phpmyadmin.net.
    pub fn cdn77() -> Self {
        Self::new("https://1314488750.rsc.cdn77.org/", "www.phpmyadmin.net")
    }

    /// The descriptor in the `url=...;front=...` form the transport reads
    /// from the SOCKS username field.
    pub(crate) fn proxy_username(&self) -> String {
        format!("url={};front={}", self.url, self.front)
    }
}

impl Default for Fronting {
    fn default() -> Self {
        Self::fastly()
    }
}

/// Configuration for a [`MoatClient`](crate::MoatClient).
///
/// Only the helper executable and its state directory are required; the rest
/// defaults to the public Moat deployment.
#[derive(Debug, Clone)]
pub struct MoatConfig {
    /// Path to the pluggable-transport helper executable (lyrebird or
    /// obfs4proxy).
    pub executable: PathBuf,
    /// Writable state directory handed to the helper. Must exist.
    pub state_dir: PathBuf,
    /// Base URL of the discovery service.
    pub base_url: Url,
    /// Domain-fronting descriptor used as the proxy credential.
    pub fronting: Fronting,
    /// Bounded wait for the transport's handshake line.
    pub handshake_timeout: Duration,
    /// Connect and overall timeout for the discovery request.
    pub request_timeout: Duration,
    /// Pass `-enableLogging -logLevel=DEBUG` to the helper.
    pub transport_log: bool,
}

impl MoatConfig {
    pub fn new(executable: impl Into<PathBuf>, state_dir: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            state_dir: state_dir.into(),
            base_url: Url::parse(DEFAULT_MOAT_URL).expect("default Moat URL is parseable"),
            fronting: Fronting::default(),
            handshake_timeout: DEFAULT_TIMEOUT,
            request_timeout: DEFAULT_TIMEOUT,
            transport_log: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proxy_username_matches_transport_format() {
        let fronting = Fronting::default();
        assert_eq!(
            fronting.proxy_username(),
            "url=https://moat.torproject.org.global.prod.fastly.net/;front=cdn.sstatic.net"
        );
    }

    #[test]
    fn custom_fronting() {
        let fronting = Fronting::new("https://example.invalid/", "front.example.com");
        assert_eq!(
            fronting.proxy_username(),
            "url=https://example.invalid/;front=front.example.com"
        );
    }

    #[test]
    fn config_defaults() {
        let config = MoatConfig::new("/usr/bin/lyrebird", "/tmp/state");
        assert_eq!(config.base_url.as_str(), "https://bridges.torproject.org/moat");
        assert_eq!(config.handshake_timeout, Duration::from_secs(20));
        assert_eq!(config.fronting, Fronting::fastly());
        assert!(!config.transport_log);
    }
}
