//! Domain-fronted discovery request.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Proxy};
use tracing::debug;
use url::Url;

use crate::config::Fronting;
use crate::error::RequestError;
use crate::transport::ProxyEndpoint;

/// Path of the circumvention settings operation, relative to the base URL.
const CIRCUMVENTION_SETTINGS: &str = "circumvention/settings";

/// Password half of the transport's SOCKS credential. A single NUL byte,
/// required verbatim by the meek client.
const FRONT_AUTH_PASSWORD: &str = "\u{0}";

const JSON_UTF8: &str = "application/json; charset=utf-8";

/// Issues the single discovery request through the transport's SOCKS proxy.
pub struct DiscoveryClient {
    base_url: Url,
    fronting: Fronting,
    timeout: Duration,
}

impl DiscoveryClient {
    pub fn new(base_url: Url, fronting: Fronting, timeout: Duration) -> Self {
        Self {
            base_url,
            fronting,
            timeout,
        }
    }

    /// POST the settings request and return the raw response body.
    ///
    /// One attempt, no retries. The target hostname is never resolved
    /// locally; the socks5h scheme hands resolution to the transport.
    pub async fn fetch(
        &self,
        endpoint: &ProxyEndpoint,
        country: Option<&str>,
    ) -> Result<Vec<u8>, RequestError> {
        let proxy_url = format!("socks5h://{}:{}", endpoint.host, endpoint.port);
        let proxy = Proxy::all(proxy_url.as_str())?
            .basic_auth(&self.fronting.proxy_username(), FRONT_AUTH_PASSWORD);

        let client = Client::builder()
            .proxy(proxy)
            .use_rustls_tls()
            .connect_timeout(self.timeout)
            .read_timeout(self.timeout)
            .timeout(self.timeout)
            .build()?;

        let url = self.settings_url()?;
        let body = match country {
            Some(country) => serde_json::json!({ "country": country }).to_string(),
            None => String::new(),
        };

        debug!("POST {} via {}", url, proxy_url);
        let response = client
            .post(url)
            .header(CONTENT_TYPE, JSON_UTF8)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RequestError::HttpStatus(status));
        }
        Ok(response.bytes().await?.to_vec())
    }

    fn settings_url(&self) -> Result<Url, url::ParseError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{}/{}", base, CIRCUMVENTION_SETTINGS))
    }
}
