//! HTTP client for the plant controller and camera firmware.
//!
//! Both boards expose plain `GET` endpoints without authentication. Every call
//! carries its own timeout; a call that fails for any reason (connection,
//! timeout, non-2xx status) yields [`Error::DeviceUnreachable`] and is never
//! retried here.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use plantcare_core::client::{DeviceClient, NO_QUERY};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = DeviceClient::new("http://192.168.1.50")?;
//!
//! let body = client.get_text("/sensor", NO_QUERY, Duration::from_secs(5)).await?;
//! println!("Soil moisture: {}%", body.trim());
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use bytes::Bytes;
use reqwest::Client;
use reqwest::header::CONNECTION;
use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result, UnreachableReason};

/// Empty query string for endpoints without parameters.
pub const NO_QUERY: &[(&str, &str)] = &[];

/// Upper bound on establishing a TCP connection, independent of per-call timeouts.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// HTTP client bound to a single device host.
#[derive(Debug, Clone)]
pub struct DeviceClient {
    client: Client,
    base_url: String,
}

impl DeviceClient {
    /// Create a new device client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The device root URL (e.g., "http://192.168.1.50")
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| Error::InvalidConfig(format!("failed to build HTTP client: {}", e)))?;

        Self::with_client(base_url, client)
    }

    /// Create a client with a custom reqwest Client.
    pub fn with_client(base_url: &str, client: Client) -> Result<Self> {
        let base_url = normalize_base_url(base_url)?;
        Ok(Self { client, base_url })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL for an endpoint path.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// `GET` an endpoint and return its body as text.
    pub async fn get_text<Q>(&self, path: &str, query: &Q, timeout: Duration) -> Result<String>
    where
        Q: Serialize + ?Sized,
    {
        let url = self.url(path);
        let response = self.send(&url, query, timeout, false).await?;
        response
            .text()
            .await
            .map_err(|e| unreachable(&url, &e))
    }

    /// `GET` an endpoint and return its raw body.
    ///
    /// The request asks the device to close the connection afterwards; the
    /// camera firmware only serves one client at a time.
    pub async fn get_bytes<Q>(&self, path: &str, query: &Q, timeout: Duration) -> Result<Bytes>
    where
        Q: Serialize + ?Sized,
    {
        let url = self.url(path);
        let response = self.send(&url, query, timeout, true).await?;
        response
            .bytes()
            .await
            .map_err(|e| unreachable(&url, &e))
    }

    async fn send<Q>(
        &self,
        url: &str,
        query: &Q,
        timeout: Duration,
        close: bool,
    ) -> Result<reqwest::Response>
    where
        Q: Serialize + ?Sized,
    {
        let mut request = self.client.get(url).query(query).timeout(timeout);
        if close {
            request = request.header(CONNECTION, "close");
        }

        let response = request.send().await.map_err(|e| unreachable(url, &e))?;

        let status = response.status();
        debug!("GET {} -> {}", url, status);
        if status.is_success() {
            Ok(response)
        } else {
            Err(Error::DeviceUnreachable {
                url: url.to_string(),
                reason: UnreachableReason::Status(status.as_u16()),
            })
        }
    }
}

fn normalize_base_url(base_url: &str) -> Result<String> {
    // Normalize URL (remove trailing slash)
    let base_url = base_url.trim().trim_end_matches('/').to_string();

    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(Error::InvalidUrl(format!(
            "URL must start with http:// or https://, got: {}",
            base_url
        )));
    }
    Ok(base_url)
}

fn unreachable(url: &str, err: &reqwest::Error) -> Error {
    let reason = if err.is_timeout() {
        UnreachableReason::Timeout
    } else if err.is_connect() {
        UnreachableReason::Connect(root_cause(err))
    } else if let Some(status) = err.status() {
        UnreachableReason::Status(status.as_u16())
    } else {
        UnreachableReason::Other(root_cause(err))
    };

    Error::DeviceUnreachable {
        url: url.to_string(),
        reason,
    }
}

/// Innermost error message, which is what reqwest hides behind "error sending request".
fn root_cause(err: &(dyn std::error::Error + 'static)) -> String {
    let mut current = err;
    while let Some(source) = current.source() {
        current = source;
    }
    current.to_string()
}
