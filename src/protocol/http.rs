// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `reqwest`-based transport for the Metronet cloud service.

use std::time::Duration;

use reqwest::Client;

use crate::error::ProtocolError;
use crate::protocol::{HttpRequest, HttpResponse, Method, Transport};

// ============================================================================
// HttpConfig - Connection parameters for the cloud service
// ============================================================================

/// Configuration for the HTTP transport.
///
/// # Examples
///
/// ```
/// use metronet_bridge::protocol::HttpConfig;
/// use std::time::Duration;
///
/// let config = HttpConfig::new("https://metronet.iessonline.com")
///     .with_timeout(Duration::from_secs(5));
/// assert_eq!(config.base_url(), "https://metronet.iessonline.com");
/// ```
#[derive(Debug, Clone)]
pub struct HttpConfig {
    base_url: String,
    timeout: Duration,
    user_agent: Option<String>,
}

impl HttpConfig {
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Creates a configuration for the given base URL.
    ///
    /// A bare host name gets an `https://` scheme; trailing slashes are removed.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let base_url = if base_url.starts_with("http://") || base_url.starts_with("https://") {
            base_url
        } else {
            format!("https://{base_url}")
        };

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Self::DEFAULT_TIMEOUT,
            user_agent: None,
        }
    }

    /// Sets the default request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets a custom `User-Agent` header.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the default timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Creates an `HttpClient` from this configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created.
    pub fn into_client(self) -> Result<HttpClient, ProtocolError> {
        let mut builder = Client::builder()
            .cookie_store(true)
            .timeout(self.timeout);

        if let Some(user_agent) = &self.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }

        let client = builder.build().map_err(ProtocolError::Http)?;

        Ok(HttpClient {
            base_url: self.base_url,
            timeout: self.timeout,
            client,
        })
    }
}

// ============================================================================
// HttpClient - Cookie-backed session transport
// ============================================================================

/// HTTP transport with a persistent cookie jar.
///
/// Redirects are followed, and the path of the final URL is reported so the
/// session layer can tell whether a login landed on the status page.
#[derive(Debug, Clone)]
pub struct HttpClient {
    base_url: String,
    timeout: Duration,
    client: Client,
}

impl HttpClient {
    /// Creates a transport for the given base URL with default settings.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ProtocolError> {
        HttpConfig::new(base_url).into_client()
    }

    /// Builds the absolute URL for a request path.
    fn build_url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }

    fn map_error(&self, error: reqwest::Error, timeout: Duration) -> ProtocolError {
        if error.is_timeout() {
            let millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
            ProtocolError::Timeout(millis)
        } else if error.is_connect() {
            ProtocolError::ConnectionFailed(format!("{}: {error}", self.base_url))
        } else {
            ProtocolError::Http(error)
        }
    }
}

impl Transport for HttpClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ProtocolError> {
        let url = self.build_url(&request.path);
        let timeout = request.timeout.unwrap_or(self.timeout);

        tracing::debug!(method = ?request.method, url = %url, "Sending HTTP request");

        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url).form(&request.form),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| self.map_error(e, timeout))?;

        let status = response.status().as_u16();
        let final_path = response.url().path().to_string();
        let body = response
            .text()
            .await
            .map_err(|e| self.map_error(e, timeout))?;

        tracing::debug!(
            status,
            final_path = %final_path,
            len = body.len(),
            "Received HTTP response"
        );

        Ok(HttpResponse {
            status,
            final_path,
            body,
        })
    }
}
