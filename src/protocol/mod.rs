// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Transport abstraction for talking to the Metronet cloud service.
//!
//! The session layer only needs to issue GET and form-encoded POST requests
//! that share a cookie-backed session. That capability is expressed by the
//! [`Transport`] trait so the poll loop can run against any HTTP stack.
//!
//! # Implementations
//!
//! - [`HttpClient`]: the default `reqwest`-based transport (feature `http`)
//!
//! Tests and hosts with their own HTTP stack can implement [`Transport`]
//! directly.

#[cfg(feature = "http")]
mod http;

#[cfg(feature = "http")]
pub use http::{HttpClient, HttpConfig};

use std::future::Future;
use std::time::Duration;

use crate::error::ProtocolError;

/// HTTP method used by a [`HttpRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// `GET` request without a body.
    Get,
    /// `POST` request with a form-encoded body.
    Post,
}

/// A request issued by the session client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Request method.
    pub method: Method,
    /// Path relative to the transport's base URL, starting with `/`.
    pub path: String,
    /// Form fields sent as `application/x-www-form-urlencoded`.
    pub form: Vec<(String, String)>,
    /// Extra request headers.
    pub headers: Vec<(String, String)>,
    /// Per-request timeout; the transport default applies when unset.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    /// Creates a `GET` request for the given path.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            form: Vec::new(),
            headers: Vec::new(),
            timeout: None,
        }
    }

    /// Creates a form `POST` request for the given path.
    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            ..Self::get(path)
        }
    }

    /// Appends a form field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.push((name.into(), value.into()));
        self
    }

    /// Appends a request header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns the value of a form field, if present.
    #[must_use]
    pub fn form_value(&self, name: &str) -> Option<&str> {
        self.form
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// A response received from the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Path of the final URL after redirects were followed.
    pub final_path: String,
    /// Response body as text.
    pub body: String,
}

impl HttpResponse {
    /// Creates a `200 OK` response for `path` with the given body.
    #[must_use]
    pub fn ok(final_path: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            status: 200,
            final_path: final_path.into(),
            body: body.into(),
        }
    }

    /// Returns `true` for 2xx status codes.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Capability to send requests within one cookie-backed HTTP session.
///
/// Implementations must keep cookies across calls and follow redirects,
/// reporting the final path in [`HttpResponse::final_path`].
pub trait Transport: Send + Sync {
    /// Returns the base URL requests are resolved against (no trailing slash).
    fn base_url(&self) -> &str;

    /// Sends a request and returns the response.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` on connection failures and timeouts. Non-success
    /// status codes are returned as responses, not errors.
    fn send(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, ProtocolError>> + Send;
}
