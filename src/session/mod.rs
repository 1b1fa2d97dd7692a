// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Authenticated session with the Metronet cloud service.
//!
//! [`SessionClient`] wraps a [`Transport`] and implements the remote
//! operations the bridge relies on:
//!
//! - [`login`](SessionClient::login): credential handshake, extracts the
//!   session id and input marker from the status page
//! - [`fetch_catalog`](SessionClient::fetch_catalog): input names
//! - [`fetch_inputs`](SessionClient::fetch_inputs): current input values
//! - [`fetch_update_flag`](SessionClient::fetch_update_flag): long-poll for
//!   changes
//!
//! # Failure classification
//!
//! Authenticated calls report [`Error::AuthenticationFailed`] when the service
//! answers with a non-success status or a body that is not JSON at all (an
//! expired session is answered with the HTML login page). JSON with missing
//! fields is an [`Error::Parse`], and transport failures are
//! [`Error::Protocol`].

mod status_page;
mod wire;

pub use wire::{
    CatalogEntry, INPUT_CLASS, INPUTS_PATH, InputReading, ROOT_PATH, STATUS_PATH, STRINGS_PATH,
    UPDATES_PATH,
};

use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::{Error, ParseError, Result};
use crate::protocol::{HttpRequest, HttpResponse, Transport};

use status_page::{LAST_INPUT_VAR, SESSION_ID_VAR, script_variable};
use wire::{InputEntry, StringEntry, UpdatesResponse};

/// Account credentials for the cloud service.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    /// Account user name.
    pub username: String,
    /// Account password.
    pub password: String,
}

impl Credentials {
    /// Creates credentials.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Correlation values of the current session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    session_id: Option<String>,
    input_marker: Option<String>,
    authenticated: bool,
}

impl SessionState {
    /// Returns the session id sent with every API call.
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Returns the last input marker, echoed in update requests.
    #[must_use]
    pub fn input_marker(&self) -> Option<&str> {
        self.input_marker.as_deref()
    }

    /// Returns `true` while the session is usable.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }
}

/// Client for the Metronet web API over a cookie-backed transport.
#[derive(Debug)]
pub struct SessionClient<T> {
    transport: T,
    credentials: Credentials,
    state: SessionState,
    request_timeout: Duration,
    update_timeout: Duration,
}

impl<T: Transport> SessionClient<T> {
    /// Default timeout for login, catalog and inputs requests.
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
    /// Default timeout for the long-poll update request.
    pub const DEFAULT_UPDATE_TIMEOUT: Duration = Duration::from_secs(30);

    /// Creates a session client. No request is sent until [`login`](Self::login).
    #[must_use]
    pub fn new(transport: T, credentials: Credentials) -> Self {
        Self {
            transport,
            credentials,
            state: SessionState::default(),
            request_timeout: Self::DEFAULT_REQUEST_TIMEOUT,
            update_timeout: Self::DEFAULT_UPDATE_TIMEOUT,
        }
    }

    /// Sets the timeouts for regular requests and for the long-poll request.
    #[must_use]
    pub fn with_timeouts(mut self, request: Duration, update: Duration) -> Self {
        self.request_timeout = request;
        self.update_timeout = update;
        self
    }

    /// Returns the current session state.
    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Returns `true` while the session is usable.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.authenticated
    }

    /// Returns the underlying transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Marks the session as expired. Ids are kept until the next login.
    pub fn invalidate(&mut self) {
        if self.state.authenticated {
            tracing::debug!("Session invalidated");
        }
        self.state.authenticated = false;
    }

    /// Records the most recent input marker seen in an inputs snapshot.
    pub fn set_input_marker(&mut self, marker: impl Into<String>) {
        self.state.input_marker = Some(marker.into());
    }

    /// Requests the service root so the transport picks up session cookies.
    ///
    /// # Errors
    ///
    /// Returns `Error::Protocol` if the service cannot be reached.
    pub async fn init_session(&self) -> Result<()> {
        let response = self.transport.send(HttpRequest::get(ROOT_PATH)).await?;
        tracing::debug!(status = response.status, "Session cookie initialized");
        Ok(())
    }

    /// Logs in with the configured credentials.
    ///
    /// Returns `Ok(false)` if the service did not accept the credentials.
    ///
    /// # Errors
    ///
    /// Returns `Error::Protocol` on transport failure and `Error::Parse` if the
    /// status page does not carry a session id.
    pub async fn login(&mut self) -> Result<bool> {
        self.state.authenticated = false;

        let base = self.transport.base_url().to_string();
        let request = HttpRequest::post(ROOT_PATH)
            .header("sec-fetch-mode", "navigate")
            .header("sec-fetch-user", "?1")
            .header("sec-fetch-site", "same-origin")
            .header("origin", base.clone())
            .header("referer", format!("{base}/"))
            .field("IsDisableAccountCreation", "False")
            .field("IsAllowThemeChange", "False")
            .field("UserName", self.credentials.username.clone())
            .field("Password", self.credentials.password.clone())
            .field("RememberMe", "false")
            .with_timeout(self.request_timeout);

        let response = self.transport.send(request).await?;
        let logged_in = response.is_success() && response.final_path == STATUS_PATH;

        tracing::debug!(
            status = response.status,
            final_path = %response.final_path,
            logged_in,
            "Login response"
        );

        if !logged_in {
            return Ok(false);
        }

        let session_id = script_variable(&response.body, SESSION_ID_VAR)
            .ok_or_else(|| ParseError::MissingField(SESSION_ID_VAR.to_string()))?;
        let input_marker = script_variable(&response.body, LAST_INPUT_VAR);
        if input_marker.is_none() {
            tracing::warn!("Status page has no last input marker");
        }

        self.state = SessionState {
            session_id: Some(session_id.to_string()),
            input_marker: input_marker.map(str::to_string),
            authenticated: true,
        };

        tracing::debug!(
            session_id = %session_id,
            input_marker = ?self.state.input_marker,
            "Session established"
        );
        Ok(true)
    }

    /// Fetches the catalog and returns the panel inputs it lists.
    ///
    /// # Errors
    ///
    /// See the [module documentation](self) for the failure classification.
    pub async fn fetch_catalog(&self) -> Result<Vec<CatalogEntry>> {
        let request = self.api_request(STRINGS_PATH)?;
        let response = self.transport.send(request).await?;
        let entries: Vec<StringEntry> = decode(&response)?;

        let inputs: Vec<CatalogEntry> = entries
            .into_iter()
            .filter_map(StringEntry::into_input)
            .collect();

        tracing::debug!(inputs = inputs.len(), "Fetched catalog");
        Ok(inputs)
    }

    /// Fetches the current value of every input.
    ///
    /// # Errors
    ///
    /// See the [module documentation](self) for the failure classification.
    pub async fn fetch_inputs(&self) -> Result<Vec<InputReading>> {
        let request = self.api_request(INPUTS_PATH)?;
        let response = self.transport.send(request).await?;
        let entries: Vec<InputEntry> = decode(&response)?;

        tracing::debug!(inputs = entries.len(), "Fetched inputs");
        Ok(entries.into_iter().map(InputReading::from).collect())
    }

    /// Asks the service whether anything changed since the last input marker.
    ///
    /// The service may hold this request open until a change happens or its
    /// own timeout elapses.
    ///
    /// # Errors
    ///
    /// See the [module documentation](self) for the failure classification.
    pub async fn fetch_update_flag(&self) -> Result<bool> {
        let mut request = self
            .api_request(UPDATES_PATH)?
            .field("CanElevate", "1")
            .field("ConnectionStatus", "1");
        // Without a marker the field is left out of the form.
        if let Some(marker) = &self.state.input_marker {
            request = request.field("Inputs", marker.clone());
        }
        let request = request
            .field("LoggedIn", "0")
            .field("LoginInProgress", "0")
            .field("ReadStringsInProgress", "0")
            .field("Strings", "1")
            .with_timeout(self.update_timeout);

        let response = self.transport.send(request).await?;
        let update: UpdatesResponse = decode(&response)?;

        tracing::debug!(
            input_marker = ?self.state.input_marker,
            has_changes = update.has_changes,
            "Fetched updates"
        );
        Ok(update.has_changes)
    }

    /// Builds an authenticated API request carrying the session id.
    fn api_request(&self, path: &str) -> Result<HttpRequest> {
        let session_id = match (&self.state.session_id, self.state.authenticated) {
            (Some(id), true) => id.clone(),
            _ => return Err(Error::NotConnected),
        };

        let base = self.transport.base_url();
        Ok(HttpRequest::post(path)
            .header("x-requested-with", "XMLHttpRequest")
            .header("sec-fetch-mode", "cors")
            .header("sec-fetch-site", "same-origin")
            .header("origin", base)
            .header("referer", format!("{base}{STATUS_PATH}"))
            .field("sessionId", session_id)
            .with_timeout(self.request_timeout))
    }
}

/// Decodes an authenticated API response.
fn decode<R: DeserializeOwned>(response: &HttpResponse) -> Result<R> {
    if !response.is_success() {
        tracing::debug!(status = response.status, "API call rejected");
        return Err(Error::AuthenticationFailed);
    }

    let Ok(value) = serde_json::from_str::<serde_json::Value>(&response.body) else {
        tracing::debug!(final_path = %response.final_path, "API call answered with non-JSON body");
        return Err(Error::AuthenticationFailed);
    };

    serde_json::from_value(value).map_err(|e| Error::Parse(ParseError::Json(e)))
}
