// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the Metronet bridge.
//!
//! Failures are grouped in three layers: transport problems
//! ([`ProtocolError`]), payloads that do not match the expected shape
//! ([`ParseError`]), and bridge-level conditions carried by [`Error`].
//! The poll loop folds all of them into a [`FailureKind`] when deciding how
//! to recover.

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred during transport communication.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Error occurred while parsing a response payload.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Credentials were rejected or the session expired.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// An operation requiring an authenticated session was attempted without one.
    #[error("bridge is not connected")]
    NotConnected,

    /// The poll loop is already running.
    #[error("poll loop is already running")]
    AlreadyRunning,

    /// The bridge configuration is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The background worker terminated abnormally.
    #[error("poll worker failed: {0}")]
    WorkerFailed(String),
}

impl Error {
    /// Returns `true` if this error means the session must be re-established.
    #[must_use]
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::AuthenticationFailed | Self::NotConnected)
    }

    /// Classifies the error for retry decisions.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::AuthenticationFailed | Self::NotConnected => FailureKind::Authentication,
            Self::Parse(_) => FailureKind::Protocol,
            Self::Protocol(_)
            | Self::AlreadyRunning
            | Self::InvalidConfiguration(_)
            | Self::WorkerFailed(_) => FailureKind::Network,
        }
    }
}

/// Errors related to transport communication.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// HTTP request failed.
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Connection to the service failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Request timed out.
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    /// Invalid URL or address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The service answered with a non-success status code.
    #[error("unexpected HTTP status {0}")]
    UnexpectedStatus(u16),
}

/// Errors related to parsing service responses.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Expected field is missing from the response.
    #[error("missing field in response: {0}")]
    MissingField(String),

    /// Unexpected response format.
    #[error("unexpected response format: {0}")]
    UnexpectedFormat(String),
}

/// Coarse failure category used by the poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Credentials rejected or session expired.
    Authentication,
    /// Transport-level failure (timeout, refused connection, bad status).
    Network,
    /// Well-formed response whose payload lacks expected fields.
    Protocol,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Authentication => "authentication",
            Self::Network => "network",
            Self::Protocol => "protocol",
        };
        f.write_str(label)
    }
}

/// A recorded failure of the background poll loop.
///
/// Unlike [`Error`], this type is cheap to clone so it can be stored as the
/// bridge's last error and broadcast to event subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollFailure {
    /// Failure category.
    pub kind: FailureKind,
    /// Human-readable description of the underlying error.
    pub message: String,
    /// `true` if the loop gave up and stopped after this failure.
    pub fatal: bool,
}

impl PollFailure {
    /// Records a recoverable failure.
    #[must_use]
    pub fn from_error(error: &Error) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
            fatal: false,
        }
    }

    /// Marks this failure as the one that stopped the loop.
    #[must_use]
    pub fn into_fatal(mut self) -> Self {
        self.fatal = true;
        self
    }
}

impl std::fmt::Display for PollFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} failure: {}", self.kind, self.message)?;
        if self.fatal {
            f.write_str(" (fatal)")?;
        }
        Ok(())
    }
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
