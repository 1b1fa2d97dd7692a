// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Poll loop state shared with the bridge handle.

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::error::PollFailure;

/// Lifecycle state of a bridge's poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopState {
    /// No loop is running.
    Stopped,
    /// `connect()` is establishing the session.
    Connecting,
    /// The loop is polling for updates.
    Polling,
    /// The session expired and the loop is logging in again.
    Relogin,
}

impl LoopState {
    /// Returns `true` while a poll loop is active.
    #[must_use]
    pub fn is_running(self) -> bool {
        matches!(self, Self::Polling | Self::Relogin)
    }
}

impl std::fmt::Display for LoopState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Stopped => "stopped",
            Self::Connecting => "connecting",
            Self::Polling => "polling",
            Self::Relogin => "relogin",
        };
        f.write_str(label)
    }
}

/// State shared between the bridge handle and its worker.
#[derive(Debug)]
pub(crate) struct LoopStatus {
    state: watch::Sender<LoopState>,
    last_error: Mutex<Option<PollFailure>>,
}

impl LoopStatus {
    pub fn new() -> Self {
        let (state, _) = watch::channel(LoopState::Stopped);
        Self {
            state,
            last_error: Mutex::new(None),
        }
    }

    pub fn state(&self) -> LoopState {
        *self.state.borrow()
    }

    pub fn set_state(&self, state: LoopState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            tracing::debug!(from = %previous, to = %state, "Loop state changed");
        }
    }

    pub fn watch(&self) -> watch::Receiver<LoopState> {
        self.state.subscribe()
    }

    pub fn last_error(&self) -> Option<PollFailure> {
        self.last_error.lock().clone()
    }

    pub fn set_last_error(&self, failure: PollFailure) {
        *self.last_error.lock() = Some(failure);
    }
}
