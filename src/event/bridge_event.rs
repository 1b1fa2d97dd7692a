// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bridge event types.

use crate::error::PollFailure;
use crate::state::Transition;

/// Events emitted by the bridge's poll loop.
///
/// Sensor transitions are delivered to registered callbacks first and then
/// published here, so subscribers see them in detection order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeEvent {
    /// The poll loop started.
    Started,

    /// A sensor's active flag changed.
    SensorChanged(Transition),

    /// The session expired and a new login succeeded.
    SessionRenewed,

    /// A poll cycle failed. Fatal failures stop the loop.
    PollFailed(PollFailure),

    /// The poll loop exited.
    Stopped,
}

impl BridgeEvent {
    /// Returns the transition carried by a `SensorChanged` event.
    #[must_use]
    pub fn transition(&self) -> Option<&Transition> {
        match self {
            Self::SensorChanged(transition) => Some(transition),
            _ => None,
        }
    }

    /// Returns `true` for a failure that stopped the loop.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::PollFailed(failure) if failure.fatal)
    }
}
