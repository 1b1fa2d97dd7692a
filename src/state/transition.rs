// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sensor state transitions.

use serde::{Deserialize, Serialize};

use super::{SensorId, SensorState};

/// A change of a sensor's active flag detected in one poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// The sensor that changed.
    pub sensor_id: SensorId,
    /// State before the change.
    pub previous: SensorState,
    /// New active flag.
    pub active: bool,
}

impl Transition {
    /// Creates a transition.
    #[must_use]
    pub fn new(sensor_id: SensorId, previous: SensorState, active: bool) -> Self {
        Self {
            sensor_id,
            previous,
            active,
        }
    }

    /// Returns the new state.
    #[must_use]
    pub fn state(&self) -> SensorState {
        SensorState::from(self.active)
    }
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "sensor {}: {} -> {}",
            self.sensor_id,
            self.previous,
            self.state()
        )
    }
}
