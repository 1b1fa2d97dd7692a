// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Detection of sensor transitions between two input snapshots.

use crate::session::InputReading;

use super::{SensorRegistry, SensorState, Transition};

/// Result of running the detector over one input snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Detection {
    /// Transitions in the order the readings were listed.
    pub transitions: Vec<Transition>,
    /// Number of sensors that received their first value.
    pub baselined: usize,
    /// Marker of the last reading in the snapshot, echoed in update requests.
    pub input_marker: Option<String>,
}

impl Detection {
    /// Returns `true` if no transition was detected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}

/// Compares fetched readings against the registry and records new values.
pub struct ChangeDetector;

impl ChangeDetector {
    /// Applies `readings` to `registry` and returns the resulting transitions.
    ///
    /// Readings for unknown indices are ignored. A sensor seen for the first
    /// time gets its value recorded without producing a transition.
    pub fn detect(registry: &mut SensorRegistry, readings: &[InputReading]) -> Detection {
        let mut detection = Detection::default();

        for reading in readings {
            if let Some(marker) = &reading.marker {
                detection.input_marker = Some(marker.clone());
            }

            let Some(sensor) = registry.get_mut(reading.index) else {
                continue;
            };

            let previous = sensor.state();
            let next = SensorState::from(reading.active);

            if !previous.is_known() {
                sensor.set_state(next);
                detection.baselined += 1;
            } else if previous != next {
                sensor.set_state(next);
                detection
                    .transitions
                    .push(Transition::new(reading.index, previous, reading.active));
            }
        }

        detection
    }
}
