// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sensor entity and its observed state.

use serde::{Deserialize, Serialize};

/// Identifier of a panel input, as assigned by the remote service.
pub type SensorId = u32;

/// Last observed state of a binary input.
///
/// A sensor starts as [`SensorState::Unknown`] and only gets a definite value
/// once the inputs have been fetched for the first time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SensorState {
    /// No value has been observed yet.
    #[default]
    Unknown,
    /// The input is in alarm (open door, detected motion, ...).
    Active,
    /// The input is at rest.
    Inactive,
}

impl SensorState {
    /// Returns the boolean value, or `None` when unknown.
    #[must_use]
    pub fn as_bool(self) -> Option<bool> {
        match self {
            Self::Unknown => None,
            Self::Active => Some(true),
            Self::Inactive => Some(false),
        }
    }

    /// Returns `true` if a value has been observed.
    #[must_use]
    pub fn is_known(self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl From<bool> for SensorState {
    fn from(active: bool) -> Self {
        if active { Self::Active } else { Self::Inactive }
    }
}

impl std::fmt::Display for SensorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Unknown => "unknown",
            Self::Active => "active",
            Self::Inactive => "inactive",
        };
        f.write_str(label)
    }
}

/// A binary input of the alarm panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sensor {
    id: SensorId,
    kind: Option<String>,
    name: Option<String>,
    state: SensorState,
}

impl Sensor {
    /// Creates a sensor with unknown state.
    #[must_use]
    pub fn new(id: SensorId) -> Self {
        Self {
            id,
            kind: None,
            name: None,
            state: SensorState::Unknown,
        }
    }

    /// Sets the kind tag (e.g. `"door"`, `"motion"`).
    #[must_use]
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Returns the sensor id.
    #[must_use]
    pub fn id(&self) -> SensorId {
        self.id
    }

    /// Returns the kind tag, if configured.
    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    /// Returns the display name, if known.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the last observed state.
    #[must_use]
    pub fn state(&self) -> SensorState {
        self.state
    }

    /// Returns the last observed value, or `None` before the first fetch.
    #[must_use]
    pub fn active(&self) -> Option<bool> {
        self.state.as_bool()
    }

    pub(crate) fn set_state(&mut self, state: SensorState) {
        self.state = state;
    }

    /// Fills the name if none is set. Returns `true` if the name changed.
    pub(crate) fn fill_name(&mut self, name: &str) -> bool {
        if self.name.as_deref().is_some_and(|n| !n.is_empty()) || name.is_empty() {
            return false;
        }
        self.name = Some(name.to_string());
        true
    }
}
