// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Registry of the sensors tracked by a bridge.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::session::CatalogEntry;

use super::{Sensor, SensorId};

/// How the registry obtained its sensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrySource {
    /// Sensors were supplied by configuration.
    Configured,
    /// Sensors are discovered from the remote catalog.
    Discovered,
}

/// Set of sensors keyed by id.
///
/// A configured registry has its key set fixed up front. A discovery registry
/// starts empty and takes its key set from the first catalog it sees; after
/// that the registry is sealed and later catalogs only fill missing names.
#[derive(Debug, Clone)]
pub struct SensorRegistry {
    sensors: BTreeMap<SensorId, Sensor>,
    source: RegistrySource,
    sealed: bool,
}

impl SensorRegistry {
    /// Creates an empty registry that discovers its sensors from the catalog.
    #[must_use]
    pub fn discovering() -> Self {
        Self {
            sensors: BTreeMap::new(),
            source: RegistrySource::Discovered,
            sealed: false,
        }
    }

    /// Creates a registry from configured sensors.
    ///
    /// An empty list falls back to discovery.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfiguration` if an id appears twice.
    pub fn configured(sensors: impl IntoIterator<Item = Sensor>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for sensor in sensors {
            let id = sensor.id();
            if map.insert(id, sensor).is_some() {
                return Err(Error::InvalidConfiguration(format!(
                    "sensor id {id} is configured more than once"
                )));
            }
        }

        if map.is_empty() {
            return Ok(Self::discovering());
        }

        Ok(Self {
            sensors: map,
            source: RegistrySource::Configured,
            sealed: true,
        })
    }

    /// Returns how the registry obtained its sensors.
    #[must_use]
    pub fn source(&self) -> RegistrySource {
        self.source
    }

    /// Returns `true` once the key set is fixed.
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Merges a remote catalog into the registry.
    ///
    /// An unsealed registry adopts every catalog input as a new sensor and
    /// seals itself. A sealed registry only fills names of known sensors.
    /// Returns the number of sensors added or renamed.
    pub fn apply_catalog(&mut self, entries: &[CatalogEntry]) -> usize {
        let mut touched = 0;

        if self.sealed {
            for entry in entries {
                if let Some(sensor) = self.sensors.get_mut(&entry.index)
                    && sensor.fill_name(&entry.description)
                {
                    touched += 1;
                }
            }
        } else {
            for entry in entries {
                let sensor = self
                    .sensors
                    .entry(entry.index)
                    .or_insert_with(|| Sensor::new(entry.index));
                sensor.fill_name(&entry.description);
                touched += 1;
            }
            self.sealed = true;
        }

        tracing::debug!(
            touched,
            total = self.sensors.len(),
            source = ?self.source,
            "Applied catalog to sensor registry"
        );
        touched
    }

    /// Returns the sensor with the given id.
    #[must_use]
    pub fn get(&self, id: SensorId) -> Option<&Sensor> {
        self.sensors.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: SensorId) -> Option<&mut Sensor> {
        self.sensors.get_mut(&id)
    }

    /// Returns `true` if a sensor with this id is registered.
    #[must_use]
    pub fn contains(&self, id: SensorId) -> bool {
        self.sensors.contains_key(&id)
    }

    /// Iterates over sensors in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Sensor> {
        self.sensors.values()
    }

    /// Returns a copy of all sensors in id order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Sensor> {
        self.sensors.values().cloned().collect()
    }

    /// Returns the number of sensors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    /// Returns `true` if no sensors are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }
}

impl Default for SensorRegistry {
    fn default() -> Self {
        Self::discovering()
    }
}
