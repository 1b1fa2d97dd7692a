// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sensor state tracking.
//!
//! This module holds the sensors a bridge knows about and the logic that turns
//! freshly fetched input readings into transitions.
//!
//! # Examples
//!
//! ```
//! use metronet_bridge::session::InputReading;
//! use metronet_bridge::state::{ChangeDetector, Sensor, SensorRegistry};
//!
//! let mut registry = SensorRegistry::configured([Sensor::new(1).with_kind("door")]).unwrap();
//!
//! // The first snapshot only records a baseline.
//! let closed = [InputReading { index: 1, active: false, marker: None }];
//! assert!(ChangeDetector::detect(&mut registry, &closed).is_empty());
//!
//! // A later change produces a transition.
//! let open = [InputReading { index: 1, active: true, marker: None }];
//! let detection = ChangeDetector::detect(&mut registry, &open);
//! assert_eq!(detection.transitions.len(), 1);
//! ```

mod detector;
mod registry;
mod sensor;
mod transition;

pub use detector::{ChangeDetector, Detection};
pub use registry::{RegistrySource, SensorRegistry};
pub use sensor::{Sensor, SensorId, SensorState};
pub use transition::Transition;
