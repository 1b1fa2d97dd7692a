// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Subscription system for sensor transitions.
//!
//! Hosts register callbacks per sensor id. When the poll loop detects that a
//! sensor's active flag flipped, every callback registered for that sensor is
//! invoked with `(sensor_id, active)`.
//!
//! # Usage
//!
//! ```
//! use metronet_bridge::subscription::CallbackRegistry;
//!
//! let registry = CallbackRegistry::new();
//!
//! let sub_id = registry.register(3, |id, active| {
//!     println!("Sensor {id} is now {}", if active { "open" } else { "closed" });
//! });
//!
//! // Later, unsubscribe
//! assert!(registry.unsubscribe(sub_id));
//! ```
//!
//! # Failure isolation
//!
//! A callback that panics is caught and logged. Delivery continues with the
//! next callback, and the poll loop keeps running.

mod callback;

pub use callback::{CallbackRegistry, DispatchReport, SubscriptionId};
