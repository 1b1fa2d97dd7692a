// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Event system for poll loop activity.
//!
//! Besides per-sensor callbacks, the bridge publishes [`BridgeEvent`]s on an
//! [`EventBus`] backed by tokio's broadcast channel. Hosts use it to observe
//! session renewals and steady-state failures, which are otherwise only
//! visible in logs.
//!
//! # Examples
//!
//! ```
//! use metronet_bridge::event::{BridgeEvent, EventBus};
//!
//! let bus = EventBus::new();
//! let mut rx = bus.subscribe();
//!
//! bus.publish(BridgeEvent::Started);
//! ```

mod bridge_event;
mod event_bus;

pub use bridge_event::BridgeEvent;
pub use event_bus::EventBus;
