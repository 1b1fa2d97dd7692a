// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bridge controller and poll loop.
//!
//! A [`Bridge`] owns one cloud session and a background task that long-polls
//! the service for changes. Each cycle of the loop:
//!
//! 1. logs in again if the session expired,
//! 2. asks whether anything changed since the last input marker,
//! 3. on a change, fetches every input and runs change detection,
//! 4. dispatches transitions to callbacks and to event subscribers.
//!
//! Failures follow a [`RetryPolicy`]: an immediate retry, then a growing
//! cooldown before a forced re-login, and finally a fatal stop once the
//! recovery budget is exhausted.
//!
//! # Observing the loop
//!
//! ```no_run
//! use metronet_bridge::bridge::{Bridge, BridgeConfig, LoopState};
//! use metronet_bridge::event::BridgeEvent;
//!
//! # async fn example() -> metronet_bridge::Result<()> {
//! let mut bridge = Bridge::new(BridgeConfig::new("user@example.com", "secret"))?;
//! let mut events = bridge.subscribe();
//!
//! bridge.connect().await?;
//! bridge.start().await?;
//! assert_eq!(bridge.state(), LoopState::Polling);
//!
//! while let Ok(event) = events.recv().await {
//!     if let BridgeEvent::SensorChanged(transition) = event {
//!         println!("{transition}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod config;
mod controller;
mod poll_worker;
mod status;

pub use config::{BridgeConfig, DEFAULT_BASE_URL, RetryPolicy, SensorConfig};
pub use controller::Bridge;
pub use status::LoopState;
