// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `Metronet` Bridge - A Rust library bridging Metronet alarm panels.
//!
//! This library logs into the Metronet cloud service, long-polls it for
//! changes and reports every open/closed transition of the panel's inputs
//! (door contacts, motion detectors, ...) to host callbacks.
//!
//! # Features
//!
//! - **Session management**: cookie-based login with transparent re-login
//! - **Sensor registry**: configured sensors, or every input the catalog lists
//! - **Change detection**: baselining, then one notification per flip
//! - **Recovery**: immediate retry, exponential cooldown, bounded attempts
//! - **Events**: broadcast channel for transitions, renewals and failures
//!
//! # Quick Start
//!
//! ```no_run
//! use metronet_bridge::{Bridge, BridgeConfig, SensorConfig};
//!
//! #[tokio::main]
//! async fn main() -> metronet_bridge::Result<()> {
//!     let config = BridgeConfig::new("user@example.com", "secret")
//!         .with_sensor(SensorConfig::new(1).with_kind("door"))
//!         .with_sensor(SensorConfig::new(2).with_kind("motion"));
//!
//!     let mut bridge = Bridge::new(config)?;
//!     bridge.register_callback(1, |id, active| {
//!         println!("Door {id}: {}", if active { "open" } else { "closed" });
//!     });
//!
//!     if !bridge.connect().await? {
//!         eprintln!("Login rejected");
//!         return Ok(());
//!     }
//!     for sensor in bridge.list_sensors() {
//!         println!("{}: {:?} ({})", sensor.id(), sensor.name(), sensor.state());
//!     }
//!
//!     bridge.start().await?;
//!     tokio::time::sleep(std::time::Duration::from_secs(600)).await;
//!     bridge.stop().await
//! }
//! ```
//!
//! ## Custom transports
//!
//! The HTTP client is behind the default `http` feature. Any type
//! implementing [`protocol::Transport`] can drive a bridge through
//! [`Bridge::with_transport`].

pub mod bridge;
pub mod error;
pub mod event;
pub mod protocol;
pub mod session;
pub mod state;
pub mod subscription;

pub use bridge::{Bridge, BridgeConfig, LoopState, RetryPolicy, SensorConfig};
pub use error::{Error, FailureKind, ParseError, PollFailure, ProtocolError, Result};
pub use event::{BridgeEvent, EventBus};
#[cfg(feature = "http")]
pub use protocol::{HttpClient, HttpConfig};
pub use protocol::{HttpRequest, HttpResponse, Method, Transport};
pub use session::{CatalogEntry, Credentials, InputReading, SessionClient};
pub use state::{Sensor, SensorId, SensorRegistry, SensorState, Transition};
pub use subscription::{CallbackRegistry, SubscriptionId};
