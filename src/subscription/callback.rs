// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Callback management for sensor transitions.
//!
//! This module provides the core types for managing sensor callbacks:
//!
//! - [`SubscriptionId`] - Unique identifier for unsubscribing
//! - [`CallbackRegistry`] - Registry for storing and dispatching callbacks

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::state::{SensorId, Transition};

/// Unique identifier for a subscription.
///
/// Returned when registering a callback and used to unsubscribe later. IDs
/// are unique within a registry's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Creates a new subscription ID with the given value.
    #[must_use]
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", self.0)
    }
}

/// Callback invoked with the sensor id and its new active flag.
type SensorCallback = Arc<dyn Fn(SensorId, bool) + Send + Sync>;

/// Outcome of dispatching a batch of transitions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Callbacks that returned normally.
    pub delivered: usize,
    /// Callbacks that panicked.
    pub failed: usize,
}

/// Registry of per-sensor callbacks.
///
/// Callbacks for the same sensor run in registration order. A panicking
/// callback is logged and skipped; remaining callbacks still run.
///
/// # Thread Safety
///
/// The registry uses `parking_lot::RwLock` internally. The lock is released
/// before callbacks run, so a callback may register or unsubscribe others;
/// such changes take effect from the next dispatch.
pub struct CallbackRegistry {
    /// Counter for generating unique subscription IDs.
    next_id: AtomicU64,
    /// Callbacks per sensor, in registration order.
    callbacks: RwLock<HashMap<SensorId, Vec<(SubscriptionId, SensorCallback)>>>,
}

impl CallbackRegistry {
    /// Creates a new empty callback registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            callbacks: RwLock::new(HashMap::new()),
        }
    }

    fn next_id(&self) -> SubscriptionId {
        SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Registers a callback for transitions of `sensor_id`.
    pub fn register<F>(&self, sensor_id: SensorId, callback: F) -> SubscriptionId
    where
        F: Fn(SensorId, bool) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.callbacks
            .write()
            .entry(sensor_id)
            .or_default()
            .push((id, Arc::new(callback)));
        id
    }

    /// Unregisters a callback by its subscription ID.
    ///
    /// Returns `true` if a callback was found and removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut callbacks = self.callbacks.write();
        let mut removed = false;
        callbacks.retain(|_, list| {
            let before = list.len();
            list.retain(|(sub_id, _)| *sub_id != id);
            removed |= list.len() != before;
            !list.is_empty()
        });
        removed
    }

    /// Clears all callbacks.
    pub fn clear(&self) {
        self.callbacks.write().clear();
    }

    /// Invokes the callbacks of every transition, in order.
    pub fn notify(&self, transitions: &[Transition]) -> DispatchReport {
        let mut report = DispatchReport::default();

        for transition in transitions {
            let callbacks = self.callbacks_for(transition.sensor_id);
            if callbacks.is_empty() {
                continue;
            }

            for (sub_id, callback) in callbacks {
                tracing::debug!(
                    sensor_id = transition.sensor_id,
                    active = transition.active,
                    subscription = %sub_id,
                    "Notifying sensor callback"
                );

                let outcome = catch_unwind(AssertUnwindSafe(|| {
                    callback(transition.sensor_id, transition.active);
                }));

                match outcome {
                    Ok(()) => report.delivered += 1,
                    Err(panic) => {
                        report.failed += 1;
                        tracing::error!(
                            sensor_id = transition.sensor_id,
                            subscription = %sub_id,
                            reason = panic_message(panic.as_ref()),
                            "Sensor callback panicked"
                        );
                    }
                }
            }
        }

        report
    }

    /// Clones the callback list so no lock is held while callbacks run.
    fn callbacks_for(&self, sensor_id: SensorId) -> Vec<(SubscriptionId, SensorCallback)> {
        self.callbacks
            .read()
            .get(&sensor_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns the number of callbacks registered for `sensor_id`.
    #[must_use]
    pub fn callback_count_for(&self, sensor_id: SensorId) -> usize {
        self.callbacks.read().get(&sensor_id).map_or(0, Vec::len)
    }

    /// Returns the total number of registered callbacks.
    #[must_use]
    pub fn callback_count(&self) -> usize {
        self.callbacks.read().values().map(Vec::len).sum()
    }

    /// Returns `true` if there are no registered callbacks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callback_count() == 0
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("callback_count", &self.callback_count())
            .finish()
    }
}
