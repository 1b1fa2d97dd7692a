// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Configuration types for the bridge.

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::error::{Error, Result};
use crate::session::Credentials;
use crate::state::{Sensor, SensorId};

/// Default Metronet cloud endpoint.
pub const DEFAULT_BASE_URL: &str = "https://metronet.iessonline.com";

/// Configuration of a bridge instance.
///
/// Deserializable from any serde format. Durations are whole seconds.
///
/// # Examples
///
/// ```
/// use metronet_bridge::bridge::{BridgeConfig, SensorConfig};
/// use std::time::Duration;
///
/// let config = BridgeConfig::new("user@example.com", "secret")
///     .with_sensor(SensorConfig::new(1).with_kind("door"))
///     .with_sensor(SensorConfig::new(2).with_kind("motion").with_name("Hallway"))
///     .with_update_timeout(Duration::from_secs(45));
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    /// Account credentials.
    #[serde(flatten)]
    pub credentials: Credentials,
    /// Sensors to track. Empty means every input found in the catalog.
    #[serde(default, alias = "inputs")]
    pub sensors: Vec<SensorConfig>,
    /// Service base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Timeout for login, catalog and inputs requests.
    #[serde(
        default = "default_request_timeout",
        deserialize_with = "duration_secs"
    )]
    pub request_timeout: Duration,
    /// Timeout for the long-poll update request.
    #[serde(default = "default_update_timeout", deserialize_with = "duration_secs")]
    pub update_timeout: Duration,
    /// Recovery policy of the poll loop.
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl BridgeConfig {
    /// Creates a configuration with default endpoint, timeouts and policy.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            credentials: Credentials::new(username, password),
            sensors: Vec::new(),
            base_url: default_base_url(),
            request_timeout: default_request_timeout(),
            update_timeout: default_update_timeout(),
            retry: RetryPolicy::default(),
        }
    }

    /// Adds a sensor to track.
    #[must_use]
    pub fn with_sensor(mut self, sensor: SensorConfig) -> Self {
        self.sensors.push(sensor);
        self
    }

    /// Replaces the tracked sensors.
    #[must_use]
    pub fn with_sensors(mut self, sensors: impl IntoIterator<Item = SensorConfig>) -> Self {
        self.sensors = sensors.into_iter().collect();
        self
    }

    /// Sets the service base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the timeout for regular requests.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the timeout for the long-poll update request.
    #[must_use]
    pub fn with_update_timeout(mut self, timeout: Duration) -> Self {
        self.update_timeout = timeout;
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Checks the configuration for obvious mistakes.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfiguration` describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.credentials.username.trim().is_empty() {
            return Err(Error::InvalidConfiguration("username is empty".into()));
        }
        if self.base_url.trim().is_empty() {
            return Err(Error::InvalidConfiguration("base URL is empty".into()));
        }
        if let Some((scheme, _)) = self.base_url.split_once("://")
            && scheme != "http"
            && scheme != "https"
        {
            return Err(Error::InvalidConfiguration(format!(
                "unsupported base URL scheme: {scheme}"
            )));
        }
        if self.request_timeout.is_zero() || self.update_timeout.is_zero() {
            return Err(Error::InvalidConfiguration(
                "timeouts must be greater than zero".into(),
            ));
        }
        validate_sensor_ids(&self.sensors)
    }
}

fn validate_sensor_ids(sensors: &[SensorConfig]) -> Result<()> {
    let mut seen = HashSet::new();
    for sensor in sensors {
        if !seen.insert(sensor.id) {
            return Err(Error::InvalidConfiguration(format!(
                "sensor id {} is configured more than once",
                sensor.id
            )));
        }
    }
    Ok(())
}

/// Static configuration of one sensor.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SensorConfig {
    /// Remote input index.
    pub id: SensorId,
    /// Kind tag such as `door` or `motion`.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Display name; taken from the catalog when absent.
    #[serde(default)]
    pub name: Option<String>,
}

impl SensorConfig {
    /// Creates a sensor configuration.
    #[must_use]
    pub fn new(id: SensorId) -> Self {
        Self {
            id,
            kind: None,
            name: None,
        }
    }

    /// Sets the kind tag.
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
}

impl From<SensorConfig> for Sensor {
    fn from(config: SensorConfig) -> Self {
        let mut sensor = Sensor::new(config.id);
        if let Some(kind) = config.kind {
            sensor = sensor.with_kind(kind);
        }
        if let Some(name) = config.name {
            sensor = sensor.with_name(name);
        }
        sensor
    }
}

/// Recovery policy of the poll loop.
///
/// A failed request is first retried immediately up to `immediate_retries`
/// times. Further failures trigger a cooldown before a forced re-login; the
/// cooldown grows by `backoff_multiplier` per consecutive recovery, capped at
/// `max_cooldown`. After `max_recovery_attempts` recoveries without a
/// successful poll the loop stops with a fatal failure.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use metronet_bridge::bridge::RetryPolicy;
///
/// // Default: 15 s cooldown doubling up to 5 min, 10 recoveries
/// let policy = RetryPolicy::default();
///
/// // Fixed 15 s cooldown, never give up
/// let policy = RetryPolicy::new()
///     .with_backoff_multiplier(1.0)
///     .with_infinite_retries();
/// assert_eq!(policy.delay_for_attempt(7), Duration::from_secs(15));
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Immediate retries before cooling down.
    pub immediate_retries: u32,
    /// Cooldown before the first recovery attempt.
    #[serde(deserialize_with = "duration_secs")]
    pub cooldown: Duration,
    /// Upper bound for the cooldown.
    #[serde(deserialize_with = "duration_secs")]
    pub max_cooldown: Duration,
    /// Multiplier applied per consecutive recovery.
    pub backoff_multiplier: f32,
    /// Recoveries allowed before giving up (None = infinite).
    pub max_recovery_attempts: Option<u32>,
}

impl RetryPolicy {
    /// Creates a policy with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of immediate retries.
    #[must_use]
    pub fn with_immediate_retries(mut self, retries: u32) -> Self {
        self.immediate_retries = retries;
        self
    }

    /// Sets the initial cooldown.
    #[must_use]
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Sets the maximum cooldown.
    #[must_use]
    pub fn with_max_cooldown(mut self, cooldown: Duration) -> Self {
        self.max_cooldown = cooldown;
        self
    }

    /// Sets the backoff multiplier.
    #[must_use]
    pub fn with_backoff_multiplier(mut self, multiplier: f32) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Sets the maximum number of recoveries.
    #[must_use]
    pub fn with_max_recovery_attempts(mut self, attempts: u32) -> Self {
        self.max_recovery_attempts = Some(attempts);
        self
    }

    /// Never gives up.
    #[must_use]
    pub fn with_infinite_retries(mut self) -> Self {
        self.max_recovery_attempts = None;
        self
    }

    /// Calculates the cooldown for a given recovery attempt.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return self.cooldown.min(self.max_cooldown);
        }

        let multiplier = self
            .backoff_multiplier
            .powi(i32::try_from(attempt).unwrap_or(i32::MAX));

        // Cooldowns are seconds to minutes, far from f32 precision limits.
        #[allow(clippy::cast_precision_loss)]
        let delay_ms = self.cooldown.as_millis() as f32 * multiplier;

        // Non-negative and saturating on overflow.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let delay = Duration::from_millis(delay_ms as u64);

        delay.min(self.max_cooldown)
    }

    /// Returns true if another recovery should be attempted.
    #[must_use]
    pub fn should_retry(&self, attempt: u32) -> bool {
        self.max_recovery_attempts.is_none_or(|max| attempt < max)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            immediate_retries: 1,
            cooldown: Duration::from_secs(15),
            max_cooldown: Duration::from_secs(300),
            backoff_multiplier: 2.0,
            max_recovery_attempts: Some(10),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_update_timeout() -> Duration {
    Duration::from_secs(30)
}

fn duration_secs<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_secs)
}
