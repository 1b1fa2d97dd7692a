// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The bridge handle exposed to hosts.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use super::config::{BridgeConfig, SensorConfig};
use super::poll_worker::PollWorker;
use super::status::{LoopState, LoopStatus};
use crate::error::{Error, PollFailure, Result};
use crate::event::{BridgeEvent, EventBus};
use crate::protocol::Transport;
use crate::session::SessionClient;
use crate::state::{ChangeDetector, Sensor, SensorId, SensorRegistry};
use crate::subscription::{CallbackRegistry, SubscriptionId};

#[cfg(feature = "http")]
use crate::protocol::{HttpClient, HttpConfig};

/// Bridge between the Metronet cloud service and a host application.
///
/// # Lifecycle
///
/// 1. [`configure`](Self::configure) (optional) and
///    [`register_callback`](Self::register_callback) for each sensor of interest
/// 2. [`connect`](Self::connect) logs in and baselines every sensor
/// 3. [`start`](Self::start) spawns the poll loop on the tokio runtime
/// 4. [`stop`](Self::stop) ends the loop and waits for it to finish
///
/// Callbacks run on the poll loop's task and must not block.
///
/// # Examples
///
/// ```no_run
/// use metronet_bridge::bridge::{Bridge, BridgeConfig, SensorConfig};
///
/// # async fn example() -> metronet_bridge::Result<()> {
/// let config = BridgeConfig::new("user@example.com", "secret")
///     .with_sensor(SensorConfig::new(1).with_kind("door"));
///
/// let mut bridge = Bridge::new(config)?;
/// bridge.register_callback(1, |id, active| {
///     println!("sensor {id} is now {}", if active { "open" } else { "closed" });
/// });
///
/// if bridge.connect().await? {
///     bridge.start().await?;
/// }
/// // ...
/// bridge.stop().await?;
/// # Ok(())
/// # }
/// ```
pub struct Bridge<T: Transport + 'static> {
    config: BridgeConfig,
    /// `None` while the poll loop owns the session.
    session: Option<SessionClient<T>>,
    registry: Arc<RwLock<SensorRegistry>>,
    callbacks: Arc<CallbackRegistry>,
    events: EventBus,
    status: Arc<LoopStatus>,
    worker: Option<RunningWorker<T>>,
}

struct RunningWorker<T> {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<SessionClient<T>>,
}

#[cfg(feature = "http")]
impl Bridge<HttpClient> {
    /// Creates a bridge talking to the configured service over HTTPS.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfiguration` for an invalid configuration and
    /// `Error::Protocol` if the HTTP client cannot be built.
    pub fn new(config: BridgeConfig) -> Result<Self> {
        config.validate()?;
        let transport = HttpConfig::new(&config.base_url)
            .with_timeout(config.request_timeout)
            .into_client()?;
        Self::with_transport(config, transport)
    }
}

impl<T: Transport + 'static> Bridge<T> {
    /// Creates a bridge over a custom transport.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfiguration` for an invalid configuration.
    pub fn with_transport(config: BridgeConfig, transport: T) -> Result<Self> {
        config.validate()?;

        let registry = build_registry(&config.sensors)?;
        let session = SessionClient::new(transport, config.credentials.clone())
            .with_timeouts(config.request_timeout, config.update_timeout);

        Ok(Self {
            config,
            session: Some(session),
            registry: Arc::new(RwLock::new(registry)),
            callbacks: Arc::new(CallbackRegistry::new()),
            events: EventBus::new(),
            status: Arc::new(LoopStatus::new()),
            worker: None,
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Replaces the tracked sensors. An empty list tracks every input
    /// listed in the catalog at the next [`connect`](Self::connect).
    ///
    /// # Errors
    ///
    /// Returns `Error::AlreadyRunning` while the poll loop runs and
    /// `Error::InvalidConfiguration` for duplicate ids.
    pub fn configure(&mut self, sensors: impl IntoIterator<Item = SensorConfig>) -> Result<()> {
        if self.is_running() {
            return Err(Error::AlreadyRunning);
        }

        let sensors: Vec<SensorConfig> = sensors.into_iter().collect();
        let registry = build_registry(&sensors)?;
        tracing::debug!(sensors = registry.len(), "Sensors configured");

        *self.registry.write() = registry;
        self.config.sensors = sensors;
        Ok(())
    }

    /// Registers a callback invoked with `(sensor_id, active)` on every
    /// transition of the sensor. Callbacks for one sensor run in
    /// registration order.
    pub fn register_callback<F>(&self, sensor_id: SensorId, callback: F) -> SubscriptionId
    where
        F: Fn(SensorId, bool) + Send + Sync + 'static,
    {
        self.callbacks.register(sensor_id, callback)
    }

    /// Removes a callback. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.callbacks.unsubscribe(id)
    }

    /// Logs in, loads the catalog and baselines every sensor.
    ///
    /// Returns `Ok(false)` if the service rejected the credentials.
    /// No callback fires for the baseline.
    ///
    /// # Errors
    ///
    /// Returns `Error::AlreadyRunning` while the poll loop runs, otherwise any
    /// transport or response error raised during the handshake.
    pub async fn connect(&mut self) -> Result<bool> {
        self.reclaim_session().await?;
        let Some(session) = self.session.as_mut() else {
            return Err(Error::WorkerFailed("session was lost".into()));
        };

        self.status.set_state(LoopState::Connecting);
        let result = handshake(session, &self.registry).await;
        self.status.set_state(LoopState::Stopped);

        match &result {
            Ok(true) => tracing::info!(sensors = self.registry.read().len(), "Connected"),
            Ok(false) => tracing::warn!("Login rejected by the service"),
            Err(e) => {
                tracing::warn!(error = %e, "Connection failed");
                session.invalidate();
            }
        }
        result
    }

    /// Returns a snapshot of every tracked sensor, ordered by id.
    #[must_use]
    pub fn list_sensors(&self) -> Vec<Sensor> {
        self.registry.read().snapshot()
    }

    /// Returns a snapshot of one sensor.
    #[must_use]
    pub fn sensor(&self, id: SensorId) -> Option<Sensor> {
        self.registry.read().get(id).cloned()
    }

    /// Spawns the poll loop on the current tokio runtime.
    ///
    /// A loop that stopped on its own after exhausting its recovery attempts
    /// is joined first, so the bridge can be restarted without reconnecting.
    ///
    /// # Errors
    ///
    /// Returns `Error::AlreadyRunning` if the loop runs and
    /// `Error::NotConnected` if [`connect`](Self::connect) never succeeded.
    pub async fn start(&mut self) -> Result<()> {
        self.reclaim_session().await?;

        let Some(session) = self.session.take() else {
            return Err(Error::WorkerFailed("session was lost".into()));
        };
        if session.state().session_id().is_none() {
            self.session = Some(session);
            return Err(Error::NotConnected);
        }

        let (shutdown, shutdown_rx) = watch::channel(false);
        let worker = PollWorker::new(
            session,
            Arc::clone(&self.registry),
            Arc::clone(&self.callbacks),
            self.events.clone(),
            Arc::clone(&self.status),
            self.config.retry.clone(),
            shutdown_rx,
        );

        self.status.set_state(LoopState::Polling);
        let handle = tokio::spawn(worker.run());
        self.worker = Some(RunningWorker { shutdown, handle });
        Ok(())
    }

    /// Requests the poll loop to stop and waits for it to exit.
    ///
    /// An in-flight request completes (bounded by its timeout) and a pending
    /// cooldown is cut short. Calling this when no loop runs is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `Error::WorkerFailed` if the loop task panicked.
    pub async fn stop(&mut self) -> Result<()> {
        if let Some(worker) = &self.worker {
            tracing::debug!("Stopping poll loop");
            worker.shutdown.send_replace(true);
        }
        self.reclaim_session().await
    }

    /// Returns `true` while the poll loop task is alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|worker| !worker.handle.is_finished())
    }

    /// Returns the current loop state.
    #[must_use]
    pub fn state(&self) -> LoopState {
        self.status.state()
    }

    /// Returns a receiver that observes loop state changes.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<LoopState> {
        self.status.watch()
    }

    /// Returns the most recent poll loop failure.
    #[must_use]
    pub fn last_error(&self) -> Option<PollFailure> {
        self.status.last_error()
    }

    /// Subscribes to bridge events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.events.subscribe()
    }

    /// Joins a finished or stopping worker and takes its session back.
    async fn reclaim_session(&mut self) -> Result<()> {
        match &self.worker {
            None => return Ok(()),
            Some(worker) if !worker.handle.is_finished() && !*worker.shutdown.borrow() => {
                return Err(Error::AlreadyRunning);
            }
            Some(_) => {}
        }

        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        match worker.handle.await {
            Ok(session) => {
                self.session = Some(session);
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "Poll loop task failed");
                self.status.set_state(LoopState::Stopped);
                Err(Error::WorkerFailed(e.to_string()))
            }
        }
    }
}

impl<T: Transport + 'static> std::fmt::Debug for Bridge<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("base_url", &self.config.base_url)
            .field("sensors", &self.registry.read().len())
            .field("callbacks", &self.callbacks.callback_count())
            .field("state", &self.status.state())
            .finish_non_exhaustive()
    }
}

fn build_registry(sensors: &[SensorConfig]) -> Result<SensorRegistry> {
    SensorRegistry::configured(sensors.iter().cloned().map(Sensor::from))
}

async fn handshake<T: Transport>(
    session: &mut SessionClient<T>,
    registry: &RwLock<SensorRegistry>,
) -> Result<bool> {
    session.init_session().await?;
    if !session.login().await? {
        return Ok(false);
    }

    let catalog = session.fetch_catalog().await?;
    let adopted = registry.write().apply_catalog(&catalog);
    tracing::debug!(catalog = catalog.len(), adopted, "Catalog applied");

    let readings = session.fetch_inputs().await?;
    let detection = ChangeDetector::detect(&mut registry.write(), &readings);
    if let Some(marker) = detection.input_marker {
        session.set_input_marker(marker);
    }
    Ok(true)
}
