// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Background poll loop.

use std::ops::ControlFlow;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::watch;

use super::config::RetryPolicy;
use super::status::{LoopState, LoopStatus};
use crate::error::{Error, PollFailure};
use crate::event::{BridgeEvent, EventBus};
use crate::protocol::Transport;
use crate::session::{InputReading, SessionClient};
use crate::state::{ChangeDetector, SensorRegistry};
use crate::subscription::CallbackRegistry;

/// Runs poll cycles until stopped or out of recovery attempts.
///
/// The worker owns the session for its lifetime and hands it back when
/// [`run`](Self::run) returns, so the bridge can be restarted.
pub(crate) struct PollWorker<T> {
    session: SessionClient<T>,
    registry: Arc<RwLock<SensorRegistry>>,
    callbacks: Arc<CallbackRegistry>,
    events: EventBus,
    status: Arc<LoopStatus>,
    policy: RetryPolicy,
    shutdown: watch::Receiver<bool>,
    /// Inputs must be fetched before the next update request.
    refresh_pending: bool,
    update_failures: u32,
    input_failures: u32,
    recovery_attempts: u32,
    /// An API call succeeded since the last login.
    api_ok_since_login: bool,
}

impl<T: Transport> PollWorker<T> {
    pub fn new(
        session: SessionClient<T>,
        registry: Arc<RwLock<SensorRegistry>>,
        callbacks: Arc<CallbackRegistry>,
        events: EventBus,
        status: Arc<LoopStatus>,
        policy: RetryPolicy,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            session,
            registry,
            callbacks,
            events,
            status,
            policy,
            shutdown,
            refresh_pending: false,
            update_failures: 0,
            input_failures: 0,
            recovery_attempts: 0,
            // The handshake fetched inputs with this session.
            api_ok_since_login: true,
        }
    }

    /// Polls until a stop is requested or recovery is exhausted.
    pub async fn run(mut self) -> SessionClient<T> {
        tracing::info!("Poll loop started");
        self.events.publish(BridgeEvent::Started);

        while !self.stop_requested() {
            if self.cycle().await.is_break() {
                break;
            }
        }

        self.status.set_state(LoopState::Stopped);
        self.events.publish(BridgeEvent::Stopped);
        tracing::info!("Poll loop stopped");
        self.session
    }

    /// A dropped sender counts as a stop request.
    fn stop_requested(&self) -> bool {
        *self.shutdown.borrow() || self.shutdown.has_changed().is_err()
    }

    async fn cycle(&mut self) -> ControlFlow<()> {
        if !self.session.is_authenticated() {
            return self.relogin().await;
        }
        if self.refresh_pending {
            return self.refresh_inputs().await;
        }

        match self.session.fetch_update_flag().await {
            Ok(has_changes) => {
                self.update_failures = 0;
                self.recovery_attempts = 0;
                self.api_ok_since_login = true;
                if has_changes {
                    self.refresh_pending = true;
                    return self.refresh_inputs().await;
                }
                ControlFlow::Continue(())
            }
            Err(e) if e.is_auth_failure() => self.session_rejected("Update", &e).await,
            Err(e) => {
                self.record_failure(&e);
                self.update_failures += 1;
                if self.update_failures <= self.policy.immediate_retries {
                    tracing::warn!(
                        error = %e,
                        attempt = self.update_failures,
                        "Update request failed, retrying"
                    );
                    return ControlFlow::Continue(());
                }
                self.update_failures = 0;
                self.cool_down().await
            }
        }
    }

    async fn relogin(&mut self) -> ControlFlow<()> {
        self.status.set_state(LoopState::Relogin);
        tracing::info!("Logging in again");

        match self.session.login().await {
            Ok(true) => {
                tracing::info!("Session renewed");
                // Changes may have happened while the session was down.
                self.refresh_pending = true;
                self.api_ok_since_login = false;
                self.status.set_state(LoopState::Polling);
                self.events.publish(BridgeEvent::SessionRenewed);
                ControlFlow::Continue(())
            }
            Ok(false) => {
                tracing::warn!("Login rejected by the service");
                self.record_failure(&Error::AuthenticationFailed);
                self.cool_down().await
            }
            Err(e) => {
                tracing::warn!(error = %e, "Login failed");
                self.record_failure(&e);
                self.cool_down().await
            }
        }
    }

    async fn refresh_inputs(&mut self) -> ControlFlow<()> {
        match self.session.fetch_inputs().await {
            Ok(readings) => {
                self.refresh_pending = false;
                self.input_failures = 0;
                self.recovery_attempts = 0;
                self.api_ok_since_login = true;
                self.apply(&readings);
                ControlFlow::Continue(())
            }
            Err(e) if e.is_auth_failure() => self.session_rejected("Inputs", &e).await,
            Err(e) => {
                self.record_failure(&e);
                self.input_failures += 1;
                if self.input_failures <= self.policy.immediate_retries {
                    tracing::warn!(
                        error = %e,
                        attempt = self.input_failures,
                        "Inputs request failed, retrying"
                    );
                    return ControlFlow::Continue(());
                }
                self.input_failures = 0;
                let flow = self.cool_down().await;
                self.session.invalidate();
                flow
            }
        }
    }

    /// Drops a session the service no longer accepts.
    ///
    /// A rejection right after a fresh login means the service keeps failing
    /// API calls, so the next login waits out a cooldown.
    async fn session_rejected(&mut self, request: &'static str, e: &Error) -> ControlFlow<()> {
        self.record_failure(e);
        self.session.invalidate();

        if self.api_ok_since_login {
            tracing::info!(error = %e, request, "Request rejected, session expired");
            return ControlFlow::Continue(());
        }
        tracing::warn!(error = %e, request, "Request rejected right after login");
        self.cool_down().await
    }

    /// Runs change detection and dispatches the resulting transitions.
    fn apply(&mut self, readings: &[InputReading]) {
        let mut detection = ChangeDetector::detect(&mut self.registry.write(), readings);

        if let Some(marker) = detection.input_marker.take() {
            self.session.set_input_marker(marker);
        }
        if detection.is_empty() {
            return;
        }

        tracing::debug!(
            transitions = detection.transitions.len(),
            baselined = detection.baselined,
            "Inputs refreshed"
        );

        let report = self.callbacks.notify(&detection.transitions);
        if report.failed > 0 {
            tracing::warn!(
                delivered = report.delivered,
                failed = report.failed,
                "Some callbacks failed"
            );
        }

        for transition in detection.transitions {
            self.events.publish(BridgeEvent::SensorChanged(transition));
        }
    }

    fn record_failure(&self, error: &Error) {
        let failure = PollFailure::from_error(error);
        self.status.set_last_error(failure.clone());
        self.events.publish(BridgeEvent::PollFailed(failure));
    }

    /// Waits out the cooldown for the next recovery, or gives up.
    async fn cool_down(&mut self) -> ControlFlow<()> {
        if !self.policy.should_retry(self.recovery_attempts) {
            let failure = self
                .status
                .last_error()
                .unwrap_or_else(|| PollFailure::from_error(&Error::AuthenticationFailed))
                .into_fatal();
            tracing::error!(
                attempts = self.recovery_attempts,
                error = %failure,
                "Giving up after repeated failures"
            );
            self.status.set_last_error(failure.clone());
            self.events.publish(BridgeEvent::PollFailed(failure));
            return ControlFlow::Break(());
        }

        let delay = self.policy.delay_for_attempt(self.recovery_attempts);
        self.recovery_attempts += 1;
        tracing::warn!(
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            attempt = self.recovery_attempts,
            "Cooling down before recovery"
        );

        tokio::select! {
            () = tokio::time::sleep(delay) => {}
            _ = self.shutdown.changed() => {}
        }
        ControlFlow::Continue(())
    }
}
