// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Poll loop behavior against a scripted transport, on paused tokio time.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use common::{
    FakeTransport, INIT, INPUTS, LOGIN, Reply, SESSION_ID, STRINGS, UPDATES, expired,
    inputs_body, login_page, status_page, unavailable, updates,
};
use metronet_bridge::protocol::HttpResponse;
use metronet_bridge::{
    Bridge, BridgeConfig, BridgeEvent, Error, FailureKind, LoopState, RetryPolicy, SensorConfig,
    SensorId, SensorState,
};
use parking_lot::Mutex;
use tokio::sync::{Notify, broadcast};

const DOOR: SensorId = 1;
const MOTION: SensorId = 2;

fn door_and_motion() -> FakeTransport {
    FakeTransport::connected(
        &[(DOOR, "Front door"), (MOTION, "Hallway")],
        &[(DOOR, false), (MOTION, false)],
    )
}

fn bridge(transport: &FakeTransport, policy: RetryPolicy) -> Bridge<FakeTransport> {
    let config = BridgeConfig::new("user@example.com", "secret")
        .with_sensor(SensorConfig::new(DOOR).with_kind("door"))
        .with_sensor(SensorConfig::new(MOTION).with_kind("motion"))
        .with_retry_policy(policy);
    Bridge::with_transport(config, transport.clone()).unwrap()
}

type Seen = Arc<Mutex<Vec<(SensorId, bool)>>>;

fn record(bridge: &Bridge<FakeTransport>, sensor_id: SensorId) -> Seen {
    let seen: Seen = Arc::default();
    let sink = Arc::clone(&seen);
    bridge.register_callback(sensor_id, move |id, active| sink.lock().push((id, active)));
    seen
}

fn drain(rx: &mut broadcast::Receiver<BridgeEvent>) -> Vec<BridgeEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

async fn run_for(duration: Duration) {
    tokio::time::sleep(duration).await;
}

// ============================================================================
// Connect
// ============================================================================

mod connect {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn connect_baselines_without_callbacks() {
        let transport = FakeTransport::connected(
            &[(DOOR, "Front door"), (MOTION, "Hallway")],
            &[(DOOR, false), (MOTION, true)],
        );
        let mut bridge = bridge(&transport, RetryPolicy::default());
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        bridge.register_callback(MOTION, move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(bridge.connect().await.unwrap());

        assert_eq!(transport.calls(), vec![INIT, LOGIN, STRINGS, INPUTS]);
        let sensors = bridge.list_sensors();
        assert_eq!(sensors.len(), 2);
        assert_eq!(sensors[0].name(), Some("Front door"));
        assert_eq!(sensors[0].kind(), Some("door"));
        assert_eq!(sensors[0].state(), SensorState::Inactive);
        assert_eq!(sensors[1].name(), Some("Hallway"));
        assert_eq!(sensors[1].state(), SensorState::Active);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(bridge.state(), LoopState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn login_posts_credentials() {
        let transport = door_and_motion();
        let mut bridge = bridge(&transport, RetryPolicy::default());

        bridge.connect().await.unwrap();

        let login = &transport.requests(LOGIN)[0];
        assert_eq!(login.form_value("UserName"), Some("user@example.com"));
        assert_eq!(login.form_value("Password"), Some("secret"));
        assert_eq!(login.form_value("RememberMe"), Some("false"));

        let catalog = &transport.requests(STRINGS)[0];
        assert_eq!(catalog.form_value("sessionId"), Some(SESSION_ID));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_configuration_discovers_catalog_inputs() {
        let transport = FakeTransport::connected(
            &[(1, "Door"), (4, "Window"), (9, "Garage")],
            &[(1, false), (4, true), (9, false)],
        );
        let config = BridgeConfig::new("user", "pass");
        let mut bridge = Bridge::with_transport(config, transport).unwrap();

        assert!(bridge.connect().await.unwrap());

        let sensors = bridge.list_sensors();
        let ids: Vec<SensorId> = sensors.iter().map(|s| s.id()).collect();
        assert_eq!(ids, vec![1, 4, 9]);
        assert_eq!(sensors[1].name(), Some("Window"));
        assert_eq!(sensors[1].kind(), None);
        assert_eq!(sensors[1].state(), SensorState::Active);
    }

    #[tokio::test(start_paused = true)]
    async fn configured_sensors_ignore_extra_catalog_inputs() {
        let transport = FakeTransport::connected(
            &[(DOOR, "Front door"), (MOTION, "Hallway"), (7, "Shed")],
            &[(DOOR, false), (MOTION, false), (7, true)],
        );
        let mut bridge = bridge(&transport, RetryPolicy::default());

        bridge.connect().await.unwrap();

        assert_eq!(bridge.list_sensors().len(), 2);
        assert!(bridge.sensor(7).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_login_returns_false() {
        let transport = door_and_motion();
        transport.fallback(LOGIN, Reply::Respond(login_page()));
        let mut bridge = bridge(&transport, RetryPolicy::default());

        assert!(!bridge.connect().await.unwrap());
        assert_eq!(transport.calls(), vec![INIT, LOGIN]);
        assert!(matches!(bridge.start().await, Err(Error::NotConnected)));
        assert!(!bridge.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_service_is_an_error() {
        let transport = door_and_motion();
        transport.push(INIT, Reply::Unreachable);
        let mut bridge = bridge(&transport, RetryPolicy::default());

        let result = bridge.connect().await;

        assert!(matches!(result, Err(Error::Protocol(_))));
        assert_eq!(bridge.state(), LoopState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn start_requires_connect() {
        let transport = door_and_motion();
        let mut bridge = bridge(&transport, RetryPolicy::default());

        assert!(matches!(bridge.start().await, Err(Error::NotConnected)));
        assert!(transport.calls().is_empty());
    }
}

// ============================================================================
// Polling
// ============================================================================

mod polling {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn no_changes_never_fetch_inputs() {
        let transport = door_and_motion();
        let mut bridge = bridge(&transport, RetryPolicy::default());
        bridge.connect().await.unwrap();
        transport.clear_log();

        bridge.start().await.unwrap();
        assert_eq!(bridge.state(), LoopState::Polling);
        run_for(Duration::from_millis(350)).await;
        bridge.stop().await.unwrap();

        assert!(transport.count(UPDATES) >= 3);
        assert_eq!(transport.count(INPUTS), 0);
        assert_eq!(bridge.state(), LoopState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn update_request_carries_session_and_marker() {
        let transport = door_and_motion();
        let mut bridge = bridge(&transport, RetryPolicy::default());
        bridge.connect().await.unwrap();

        bridge.start().await.unwrap();
        run_for(Duration::from_millis(150)).await;
        bridge.stop().await.unwrap();

        let update = &transport.requests(UPDATES)[0];
        assert_eq!(update.form_value("sessionId"), Some(SESSION_ID));
        assert_eq!(update.form_value("Inputs"), Some("00ff-02"));
        assert_eq!(update.timeout, Some(Duration::from_secs(30)));
    }

    #[tokio::test(start_paused = true)]
    async fn update_request_omits_missing_marker() {
        let transport = door_and_motion();
        transport.push(
            LOGIN,
            Reply::Respond(HttpResponse::ok(
                "/Status",
                format!("<html><script>var sessionId = '{SESSION_ID}';</script></html>"),
            )),
        );
        transport.push(
            INPUTS,
            Reply::Respond(HttpResponse::ok(
                "/api/inputs",
                r#"[{"Index": 1, "Alarm": false}, {"Index": 2, "Alarm": false}]"#,
            )),
        );
        let mut bridge = bridge(&transport, RetryPolicy::default());
        bridge.connect().await.unwrap();

        bridge.start().await.unwrap();
        run_for(Duration::from_millis(150)).await;
        bridge.stop().await.unwrap();

        let update = &transport.requests(UPDATES)[0];
        assert_eq!(update.form_value("sessionId"), Some(SESSION_ID));
        assert_eq!(update.form_value("Inputs"), None);
        assert_eq!(update.form_value("Strings"), Some("1"));
    }

    #[tokio::test(start_paused = true)]
    async fn door_then_motion_fire_once_each() {
        let transport = door_and_motion();
        let mut bridge = bridge(&transport, RetryPolicy::default());
        let door = record(&bridge, DOOR);
        let motion = record(&bridge, MOTION);
        let mut events = bridge.subscribe();
        bridge.connect().await.unwrap();

        transport.push(UPDATES, Reply::Respond(updates(true)));
        transport.push(UPDATES, Reply::Respond(updates(true)));
        transport.push(
            INPUTS,
            Reply::Respond(inputs_body(&[(DOOR, true), (MOTION, false)], "00ff-10")),
        );
        transport.push(
            INPUTS,
            Reply::Respond(inputs_body(&[(DOOR, true), (MOTION, true)], "00ff-11")),
        );

        bridge.start().await.unwrap();
        run_for(Duration::from_secs(1)).await;
        bridge.stop().await.unwrap();

        assert_eq!(*door.lock(), vec![(DOOR, true)]);
        assert_eq!(*motion.lock(), vec![(MOTION, true)]);
        assert_eq!(bridge.sensor(DOOR).unwrap().state(), SensorState::Active);
        assert_eq!(bridge.sensor(MOTION).unwrap().state(), SensorState::Active);

        let changes: Vec<(SensorId, bool)> = drain(&mut events)
            .iter()
            .filter_map(BridgeEvent::transition)
            .map(|t| (t.sensor_id, t.active))
            .collect();
        assert_eq!(changes, vec![(DOOR, true), (MOTION, true)]);

        let last_update = transport.requests(UPDATES).pop().unwrap();
        assert_eq!(last_update.form_value("Inputs"), Some("00ff-11"));
    }

    #[tokio::test(start_paused = true)]
    async fn unchanged_snapshot_fires_nothing() {
        let transport = door_and_motion();
        let mut bridge = bridge(&transport, RetryPolicy::default());
        let door = record(&bridge, DOOR);
        bridge.connect().await.unwrap();

        transport.push(UPDATES, Reply::Respond(updates(true)));

        bridge.start().await.unwrap();
        run_for(Duration::from_secs(1)).await;
        bridge.stop().await.unwrap();

        assert_eq!(transport.count(INPUTS), 2);
        assert!(door.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_callback_does_not_stop_delivery() {
        let transport = door_and_motion();
        let mut bridge = bridge(&transport, RetryPolicy::default());
        bridge.register_callback(DOOR, |_, _| panic!("host bug"));
        let door = record(&bridge, DOOR);
        let motion = record(&bridge, MOTION);
        bridge.connect().await.unwrap();

        transport.push(UPDATES, Reply::Respond(updates(true)));
        transport.push(
            INPUTS,
            Reply::Respond(inputs_body(&[(DOOR, true), (MOTION, true)], "00ff-10")),
        );

        bridge.start().await.unwrap();
        run_for(Duration::from_secs(1)).await;

        assert!(bridge.is_running());
        assert_eq!(*door.lock(), vec![(DOOR, true)]);
        assert_eq!(*motion.lock(), vec![(MOTION, true)]);

        bridge.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn unsubscribed_callback_is_not_invoked() {
        let transport = door_and_motion();
        let mut bridge = bridge(&transport, RetryPolicy::default());
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let id = bridge.register_callback(DOOR, move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(bridge.unsubscribe(id));
        bridge.connect().await.unwrap();

        transport.push(UPDATES, Reply::Respond(updates(true)));
        transport.push(
            INPUTS,
            Reply::Respond(inputs_body(&[(DOOR, true), (MOTION, false)], "00ff-10")),
        );

        bridge.start().await.unwrap();
        run_for(Duration::from_secs(1)).await;
        bridge.stop().await.unwrap();

        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(bridge.sensor(DOOR).unwrap().state(), SensorState::Active);
    }
}

// ============================================================================
// Session expiry and recovery
// ============================================================================

mod recovery {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn expired_session_logs_in_before_next_fetch() {
        let transport = door_and_motion();
        let mut bridge = bridge(&transport, RetryPolicy::default());
        let mut events = bridge.subscribe();
        bridge.connect().await.unwrap();
        transport.clear_log();

        transport.push(UPDATES, Reply::Respond(expired()));

        bridge.start().await.unwrap();
        run_for(Duration::from_secs(1)).await;

        let calls = transport.calls();
        assert_eq!(calls[..4], [UPDATES, LOGIN, INPUTS, UPDATES]);
        assert_eq!(bridge.state(), LoopState::Polling);
        assert!(drain(&mut events).contains(&BridgeEvent::SessionRenewed));

        bridge.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn expired_inputs_session_logs_in_before_refetch() {
        let transport = door_and_motion();
        let mut bridge = bridge(&transport, RetryPolicy::default());
        let door = record(&bridge, DOOR);
        bridge.connect().await.unwrap();
        transport.clear_log();

        transport.push(UPDATES, Reply::Respond(updates(true)));
        transport.push(INPUTS, Reply::Respond(expired()));
        transport.push(
            INPUTS,
            Reply::Respond(inputs_body(&[(DOOR, true), (MOTION, false)], "00ff-10")),
        );

        bridge.start().await.unwrap();
        run_for(Duration::from_secs(1)).await;
        bridge.stop().await.unwrap();

        let calls = transport.calls();
        assert_eq!(calls[..5], [UPDATES, INPUTS, LOGIN, INPUTS, UPDATES]);
        assert_eq!(*door.lock(), vec![(DOOR, true)]);
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_api_calls_after_login_cool_down() {
        let transport = door_and_motion();
        let mut bridge = bridge(&transport, RetryPolicy::default());
        bridge.connect().await.unwrap();
        transport.clear_log();

        transport.fallback(UPDATES, Reply::Respond(updates(true)));
        transport.fallback(INPUTS, Reply::Respond(unavailable("/api/inputs")));

        bridge.start().await.unwrap();
        run_for(Duration::from_secs(60)).await;

        // One login right away, then one after each of the 15 s and 30 s cooldowns.
        assert_eq!(transport.count(LOGIN), 3);
        assert_eq!(transport.count(INPUTS), 4);
        let failure = bridge.last_error().unwrap();
        assert_eq!(failure.kind, FailureKind::Authentication);
        assert!(!failure.fatal);
        assert!(bridge.is_running());

        bridge.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_api_rejection_stops_with_fatal_error() {
        let transport = door_and_motion();
        let policy = RetryPolicy::new()
            .with_cooldown(Duration::from_secs(1))
            .with_max_recovery_attempts(3);
        let mut bridge = bridge(&transport, policy);
        let mut events = bridge.subscribe();
        bridge.connect().await.unwrap();
        transport.clear_log();

        transport.fallback(UPDATES, Reply::Respond(updates(true)));
        transport.fallback(INPUTS, Reply::Respond(unavailable("/api/inputs")));

        bridge.start().await.unwrap();
        run_for(Duration::from_secs(60)).await;

        assert!(!bridge.is_running());
        let failure = bridge.last_error().unwrap();
        assert!(failure.fatal);
        assert_eq!(failure.kind, FailureKind::Authentication);

        // A login after the first rejection, then one per cooldown.
        assert_eq!(transport.count(LOGIN), 4);
        assert_eq!(transport.count(UPDATES), 1);

        let events = drain(&mut events);
        assert!(events.iter().any(BridgeEvent::is_fatal));
        assert_eq!(events.last(), Some(&BridgeEvent::Stopped));
    }

    #[tokio::test(start_paused = true)]
    async fn change_during_relogin_is_not_lost() {
        let transport = door_and_motion();
        let mut bridge = bridge(&transport, RetryPolicy::default());
        let door = record(&bridge, DOOR);
        bridge.connect().await.unwrap();

        transport.push(UPDATES, Reply::Respond(expired()));
        transport.push(
            INPUTS,
            Reply::Respond(inputs_body(&[(DOOR, true), (MOTION, false)], "00ff-10")),
        );

        bridge.start().await.unwrap();
        run_for(Duration::from_secs(1)).await;
        bridge.stop().await.unwrap();

        assert_eq!(*door.lock(), vec![(DOOR, true)]);
    }

    #[tokio::test(start_paused = true)]
    async fn update_failure_retries_then_cools_down() {
        let transport = door_and_motion();
        let mut bridge = bridge(&transport, RetryPolicy::default());
        bridge.connect().await.unwrap();
        transport.clear_log();

        transport.push(UPDATES, Reply::Unreachable);
        transport.push(UPDATES, Reply::Unreachable);

        bridge.start().await.unwrap();
        run_for(Duration::from_secs(10)).await;

        // Failed request, one immediate retry, then the 15 s cooldown.
        assert_eq!(transport.count(UPDATES), 2);
        let failure = bridge.last_error().unwrap();
        assert_eq!(failure.kind, FailureKind::Network);
        assert!(!failure.fatal);
        assert!(bridge.is_running());

        run_for(Duration::from_secs(10)).await;
        assert!(transport.count(UPDATES) > 2);

        bridge.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn inputs_failure_forces_relogin_after_cooldown() {
        let transport = door_and_motion();
        let mut bridge = bridge(&transport, RetryPolicy::default());
        let door = record(&bridge, DOOR);
        bridge.connect().await.unwrap();
        transport.clear_log();

        transport.push(UPDATES, Reply::Respond(updates(true)));
        transport.push(INPUTS, Reply::Unreachable);
        transport.push(INPUTS, Reply::Unreachable);
        transport.push(
            INPUTS,
            Reply::Respond(inputs_body(&[(DOOR, true), (MOTION, false)], "00ff-10")),
        );

        bridge.start().await.unwrap();
        run_for(Duration::from_secs(20)).await;
        bridge.stop().await.unwrap();

        let calls = transport.calls();
        assert_eq!(calls[..6], [UPDATES, INPUTS, INPUTS, LOGIN, INPUTS, UPDATES]);
        assert_eq!(*door.lock(), vec![(DOOR, true)]);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_recovery_stops_with_fatal_error() {
        let transport = door_and_motion();
        let policy = RetryPolicy::new()
            .with_cooldown(Duration::from_secs(1))
            .with_max_recovery_attempts(2);
        let mut bridge = bridge(&transport, policy);
        let mut events = bridge.subscribe();
        bridge.connect().await.unwrap();

        transport.fallback(LOGIN, Reply::Respond(login_page()));
        transport.push(UPDATES, Reply::Respond(expired()));

        bridge.start().await.unwrap();
        run_for(Duration::from_secs(30)).await;

        assert!(!bridge.is_running());
        assert_eq!(bridge.state(), LoopState::Stopped);
        let failure = bridge.last_error().unwrap();
        assert!(failure.fatal);
        assert_eq!(failure.kind, FailureKind::Authentication);

        // One login from connect, then three rejected attempts.
        assert_eq!(transport.count(LOGIN), 4);

        let events = drain(&mut events);
        assert!(events.iter().any(BridgeEvent::is_fatal));
        assert_eq!(events.last(), Some(&BridgeEvent::Stopped));
    }

    #[tokio::test(start_paused = true)]
    async fn bridge_restarts_after_fatal_stop() {
        let transport = door_and_motion();
        let policy = RetryPolicy::new()
            .with_cooldown(Duration::from_secs(1))
            .with_max_recovery_attempts(1);
        let mut bridge = bridge(&transport, policy);
        bridge.connect().await.unwrap();

        transport.fallback(LOGIN, Reply::Respond(login_page()));
        transport.push(UPDATES, Reply::Respond(expired()));
        bridge.start().await.unwrap();
        run_for(Duration::from_secs(10)).await;
        assert!(!bridge.is_running());

        transport.fallback(LOGIN, Reply::Respond(status_page(SESSION_ID, "00ff-20")));
        bridge.start().await.unwrap();
        run_for(Duration::from_secs(1)).await;

        assert!(bridge.is_running());
        assert_eq!(bridge.state(), LoopState::Polling);
        bridge.stop().await.unwrap();
    }
}

// ============================================================================
// Lifecycle
// ============================================================================

mod lifecycle {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn stop_waits_for_in_flight_request() {
        let transport = door_and_motion();
        let mut bridge = bridge(&transport, RetryPolicy::default());
        bridge.connect().await.unwrap();
        transport.clear_log();

        let gate = Arc::new(Notify::new());
        transport.push(UPDATES, Reply::Gated(Arc::clone(&gate), updates(false)));

        bridge.start().await.unwrap();
        run_for(Duration::from_secs(1)).await;
        assert!(bridge.is_running());

        let release = Arc::clone(&gate);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            release.notify_one();
        });

        let started = tokio::time::Instant::now();
        bridge.stop().await.unwrap();

        assert!(started.elapsed() >= Duration::from_secs(4));
        assert_eq!(transport.calls(), vec![UPDATES]);
        assert!(!bridge.is_running());
        assert_eq!(bridge.state(), LoopState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cuts_cooldown_short() {
        let transport = door_and_motion();
        let mut bridge = bridge(&transport, RetryPolicy::default());
        bridge.connect().await.unwrap();

        transport.fallback(UPDATES, Reply::Unreachable);
        bridge.start().await.unwrap();
        run_for(Duration::from_secs(1)).await;

        let started = tokio::time::Instant::now();
        bridge.stop().await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn start_twice_is_rejected() {
        let transport = door_and_motion();
        let mut bridge = bridge(&transport, RetryPolicy::default());
        bridge.connect().await.unwrap();

        bridge.start().await.unwrap();
        assert!(matches!(bridge.start().await, Err(Error::AlreadyRunning)));
        assert!(matches!(
            bridge.configure([SensorConfig::new(5)]),
            Err(Error::AlreadyRunning)
        ));
        assert!(matches!(bridge.connect().await, Err(Error::AlreadyRunning)));

        bridge.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn stop_without_start_is_noop() {
        let transport = door_and_motion();
        let mut bridge = bridge(&transport, RetryPolicy::default());

        bridge.stop().await.unwrap();
        assert_eq!(bridge.state(), LoopState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_after_stop_resumes_polling() {
        let transport = door_and_motion();
        let mut bridge = bridge(&transport, RetryPolicy::default());
        let door = record(&bridge, DOOR);
        bridge.connect().await.unwrap();

        bridge.start().await.unwrap();
        run_for(Duration::from_millis(500)).await;
        bridge.stop().await.unwrap();

        transport.push(UPDATES, Reply::Respond(updates(true)));
        transport.push(
            INPUTS,
            Reply::Respond(inputs_body(&[(DOOR, true), (MOTION, false)], "00ff-10")),
        );
        bridge.start().await.unwrap();
        run_for(Duration::from_secs(1)).await;
        bridge.stop().await.unwrap();

        assert_eq!(*door.lock(), vec![(DOOR, true)]);
        assert_eq!(transport.count(LOGIN), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn state_watchers_observe_lifecycle() {
        let transport = door_and_motion();
        let mut bridge = bridge(&transport, RetryPolicy::default());
        let rx = bridge.watch_state();
        let mut events = bridge.subscribe();
        bridge.connect().await.unwrap();

        bridge.start().await.unwrap();
        assert_eq!(*rx.borrow(), LoopState::Polling);
        run_for(Duration::from_millis(250)).await;
        bridge.stop().await.unwrap();
        assert_eq!(*rx.borrow(), LoopState::Stopped);

        let events = drain(&mut events);
        assert_eq!(events.first(), Some(&BridgeEvent::Started));
        assert_eq!(events.last(), Some(&BridgeEvent::Stopped));
    }

    #[tokio::test(start_paused = true)]
    async fn reconfigure_before_connect() {
        let transport = FakeTransport::connected(
            &[(DOOR, "Front door"), (MOTION, "Hallway"), (7, "Shed")],
            &[(DOOR, false), (MOTION, false), (7, true)],
        );
        let mut bridge = bridge(&transport, RetryPolicy::default());

        bridge
            .configure([SensorConfig::new(7).with_kind("door").with_name("Garden shed")])
            .unwrap();
        bridge.connect().await.unwrap();

        let sensors = bridge.list_sensors();
        assert_eq!(sensors.len(), 1);
        assert_eq!(sensors[0].name(), Some("Garden shed"));
        assert_eq!(sensors[0].state(), SensorState::Active);
        assert!(bridge.configure([SensorConfig::new(1), SensorConfig::new(1)]).is_err());
    }
}
