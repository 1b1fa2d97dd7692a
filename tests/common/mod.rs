// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scripted in-memory transport shared by integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use metronet_bridge::protocol::{HttpRequest, HttpResponse, Method, Transport};
use metronet_bridge::{ProtocolError, SensorId};
use parking_lot::Mutex;
use tokio::sync::Notify;

pub const SESSION_ID: &str = "5e1d-aa02";
pub const INITIAL_MARKER: &str = "00ff-01";

pub const LOGIN: &str = "POST /";
pub const INIT: &str = "GET /";
pub const STRINGS: &str = "POST /api/strings";
pub const INPUTS: &str = "POST /api/inputs";
pub const UPDATES: &str = "POST /api/updates";

/// One scripted answer.
#[derive(Clone)]
pub enum Reply {
    Respond(HttpResponse),
    /// Fails with a connection error.
    Unreachable,
    /// Waits for the notification, then responds.
    Gated(Arc<Notify>, HttpResponse),
}

#[derive(Default)]
struct Script {
    queued: HashMap<String, VecDeque<Reply>>,
    fallback: HashMap<String, Reply>,
    log: Vec<(String, HttpRequest)>,
}

/// Transport answering from per-route reply queues.
///
/// Each route serves its queued replies in order, then repeats its fallback.
/// Every request takes `latency` of (virtual) time.
#[derive(Clone)]
pub struct FakeTransport {
    script: Arc<Mutex<Script>>,
    latency: Duration,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(Script::default())),
            latency: Duration::from_millis(100),
        }
    }

    /// A transport scripted for a successful `connect()` with the given catalog
    /// and inputs. Later update requests report no changes and later inputs
    /// requests repeat the same snapshot unless more replies are queued.
    pub fn connected(catalog: &[(SensorId, &str)], inputs: &[(SensorId, bool)]) -> Self {
        let transport = Self::new();
        transport.fallback(INIT, Reply::Respond(HttpResponse::ok("/", "<html></html>")));
        transport.fallback(LOGIN, Reply::Respond(status_page(SESSION_ID, INITIAL_MARKER)));
        transport.fallback(STRINGS, Reply::Respond(catalog_body(catalog)));
        transport.fallback(INPUTS, Reply::Respond(inputs_body(inputs, "00ff-02")));
        transport.fallback(UPDATES, Reply::Respond(updates(false)));
        transport
    }

    pub fn push(&self, route: &str, reply: Reply) {
        self.script
            .lock()
            .queued
            .entry(route.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn fallback(&self, route: &str, reply: Reply) {
        self.script.lock().fallback.insert(route.to_string(), reply);
    }

    /// Routes of every request received so far.
    pub fn calls(&self) -> Vec<String> {
        self.script
            .lock()
            .log
            .iter()
            .map(|(route, _)| route.clone())
            .collect()
    }

    /// Requests received so far on one route.
    pub fn requests(&self, route: &str) -> Vec<HttpRequest> {
        self.script
            .lock()
            .log
            .iter()
            .filter(|(r, _)| r == route)
            .map(|(_, request)| request.clone())
            .collect()
    }

    pub fn count(&self, route: &str) -> usize {
        self.calls().iter().filter(|r| *r == route).count()
    }

    pub fn clear_log(&self) {
        self.script.lock().log.clear();
    }

    fn next_reply(&self, route: &str) -> Option<Reply> {
        let mut script = self.script.lock();
        if let Some(reply) = script.queued.get_mut(route).and_then(VecDeque::pop_front) {
            return Some(reply);
        }
        script.fallback.get(route).cloned()
    }
}

impl Transport for FakeTransport {
    fn base_url(&self) -> &str {
        "https://panel.test"
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ProtocolError> {
        let verb = match request.method {
            Method::Get => "GET",
            Method::Post => "POST",
        };
        let route = format!("{verb} {}", request.path);
        self.script.lock().log.push((route.clone(), request));

        tokio::time::sleep(self.latency).await;

        match self.next_reply(&route) {
            Some(Reply::Respond(response)) => Ok(response),
            Some(Reply::Unreachable) => Err(ProtocolError::ConnectionFailed(route)),
            Some(Reply::Gated(gate, response)) => {
                gate.notified().await;
                Ok(response)
            }
            None => Ok(HttpResponse {
                status: 404,
                final_path: request_path(&route),
                body: String::new(),
            }),
        }
    }
}

fn request_path(route: &str) -> String {
    route.split_once(' ').map_or("/", |(_, path)| path).to_string()
}

/// Status page reached after a successful login.
pub fn status_page(session_id: &str, marker: &str) -> HttpResponse {
    HttpResponse::ok(
        "/Status",
        format!(
            "<html><script>\n  var sessionId = '{session_id}';\n  var lastInputId = '{marker}';\n</script></html>"
        ),
    )
}

/// Login page served again after rejected credentials.
pub fn login_page() -> HttpResponse {
    HttpResponse::ok("/", "<html><form id=\"login\"></form></html>")
}

/// HTML page returned by API routes once the session expired.
pub fn expired() -> HttpResponse {
    HttpResponse::ok("/", "<!DOCTYPE html><html>Login</html>")
}

/// Gateway error returned by an overloaded service.
pub fn unavailable(path: &str) -> HttpResponse {
    HttpResponse {
        status: 503,
        final_path: path.to_string(),
        body: String::new(),
    }
}

pub fn updates(has_changes: bool) -> HttpResponse {
    HttpResponse::ok(
        "/api/updates",
        serde_json::json!({ "HasChanges": has_changes }).to_string(),
    )
}

pub fn catalog_body(inputs: &[(SensorId, &str)]) -> HttpResponse {
    let mut entries: Vec<serde_json::Value> = inputs
        .iter()
        .map(|(index, description)| {
            serde_json::json!({ "Class": 10, "Index": index, "Description": description })
        })
        .collect();
    entries.push(serde_json::json!({ "Class": 4, "Index": 1, "Description": "Area 1" }));
    HttpResponse::ok("/api/strings", serde_json::Value::Array(entries).to_string())
}

pub fn inputs_body(inputs: &[(SensorId, bool)], last_marker: &str) -> HttpResponse {
    let entries: Vec<serde_json::Value> = inputs
        .iter()
        .enumerate()
        .map(|(i, (index, alarm))| {
            let marker = if i + 1 == inputs.len() {
                last_marker.to_string()
            } else {
                format!("{last_marker}-{i}")
            };
            serde_json::json!({ "Index": index, "Alarm": alarm, "Id": marker })
        })
        .collect();
    HttpResponse::ok("/api/inputs", serde_json::Value::Array(entries).to_string())
}
