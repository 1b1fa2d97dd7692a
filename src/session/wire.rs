// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Request paths and JSON payloads of the Metronet web API.

use serde::Deserialize;

use crate::state::SensorId;

/// Service root; GET seeds the cookie jar, POST submits credentials.
pub const ROOT_PATH: &str = "/";
/// Page the service redirects to after a successful login.
pub const STATUS_PATH: &str = "/Status";
/// Catalog of configured strings (input names among others).
pub const STRINGS_PATH: &str = "/api/strings";
/// Current state of every input.
pub const INPUTS_PATH: &str = "/api/inputs";
/// Long-poll endpoint reporting whether anything changed.
pub const UPDATES_PATH: &str = "/api/updates";

/// Catalog class used for panel inputs.
pub const INPUT_CLASS: u32 = 10;

/// Entry of the `/api/strings` response.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct StringEntry {
    #[serde(rename = "Class")]
    pub class: u32,
    #[serde(rename = "Index")]
    pub index: SensorId,
    #[serde(rename = "Description", default)]
    pub description: Option<String>,
}

/// Entry of the `/api/inputs` response.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct InputEntry {
    #[serde(rename = "Index")]
    pub index: SensorId,
    #[serde(rename = "Alarm")]
    pub alarm: bool,
    #[serde(rename = "Id", default)]
    pub id: Option<RawMarker>,
}

/// Input marker as sent by the service; usually a GUID, sometimes a number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawMarker {
    Text(String),
    Number(i64),
}

impl RawMarker {
    pub fn into_string(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Number(number) => number.to_string(),
        }
    }
}

/// Body of the `/api/updates` response.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct UpdatesResponse {
    #[serde(rename = "HasChanges")]
    pub has_changes: bool,
}

/// A panel input listed in the remote catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Remote input index, used as sensor id.
    pub index: SensorId,
    /// Description configured on the panel.
    pub description: String,
}

/// Current value of one input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputReading {
    /// Remote input index.
    pub index: SensorId,
    /// Whether the input is in alarm.
    pub active: bool,
    /// Opaque marker of this reading.
    pub marker: Option<String>,
}

impl StringEntry {
    /// Converts the entry to a catalog input, skipping non-input classes.
    pub fn into_input(self) -> Option<CatalogEntry> {
        (self.class == INPUT_CLASS).then(|| CatalogEntry {
            index: self.index,
            description: self.description.unwrap_or_default(),
        })
    }
}

impl From<InputEntry> for InputReading {
    fn from(entry: InputEntry) -> Self {
        Self {
            index: entry.index,
            active: entry.alarm,
            marker: entry.id.map(RawMarker::into_string),
        }
    }
}
