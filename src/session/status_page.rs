// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Extraction of session values embedded in the status page.
//!
//! After login the service renders a page containing script assignments such
//! as `var sessionId = '6f1c-...';`. Only values made of lowercase hex digits
//! and dashes are accepted.

/// Name of the script variable holding the session id.
pub(crate) const SESSION_ID_VAR: &str = "sessionId";
/// Name of the script variable holding the last input marker.
pub(crate) const LAST_INPUT_VAR: &str = "lastInputId";

/// Finds `var <name> = '<value>';` in `page` and returns the value.
///
/// Whitespace (at least one character) is required around `=` and after
/// `var`, matching the markup the service emits.
pub(crate) fn script_variable<'a>(page: &'a str, name: &str) -> Option<&'a str> {
    let mut offset = 0;
    while let Some(found) = page[offset..].find("var") {
        let start = offset + found;
        if let Some(value) = match_assignment(&page[start + 3..], name) {
            return Some(value);
        }
        offset = start + 3;
    }
    None
}

fn match_assignment<'a>(rest: &'a str, name: &str) -> Option<&'a str> {
    let rest = skip_whitespace(rest)?;
    let rest = rest.strip_prefix(name)?;
    let rest = skip_whitespace(rest)?;
    let rest = rest.strip_prefix('=')?;
    let rest = skip_whitespace(rest)?;
    let rest = rest.strip_prefix('\'')?;

    let len = rest
        .find(|c: char| !(c.is_ascii_digit() || ('a'..='f').contains(&c) || c == '-'))
        .unwrap_or(rest.len());
    if len == 0 {
        return None;
    }

    let (value, tail) = rest.split_at(len);
    tail.starts_with("';").then_some(value)
}

/// Strips leading whitespace, requiring at least one whitespace character.
fn skip_whitespace(text: &str) -> Option<&str> {
    let trimmed = text.trim_start();
    (trimmed.len() < text.len()).then_some(trimmed)
}
