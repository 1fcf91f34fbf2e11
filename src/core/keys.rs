// Copyright 2025 Eric Jingryd (tidynest@proton.me)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Key registry and alias table
//!
//! Translates between symbolic key names ("left_control", "kb_fn") and
//! the page-qualified usage codes stored by macOS, and expands alias
//! names ("control", "fn") into the concrete keys they stand for.
//!
//! Both tables are fixed at compile time and indexed lazily on first use.
//! An unknown name or code is always an error, never skipped: a foreign
//! entry in the preference store must stop the operation rather than be
//! printed or rewritten wrongly.
//!
//! # References
//! - Apple TN2450 (Remapping Keys in macOS 10.12 Sierra)
//! - IOHIDFamily `AppleHIDUsageTables.h`
//! - `IOHIDUsageTables.h` from IOKit

use once_cell::sync::Lazy;
use std::collections::HashMap;
use thiserror::Error;

use crate::core::types::{UsageCode, UsagePage};

/// Registry lookup failures
#[derive(Debug, Error, PartialEq)]
pub enum KeyError {
    /// Key or alias name not in the registry
    #[error("Unknown key name '{0}'")]
    UnknownName(String),

    /// Usage code not in the registry (foreign or corrupted entry)
    #[error("Unknown key code {0}")]
    UnknownCode(UsageCode),
}

/// Every key this tool knows about, name ↔ code
const KEYS: &[(&str, UsageCode)] = &[
    ("escape", UsageCode::new(UsagePage::Keyboard, 0x29)),
    ("caps_lock", UsageCode::new(UsagePage::Keyboard, 0x39)),
    ("left_control", UsageCode::new(UsagePage::Keyboard, 0xE0)),
    ("right_control", UsageCode::new(UsagePage::Keyboard, 0xE4)),
    ("left_shift", UsageCode::new(UsagePage::Keyboard, 0xE1)),
    ("right_shift", UsageCode::new(UsagePage::Keyboard, 0xE5)),
    ("left_option", UsageCode::new(UsagePage::Keyboard, 0xE2)),
    ("right_option", UsageCode::new(UsagePage::Keyboard, 0xE6)),
    ("left_command", UsageCode::new(UsagePage::Keyboard, 0xE3)),
    ("right_command", UsageCode::new(UsagePage::Keyboard, 0xE7)),
    ("kb_fn", UsageCode::new(UsagePage::AppleVendorKeyboard, 0x03)),
    ("top_case_fn", UsageCode::new(UsagePage::AppleVendorTopCase, 0x03)),
];

/// "Either side" aliases, always left variant first
///
/// The order matters: a destination that must collapse to one key
/// (see `apply::resolve_requests`) takes the last element.
const MULTI_KEY_ALIASES: &[(&str, &[&str])] = &[
    ("control", &["left_control", "right_control"]),
    ("shift", &["left_shift", "right_shift"]),
    ("option", &["left_option", "right_option"]),
    ("command", &["left_command", "right_command"]),
    ("fn", &["kb_fn", "top_case_fn"]),
];

static NAME_TO_CODE: Lazy<HashMap<&'static str, UsageCode>> =
    Lazy::new(|| KEYS.iter().copied().collect());

static CODE_TO_NAME: Lazy<HashMap<UsageCode, &'static str>> =
    Lazy::new(|| KEYS.iter().map(|&(name, code)| (code, name)).collect());

/// Alias name → ordered key names, including one trivial alias per key
static ALIASES: Lazy<HashMap<&'static str, &'static [&'static str]>> = Lazy::new(|| {
    let mut aliases: HashMap<&'static str, &'static [&'static str]> = KEYS
        .iter()
        .map(|(name, _)| (*name, std::slice::from_ref(name)))
        .collect();
    aliases.extend(MULTI_KEY_ALIASES.iter().copied());
    aliases
});

/// Looks up the usage code for a concrete key name
///
/// # Example
/// ```
/// use hid_modifier_manager::core::keys::code_of;
///
/// assert_eq!(code_of("caps_lock").unwrap().raw(), 0x7_0000_0039);
/// assert!(code_of("capslock").is_err());
/// ```
pub fn code_of(name: &str) -> Result<UsageCode, KeyError> {
    NAME_TO_CODE
        .get(name)
        .copied()
        .ok_or_else(|| KeyError::UnknownName(name.to_string()))
}

/// Looks up the key name for a usage code
pub fn name_of(code: UsageCode) -> Result<&'static str, KeyError> {
    CODE_TO_NAME
        .get(&code)
        .copied()
        .ok_or(KeyError::UnknownCode(code))
}

/// Expands an alias into the ordered key names it stands for
///
/// Every key name is its own one-element alias, so `expand_alias("kb_fn")`
/// yields `["kb_fn"]` while `expand_alias("fn")` yields
/// `["kb_fn", "top_case_fn"]`.
pub fn expand_alias(alias: &str) -> Result<&'static [&'static str], KeyError> {
    ALIASES
        .get(alias)
        .copied()
        .ok_or_else(|| KeyError::UnknownName(alias.to_string()))
}

/// All accepted alias names, sorted
pub fn alias_names() -> Vec<&'static str> {
    let mut names: Vec<_> = ALIASES.keys().copied().collect();
    names.sort_unstable();
    names
}

/// All concrete key names in registry order
pub fn key_names() -> impl Iterator<Item = &'static str> {
    KEYS.iter().map(|(name, _)| *name)
}
