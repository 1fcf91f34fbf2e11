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

//! Modifier mapping persistence via the macOS preference store.
//!
//! Remapping tables live in the current host's global domain, one key per
//! keyboard model:
//!
//! ```text
//! com.apple.keyboard.modifiermapping.<vendor>-<product>-0
//! ```
//!
//! Each value is an array of dictionaries with `HIDKeyboardModifierMappingSrc`
//! and `HIDKeyboardModifierMappingDst`. The store writes integers, but
//! existing entries are sometimes `<real>`, so codes are coerced on read.
//!
//! - **Reads** export the whole domain once (`defaults -currentHost export -g -`)
//! - **Writes** overwrite exactly one keyboard's key and nothing else
//! - **Failures** of the `defaults` tool are fatal, no partial results
//!
//! Preferences written here take effect the next time the user logs in.
//!
//! # Example
//!
//! ```no_run
//! use hid_modifier_manager::config::{settings::Tools, MappingStore};
//! use hid_modifier_manager::ipc::{ClientMode, SystemRunner};
//!
//! let runner = SystemRunner::new();
//! let store = MappingStore::new(&runner, &Tools::default(), ClientMode::Live);
//!
//! for (device, table) in store.read_all()? {
//!     println!("{}: {} remappings", device, table.len());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod settings;

pub use error::ConfigError;

use once_cell::sync::Lazy;
use plist::Value;
use regex::Regex;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::PathBuf;

use crate::config::settings::Tools;
use crate::core::types::{DeviceId, MappingEntry, MappingTable, UsageCode};
use crate::ipc::{ClientMode, CommandRunner, Invocation};

const SRC_FIELD: &str = "HIDKeyboardModifierMappingSrc";
const DST_FIELD: &str = "HIDKeyboardModifierMappingDst";

static MAPPING_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^com\.apple\.keyboard\.modifiermapping\.(\d+)-(\d+)-0$")
        .expect("modifier mapping key pattern should be valid regex")
});

/// Reads and writes per-keyboard remapping tables.
///
/// Holds no state between calls: every `read_all` re-exports the
/// preference domain.
pub struct MappingStore<'a> {
    runner: &'a dyn CommandRunner,
    defaults: PathBuf,
    mode: ClientMode,
}

impl<'a> MappingStore<'a> {
    /// Creates a store backed by the `defaults` tool in `tools`.
    ///
    /// In `ClientMode::DryRun`, `write_one` builds its command but never
    /// runs it. Reads are unaffected by the mode.
    pub fn new(runner: &'a dyn CommandRunner, tools: &Tools, mode: ClientMode) -> Self {
        Self {
            runner,
            defaults: tools.defaults.clone(),
            mode,
        }
    }

    /// Reads every keyboard's persisted remapping table.
    ///
    /// Keyboards without a preference key are simply absent from the
    /// result; callers treat a missing table as empty.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Command` if `defaults` fails, and a parse
    /// error if the export or any mapping entry is malformed.
    pub fn read_all(&self) -> Result<HashMap<DeviceId, MappingTable>, ConfigError> {
        let cmd = Invocation::new(&self.defaults).args(["-currentHost", "export", "-g", "-"]);
        let output = self.runner.run(&cmd)?;
        parse_preferences(output.as_bytes())
    }

    /// Builds the command that overwrites one keyboard's table.
    pub fn write_command(
        &self,
        device: DeviceId,
        table: &MappingTable,
    ) -> Result<Invocation, ConfigError> {
        Ok(Invocation::new(&self.defaults)
            .args(["-currentHost", "write", "-g"])
            .arg(device.preference_key())
            .arg(serialize_table(table)?))
    }

    /// Overwrites one keyboard's table, leaving other keyboards untouched.
    pub fn write_one(&self, device: DeviceId, table: &MappingTable) -> Result<(), ConfigError> {
        let cmd = self.write_command(device, table)?;

        match self.mode {
            ClientMode::DryRun => Ok(()),
            ClientMode::Live => {
                self.runner.run(&cmd)?;
                log::info!("Saved {} remapping(s) for keyboard {}", table.len(), device);
                Ok(())
            }
        }
    }
}

/// Extracts remapping tables from an exported preference domain.
///
/// Keys that are not modifier mapping keys are ignored.
pub fn parse_preferences(xml: &[u8]) -> Result<HashMap<DeviceId, MappingTable>, ConfigError> {
    let document = Value::from_reader_xml(Cursor::new(xml))?;
    let domain = document.as_dictionary().ok_or(ConfigError::NotADictionary)?;

    let mut keyboards: HashMap<DeviceId, MappingTable> = HashMap::new();

    for (key, value) in domain {
        let Some(device) = device_for_key(key)? else {
            continue;
        };

        let entries = value
            .as_array()
            .ok_or_else(|| invalid_entry(key, "value is not an array"))?;

        let table = keyboards.entry(device).or_default();
        for entry in entries {
            let entry = entry
                .as_dictionary()
                .ok_or_else(|| invalid_entry(key, "entry is not a dictionary"))?;

            let src = read_code(key, entry, SRC_FIELD)?;
            let dst = read_code(key, entry, DST_FIELD)?;
            table.insert(src, dst);
        }
    }

    Ok(keyboards)
}

/// Renders a table as the XML property list `defaults write` accepts.
pub fn serialize_table(table: &MappingTable) -> Result<String, ConfigError> {
    let mut buffer = Vec::new();
    plist::to_writer_xml(&mut buffer, &MappingEntry::list_from_table(table))?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Maps a preference key to the keyboard it belongs to, if any
fn device_for_key(key: &str) -> Result<Option<DeviceId>, ConfigError> {
    let Some(captures) = MAPPING_KEY.captures(key) else {
        return Ok(None);
    };

    let id = |group: usize| {
        captures[group]
            .parse::<u32>()
            .map_err(|_| invalid_entry(key, "device id out of range"))
    };

    Ok(Some(DeviceId::new(id(1)?, id(2)?)))
}

fn read_code(
    key: &str,
    entry: &plist::Dictionary,
    field: &str,
) -> Result<UsageCode, ConfigError> {
    let value = entry
        .get(field)
        .ok_or_else(|| invalid_entry(key, &format!("missing {}", field)))?;

    coerce_code(value)
        .map(UsageCode::from_raw)
        .ok_or_else(|| invalid_entry(key, &format!("{} is not a key code", field)))
}

/// Accepts integer or real encodings (and their string forms)
///
/// Reals are truncated toward zero.
fn coerce_code(value: &Value) -> Option<u64> {
    match value {
        Value::Integer(integer) => integer.as_unsigned(),
        Value::Real(real) => real_to_code(*real),
        Value::String(text) => text
            .trim()
            .parse::<u64>()
            .ok()
            .or_else(|| text.trim().parse::<f64>().ok().and_then(real_to_code)),
        _ => None,
    }
}

fn real_to_code(real: f64) -> Option<u64> {
    if real.is_finite() && real >= 0.0 && real < u64::MAX as f64 {
        Some(real as u64)
    } else {
        None
    }
}

fn invalid_entry(key: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidEntry {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests;
