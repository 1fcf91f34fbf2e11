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

//! Diff and apply engine
//!
//! Turns requested `src,dst` strings into concrete code pairs, compares
//! them against each keyboard's persisted table and writes back only the
//! keyboards that actually change.
//!
//! # Pipeline
//! 1. Resolve every request to code pairs (all names validated up front)
//! 2. Export current preferences once
//! 3. Per keyboard: diff, then push via the helper (if any) and persist
//!
//! A keyboard with nothing to change gets no writes at all. There is no
//! rollback: if a later keyboard fails, earlier ones stay changed.

use std::collections::BTreeSet;
use std::io::Write;
use std::path::PathBuf;
use thiserror::Error;

use crate::config::{settings::Tools, ConfigError, MappingStore};
use crate::core::keys::{self, KeyError};
use crate::core::parser::{parse_mapping_request, ParseError};
use crate::core::types::{DeviceId, MappingTable, UsageCode};
use crate::ipc::hidutil::{HelperError, HidutilClient};
use crate::ipc::{ClientMode, CommandRunner, Invocation};

/// Sources whose destination always collapses to a single key
///
/// macOS only ever maps these onto the last (right-hand or top-case)
/// variant of a destination alias, never onto both sides.
const SINGLE_DESTINATION_SOURCES: &[&str] = &["escape", "caps_lock", "fn"];

/// Errors that abort an apply
#[derive(Debug, Error)]
pub enum ApplyError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Helper(#[from] HelperError),

    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),
}

/// Requested code pairs in request order
///
/// A later request for the same source replaces the earlier destination
/// in place, so iteration order stays the order sources first appeared.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestedMappings {
    pairs: Vec<(UsageCode, UsageCode)>,
}

impl RequestedMappings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a pair, overwriting any earlier destination for `src`
    pub fn insert(&mut self, src: UsageCode, dst: UsageCode) {
        match self.pairs.iter_mut().find(|(existing, _)| *existing == src) {
            Some(pair) => pair.1 = dst,
            None => self.pairs.push((src, dst)),
        }
    }

    pub fn get(&self, src: UsageCode) -> Option<UsageCode> {
        self.pairs
            .iter()
            .find(|(existing, _)| *existing == src)
            .map(|&(_, dst)| dst)
    }

    pub fn iter(&self) -> impl Iterator<Item = (UsageCode, UsageCode)> + '_ {
        self.pairs.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Options for `apply`
#[derive(Clone, Debug, Default)]
pub struct ApplyOptions {
    /// Modified hidutil for immediate effect; `None` means "after logout"
    pub helper: Option<PathBuf>,
    /// Print unchanged pairs and the commands being run
    pub verbose: bool,
    /// DryRun prints commands instead of running them
    pub mode: ClientMode,
}

/// Outcome of an apply, per keyboard
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub changed: Vec<DeviceId>,
    pub unchanged: Vec<DeviceId>,
}

/// Resolves `src,dst` strings into code pairs
///
/// Both sides are alias-expanded and crossed, so `"control,command"`
/// yields four pairs. When the source is `escape`, `caps_lock` or `fn`
/// the destination is first collapsed to the last key of its alias.
///
/// # Errors
/// * `ApplyError::Parse` - a request without a comma
/// * `ApplyError::Key` - an unknown key or alias name
///
/// # Example
/// ```
/// use hid_modifier_manager::core::apply::resolve_requests;
/// use hid_modifier_manager::core::keys::code_of;
///
/// let requested = resolve_requests(&["caps_lock,control"])?;
/// assert_eq!(requested.len(), 1);
/// assert_eq!(
///     requested.get(code_of("caps_lock")?),
///     Some(code_of("right_control")?)
/// );
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn resolve_requests<S: AsRef<str>>(requests: &[S]) -> Result<RequestedMappings, ApplyError> {
    let mut mappings = RequestedMappings::new();

    for request in requests {
        let (src_alias, dst_alias) = parse_mapping_request(request.as_ref())?;

        let dst_names = keys::expand_alias(dst_alias)?;
        let dst_names = if SINGLE_DESTINATION_SOURCES.iter().any(|name| *name == src_alias) {
            match dst_names.split_last() {
                Some((last, _)) => std::slice::from_ref(last),
                None => dst_names,
            }
        } else {
            dst_names
        };

        for src_name in keys::expand_alias(src_alias)? {
            for dst_name in dst_names {
                mappings.insert(keys::code_of(src_name)?, keys::code_of(dst_name)?);
            }
        }
    }

    Ok(mappings)
}

/// Applies requested pairs to one keyboard's table in memory
///
/// Prints a `Changing` line per differing pair and, when verbose, a
/// `No change` line per pair already in place.
///
/// # Returns
/// `true` if the table was modified.
pub fn diff_device(
    device: DeviceId,
    table: &mut MappingTable,
    requested: &RequestedMappings,
    verbose: bool,
    out: &mut dyn Write,
) -> Result<bool, ApplyError> {
    let mut changed = false;

    for (src, dst) in requested.iter() {
        let src_name = keys::name_of(src)?;
        let dst_name = keys::name_of(dst)?;

        if table.get(&src) != Some(&dst) {
            writeln!(out, "Keyboard {}: Changing {} -> {}", device, src_name, dst_name)?;
            table.insert(src, dst);
            changed = true;
        } else if verbose {
            writeln!(out, "Keyboard {}: No change {} -> {}", device, src_name, dst_name)?;
        }
    }

    Ok(changed)
}

/// Applies requested mappings to a set of keyboards
///
/// # Arguments
///
/// * `runner` - Process runner for all collaborators
/// * `tools` - Stock tool locations
/// * `devices` - Keyboards to update
/// * `requests` - `src,dst` strings, later ones win on the same source
/// * `options` - Helper path, verbosity and mode
/// * `out` - Sink for user-facing lines
///
/// # Errors
///
/// Unknown names fail before anything is read or written. Any
/// collaborator failure aborts the remaining keyboards.
///
/// An empty request list does nothing.
pub fn apply<S: AsRef<str>>(
    runner: &dyn CommandRunner,
    tools: &Tools,
    devices: &BTreeSet<DeviceId>,
    requests: &[S],
    options: &ApplyOptions,
    out: &mut dyn Write,
) -> Result<ApplySummary, ApplyError> {
    let requested = resolve_requests(requests)?;
    if requested.is_empty() {
        return Ok(ApplySummary::default());
    }

    let store = MappingStore::new(runner, tools, options.mode);
    let mut current = store.read_all()?;

    let helper = options
        .helper
        .as_ref()
        .map(|path| HidutilClient::new(runner, path, options.mode));

    let mut summary = ApplySummary::default();

    for &device in devices {
        // No preference key yet means an empty table
        let mut table = current.remove(&device).unwrap_or_default();

        if !diff_device(device, &mut table, &requested, options.verbose, out)? {
            summary.unchanged.push(device);
            continue;
        }

        match &helper {
            Some(client) => {
                announce(&client.build_command(device, &table)?, options, out)?;
                client.apply_mappings(device, &table)?;
            }
            None => log::warn!(
                "Modified hidutil not available, changes to keyboard {} will not work until you log out and back in",
                device
            ),
        }

        announce(&store.write_command(device, &table)?, options, out)?;
        store.write_one(device, &table)?;

        summary.changed.push(device);
    }

    Ok(summary)
}

/// Echoes a command before it runs (verbose) or instead of running (dry run)
fn announce(cmd: &Invocation, options: &ApplyOptions, out: &mut dyn Write) -> std::io::Result<()> {
    match options.mode {
        ClientMode::DryRun => writeln!(out, "Would execute: {}", cmd),
        ClientMode::Live if options.verbose => writeln!(out, "Will execute: {}", cmd),
        ClientMode::Live => Ok(()),
    }
}
