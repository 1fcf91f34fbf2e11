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

//! Current remappings, per attached keyboard, as text

use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

use crate::config::{settings::Tools, ConfigError, MappingStore};
use crate::core::keys::{name_of, KeyError};
use crate::core::types::{DeviceId, MappingTable};
use crate::ipc::hidutil::{list_keyboards, ListError};
use crate::ipc::{ClientMode, CommandRunner};

/// Errors produced while building the remapping report
#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    List(#[from] ListError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Key(#[from] KeyError),
}

/// Lists attached keyboards and renders their persisted remappings
pub fn render(runner: &dyn CommandRunner, tools: &Tools) -> Result<String, ReportError> {
    let mappings = MappingStore::new(runner, tools, ClientMode::Live).read_all()?;
    let devices = list_keyboards(runner, tools)?;
    Ok(render_report(&devices, &mappings)?)
}

/// Renders one section per keyboard, in device order
///
/// Entries are printed as `  src -> dst`, sorted by that text. A keyboard
/// without entries shows `  No remappings`.
pub fn render_report(
    devices: &BTreeSet<DeviceId>,
    mappings: &HashMap<DeviceId, MappingTable>,
) -> Result<String, KeyError> {
    let mut report = String::from("Keyboard remappings\n");

    for device in devices {
        report.push_str(&format!("\nKeyboard {}:\n", device));

        let table = match mappings.get(device) {
            Some(table) if !table.is_empty() => table,
            _ => {
                report.push_str("  No remappings\n");
                continue;
            }
        };

        let mut lines = table
            .iter()
            .map(|(&src, &dst)| Ok(format!("  {} -> {}", name_of(src)?, name_of(dst)?)))
            .collect::<Result<Vec<_>, KeyError>>()?;
        lines.sort();

        for line in lines {
            report.push_str(&line);
            report.push('\n');
        }
    }

    Ok(report)
}
