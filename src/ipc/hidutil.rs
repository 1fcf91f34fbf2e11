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

//! hidutil integration
//!
//! Two collaborators share this module:
//! - The stock `hidutil`, used read-only to list attached keyboards
//! - A modified hidutil that can set `HIDKeyboardModifierMappingPairs`
//!   on a live device, making a change take effect without logging out

use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::config::settings::Tools;
use crate::core::parser::{parse_device_listing, ParseError};
use crate::core::types::{DeviceId, MappingEntry, MappingTable};
use crate::ipc::{ClientMode, CommandError, CommandRunner, Invocation};

/// Errors from listing keyboards
#[derive(Debug, thiserror::Error)]
pub enum ListError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Lists attached keyboards via `hidutil list -m keyboard`
pub fn list_keyboards(
    runner: &dyn CommandRunner,
    tools: &Tools,
) -> Result<BTreeSet<DeviceId>, ListError> {
    let cmd = Invocation::new(&tools.hidutil).args(["list", "-m", "keyboard"]);
    let output = runner.run(&cmd)?;
    Ok(parse_device_listing(&output)?)
}

/// `-m` matching dictionary selecting one keyboard
#[derive(Serialize)]
struct DeviceMatch {
    #[serde(rename = "VendorID")]
    vendor_id: u32,
    #[serde(rename = "ProductID")]
    product_id: u32,
}

/// `-s` property payload
#[derive(Serialize)]
struct MappingProperty {
    #[serde(rename = "HIDKeyboardModifierMappingPairs")]
    pairs: Vec<MappingEntry>,
}

/// Client for the modified hidutil that applies mappings immediately
///
/// # Example
/// ```
/// use hid_modifier_manager::ipc::{hidutil::HidutilClient, ClientMode, SystemRunner};
/// use hid_modifier_manager::core::types::{DeviceId, MappingTable};
///
/// // DryRun builds commands but never runs them
/// let runner = SystemRunner::new();
/// let client = HidutilClient::new(&runner, "/usr/local/bin/hidtool_modified", ClientMode::DryRun);
///
/// let device = DeviceId::new(0x5AC, 0x27E);
/// let cmd = client.build_command(device, &MappingTable::new())?;
/// assert_eq!(cmd.args[0], "property");
/// assert!(client.apply_mappings(device, &MappingTable::new()).is_ok());
/// # Ok::<(), hid_modifier_manager::ipc::hidutil::HelperError>(())
/// ```
pub struct HidutilClient<'a> {
    runner: &'a dyn CommandRunner,
    path: PathBuf,
    mode: ClientMode,
}

impl<'a> HidutilClient<'a> {
    pub fn new(runner: &'a dyn CommandRunner, path: impl AsRef<Path>, mode: ClientMode) -> Self {
        Self {
            runner,
            path: path.as_ref().to_path_buf(),
            mode,
        }
    }

    /// Builds the `property -m <match> -s <payload>` invocation
    ///
    /// The payload carries the whole new table, not just the changes:
    /// setting the property replaces the device's mapping.
    pub fn build_command(
        &self,
        device: DeviceId,
        table: &MappingTable,
    ) -> Result<Invocation, HelperError> {
        let matching = serde_json::to_string(&DeviceMatch {
            vendor_id: device.vendor_id,
            product_id: device.product_id,
        })?;
        let property = serde_json::to_string(&MappingProperty {
            pairs: MappingEntry::list_from_table(table),
        })?;

        Ok(Invocation::new(&self.path)
            .arg("property")
            .arg("-m")
            .arg(matching)
            .arg("-s")
            .arg(property))
    }

    /// Pushes a device's full new table into the running HID system
    ///
    /// # Arguments
    ///
    /// * `device` - Keyboard to update
    /// * `table` - Complete new remapping table for that keyboard
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Command sent (Live) or only built (DryRun)
    /// * `Err(HelperError)` - Payload encoding or the helper failed
    pub fn apply_mappings(&self, device: DeviceId, table: &MappingTable) -> Result<(), HelperError> {
        let cmd = self.build_command(device, table)?;

        match self.mode {
            ClientMode::DryRun => Ok(()),
            ClientMode::Live => {
                self.runner.run(&cmd)?;
                Ok(())
            }
        }
    }
}

/// Errors from the immediate-effect helper
#[derive(Debug, thiserror::Error)]
pub enum HelperError {
    #[error("Failed to encode hidutil payload: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Command(#[from] CommandError),
}
