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

//! Collaborator locations
//!
//! The stock tools are found through `PATH`. The modified hidutil is
//! optional and located either explicitly (`--hidutil`) or by looking for
//! `hidtool_modified` next to our own executable.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::ConfigError;

/// File name of the helper looked for beside the executable
pub const HELPER_FILE_NAME: &str = "hidtool_modified";

/// Paths of the stock macOS tools
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tools {
    /// Lists HID devices
    pub hidutil: PathBuf,
    /// Reads and writes the preference store
    pub defaults: PathBuf,
}

impl Default for Tools {
    fn default() -> Self {
        Self {
            hidutil: PathBuf::from("hidutil"),
            defaults: PathBuf::from("defaults"),
        }
    }
}

/// Locates the immediate-effect helper
///
/// # Arguments
///
/// * `explicit` - Path given by the operator, `~` is expanded
/// * `exe_dir` - Directory of the running executable, searched when no
///   explicit path is given
///
/// # Returns
///
/// * `Ok(Some(path))` - Helper found
/// * `Ok(None)` - No explicit path and nothing usable beside the executable
///
/// # Errors
///
/// Returns `ConfigError::HelperNotExecutable` if an explicit path does not
/// point at an executable file.
pub fn resolve_helper(
    explicit: Option<&str>,
    exe_dir: Option<&Path>,
) -> Result<Option<PathBuf>, ConfigError> {
    if let Some(path) = explicit {
        let expanded = PathBuf::from(shellexpand::tilde(path).into_owned());
        if !is_executable(&expanded) {
            return Err(ConfigError::HelperNotExecutable(expanded));
        }
        return Ok(Some(expanded));
    }

    Ok(exe_dir
        .map(|dir| dir.join(HELPER_FILE_NAME))
        .filter(|candidate| is_executable(candidate)))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    fs::metadata(path).map(|meta| meta.is_file()).unwrap_or(false)
}
