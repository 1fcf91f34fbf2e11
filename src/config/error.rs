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

use std::path::PathBuf;
use thiserror::Error;

use crate::ipc::CommandError;

/// Errors that can occur reading or writing modifier preferences.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The `defaults` tool could not be run or failed.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Exported preferences are not a readable property list.
    #[error("Failed to parse preferences: {0}")]
    Plist(#[from] plist::Error),

    /// Exported preferences are a property list, but not a dictionary.
    #[error("Preference export is not a dictionary")]
    NotADictionary,

    /// A modifier mapping entry is malformed.
    #[error("Invalid entry under {key}: {reason}")]
    InvalidEntry { key: String, reason: String },

    /// The immediate-effect helper path is not an executable file.
    #[error("hidutil helper is not executable: {0}")]
    HelperNotExecutable(PathBuf),
}
