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

//! HID Modifier Manager
//!
//! Inspects and rewrites per-keyboard modifier key remapping on macOS,
//! translating between readable key names ("caps_lock", "control", "fn")
//! and the HID usage codes the preference store and the HID event system
//! actually use.
//!
//! # Features
//!
//! - **Per-keyboard tables:** Every attached keyboard model is remapped
//!   independently, keyed by its vendor/product id
//! - **Change-only writes:** Keyboards already in the requested state are
//!   never written
//! - **Immediate effect:** Optional modified hidutil applies changes without
//!   logging out
//! - **Dry run:** Print every change and command without touching anything
//!
//! # Architecture
//!
//! - **`core`:** Business logic (types, key registry, parsing, diff/apply, report)
//! - **`config`:** Preference store access and collaborator locations
//! - **`ipc`:** External process invocation and hidutil integration
//!
//! # Examples
//!
//! ## Translating key names
//!
//! ```
//! use hid_modifier_manager::core::keys::{code_of, expand_alias, name_of};
//!
//! let code = code_of("left_control")?;
//! assert_eq!(name_of(code)?, "left_control");
//! assert_eq!(expand_alias("control")?, ["left_control", "right_control"]);
//! # Ok::<(), hid_modifier_manager::core::KeyError>(())
//! ```
//!
//! ## Remapping caps lock to control on every keyboard
//!
//! ```no_run
//! use hid_modifier_manager::config::settings::Tools;
//! use hid_modifier_manager::core::{apply, ApplyOptions};
//! use hid_modifier_manager::ipc::{hidutil::list_keyboards, SystemRunner};
//!
//! let runner = SystemRunner::new();
//! let tools = Tools::default();
//! let keyboards = list_keyboards(&runner, &tools)?;
//!
//! let summary = apply(
//!     &runner,
//!     &tools,
//!     &keyboards,
//!     &["caps_lock,control"],
//!     &ApplyOptions::default(),
//!     &mut std::io::stdout(),
//! )?;
//! println!("{} keyboard(s) changed", summary.changed.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod core;
pub mod ipc;

#[cfg(test)]
mod testing;

// Re-export commonly used types for convenience
pub use crate::core::{DeviceId, MappingTable, UsageCode};
