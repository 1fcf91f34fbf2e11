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

//! src/core/types.rs
//!
//! Core type definitions for modifier remapping
//!
//! This module defines the fundamental types used throughout the application:
//! - `UsagePage`: The three HID usage pages modifier keys live on
//! - `UsageCode`: A page-qualified key code as macOS stores it
//! - `DeviceId`: The vendor/product pair that scopes a remapping table
//! - `MappingTable`: Source code → destination code for one keyboard
//! - `MappingEntry`: One serialised row of a table (preferences and hidutil)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// HID usage pages that modifier keys are defined on
///
/// macOS represents a key as its usage page shifted left 32 bits, OR'ed
/// with the usage id. The fn key is not part of the USB keyboard page;
/// Apple defines it (as usage 3) on two vendor pages.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum UsagePage {
    /// USB "Keyboard/Keypad" page (0x07)
    Keyboard,
    /// kHIDPage_AppleVendorKeyboard (0xFF01)
    AppleVendorKeyboard,
    /// kHIDPage_AppleVendorTopCase (0x00FF)
    AppleVendorTopCase,
}

impl UsagePage {
    /// Raw page number as found in the HID usage tables
    pub const fn page(self) -> u64 {
        match self {
            UsagePage::Keyboard => 0x07,
            UsagePage::AppleVendorKeyboard => 0xFF01,
            UsagePage::AppleVendorTopCase => 0x00FF,
        }
    }

    /// Page number shifted into the high 32 bits
    pub const fn mask(self) -> u64 {
        self.page() << 32
    }
}

/// A page-qualified HID usage, the key identity macOS persists
///
/// Only ever produced from the built-in key registry or read back from
/// the preference store; user input is translated by table lookup.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UsageCode(u64);

impl UsageCode {
    /// Combines a usage page with a usage id
    pub const fn new(page: UsagePage, usage: u8) -> Self {
        Self(page.mask() | usage as u64)
    }

    /// Wraps a raw 64-bit code (e.g. one read from preferences)
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for UsageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Identity of one keyboard model: (vendor id, product id)
///
/// Two identical keyboards share one identity and therefore one
/// remapping table. Ordering is vendor first, then product.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct DeviceId {
    pub vendor_id: u32,
    pub product_id: u32,
}

impl DeviceId {
    pub const fn new(vendor_id: u32, product_id: u32) -> Self {
        Self { vendor_id, product_id }
    }

    /// Preference key holding this keyboard's remapping table
    ///
    /// Vendor and product are written in decimal:
    /// `com.apple.keyboard.modifiermapping.1452-641-0`
    pub fn preference_key(&self) -> String {
        format!(
            "com.apple.keyboard.modifiermapping.{}-{}-0",
            self.vendor_id, self.product_id
        )
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}:{:04X}", self.vendor_id, self.product_id)
    }
}

/// Remapping table for one keyboard: source code → destination code
///
/// Keys are unique. A BTreeMap keeps serialised output stable, ordering
/// carries no meaning.
pub type MappingTable = BTreeMap<UsageCode, UsageCode>;

/// One row of a remapping table as macOS serialises it
///
/// The same shape is used for the preference store entry list and for the
/// `HIDKeyboardModifierMappingPairs` payload handed to hidutil.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct MappingEntry {
    #[serde(rename = "HIDKeyboardModifierMappingSrc")]
    pub src: UsageCode,

    #[serde(rename = "HIDKeyboardModifierMappingDst")]
    pub dst: UsageCode,
}

impl MappingEntry {
    /// Flattens a table into its serialised entry list
    pub fn list_from_table(table: &MappingTable) -> Vec<MappingEntry> {
        table
            .iter()
            .map(|(&src, &dst)| MappingEntry { src, dst })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_code_layout() {
        let escape = UsageCode::new(UsagePage::Keyboard, 0x29);
        assert_eq!(escape.raw(), 0x7_0000_0029);

        let top_case_fn = UsageCode::new(UsagePage::AppleVendorTopCase, 0x03);
        assert_eq!(top_case_fn.raw(), 0xFF_0000_0003);
    }

    #[test]
    fn test_device_id_display_is_upper_hex() {
        let device = DeviceId::new(0x5AC, 0x27E);
        assert_eq!(format!("{}", device), "05AC:027E");
    }

    #[test]
    fn test_device_id_preference_key_is_decimal() {
        let device = DeviceId::new(0x5AC, 0x27E);
        assert_eq!(
            device.preference_key(),
            "com.apple.keyboard.modifiermapping.1452-638-0"
        );
    }

    #[test]
    fn test_device_id_ordering() {
        let a = DeviceId::new(1, 9);
        let b = DeviceId::new(2, 0);
        let c = DeviceId::new(2, 1);
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn test_entry_list_from_table() {
        let mut table = MappingTable::new();
        table.insert(UsageCode::from_raw(1), UsageCode::from_raw(2));

        let entries = MappingEntry::list_from_table(&table);
        assert_eq!(
            entries,
            vec![MappingEntry {
                src: UsageCode::from_raw(1),
                dst: UsageCode::from_raw(2),
            }]
        );
    }
}
