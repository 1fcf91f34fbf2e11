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

//! src/core/parser.rs
//!
//! Parsers for external tool output and operator input
//!
//! This module handles:
//! - The columnar device report printed by `hidutil list -m keyboard`
//! - Requested mappings of the form `src,dst`
//! - Keyboard filters of the form `vendor:product` (hex)
//!
//! # Architecture
//! The device report is read line by line and defensively: the header row
//! is located by column name rather than position, incomplete rows are
//! skipped, and every row is re-checked for the keyboard usage signature
//! even though the listing was already filtered to keyboards.
//!
//! The small operator-facing grammars use nom combinators.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_until},
    character::complete::{char, hex_digit1},
    combinator::{all_consuming, map_res, opt, rest},
    sequence::{preceded, separated_pair},
    IResult, Parser,
};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::core::types::DeviceId;

/// Generic Desktop usage page
const GENERIC_DESKTOP_PAGE: u32 = 0x01;
/// Keyboard usage on the Generic Desktop page
const KEYBOARD_USAGE: u32 = 0x06;

/// 05AC:8600 is the Touch Bar, which cannot be remapped this way
pub const TOUCH_BAR: DeviceId = DeviceId::new(0x05AC, 0x8600);

/// Parse errors for tool output and operator input
#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("Didn't find \"Devices:\" in hidutil output")]
    MissingMarker,

    #[error("Didn't find a VendorID/ProductID/UsagePage/Usage header in hidutil output")]
    MissingHeader,

    #[error("Invalid hex number '{0}' in hidutil output")]
    InvalidNumber(String),

    #[error("Invalid mapping '{0}': expected SRC,DST")]
    InvalidMapping(String),

    #[error("Invalid keyboard '{0}': expected VENDOR:PRODUCT in hex")]
    InvalidDeviceFilter(String),
}

/// Column positions taken from the report's header row
#[derive(Debug, PartialEq)]
struct ListingColumns {
    count: usize,
    vendor: usize,
    product: usize,
    usage_page: usize,
    usage: usize,
}

impl ListingColumns {
    /// Recognises a header row by the presence of all four column names
    fn from_header(line: &str) -> Option<Self> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let position = |name: &str| fields.iter().position(|field| *field == name);

        Some(Self {
            vendor: position("VendorID")?,
            product: position("ProductID")?,
            usage_page: position("UsagePage")?,
            usage: position("Usage")?,
            count: fields.len(),
        })
    }

    fn is_keyboard(&self, fields: &[&str]) -> bool {
        parse_number(fields[self.usage_page]) == Some(GENERIC_DESKTOP_PAGE)
            && parse_number(fields[self.usage]) == Some(KEYBOARD_USAGE)
    }
}

/// Parses a `hidutil list` report into the set of attached keyboards
///
/// # Arguments
/// * `output` - Full stdout of `hidutil list -m keyboard`
///
/// # Returns
/// Deduplicated keyboard identities, excluding the Touch Bar.
///
/// # Errors
/// * `ParseError::MissingMarker` - no `Devices:` line
/// * `ParseError::MissingHeader` - no header row after it
/// * `ParseError::InvalidNumber` - a keyboard row with non-hex ids
///
/// # Example
/// ```
/// use hid_modifier_manager::core::parser::parse_device_listing;
///
/// let report = "Services:\n\nDevices:\n\
///     VendorID ProductID LocationID UsagePage Usage Product\n\
///     0x5ac 0x27e 0x1 1 6 Apple Internal Keyboard / Trackpad\n";
/// let keyboards = parse_device_listing(report)?;
/// assert_eq!(keyboards.len(), 1);
/// # Ok::<(), hid_modifier_manager::core::parser::ParseError>(())
/// ```
pub fn parse_device_listing(output: &str) -> Result<BTreeSet<DeviceId>, ParseError> {
    let mut lines = output.lines();

    if !lines
        .by_ref()
        .any(|line| line.trim().eq_ignore_ascii_case("devices:"))
    {
        return Err(ParseError::MissingMarker);
    }

    let columns = lines
        .by_ref()
        .find_map(ListingColumns::from_header)
        .ok_or(ParseError::MissingHeader)?;

    let mut keyboards = BTreeSet::new();

    for line in lines {
        // A blank line ends the device table
        if line.trim().is_empty() {
            break;
        }

        let fields = split_fields(line, columns.count);
        if fields.len() < columns.count {
            continue;
        }

        // Should always hold for a keyboard-filtered listing
        if !columns.is_keyboard(&fields) {
            continue;
        }

        let device = DeviceId::new(
            parse_hex(fields[columns.vendor])?,
            parse_hex(fields[columns.product])?,
        );

        if device != TOUCH_BAR {
            keyboards.insert(device);
        }
    }

    Ok(keyboards)
}

/// Splits on whitespace into at most `max` fields
///
/// The last field keeps any embedded whitespace (device names).
fn split_fields(line: &str, max: usize) -> Vec<&str> {
    let mut fields = Vec::with_capacity(max);
    let mut remaining = line.trim();

    while !remaining.is_empty() && fields.len() + 1 < max {
        match remaining.find(char::is_whitespace) {
            Some(end) => {
                fields.push(&remaining[..end]);
                remaining = remaining[end..].trim_start();
            }
            None => {
                fields.push(remaining);
                remaining = "";
            }
        }
    }

    if !remaining.is_empty() {
        fields.push(remaining);
    }

    fields
}

/// Decimal, or hex with a `0x` prefix
fn parse_number(field: &str) -> Option<u32> {
    match field.strip_prefix("0x").or_else(|| field.strip_prefix("0X")) {
        Some(digits) => u32::from_str_radix(digits, 16).ok(),
        None => field.parse().ok(),
    }
}

/// Hex number with optional `0x` prefix
fn hex_u32(input: &str) -> IResult<&str, u32> {
    map_res(
        preceded(opt(alt((tag("0x"), tag("0X")))), hex_digit1),
        |digits: &str| u32::from_str_radix(digits, 16),
    )
    .parse(input)
}

fn parse_hex(field: &str) -> Result<u32, ParseError> {
    all_consuming(hex_u32)
        .parse(field)
        .map(|(_, value)| value)
        .map_err(|_| ParseError::InvalidNumber(field.to_string()))
}

/// Splits a requested mapping on its first comma
///
/// Whitespace around either side is dropped, so `"caps_lock, control"`
/// yields `("caps_lock", "control")`. Names are not checked here.
pub fn parse_mapping_request(input: &str) -> Result<(&str, &str), ParseError> {
    let parsed: IResult<&str, (&str, &str)> =
        separated_pair(take_until(","), char(','), rest).parse(input);

    match parsed {
        Ok((_, (src, dst))) if !src.trim().is_empty() && !dst.trim().is_empty() => {
            Ok((src.trim(), dst.trim()))
        }
        _ => Err(ParseError::InvalidMapping(input.to_string())),
    }
}

/// Parses a `vendor:product` keyboard filter, both parts in hex
///
/// Accepts the same notation the report prints, e.g. `05AC:027E`.
pub fn parse_device_filter(input: &str) -> Result<DeviceId, ParseError> {
    let parsed: IResult<&str, (u32, u32)> =
        all_consuming(separated_pair(hex_u32, char(':'), hex_u32)).parse(input.trim());

    parsed
        .map(|(_, (vendor_id, product_id))| DeviceId::new(vendor_id, product_id))
        .map_err(|_| ParseError::InvalidDeviceFilter(input.to_string()))
}
