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

//! Simulated macOS collaborators for tests
//!
//! `FakeSystem` answers `hidutil list`, keeps an in-memory global
//! preference domain for `defaults export`/`write`, accepts any other
//! program as the immediate-effect helper, and records every invocation.

use plist::{Dictionary, Value};
use std::cell::RefCell;
use std::io::Cursor;

use crate::ipc::{CommandError, CommandRunner, Invocation};

/// Two keyboards (one listed twice), a mouse, the Touch Bar, a truncated
/// row, and rows after the table that must be ignored
pub const SAMPLE_LISTING: &str = "\
Services:
VendorID ProductID LocationID UsagePage Usage Product
0x1234   0x5678    0x0        1         6     Service Row

Devices:
VendorID ProductID LocationID UsagePage Usage RegistryID  Transport Product
0x5ac    0x27e     0x0        1         6     0x100000a1c SPI       Apple Internal Keyboard / Trackpad
0x4d9    0x104     0x14100000 1         6     0x100000b2e USB       USB Keyboard
0x4d9    0x104     0x14200000 1         6     0x100000b2f USB       USB Keyboard
0x46d    0xc52b    0x14300000 1         2     0x100000c3f USB       USB Receiver
0x5ac    0x8600    0x0        1         6     0x100000d40 SPI       TouchBarUserDevice
0x5ac    0x24f     0x14400000

0x1111   0x2222    0x0        1         6     0x100000e51 USB       After Blank Line
";

pub struct FakeSystem {
    listing: String,
    domain: RefCell<Dictionary>,
    invocations: RefCell<Vec<Invocation>>,
    failing_program: Option<String>,
    failing_write: Option<usize>,
}

impl FakeSystem {
    pub fn new() -> Self {
        Self {
            listing: SAMPLE_LISTING.to_string(),
            domain: RefCell::new(Dictionary::new()),
            invocations: RefCell::new(Vec::new()),
            failing_program: None,
            failing_write: None,
        }
    }

    pub fn with_listing(mut self, listing: &str) -> Self {
        self.listing = listing.to_string();
        self
    }

    /// Makes every invocation of `program` exit non-zero
    pub fn failing(mut self, program: &str) -> Self {
        self.failing_program = Some(program.to_string());
        self
    }

    /// Seeds a preference key with raw entry dictionaries
    /// Fails the `nth` (1-based) `defaults write`, earlier writes succeed
    pub fn failing_write(mut self, nth: usize) -> Self {
        self.failing_write = Some(nth);
        self
    }

    pub fn with_preference(self, key: &str, value: Value) -> Self {
        self.domain.borrow_mut().insert(key.to_string(), value);
        self
    }

    pub fn preference(&self, key: &str) -> Option<Value> {
        self.domain.borrow().get(key).cloned()
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.borrow().clone()
    }

    /// Invocations whose program file name is `program`
    pub fn invocations_of(&self, program: &str) -> Vec<Invocation> {
        self.invocations
            .borrow()
            .iter()
            .filter(|cmd| cmd.program_name() == program)
            .cloned()
            .collect()
    }

    /// `defaults ... write` invocations
    pub fn writes(&self) -> Vec<Invocation> {
        self.invocations_of("defaults")
            .into_iter()
            .filter(|cmd| cmd.args.iter().any(|arg| arg == "write"))
            .collect()
    }

    fn export(&self) -> String {
        let mut buffer = Vec::new();
        Value::Dictionary(self.domain.borrow().clone())
            .to_writer_xml(&mut buffer)
            .unwrap();
        String::from_utf8(buffer).unwrap()
    }

    fn defaults(&self, cmd: &Invocation) -> Result<String, CommandError> {
        match cmd.args.as_slice() {
            [host, export, global, dash] if host == "-currentHost" && export == "export" => {
                assert_eq!((global.as_str(), dash.as_str()), ("-g", "-"));
                Ok(self.export())
            }
            [host, write, global, key, value] if host == "-currentHost" && write == "write" => {
                assert_eq!(global, "-g");
                let value = Value::from_reader_xml(Cursor::new(value.as_bytes())).unwrap();
                self.domain.borrow_mut().insert(key.clone(), value);
                Ok(String::new())
            }
            other => panic!("unexpected defaults invocation: {:?}", other),
        }
    }
}

impl CommandRunner for FakeSystem {
    fn run(&self, cmd: &Invocation) -> Result<String, CommandError> {
        self.invocations.borrow_mut().push(cmd.clone());

        let is_write = cmd.program_name() == "defaults" && cmd.args.iter().any(|arg| arg == "write");
        let write_fails = is_write && self.failing_write == Some(self.writes().len());

        if write_fails || self.failing_program.as_deref() == Some(cmd.program_name()) {
            return Err(CommandError::Failed {
                command: cmd.to_string(),
                status: "exit status: 1".to_string(),
                stderr: "simulated failure".to_string(),
            });
        }

        match cmd.program_name() {
            "hidutil" => Ok(self.listing.clone()),
            "defaults" => self.defaults(cmd),
            _ => Ok(String::new()),
        }
    }
}

/// Builds one raw preference entry
pub fn entry(src: Value, dst: Value) -> Value {
    let mut entry = Dictionary::new();
    entry.insert("HIDKeyboardModifierMappingSrc".to_string(), src);
    entry.insert("HIDKeyboardModifierMappingDst".to_string(), dst);
    Value::Dictionary(entry)
}
