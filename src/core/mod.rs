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

//! src/core/mod.rs
//!
//! Core business logic module
//!
//! This module contains the data structures and algorithms for modifier
//! remapping, including:
//! - Type definitions for usage codes, keyboards and remapping tables
//! - The key registry and alias table
//! - Parsing of hidutil reports and operator input
//! - The diff/apply engine and the mapping report
//!
//! Parsing, key translation and diffing are pure; everything that talks to
//! macOS goes through `ipc::CommandRunner`, so the whole module is
//! testable without a Mac.

pub mod apply;
pub mod keys;
pub mod parser;
pub mod report;
pub mod types;

pub use apply::{apply, ApplyError, ApplyOptions, ApplySummary, RequestedMappings};
pub use keys::KeyError;
pub use parser::ParseError;
pub use types::*;

#[cfg(test)]
mod tests;
