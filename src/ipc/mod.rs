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

//! External tool invocation
//!
//! Every interaction with macOS goes through a command-line collaborator:
//! `hidutil` to list keyboards, `defaults` to read and write preferences,
//! and an optional modified hidutil to push mappings into the running
//! HID event system.
//!
//! # Safety Modes
//!
//! - **Live** (default): changes are sent to the collaborators
//! - **DryRun**: changes are computed and printed, never sent
//!
//! Reads always run; the mode only gates invocations that modify state.
//!
//! # Process Handling
//!
//! `SystemRunner` waits for each child to exit and collects its output in
//! one call, so pipes are closed and the exit status reaped on every path,
//! including spawn and decode failures. There is no timeout: a hung tool
//! hangs the operation.
//!
//! # Example
//! ```
//! use hid_modifier_manager::ipc::Invocation;
//!
//! let cmd = Invocation::new("hidutil").args(["list", "-m", "keyboard"]);
//! assert_eq!(cmd.to_string(), "hidutil list -m keyboard");
//! ```

pub mod hidutil;

use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use thiserror::Error;

/// Failures running an external collaborator
#[derive(Debug, Error)]
pub enum CommandError {
    /// The program could not be started at all
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The program ran and exited unsuccessfully
    #[error("{command} failed ({status}): {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },

    /// The program's stdout was not valid UTF-8
    #[error("{0} produced non-UTF-8 output")]
    NonUtf8Output(String),
}

/// Whether state-changing invocations are actually sent
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ClientMode {
    /// Print what would run, never modify anything
    DryRun,

    /// Full access
    #[default]
    Live,
}

/// A program plus its arguments, built without a shell
///
/// Arguments are passed to the child verbatim, so JSON and plist payloads
/// need no quoting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(program: impl AsRef<Path>) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// File name of the program, for matching in logs and tests
    pub fn program_name(&self) -> &str {
        self.program
            .file_name()
            .and_then(OsStr::to_str)
            .unwrap_or_default()
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Runs external collaborators
///
/// The seam between the engine and the operating system. Production code
/// uses `SystemRunner`; tests substitute a simulated system.
pub trait CommandRunner {
    /// Runs the invocation to completion and returns its stdout
    ///
    /// A non-zero exit status is an error carrying the tool's stderr.
    fn run(&self, invocation: &Invocation) -> Result<String, CommandError>;
}

/// Runs collaborators as real child processes
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }

    fn check_output(invocation: &Invocation, output: Output) -> Result<String, CommandError> {
        if !output.status.success() {
            return Err(CommandError::Failed {
                command: invocation.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        String::from_utf8(output.stdout)
            .map_err(|_| CommandError::NonUtf8Output(invocation.to_string()))
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<String, CommandError> {
        log::debug!("Running: {}", invocation);

        // output() waits for exit and drains both pipes before returning
        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .output()
            .map_err(|source| CommandError::Spawn {
                program: invocation.program.display().to_string(),
                source,
            })?;

        Self::check_output(invocation, output)
    }
}

#[cfg(test)]
mod tests;
