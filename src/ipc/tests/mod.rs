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

//! IPC module tests
//!
//! Contains test suites for external tool invocation.
//! `SystemRunner` tests spawn `/bin/sh` and are limited to Unix.

use crate::{
    config::settings::Tools,
    core::{
        keys::code_of,
        parser::ParseError,
        types::{DeviceId, MappingTable},
    },
    ipc::{
        hidutil::{list_keyboards, HelperError, HidutilClient, ListError},
        ClientMode, CommandError, CommandRunner, Invocation, SystemRunner,
    },
    testing::FakeSystem,
};

/// Helper: Table with caps lock mapped to left control
fn caps_to_control() -> MappingTable {
    let mut table = MappingTable::new();
    table.insert(code_of("caps_lock").unwrap(), code_of("left_control").unwrap());
    table
}

#[test]
fn test_invocation_display() {
    let cmd = Invocation::new("/usr/bin/defaults")
        .args(["-currentHost", "export"])
        .arg("-g");

    assert_eq!(cmd.to_string(), "/usr/bin/defaults -currentHost export -g");
    assert_eq!(cmd.program_name(), "defaults");
}

#[test]
fn test_default_mode_is_live() {
    assert_eq!(ClientMode::default(), ClientMode::Live);
}

#[cfg(unix)]
#[test]
fn test_system_runner_returns_stdout() {
    let runner = SystemRunner::new();
    let cmd = Invocation::new("/bin/sh").args(["-c", "echo Devices:"]);

    assert_eq!(runner.run(&cmd).unwrap(), "Devices:\n");
}

#[cfg(unix)]
#[test]
fn test_system_runner_reports_exit_failure() {
    let runner = SystemRunner::new();
    let cmd = Invocation::new("/bin/sh").args(["-c", "echo 'no such domain' >&2; exit 3"]);

    match runner.run(&cmd) {
        Err(CommandError::Failed { stderr, .. }) => assert_eq!(stderr, "no such domain"),
        other => panic!("Expected Failed, got {:?}", other),
    }
}

#[test]
fn test_system_runner_reports_missing_program() {
    let runner = SystemRunner::new();
    let cmd = Invocation::new("/nonexistent/hidtool_modified").arg("property");

    match runner.run(&cmd) {
        Err(CommandError::Spawn { program, .. }) => {
            assert_eq!(program, "/nonexistent/hidtool_modified")
        }
        other => panic!("Expected Spawn, got {:?}", other),
    }
}

#[test]
fn test_list_keyboards_invokes_hidutil() {
    let system = FakeSystem::new();

    let keyboards = list_keyboards(&system, &Tools::default()).unwrap();

    assert!(keyboards.contains(&DeviceId::new(0x5AC, 0x27E)));
    assert_eq!(
        system.invocations(),
        vec![Invocation::new("hidutil").args(["list", "-m", "keyboard"])]
    );
}

#[test]
fn test_list_keyboards_propagates_parse_errors() {
    let system = FakeSystem::new().with_listing("Services:\n");

    assert!(matches!(
        list_keyboards(&system, &Tools::default()),
        Err(ListError::Parse(ParseError::MissingMarker))
    ));
}

#[test]
fn test_list_keyboards_propagates_tool_failure() {
    let system = FakeSystem::new().failing("hidutil");

    assert!(matches!(
        list_keyboards(&system, &Tools::default()),
        Err(ListError::Command(CommandError::Failed { .. }))
    ));
}

#[test]
fn test_helper_command_carries_full_table() {
    let system = FakeSystem::new();
    let client = HidutilClient::new(&system, "hidtool_modified", ClientMode::Live);

    let cmd = client
        .build_command(DeviceId::new(0x5AC, 0x27E), &caps_to_control())
        .unwrap();

    assert_eq!(cmd.args.len(), 5);
    assert_eq!(cmd.args[1], "-m");
    assert_eq!(cmd.args[2], r#"{"VendorID":1452,"ProductID":638}"#);
    assert_eq!(cmd.args[3], "-s");

    let payload: serde_json::Value = serde_json::from_str(&cmd.args[4]).unwrap();
    let pairs = payload["HIDKeyboardModifierMappingPairs"].as_array().unwrap();
    assert_eq!(pairs.len(), 1);
    assert_eq!(
        pairs[0]["HIDKeyboardModifierMappingSrc"].as_u64(),
        Some(code_of("caps_lock").unwrap().raw())
    );
}

#[test]
fn test_dryrun_helper_never_runs() {
    let system = FakeSystem::new();
    let client = HidutilClient::new(&system, "hidtool_modified", ClientMode::DryRun);

    client
        .apply_mappings(DeviceId::new(0x5AC, 0x27E), &caps_to_control())
        .unwrap();

    assert!(system.invocations().is_empty(), "DryRun must not invoke the helper");
}

#[test]
fn test_live_helper_runs_once() {
    let system = FakeSystem::new();
    let client = HidutilClient::new(&system, "hidtool_modified", ClientMode::Live);

    client
        .apply_mappings(DeviceId::new(0x5AC, 0x27E), &caps_to_control())
        .unwrap();

    assert_eq!(system.invocations_of("hidtool_modified").len(), 1);
}

#[test]
fn test_live_helper_failure_is_reported() {
    let system = FakeSystem::new().failing("hidtool_modified");
    let client = HidutilClient::new(&system, "hidtool_modified", ClientMode::Live);

    let result = client.apply_mappings(DeviceId::new(0x5AC, 0x27E), &caps_to_control());
    assert!(matches!(result, Err(HelperError::Command(_))));
}
