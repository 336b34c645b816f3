//! Fuzz target: `parse_line` → `Command::parse`
//!
//! Night scripts are hand-edited; any line must either become a typed
//! command or a `CommandError`, never a panic.
//!
//! cargo fuzz run fuzz_command_line

#![no_main]

use libfuzzer_sys::fuzz_target;
use observatory::app::commands::{Command, parse_line};

fuzz_target!(|data: &[u8]| {
    let Ok(line) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(Some((name, params))) = parse_line(line) {
        if let Ok(command) = Command::parse(&name, &params) {
            assert_eq!(command.name(), name);
        }
    }
});
