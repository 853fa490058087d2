//! Parsing of the handle enumeration tool's text output.
//!
//! Each interesting line has the shape
//! `<name> pid: <pid> type: <type> <user> <handle>: <path>`, for example
//! `notepad.exe  pid: 100  type: File  DESKTOP\bob  1A4: C:\tmp\locked\file.txt`.
//! The user column is missing for handles the tool cannot attribute to an account.

use std::collections::HashSet;
use std::sync::OnceLock;

use core_types::LockingProcessInfo;
use regex::Regex;

fn handle_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^\s*(?P<name>.+?)\s+pid:\s*(?P<pid>\d+)\s+type:\s*(?P<type>\S+)\s+(?:(?P<user>.+?)\s+)??(?P<kind>[0-9A-Fa-f]+):\s*(?P<path>.+?)\s*$",
        )
        .unwrap()
    })
}

/// Parses one output line. Lines that do not follow the grammar yield `None`.
pub fn parse_handle_line(line: &str) -> Option<LockingProcessInfo> {
    let captures = handle_line_regex().captures(line)?;
    let process_id = captures["pid"].parse().ok()?;

    Some(LockingProcessInfo {
        process_id,
        executable_name: captures["name"].to_string(),
        handle_type: captures["type"].to_string(),
        owner_user: captures
            .name("user")
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default(),
        locked_path: captures["path"].to_string(),
        ..Default::default()
    })
}

/// Parses the whole output, skipping banners, blank lines and "No matching handles" notices.
pub fn parse_handle_output(output: &str) -> Vec<LockingProcessInfo> {
    output.lines().filter_map(parse_handle_line).collect()
}

/// Keeps the first record of every executable name, compared case-insensitively.
pub fn dedupe_by_executable(records: Vec<LockingProcessInfo>) -> Vec<LockingProcessInfo> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| seen.insert(record.executable_name.to_lowercase()))
        .collect()
}
