//! Log parsing for nginx access logs.
//!
//! Turns combined-format lines into [`LogEntry`] values. Lines that do not
//! match the grammar are rejected without error; truncated lines are normal
//! in rotated logs.

use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;

use super::types::*;

/// Format of the leading token of a combined-log timestamp: "10/Oct/2000:13:55:36"
pub const TIMESTAMP_FORMAT: &str = "%d/%b/%Y:%H:%M:%S";

/// Compiled regex patterns for log parsing
pub struct LogPatterns {
    /// Match: `IP - - [TIME] "METHOD PATH PROTO" STATUS SIZE "REFERRER" "USER_AGENT"`
    pub combined: Regex,
}

impl LogPatterns {
    pub fn new() -> Self {
        Self {
            combined: Regex::new(
                r#"^(?P<ip>\S+) - - \[(?P<time>[^\]]+)\] "(?P<method>\S+) (?P<path>\S+) (?P<protocol>\S+)" (?P<status>\d+) (?P<size>\d+|-) "(?P<referrer>[^"]*)" "(?P<user_agent>[^"]*)""#
            ).expect("Invalid combined log regex"),
        }
    }
}

/// Global patterns instance
pub static PATTERNS: LazyLock<LogPatterns> = LazyLock::new(LogPatterns::new);

/// Parse a combined-log timestamp as naive local time.
///
/// Only the first whitespace-separated token is used, so the zone offset
/// (`+0000`) is ignored.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let token = raw.split_whitespace().next()?;
    NaiveDateTime::parse_from_str(token, TIMESTAMP_FORMAT).ok()
}

/// Parse one raw line into a [`LogEntry`].
///
/// Returns [`Rejection::Malformed`] when the grammar does not match, the
/// status is outside 100..=599, or a numeric field overflows.
pub fn parse_line(line: &str, source_label: &str) -> Result<LogEntry, Rejection> {
    let caps = PATTERNS
        .combined
        .captures(line.trim())
        .ok_or(Rejection::Malformed)?;
    let field = |name: &str| caps.name(name).map(|m| m.as_str()).unwrap_or("");

    let status: u16 = field("status").parse().map_err(|_| Rejection::Malformed)?;
    if !(100..=599).contains(&status) {
        return Err(Rejection::Malformed);
    }

    let size = match field("size") {
        "-" => None,
        digits => Some(digits.parse::<u64>().map_err(|_| Rejection::Malformed)?),
    };

    let timestamp_raw = field("time").to_string();
    let timestamp = parse_timestamp(&timestamp_raw);

    Ok(LogEntry {
        ip: field("ip").to_string(),
        timestamp_raw,
        timestamp,
        method: field("method").to_string(),
        path: field("path").to_string(),
        protocol: field("protocol").to_string(),
        status,
        size,
        referrer: field("referrer").to_string(),
        user_agent: field("user_agent").to_string(),
        source_label: source_label.to_string(),
    })
}
