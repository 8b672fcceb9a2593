//! Model — input entries, assembled messages and severity levels.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::pattern::{check_level_at, skip_log_prefix};

/// Coarse severity tag attached to every entry by the upstream reader.
///
/// The collector never inspects it; it is carried from the first line of a
/// message onto the emitted [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    #[default]
    Unknown,
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Unknown => "unknown",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Error => "error",
            Level::Critical => "critical",
        }
    }

    /// Best-effort level guess from a raw line, scanning past timestamp prefixes.
    /// Returns `Unknown` when no level keyword opens the line.
    pub fn from_line(line: &str) -> Level {
        let content = line.as_bytes();
        let table: &[(&[u8], Level)] = &[
            (b"CRITICAL", Level::Critical),
            (b"critical", Level::Critical),
            (b"FATAL", Level::Critical),
            (b"fatal", Level::Critical),
            (b"PANIC", Level::Critical),
            (b"ERROR", Level::Error),
            (b"error", Level::Error),
            (b"WARNING", Level::Warning),
            (b"warning", Level::Warning),
            (b"WARN", Level::Warning),
            (b"warn", Level::Warning),
            (b"INFO", Level::Info),
            (b"info", Level::Info),
            (b"NOTICE", Level::Info),
            (b"DEBUG", Level::Debug),
            (b"debug", Level::Debug),
            (b"TRACE", Level::Debug),
            (b"trace", Level::Debug),
        ];

        let mut offsets = vec![0];
        let skipped = skip_log_prefix(content);
        if skipped > 0 && skipped < content.len() {
            offsets.push(skipped);
            if content[skipped] == b'[' {
                offsets.push(skipped + 1);
            }
        }

        for pos in offsets {
            for (keyword, level) in table {
                if check_level_at(content, pos, &[*keyword]) {
                    return *level;
                }
            }
        }

        // glog: "I0215 12:33:07.230967 ..."
        if content.len() > 5 && content[1..5].iter().all(u8::is_ascii_digit) {
            return match content[0] {
                b'I' => Level::Info,
                b'W' => Level::Warning,
                b'E' => Level::Error,
                b'F' => Level::Critical,
                _ => Level::Unknown,
            };
        }

        Level::Unknown
    }
}

/// One raw line as delivered by the upstream reader, without its terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub content: String,
    pub level: Level,
}

impl LogEntry {
    pub fn new(timestamp: DateTime<Utc>, content: impl Into<String>, level: Level) -> Self {
        Self {
            timestamp,
            content: content.into(),
            level,
        }
    }
}

/// One assembled logical record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    /// Timestamp of the first entry folded into the message.
    pub timestamp: DateTime<Utc>,
    /// Constituent lines joined by `\n`, capped at the configured byte limit.
    pub content: String,
    /// Level of the first entry folded into the message.
    pub level: Level,
    /// Number of entries folded in, including those dropped after truncation.
    pub line_count: usize,
    pub truncated: bool,
}
