use chrono::{DateTime, Utc};
use std::fmt;

use crate::level::Level;

/// Source location that produced a log entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caller {
    pub file: Option<String>,
    pub line: Option<u32>,
}

impl Caller {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Caller { file: Some(file.into()), line: Some(line) }
    }

    /// Final directory and file name plus line, e.g. `src/core.rs:42`.
    /// Returns `"undefined"` when no file is known.
    pub fn trimmed_path(&self) -> String {
        let file = match &self.file {
            Some(f) => f.as_str(),
            None => return "undefined".to_string(),
        };

        let trimmed = match file.rfind('/') {
            Some(last) => match file[..last].rfind('/') {
                Some(prev) => &file[prev + 1..],
                None => file,
            },
            None => file,
        };

        match self.line {
            Some(line) => format!("{}:{}", trimmed, line),
            None => trimmed.to_string(),
        }
    }
}

impl fmt::Display for Caller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.trimmed_path())
    }
}

/// Metadata of a single log call, consumed read-only by the notification
/// builder.
#[derive(Debug, Clone)]
pub struct Entry {
    pub level: Level,
    pub time: DateTime<Utc>,
    pub message: String,
    pub caller: Caller,
    /// Captured stack trace text, if any.
    pub stack: Option<String>,
}

impl Entry {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Entry {
            level,
            time: Utc::now(),
            message: message.into(),
            caller: Caller::default(),
            stack: None,
        }
    }

    pub fn with_caller(mut self, caller: Caller) -> Self {
        self.caller = caller;
        self
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    pub fn with_time(mut self, time: DateTime<Utc>) -> Self {
        self.time = time;
        self
    }
}
