use chrono::{DateTime, FixedOffset, Local};
use serde::Serialize;
use std::path::Path;

use crate::level::Level;
use crate::value::Attr;

/// One structured log event handed to a handler.
///
/// The handler only borrows the record for the duration of `handle`.
#[derive(Debug, Clone)]
pub struct Record {
    /// `None` omits the time from the rendered line.
    pub timestamp: Option<DateTime<FixedOffset>>,
    pub level: Level,
    pub message: String,
    pub attrs: Vec<Attr>,
    pub source: Option<Source>,
}

impl Record {
    /// A record stamped with the current local time.
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Record {
            timestamp: Some(Local::now().fixed_offset()),
            level,
            message: message.into(),
            attrs: Vec::new(),
            source: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: Option<DateTime<FixedOffset>>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_attr(mut self, attr: Attr) -> Self {
        self.attrs.push(attr);
        self
    }

    pub fn with_attrs(mut self, attrs: impl IntoIterator<Item = Attr>) -> Self {
        self.attrs.extend(attrs);
        self
    }

    pub fn with_source(mut self, source: Source) -> Self {
        self.source = Some(source);
        self
    }

    /// Records the caller's file and line as the source location.
    #[track_caller]
    pub fn with_caller(self) -> Self {
        let loc = std::panic::Location::caller();
        self.with_source(Source::new(loc.file(), loc.line()))
    }
}

/// Location in the program that produced a record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Source {
    pub function: Option<String>,
    pub file: String,
    pub line: u32,
}

impl Source {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Source {
            function: None,
            file: file.into(),
            line,
        }
    }

    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.function = Some(function.into());
        self
    }

    /// `dir/file` made of the file name and its parent directory only.
    pub fn short_path(&self) -> String {
        let path = Path::new(&self.file);
        let file = path.file_name().map(|f| f.to_string_lossy());
        let dir = path
            .parent()
            .and_then(|p| p.file_name())
            .map(|d| d.to_string_lossy());

        match (dir, file) {
            (Some(dir), Some(file)) => format!("{dir}/{file}"),
            (None, Some(file)) => file.into_owned(),
            _ => self.file.clone(),
        }
    }
}
