use chrono::format::{Item, StrftimeItems};
use std::fmt;
use std::io::Write;
use std::sync::Arc;

use crate::handler::TintHandler;
use crate::level::{Level, Leveler, ParseLevelError};
use crate::value::Attr;

/// Millisecond-precision stamp, e.g. `Mar  1 12:30:00.000`.
pub const DEFAULT_TIME_FORMAT: &str = "%b %e %H:%M:%S%.3f";

/// Callback that may rewrite or drop any non-group attribute.
///
/// It receives the names of the enclosing groups (outermost first) and the
/// attribute. Returning [`Attr::empty`] drops a regular attribute; returning
/// any attribute with an empty key drops the built-in time, level, source or
/// message attribute.
pub type ReplaceAttr = Arc<dyn Fn(&[String], Attr) -> Attr + Send + Sync>;

/// Configuration for a [`TintHandler`].
///
/// **Fields**
/// - `add_source`: render `dir/file:line` of the record's source location.
/// - `level`: minimum level to log. May be a [`crate::LevelVar`] for a
///   threshold adjusted at runtime.
/// - `replace_attr`: optional [`ReplaceAttr`] callback.
/// - `time_format`: chrono strftime format of the header timestamp.
/// - `no_color`: omit all ANSI escape codes.
#[derive(Clone)]
pub struct HandlerOptions {
    pub add_source: bool,
    pub level: Arc<dyn Leveler>,
    pub replace_attr: Option<ReplaceAttr>,
    pub time_format: String,
    pub no_color: bool,
}

impl Default for HandlerOptions {
    fn default() -> Self {
        Self {
            add_source: false,
            level: Arc::new(Level::INFO),
            replace_attr: None,
            time_format: DEFAULT_TIME_FORMAT.to_string(),
            no_color: false,
        }
    }
}

impl fmt::Debug for HandlerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerOptions")
            .field("add_source", &self.add_source)
            .field("level", &self.level.level())
            .field("replace_attr", &self.replace_attr.is_some())
            .field("time_format", &self.time_format)
            .field("no_color", &self.no_color)
            .finish()
    }
}

impl HandlerOptions {
    pub fn with_add_source(mut self, add_source: bool) -> Self {
        self.add_source = add_source;
        self
    }

    pub fn with_level<L: Leveler + 'static>(mut self, level: L) -> Self {
        self.level = Arc::new(level);
        self
    }

    /// Shares an existing leveler, typically a [`crate::LevelVar`].
    pub fn with_shared_level(mut self, level: Arc<dyn Leveler>) -> Self {
        self.level = level;
        self
    }

    pub fn with_replace_attr<F>(mut self, f: F) -> Self
    where
        F: Fn(&[String], Attr) -> Attr + Send + Sync + 'static,
    {
        self.replace_attr = Some(Arc::new(f));
        self
    }

    pub fn with_time_format(mut self, format: impl Into<String>) -> Self {
        self.time_format = format.into();
        self
    }

    pub fn with_no_color(mut self, no_color: bool) -> Self {
        self.no_color = no_color;
        self
    }

    /// Checks the options without building a handler.
    ///
    /// **Returns**
    /// - `Err(OptionsError::InvalidTimeFormat)` if `time_format` contains
    ///   an unknown strftime specifier.
    pub fn validate(&self) -> Result<(), OptionsError> {
        if StrftimeItems::new(&self.time_format).any(|item| matches!(item, Item::Error)) {
            return Err(OptionsError::InvalidTimeFormat(self.time_format.clone()));
        }
        Ok(())
    }

    /// Builds a handler writing to `sink`.
    pub fn build<W>(self, sink: W) -> Result<TintHandler, OptionsError>
    where
        W: Write + Send + 'static,
    {
        TintHandler::with_options(sink, self)
    }
}

/// Error returned when handler options are unusable.
#[derive(thiserror::Error, Debug)]
pub enum OptionsError {
    #[error("invalid time format: {0:?}")]
    InvalidTimeFormat(String),

    #[error(transparent)]
    InvalidLevel(#[from] ParseLevelError),
}
