use chrono::{DateTime, FixedOffset, SecondsFormat};
use std::error::Error;
use std::fmt::Write as _;

use crate::buffer::Buffer;
use crate::level::Level;
use crate::quote::append_string;
use crate::record::Source;
use crate::value::Value;

/// ANSI codes, one per semantic role.
pub(crate) mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const FAINT: &str = "\x1b[2m";
    pub const RESET_FAINT: &str = "\x1b[22m";
    pub const DEBUG: &str = "\x1b[95;2m";
    pub const INFO: &str = "\x1b[92m";
    pub const WARN: &str = "\x1b[93m";
    pub const ERROR: &str = "\x1b[91m";
    pub const ERROR_KEY: &str = "\x1b[91;2m";
}

/// Writes the pieces of a line into a [`Buffer`].
///
/// Holds only borrowed configuration, so one is built per call.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Renderer<'a> {
    pub color: bool,
    pub time_format: &'a str,
}

impl Renderer<'_> {
    /// Header timestamp in the configured format, faint.
    pub fn append_time(&self, buf: &mut Buffer, t: &DateTime<FixedOffset>) {
        buf.write_str_if(self.color, ansi::FAINT);
        // The format string is validated when the handler is built.
        let _ = write!(buf, "{}", t.format(self.time_format));
        buf.write_str_if(self.color, ansi::RESET);
    }

    pub fn append_level(&self, buf: &mut Buffer, level: Level) {
        let (base, delta) = level.bucket();
        let (color, label) = match base {
            Level::DEBUG => (ansi::DEBUG, "DBG"),
            Level::INFO => (ansi::INFO, "INF"),
            Level::WARN => (ansi::WARN, "WRN"),
            _ => (ansi::ERROR, "ERR"),
        };

        buf.write_str_if(self.color, color);
        buf.write_str(label);
        if delta != 0 {
            let _ = write!(buf, "{delta:+}");
        }
        buf.write_str_if(self.color, ansi::RESET);
    }

    pub fn append_source(&self, buf: &mut Buffer, src: &Source) {
        buf.write_str_if(self.color, ansi::FAINT);
        buf.write_str(&src.short_path());
        let _ = write!(buf, ":{}", src.line);
        buf.write_str_if(self.color, ansi::RESET);
    }

    /// `prefix + key` followed by `=`, faint.
    pub fn append_key(&self, buf: &mut Buffer, key: &str, prefix: &str) {
        buf.write_str_if(self.color, ansi::FAINT);
        append_prefixed(buf, prefix, key);
        buf.write_byte(b'=');
        buf.write_str_if(self.color, ansi::RESET);
    }

    /// Error attributes: red faint key, then the message in red.
    pub fn append_error(&self, buf: &mut Buffer, err: &dyn Error, key: &str, prefix: &str) {
        buf.write_str_if(self.color, ansi::ERROR_KEY);
        append_prefixed(buf, prefix, key);
        buf.write_byte(b'=');
        buf.write_str_if(self.color, ansi::RESET_FAINT);
        append_string(buf, &err.to_string(), true);
        buf.write_str_if(self.color, ansi::RESET);
    }

    /// Renders a resolved value. Groups produce no output here; they are
    /// expanded by the caller.
    pub fn append_value(&self, buf: &mut Buffer, v: &Value, quote: bool) {
        match v {
            Value::Nil => buf.write_str("<nil>"),
            Value::String(s) => append_string(buf, s, quote),
            Value::Int64(n) => {
                let _ = write!(buf, "{n}");
            }
            Value::Uint64(n) => {
                let _ = write!(buf, "{n}");
            }
            Value::Float64(f) => append_float(buf, *f),
            Value::Bool(b) => buf.write_str(if *b { "true" } else { "false" }),
            Value::Duration(d) => append_string(buf, &format!("{d:?}"), quote),
            Value::Time(t) => {
                append_string(buf, &t.to_rfc3339_opts(SecondsFormat::AutoSi, true), quote)
            }
            Value::Group(_) => {}
            Value::Any(any) => {
                if let Some(level) = any.as_level() {
                    self.append_level(buf, level);
                } else if let Some(text) = any.marshal_text() {
                    if let Ok(text) = text {
                        append_string(buf, &text, quote);
                    }
                } else if let Some(src) = any.as_source() {
                    self.append_source(buf, src);
                } else {
                    append_string(buf, &format!("{any:?}"), quote);
                }
            }
            Value::Lazy(_) => self.append_value(buf, &v.clone().resolve(), quote),
        }
    }
}

/// Writes `prefix + key`, quoted as one string when needed.
fn append_prefixed(buf: &mut Buffer, prefix: &str, key: &str) {
    if prefix.is_empty() {
        append_string(buf, key, true);
    } else {
        let mut full = String::with_capacity(prefix.len() + key.len());
        full.push_str(prefix);
        full.push_str(key);
        append_string(buf, &full, true);
    }
}

/// Shortest text that parses back to `f`, switching to exponent form for
/// very small and very large magnitudes.
fn append_float(buf: &mut Buffer, f: f64) {
    if f.is_nan() {
        buf.write_str("NaN");
    } else if f.is_infinite() {
        buf.write_str(if f > 0.0 { "+Inf" } else { "-Inf" });
    } else {
        let abs = f.abs();
        let _ = if abs != 0.0 && !(1e-4..1e21).contains(&abs) {
            write!(buf, "{f:e}")
        } else {
            write!(buf, "{f}")
        };
    }
}
