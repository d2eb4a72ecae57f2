use chrono::{DateTime, FixedOffset};
use std::error::Error;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use crate::level::Level;
use crate::record::Source;

/// Maximum number of [`LogValuer`] hops followed by [`Value::resolve`].
const MAX_RESOLVE_DEPTH: usize = 100;

/// A single key/value pair, or a group of them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Attr {
    pub key: String,
    pub value: Value,
}

impl Attr {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Attr {
            key: key.into(),
            value: value.into(),
        }
    }

    /// A nested group; an empty `key` inlines the children at the current
    /// nesting level.
    pub fn group(key: impl Into<String>, attrs: Vec<Attr>) -> Self {
        Attr {
            key: key.into(),
            value: Value::Group(attrs),
        }
    }

    /// An attribute whose value is rendered on the error path.
    pub fn error<E>(key: impl Into<String>, err: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Attr {
            key: key.into(),
            value: Value::error(err),
        }
    }

    /// The sentinel a rewrite callback returns to drop an attribute.
    pub fn empty() -> Self {
        Attr::default()
    }

    /// True for the sentinel: no key and the zero value.
    pub fn is_empty(&self) -> bool {
        self.key.is_empty() && matches!(self.value, Value::Nil)
    }
}

/// Typed attribute value.
///
/// [`Value::Lazy`] is the only deferred state; every other variant is
/// already resolved.
#[derive(Clone, Default)]
pub enum Value {
    /// The zero value.
    #[default]
    Nil,
    String(String),
    Int64(i64),
    Uint64(u64),
    Float64(f64),
    Bool(bool),
    Duration(Duration),
    Time(DateTime<FixedOffset>),
    Group(Vec<Attr>),
    Any(Arc<dyn Opaque>),
    Lazy(Arc<dyn LogValuer>),
}

impl Value {
    /// Wraps any opaque value.
    pub fn any<T: Opaque + 'static>(v: T) -> Self {
        Value::Any(Arc::new(v))
    }

    /// Wraps an error so it is rendered on the error path.
    pub fn error<E>(err: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Value::Any(Arc::new(ErrorValue::new(err)))
    }

    /// Wraps a value that knows how to marshal itself to text.
    pub fn text<T: MarshalText + fmt::Debug + 'static>(v: T) -> Self {
        Value::Any(Arc::new(TextValue(v)))
    }

    /// Defers computing the value until it is rendered.
    pub fn lazy<L: LogValuer + 'static>(v: L) -> Self {
        Value::Lazy(Arc::new(v))
    }

    pub fn is_lazy(&self) -> bool {
        matches!(self, Value::Lazy(_))
    }

    /// Follows deferred values until a resolved one is reached.
    ///
    /// Resolved values are returned as is, so calling this twice is harmless.
    /// A chain longer than 100 hops, or a valuer that panics, resolves to an
    /// error value describing the problem.
    pub fn resolve(self) -> Value {
        let mut v = self;
        for _ in 0..MAX_RESOLVE_DEPTH {
            let valuer = match v {
                Value::Lazy(valuer) => valuer,
                resolved => return resolved,
            };
            v = match panic::catch_unwind(AssertUnwindSafe(|| valuer.log_value())) {
                Ok(next) => next,
                Err(payload) => {
                    let msg = payload
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| payload.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    return Value::error(ResolveError::Panicked(msg));
                }
            };
        }
        match v {
            Value::Lazy(_) => Value::error(ResolveError::TooDeep(MAX_RESOLVE_DEPTH)),
            v => v,
        }
    }

    /// The opaque payload, if this is an [`Value::Any`].
    pub fn as_opaque(&self) -> Option<&dyn Opaque> {
        match self {
            Value::Any(v) => Some(v.as_ref()),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("Nil"),
            Value::String(s) => f.debug_tuple("String").field(s).finish(),
            Value::Int64(n) => f.debug_tuple("Int64").field(n).finish(),
            Value::Uint64(n) => f.debug_tuple("Uint64").field(n).finish(),
            Value::Float64(n) => f.debug_tuple("Float64").field(n).finish(),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Duration(d) => f.debug_tuple("Duration").field(d).finish(),
            Value::Time(t) => f.debug_tuple("Time").field(t).finish(),
            Value::Group(attrs) => f.debug_tuple("Group").field(attrs).finish(),
            Value::Any(v) => f.debug_tuple("Any").field(v).finish(),
            Value::Lazy(_) => f.write_str("Lazy(..)"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::Uint64(a), Value::Uint64(b)) => a == b,
            (Value::Float64(a), Value::Float64(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Duration(a), Value::Duration(b)) => a == b,
            (Value::Time(a), Value::Time(b)) => a == b,
            (Value::Group(a), Value::Group(b)) => a == b,
            (Value::Any(a), Value::Any(b)) => Arc::ptr_eq(a, b),
            (Value::Lazy(a), Value::Lazy(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

macro_rules! impl_from {
    ($($t:ty => $variant:ident as $conv:ty),* $(,)?) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::$variant(v as $conv)
                }
            }
        )*
    };
}

impl_from! {
    i8 => Int64 as i64,
    i16 => Int64 as i64,
    i32 => Int64 as i64,
    i64 => Int64 as i64,
    isize => Int64 as i64,
    u8 => Uint64 as u64,
    u16 => Uint64 as u64,
    u32 => Uint64 as u64,
    u64 => Uint64 as u64,
    usize => Uint64 as u64,
    f32 => Float64 as f64,
    f64 => Float64 as f64,
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Duration> for Value {
    fn from(v: Duration) -> Self {
        Value::Duration(v)
    }
}

impl<Tz: chrono::TimeZone> From<DateTime<Tz>> for Value {
    fn from(v: DateTime<Tz>) -> Self {
        Value::Time(v.fixed_offset())
    }
}

impl From<Level> for Value {
    fn from(v: Level) -> Self {
        Value::any(v)
    }
}

impl From<Source> for Value {
    fn from(v: Source) -> Self {
        Value::any(v)
    }
}

impl From<Vec<Attr>> for Value {
    fn from(v: Vec<Attr>) -> Self {
        Value::Group(v)
    }
}

/// A value of unspecified type inspected at render time.
///
/// Each method probes one capability. The renderer checks them in a fixed
/// order: level, text marshaling, source location, and otherwise falls back
/// to the `Debug` dump. The error probe is consulted separately when the
/// value is an attribute, before any of the others.
pub trait Opaque: fmt::Debug + Send + Sync {
    fn as_level(&self) -> Option<Level> {
        None
    }

    /// `None` when the value cannot marshal itself to text.
    fn marshal_text(&self) -> Option<Result<String, MarshalError>> {
        None
    }

    fn as_source(&self) -> Option<&Source> {
        None
    }

    fn as_error(&self) -> Option<&(dyn Error + 'static)> {
        None
    }
}

impl Opaque for Level {
    fn as_level(&self) -> Option<Level> {
        Some(*self)
    }
}

impl Opaque for Source {
    fn as_source(&self) -> Option<&Source> {
        Some(self)
    }
}

/// Failure reported by a [`MarshalText`] implementation.
pub type MarshalError = Box<dyn Error + Send + Sync>;

/// Types with a canonical textual encoding.
pub trait MarshalText: Send + Sync {
    fn marshal_text(&self) -> Result<String, MarshalError>;
}

struct TextValue<T>(T);

impl<T: fmt::Debug> fmt::Debug for TextValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<T: MarshalText + fmt::Debug> Opaque for TextValue<T> {
    fn marshal_text(&self) -> Option<Result<String, MarshalError>> {
        Some(self.0.marshal_text())
    }
}

/// An error carried as an attribute value.
///
/// Its `Debug` output is the error's message, so it reads the same wherever
/// it falls through to the generic dump.
pub struct ErrorValue(Box<dyn Error + Send + Sync>);

impl ErrorValue {
    pub fn new<E: Error + Send + Sync + 'static>(err: E) -> Self {
        ErrorValue(Box::new(err))
    }
}

impl fmt::Debug for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl Opaque for ErrorValue {
    fn as_error(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.0.as_ref())
    }
}

/// A value computed only when the record is rendered.
pub trait LogValuer: Send + Sync {
    fn log_value(&self) -> Value;
}

impl<F> LogValuer for F
where
    F: Fn() -> Value + Send + Sync,
{
    fn log_value(&self) -> Value {
        self()
    }
}

#[derive(thiserror::Error, Debug)]
enum ResolveError {
    #[error("log value resolution exceeded {0} steps")]
    TooDeep(usize),
    #[error("log value panicked: {0}")]
    Panicked(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Forever;

    impl LogValuer for Forever {
        fn log_value(&self) -> Value {
            Value::lazy(Forever)
        }
    }

    #[test]
    fn resolve_is_idempotent_on_resolved_values() {
        let v = Value::from("x").resolve().resolve();
        assert_eq!(v, Value::String("x".into()));
    }

    #[test]
    fn resolve_follows_chain() {
        let v = Value::lazy(|| Value::lazy(|| Value::from(7_i64)));
        assert!(v.is_lazy());
        assert_eq!(v.resolve(), Value::Int64(7));
    }

    #[test]
    fn resolve_bounds_infinite_chain() {
        let v = Value::lazy(Forever).resolve();
        let err = v.as_opaque().and_then(|o| o.as_error()).map(|e| e.to_string());
        assert_eq!(err.as_deref(), Some("log value resolution exceeded 100 steps"));
    }

    #[test]
    fn resolve_catches_panics() {
        let v = Value::lazy(|| -> Value { panic!("boom") }).resolve();
        let err = v.as_opaque().and_then(|o| o.as_error()).map(|e| e.to_string());
        assert_eq!(err.as_deref(), Some("log value panicked: boom"));
    }

    #[test]
    fn empty_sentinel() {
        assert!(Attr::empty().is_empty());
        assert!(!Attr::new("", "").is_empty());
        assert!(!Attr::new("k", Value::Nil).is_empty());
    }

    #[test]
    fn conversions() {
        assert_eq!(Value::from(3_u8), Value::Uint64(3));
        assert_eq!(Value::from(-3_i32), Value::Int64(-3));
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from(Duration::from_millis(5)), Value::Duration(Duration::from_millis(5)));
    }
}
