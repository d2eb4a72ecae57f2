use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicI32, Ordering};

/// Severity of a log record.
///
/// Levels are plain integers so callers can define their own in between the
/// named ones. The named levels are four apart; the gaps are rendered as a
/// signed delta from the enclosing bucket, e.g. `INF+2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Level(pub i32);

impl Level {
    pub const DEBUG: Level = Level(-4);
    pub const INFO: Level = Level(0);
    pub const WARN: Level = Level(4);
    pub const ERROR: Level = Level(8);

    /// Returns the level `delta` steps away from `self`, clamped to the
    /// `i32` range.
    #[must_use]
    pub const fn offset(self, delta: i32) -> Level {
        Level(self.0.saturating_add(delta))
    }

    /// Named bucket this level falls into and its distance from that bucket.
    pub(crate) fn bucket(self) -> (Level, i32) {
        let base = if self < Level::INFO {
            Level::DEBUG
        } else if self < Level::WARN {
            Level::INFO
        } else if self < Level::ERROR {
            Level::WARN
        } else {
            Level::ERROR
        };
        (base, self.0 - base.0)
    }

    fn name(self) -> &'static str {
        match self {
            Level::DEBUG => "DEBUG",
            Level::INFO => "INFO",
            Level::WARN => "WARN",
            _ => "ERROR",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (base, delta) = self.bucket();
        if delta == 0 {
            f.write_str(base.name())
        } else {
            write!(f, "{}{:+}", base.name(), delta)
        }
    }
}

/// Error returned when a string names no level.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid level: {0:?}")]
pub struct ParseLevelError(String);

impl FromStr for Level {
    type Err = ParseLevelError;

    /// Parses `DEBUG`, `info`, `WARN+2`, `error-1` and the like.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseLevelError(s.to_string());

        let (name, delta) = match s.find(['+', '-']) {
            Some(i) => {
                let delta: i32 = s[i..].parse().map_err(|_| err())?;
                (&s[..i], delta)
            }
            None => (s, 0),
        };

        let base = match name.to_ascii_uppercase().as_str() {
            "DEBUG" => Level::DEBUG,
            "INFO" => Level::INFO,
            "WARN" => Level::WARN,
            "ERROR" => Level::ERROR,
            _ => return Err(err()),
        };
        base.0.checked_add(delta).map(Level).ok_or_else(err)
    }
}

impl Serialize for Level {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Level {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Source of the minimum enabled level.
///
/// Implemented by [`Level`] for a fixed threshold and by [`LevelVar`] for one
/// that can be changed while handlers are in use.
pub trait Leveler: Send + Sync {
    fn level(&self) -> Level;
}

impl Leveler for Level {
    fn level(&self) -> Level {
        *self
    }
}

/// A level that may be changed concurrently with logging.
#[derive(Debug, Default)]
pub struct LevelVar(AtomicI32);

impl LevelVar {
    pub fn new(level: Level) -> Self {
        LevelVar(AtomicI32::new(level.0))
    }

    pub fn set(&self, level: Level) {
        self.0.store(level.0, Ordering::Relaxed);
    }
}

impl Leveler for LevelVar {
    fn level(&self) -> Level {
        Level(self.0.load(Ordering::Relaxed))
    }
}
