//! Environment variable names for configuring a handler from a service's
//! environment.
//!
//! These are helpers only; [`crate::TintHandler::new`] never reads the
//! environment. Values are read once, when the options are built.

use crate::level::Level;
use crate::options::{HandlerOptions, OptionsError};

/// Minimum level, e.g. `debug` or `WARN+2`.
pub const TINT_LEVEL_ENV: &str = "TINT_LEVEL";

/// chrono strftime format of the header timestamp.
pub const TINT_TIME_FORMAT_ENV: &str = "TINT_TIME_FORMAT";

/// `1` or `true` to render the source location.
pub const TINT_ADD_SOURCE_ENV: &str = "TINT_ADD_SOURCE";

/// Any non-empty value disables colors (<https://no-color.org>).
pub const NO_COLOR_ENV: &str = "NO_COLOR";

impl HandlerOptions {
    /// Default options overridden by the process environment.
    pub fn from_env() -> Result<Self, OptionsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Default options overridden by whatever `lookup` returns for the
    /// variables above.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, OptionsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut opts = HandlerOptions::default();

        if let Some(level) = lookup(TINT_LEVEL_ENV) {
            opts = opts.with_level(level.trim().parse::<Level>()?);
        }
        if let Some(format) = lookup(TINT_TIME_FORMAT_ENV).filter(|f| !f.is_empty()) {
            opts = opts.with_time_format(format);
        }
        if let Some(flag) = lookup(TINT_ADD_SOURCE_ENV) {
            opts.add_source = matches!(flag.trim().to_ascii_lowercase().as_str(), "1" | "true");
        }
        if lookup(NO_COLOR_ENV).is_some_and(|v| !v.is_empty()) {
            opts.no_color = true;
        }

        opts.validate()?;
        Ok(opts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| vars.get(k).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let opts = HandlerOptions::from_lookup(lookup(&[])).unwrap();
        assert_eq!(opts.level.level(), Level::INFO);
        assert!(!opts.no_color);
        assert!(!opts.add_source);
    }

    #[test]
    fn overrides() {
        let opts = HandlerOptions::from_lookup(lookup(&[
            (TINT_LEVEL_ENV, "warn+1"),
            (TINT_TIME_FORMAT_ENV, "%H:%M"),
            (TINT_ADD_SOURCE_ENV, "TRUE"),
            (NO_COLOR_ENV, "1"),
        ]))
        .unwrap();
        assert_eq!(opts.level.level(), Level(5));
        assert_eq!(opts.time_format, "%H:%M");
        assert!(opts.add_source);
        assert!(opts.no_color);
    }

    #[test]
    fn empty_no_color_is_ignored() {
        let opts = HandlerOptions::from_lookup(lookup(&[(NO_COLOR_ENV, "")])).unwrap();
        assert!(!opts.no_color);
    }

    #[test]
    fn invalid_values_are_errors() {
        assert!(matches!(
            HandlerOptions::from_lookup(lookup(&[(TINT_LEVEL_ENV, "loud")])),
            Err(OptionsError::InvalidLevel(_))
        ));
        assert!(matches!(
            HandlerOptions::from_lookup(lookup(&[(TINT_TIME_FORMAT_ENV, "%Q")])),
            Err(OptionsError::InvalidTimeFormat(_))
        ));
    }

    #[test]
    fn overflowing_level_is_an_error() {
        assert!(matches!(
            HandlerOptions::from_lookup(lookup(&[(TINT_LEVEL_ENV, "error+2147483647")])),
            Err(OptionsError::InvalidLevel(_))
        ));
    }
}
