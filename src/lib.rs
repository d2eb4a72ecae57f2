//! Colorized, single-line rendering of structured log records.
//!
//! A [`TintHandler`] turns each [`Record`] into one line of the form
//!
//! ```text
//! [TIME ]LEVEL[+DELTA] [SOURCE ]MESSAGE [KEY=VALUE ]...
//! ```
//!
//! and writes it to any [`std::io::Write`] sink in a single locked write.
//! Attribute groups are flattened into dotted keys, errors are highlighted,
//! and ANSI colors can be turned off with [`HandlerOptions::no_color`].
//!
//! ```
//! use tracing_tint::{Attr, HandlerOptions, Level, MemorySink, Record};
//!
//! let sink = MemorySink::new();
//! let handler = HandlerOptions::default()
//!     .with_no_color(true)
//!     .build(sink.clone())
//!     .unwrap()
//!     .with_group("http");
//!
//! let record = Record::new(Level::INFO, "request")
//!     .with_timestamp(None)
//!     .with_attr(Attr::group("req", vec![Attr::new("method", "GET")]));
//! handler.handle(&record).unwrap();
//!
//! assert_eq!(sink.contents(), "INF request http.req.method=GET\n");
//! ```
//!
//! With the `tracing` feature (on by default), [`layer::TintLayer`] and
//! [`init::init_tracing`] put the handler behind the `tracing` macros.

pub mod buffer;
pub mod env;
pub mod handler;
pub mod level;
pub mod options;
pub mod quote;
pub mod record;
mod render;
pub mod sink;
pub mod value;

#[cfg(feature = "tracing")]
pub mod init;
#[cfg(feature = "tracing")]
pub mod layer;

pub use handler::{HandleError, Handler, TintHandler};
pub use level::{Level, LevelVar, Leveler, ParseLevelError};
pub use options::{HandlerOptions, OptionsError, ReplaceAttr, DEFAULT_TIME_FORMAT};
pub use quote::{needs_quoting, quote, unquote, UnquoteError};
pub use record::{Record, Source};
pub use sink::MemorySink;
pub use value::{Attr, ErrorValue, LogValuer, MarshalError, MarshalText, Opaque, Value};
