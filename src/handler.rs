use std::borrow::Cow;
use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use crate::buffer::{self, Buffer};
use crate::level::Level;
use crate::options::{HandlerOptions, OptionsError, ReplaceAttr};
use crate::record::Record;
use crate::render::Renderer;
use crate::value::{Attr, Value};

/// Key of the built-in time attribute passed to the rewrite callback.
pub const TIME_KEY: &str = "time";
/// Key of the built-in level attribute passed to the rewrite callback.
pub const LEVEL_KEY: &str = "level";
/// Key of the built-in source attribute passed to the rewrite callback.
pub const SOURCE_KEY: &str = "source";
/// Key of the built-in message attribute passed to the rewrite callback.
pub const MESSAGE_KEY: &str = "msg";

/// Error returned by [`Handler::handle`] when the sink rejects a line.
#[derive(thiserror::Error, Debug)]
pub enum HandleError {
    #[error(transparent)]
    Write(#[from] io::Error),
}

/// Terminal stage of a structured logging pipeline.
///
/// A logging facade calls [`Handler::enabled`] before building a record and
/// [`Handler::handle`] with it afterwards. The scoping methods return new
/// handlers and leave the receiver untouched; when there is nothing to add
/// they hand back the receiver itself.
pub trait Handler: Send + Sync {
    fn enabled(&self, level: Level) -> bool;

    fn handle(&self, record: &Record) -> Result<(), HandleError>;

    fn with_attrs(self: Arc<Self>, attrs: &[Attr]) -> Arc<dyn Handler>;

    fn with_group(self: Arc<Self>, name: &str) -> Arc<dyn Handler>;
}

/// State shared by a handler and everything derived from it.
struct Shared {
    sink: Mutex<Box<dyn Write + Send>>,
    options: HandlerOptions,
}

/// Handler that writes one colorized line per record.
///
/// A `TintHandler` is an immutable snapshot. [`TintHandler::with_attrs`] and
/// [`TintHandler::with_group`] build new snapshots that share the sink and
/// options with their parent, so parents and children may be used from
/// different threads at once. Only the sink is locked, and only around the
/// write of a finished line.
#[derive(Clone)]
pub struct TintHandler {
    /// Attributes from `with_attrs`, already rendered.
    attrs_prefix: Arc<[u8]>,
    /// Open groups joined with trailing dots, e.g. `http.req.`.
    group_prefix: Arc<str>,
    groups: Arc<[String]>,
    shared: Arc<Shared>,
}

impl TintHandler {
    /// Creates a handler writing to `sink` with default options.
    pub fn new<W>(sink: W) -> Self
    where
        W: Write + Send + 'static,
    {
        Self::from_parts(sink, HandlerOptions::default())
    }

    /// Creates a handler writing to `sink` with the given options.
    ///
    /// **Returns**
    /// - `Err(OptionsError)` if the options fail [`HandlerOptions::validate`].
    pub fn with_options<W>(sink: W, options: HandlerOptions) -> Result<Self, OptionsError>
    where
        W: Write + Send + 'static,
    {
        options.validate()?;
        Ok(Self::from_parts(sink, options))
    }

    fn from_parts<W>(sink: W, options: HandlerOptions) -> Self
    where
        W: Write + Send + 'static,
    {
        TintHandler {
            attrs_prefix: Arc::from(&b""[..]),
            group_prefix: Arc::from(""),
            groups: Arc::from(Vec::new()),
            shared: Arc::new(Shared {
                sink: Mutex::new(Box::new(sink)),
                options,
            }),
        }
    }

    pub fn options(&self) -> &HandlerOptions {
        &self.shared.options
    }

    /// Names of the groups opened with [`TintHandler::with_group`].
    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    /// True if records at `level` would be written.
    pub fn enabled(&self, level: Level) -> bool {
        level >= self.shared.options.level.level()
    }

    /// Renders `record` and writes it to the sink as a single line.
    ///
    /// Nothing is written when every part of the line was dropped. A failed
    /// write is returned as is.
    pub fn handle(&self, record: &Record) -> Result<(), HandleError> {
        let mut buf = buffer::acquire();
        let r = self.renderer();
        let rep = self.shared.options.replace_attr.as_ref();

        if let Some(ts) = record.timestamp {
            match rep {
                None => {
                    r.append_time(&mut buf, &ts);
                    buf.write_byte(b' ');
                }
                Some(rep) => {
                    if let Some(v) = replace_builtin(rep, TIME_KEY, Value::Time(ts)) {
                        match &v {
                            Value::Time(t) => r.append_time(&mut buf, t),
                            v => r.append_value(&mut buf, v, false),
                        }
                        buf.write_byte(b' ');
                    }
                }
            }
        }

        match rep {
            None => {
                r.append_level(&mut buf, record.level);
                buf.write_byte(b' ');
            }
            Some(rep) => {
                if let Some(v) = replace_builtin(rep, LEVEL_KEY, Value::from(record.level)) {
                    r.append_value(&mut buf, &v, false);
                    buf.write_byte(b' ');
                }
            }
        }

        if self.shared.options.add_source {
            if let Some(src) = record.source.as_ref().filter(|s| !s.file.is_empty()) {
                match rep {
                    None => {
                        r.append_source(&mut buf, src);
                        buf.write_byte(b' ');
                    }
                    Some(rep) => {
                        if let Some(v) = replace_builtin(rep, SOURCE_KEY, Value::from(src.clone())) {
                            r.append_value(&mut buf, &v, false);
                            buf.write_byte(b' ');
                        }
                    }
                }
            }
        }

        match rep {
            None => {
                buf.write_str(&record.message);
                buf.write_byte(b' ');
            }
            Some(rep) => {
                let msg = Value::String(record.message.clone());
                if let Some(v) = replace_builtin(rep, MESSAGE_KEY, msg) {
                    r.append_value(&mut buf, &v, false);
                    buf.write_byte(b' ');
                }
            }
        }

        buf.write_bytes(&self.attrs_prefix);

        if !record.attrs.is_empty() {
            let mut prefix = self.group_prefix.to_string();
            let mut groups = self.groups.to_vec();
            for attr in &record.attrs {
                self.append_attr(&mut buf, attr, &mut prefix, &mut groups);
            }
        }

        if buf.is_empty() {
            return Ok(());
        }
        buf.set_last(b'\n');

        self.write_line(&buf)
    }

    /// Returns a handler that adds `attrs` to every record.
    ///
    /// The attributes are rendered once, here, under the current group.
    pub fn with_attrs(&self, attrs: &[Attr]) -> TintHandler {
        if attrs.is_empty() {
            return self.clone();
        }

        let mut buf = buffer::acquire();
        let mut prefix = self.group_prefix.to_string();
        let mut groups = self.groups.to_vec();
        for attr in attrs {
            self.append_attr(&mut buf, attr, &mut prefix, &mut groups);
        }

        let mut attrs_prefix = Vec::with_capacity(self.attrs_prefix.len() + buf.len());
        attrs_prefix.extend_from_slice(&self.attrs_prefix);
        attrs_prefix.extend_from_slice(buf.as_bytes());

        TintHandler {
            attrs_prefix: Arc::from(attrs_prefix),
            ..self.clone()
        }
    }

    /// Returns a handler that nests subsequent attributes under `name`.
    pub fn with_group(&self, name: &str) -> TintHandler {
        if name.is_empty() {
            return self.clone();
        }

        let mut groups = self.groups.to_vec();
        groups.push(name.to_string());

        TintHandler {
            group_prefix: Arc::from(format!("{}{}.", self.group_prefix, name)),
            groups: Arc::from(groups),
            ..self.clone()
        }
    }

    fn renderer(&self) -> Renderer<'_> {
        Renderer {
            color: !self.shared.options.no_color,
            time_format: &self.shared.options.time_format,
        }
    }

    /// Flattens one attribute into `buf`.
    ///
    /// `prefix` and `groups` describe the enclosing groups; both are restored
    /// before returning.
    fn append_attr(
        &self,
        buf: &mut Buffer,
        attr: &Attr,
        prefix: &mut String,
        groups: &mut Vec<String>,
    ) {
        let mut attr = Cow::Borrowed(attr);
        if attr.value.is_lazy() {
            attr = Cow::Owned(resolved(attr.into_owned()));
        }

        if let Some(rep) = self.shared.options.replace_attr.as_ref() {
            if !matches!(attr.value, Value::Group(_)) {
                attr = Cow::Owned(resolved(rep(groups.as_slice(), attr.into_owned())));
            }
        }

        if attr.is_empty() {
            return;
        }

        let r = self.renderer();
        match &attr.value {
            Value::Group(children) => {
                let nested = !attr.key.is_empty();
                let prefix_len = prefix.len();
                if nested {
                    prefix.push_str(&attr.key);
                    prefix.push('.');
                    groups.push(attr.key.clone());
                }
                for child in children {
                    self.append_attr(buf, child, prefix, groups);
                }
                if nested {
                    prefix.truncate(prefix_len);
                    groups.pop();
                }
            }
            value => {
                match value.as_opaque().and_then(|v| v.as_error()) {
                    Some(err) => r.append_error(buf, err, &attr.key, prefix),
                    None => {
                        r.append_key(buf, &attr.key, prefix);
                        r.append_value(buf, value, true);
                    }
                }
                buf.write_byte(b' ');
            }
        }
    }

    fn write_line(&self, buf: &Buffer) -> Result<(), HandleError> {
        // A panic mid-write leaves at worst a partial line; keep logging.
        let mut sink = self.shared.sink.lock().unwrap_or_else(|e| e.into_inner());
        sink.write_all(buf.as_bytes())?;
        Ok(())
    }
}

const NO_GROUPS: &[String] = &[];

/// Runs a built-in attribute through the rewrite callback. `None` means the
/// callback dropped it.
fn replace_builtin(rep: &ReplaceAttr, key: &str, value: Value) -> Option<Value> {
    let attr = rep(NO_GROUPS, Attr::new(key, value));
    if attr.key.is_empty() {
        None
    } else {
        Some(attr.value.resolve())
    }
}

fn resolved(attr: Attr) -> Attr {
    Attr {
        key: attr.key,
        value: attr.value.resolve(),
    }
}

impl Handler for TintHandler {
    fn enabled(&self, level: Level) -> bool {
        TintHandler::enabled(self, level)
    }

    fn handle(&self, record: &Record) -> Result<(), HandleError> {
        TintHandler::handle(self, record)
    }

    fn with_attrs(self: Arc<Self>, attrs: &[Attr]) -> Arc<dyn Handler> {
        if attrs.is_empty() {
            return self;
        }
        Arc::new(TintHandler::with_attrs(&self, attrs))
    }

    fn with_group(self: Arc<Self>, name: &str) -> Arc<dyn Handler> {
        if name.is_empty() {
            return self;
        }
        Arc::new(TintHandler::with_group(&self, name))
    }
}

impl fmt::Debug for TintHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TintHandler")
            .field("attrs_prefix", &String::from_utf8_lossy(&self.attrs_prefix))
            .field("group_prefix", &self.group_prefix)
            .field("options", &self.shared.options)
            .finish()
    }
}
