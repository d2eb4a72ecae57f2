use chrono::Local;
use std::error::Error;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::span;
use tracing::subscriber::Interest;
use tracing::{Event, Metadata, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

use crate::handler::Handler;
use crate::init::LayerConfig;
use crate::level::Level;
use crate::record::{Record, Source};
use crate::value::{Attr, Value};

/// `tracing_subscriber` layer that renders every enabled event through a
/// [`Handler`].
///
/// Event fields become attributes in the order they were declared and the
/// `message` field becomes the record message. Fields recorded on the
/// enclosing spans are added as one group per span, named after the span,
/// outermost first.
pub struct TintLayer {
    handler: Arc<dyn Handler>,
    config: LayerConfig,
    /// Events handed to the handler.
    pub total_events: Arc<AtomicU64>,
    /// Events whose line could not be written.
    pub failed_writes: Arc<AtomicU64>,
}

impl TintLayer {
    pub fn new<H: Handler + 'static>(handler: H) -> Self {
        Self::with_config(handler, LayerConfig::default())
    }

    pub fn with_config<H: Handler + 'static>(handler: H, config: LayerConfig) -> Self {
        Self::from_arc(Arc::new(handler), config)
    }

    /// Wraps an already shared handler, e.g. one derived with `with_attrs`.
    pub fn from_arc(handler: Arc<dyn Handler>, config: LayerConfig) -> Self {
        Self {
            handler,
            config,
            total_events: Arc::new(AtomicU64::new(0)),
            failed_writes: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl fmt::Debug for TintLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TintLayer")
            .field("config", &self.config)
            .field("total_events", &self.total_events)
            .field("failed_writes", &self.failed_writes)
            .finish()
    }
}

/// Maps `tracing` levels onto the numeric scale. `TRACE` sits one bucket
/// below `DEBUG` and renders as `DBG-4`.
pub fn level_from_tracing(level: &tracing::Level) -> Level {
    match *level {
        tracing::Level::TRACE => Level::DEBUG.offset(-4),
        tracing::Level::DEBUG => Level::DEBUG,
        tracing::Level::INFO => Level::INFO,
        tracing::Level::WARN => Level::WARN,
        _ => Level::ERROR,
    }
}

/// Fields recorded on a span, stored in its extensions.
struct SpanFields(Vec<Attr>);

impl<S> Layer<S> for TintLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn register_callsite(&self, _metadata: &'static Metadata<'static>) -> Interest {
        // The minimum level may be a `LevelVar`, so never cache the answer.
        Interest::sometimes()
    }

    fn enabled(&self, metadata: &Metadata<'_>, _ctx: Context<'_, S>) -> bool {
        !metadata.is_event() || self.handler.enabled(level_from_tracing(metadata.level()))
    }

    fn on_new_span(&self, attrs: &span::Attributes<'_>, id: &span::Id, ctx: Context<'_, S>) {
        if !self.config.span_fields {
            return;
        }
        let Some(span) = ctx.span(id) else { return };

        let mut visitor = FieldVisitor::default();
        attrs.record(&mut visitor);
        span.extensions_mut().insert(SpanFields(visitor.into_attrs()));
    }

    fn on_record(&self, id: &span::Id, values: &span::Record<'_>, ctx: Context<'_, S>) {
        if !self.config.span_fields {
            return;
        }
        let Some(span) = ctx.span(id) else { return };

        let mut visitor = FieldVisitor::default();
        values.record(&mut visitor);
        let mut extensions = span.extensions_mut();
        match extensions.get_mut::<SpanFields>() {
            Some(fields) => fields.0.extend(visitor.into_attrs()),
            None => extensions.insert(SpanFields(visitor.into_attrs())),
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let meta = event.metadata();
        let level = level_from_tracing(meta.level());
        if !self.handler.enabled(level) {
            return;
        }
        self.total_events.fetch_add(1, Ordering::Relaxed);

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let mut attrs = Vec::new();
        if self.config.span_fields {
            if let Some(scope) = ctx.event_scope(event) {
                for span in scope.from_root() {
                    if let Some(fields) = span.extensions().get::<SpanFields>() {
                        if !fields.0.is_empty() {
                            attrs.push(Attr::group(span.name(), fields.0.clone()));
                        }
                    }
                }
            }
        }
        let message = visitor.message.take().unwrap_or_default();
        attrs.extend(visitor.attrs);

        let source = meta.file().map(|file| {
            let src = Source::new(file, meta.line().unwrap_or(0));
            match meta.module_path() {
                Some(module) => src.with_function(module),
                None => src,
            }
        });

        let record = Record {
            timestamp: Some(Local::now().fixed_offset()),
            level,
            message,
            attrs,
            source,
        };

        if let Err(e) = self.handler.handle(&record) {
            self.failed_writes.fetch_add(1, Ordering::Relaxed);
            eprintln!("error writing log line: {}", e);
        }
    }
}

/// Collects `tracing` fields as attributes.
#[derive(Default)]
pub struct FieldVisitor {
    pub attrs: Vec<Attr>,
    pub message: Option<String>,
}

impl FieldVisitor {
    /// All fields, with a recorded `message` kept as an ordinary attribute.
    fn into_attrs(mut self) -> Vec<Attr> {
        if let Some(message) = self.message.take() {
            self.attrs.insert(0, Attr::new("message", message));
        }
        self.attrs
    }

    fn push(&mut self, field: &Field, value: impl Into<Value>) {
        self.attrs.push(Attr::new(field.name(), value));
    }
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.push(field, value);
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.push(field, value);
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.push(field, value);
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.push(field, value);
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.push(field, value);
    }

    fn record_error(&mut self, field: &Field, value: &(dyn Error + 'static)) {
        self.push(field, Value::error(ErrorMessage(value.to_string())));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{:?}", value));
        } else {
            self.push(field, format!("{:?}", value));
        }
    }
}

/// Owned copy of a borrowed `tracing` error.
#[derive(Debug)]
struct ErrorMessage(String);

impl fmt::Display for ErrorMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Error for ErrorMessage {}
