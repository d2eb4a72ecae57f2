#![cfg(feature = "tracing")]

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tracing::{debug, error, info, info_span, trace, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

use tracing_tint::init::LayerConfig;
use tracing_tint::layer::{level_from_tracing, TintLayer};
use tracing_tint::{Attr, HandlerOptions, Level, MemorySink, TintHandler};

fn handler(sink: &MemorySink, level: Level) -> TintHandler {
    HandlerOptions::default()
        .with_no_color(true)
        .with_level(level)
        .with_replace_attr(|groups, a| {
            // Drop the wall-clock time so lines are deterministic.
            if a.key == "time" && groups.is_empty() {
                Attr::new("", "")
            } else {
                a
            }
        })
        .build(sink.clone())
        .unwrap()
}

#[test]
fn events_become_lines() {
    let sink = MemorySink::new();
    let subscriber = Registry::default().with(TintLayer::new(handler(&sink, Level::INFO)));

    tracing::subscriber::with_default(subscriber, || {
        info!(addr = ":8080", env = "production", "Starting server");
        warn!(retries = 3_u64, ratio = 0.5, ok = false, "flaky");
        debug!("hidden");
    });

    assert_eq!(
        sink.lines(),
        [
            "INF Starting server addr=:8080 env=production",
            "WRN flaky retries=3 ratio=0.5 ok=false",
        ]
    );
}

#[test]
fn trace_maps_below_debug() {
    assert_eq!(level_from_tracing(&tracing::Level::TRACE), Level(-8));
    assert_eq!(level_from_tracing(&tracing::Level::ERROR), Level::ERROR);

    let sink = MemorySink::new();
    let subscriber = Registry::default().with(TintLayer::new(handler(&sink, Level(-8))));
    tracing::subscriber::with_default(subscriber, || {
        trace!("deep");
    });
    assert_eq!(sink.lines(), ["DBG-4 deep"]);
}

#[test]
fn span_fields_are_grouped() {
    let sink = MemorySink::new();
    let subscriber = Registry::default().with(TintLayer::new(handler(&sink, Level::INFO)));

    tracing::subscriber::with_default(subscriber, || {
        let span = info_span!("req", method = "GET", path = "/health");
        let _guard = span.enter();
        info!(status = 200_u64, "done");
    });

    assert_eq!(
        sink.lines(),
        ["INF done req.method=GET req.path=/health status=200"]
    );
}

#[test]
fn span_fields_can_be_disabled() {
    let sink = MemorySink::new();
    let layer = TintLayer::with_config(
        handler(&sink, Level::INFO),
        LayerConfig { span_fields: false },
    );
    let subscriber = Registry::default().with(layer);

    tracing::subscriber::with_default(subscriber, || {
        let span = info_span!("req", method = "GET");
        let _guard = span.enter();
        info!("done");
    });

    assert_eq!(sink.lines(), ["INF done"]);
}

#[test]
fn errors_use_error_path() {
    let sink = MemorySink::new();
    let subscriber = Registry::default().with(TintLayer::new(handler(&sink, Level::INFO)));

    let err = std::io::Error::new(std::io::ErrorKind::Other, "connection reset");
    tracing::subscriber::with_default(subscriber, || {
        error!(err = &err as &(dyn std::error::Error + 'static), "request failed");
    });

    assert_eq!(sink.lines(), ["ERR request failed err=\"connection reset\""]);
}

#[test]
fn counts_events() {
    let sink = MemorySink::new();
    let layer = TintLayer::from_arc(Arc::new(handler(&sink, Level::INFO)), LayerConfig::default());
    let total = Arc::clone(&layer.total_events);
    let failed = Arc::clone(&layer.failed_writes);
    let subscriber = Registry::default().with(layer);

    tracing::subscriber::with_default(subscriber, || {
        info!("one");
        info!("two");
        debug!("filtered");
    });

    assert_eq!(total.load(Ordering::Relaxed), 2);
    assert_eq!(failed.load(Ordering::Relaxed), 0);
}
