use tracing_tint::handler::{SOURCE_KEY, TIME_KEY};
use tracing_tint::{Attr, HandlerOptions, Level, Record, Value};

/// Example of rewriting attributes before they are rendered: the time is
/// dropped, secrets are masked and the source is reduced to a line number.
fn main() {
    let handler = HandlerOptions::default()
        .with_add_source(true)
        .with_replace_attr(|groups, attr| {
            if groups.is_empty() && attr.key == TIME_KEY {
                return Attr::empty();
            }
            if attr.key == SOURCE_KEY {
                if let Some(src) = attr.value.as_opaque().and_then(|v| v.as_source()) {
                    return Attr::new(SOURCE_KEY, format!("line {}", src.line));
                }
            }
            if attr.key == "token" {
                return Attr::new("token", "<redacted>");
            }
            attr
        })
        .build(std::io::stderr())
        .expect("valid options");

    let record = Record::new(Level::INFO, "user logged in")
        .with_caller()
        .with_attrs([
            Attr::new("user", "alice"),
            Attr::new("token", "s3cr3t"),
            Attr::new("elapsed", Value::lazy(|| Value::from(std::time::Duration::from_millis(12)))),
        ]);

    handler.handle(&record).expect("write to stderr");
}
