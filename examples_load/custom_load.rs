use std::sync::Arc;
use std::thread;
use std::time::Instant;

use tracing_tint::{Attr, HandlerOptions, Level, Record};

/// Hammers one handler from several threads without the `tracing` bridge,
/// with attributes, groups and an error value on every record.
fn main() {
    let handler = HandlerOptions::default()
        .with_level(Level::DEBUG)
        .with_add_source(true)
        .build(std::io::sink())
        .expect("valid options")
        .with_attrs(&[Attr::new("service", "load")])
        .with_group("req");
    let handler = Arc::new(handler);

    let threads = 8;
    let n: u64 = 100_000;
    let start = Instant::now();

    let workers: Vec<_> = (0..threads)
        .map(|t| {
            let handler = Arc::clone(&handler);
            thread::spawn(move || {
                for i in 0..n / threads {
                    let record = Record::new(Level::WARN, "custom load test")
                        .with_caller()
                        .with_attrs([
                            Attr::new("worker", t),
                            Attr::new("iteration", i),
                            Attr::group("user", vec![Attr::new("name", "load tester")]),
                            Attr::error("err", std::io::Error::other("timed out")),
                        ]);
                    handler.handle(&record).expect("write to sink");
                }
            })
        })
        .collect();
    for w in workers {
        w.join().expect("worker panicked");
    }

    let elapsed = start.elapsed();
    println!("custom config: rendered {} events on {} threads in {:?} (~{:.0} ev/s)",
        n,
        threads,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );
}
