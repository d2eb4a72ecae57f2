use std::time::Instant;
use tracing::error;

use tracing_tint::init::init_tracing;
use tracing_tint::TintHandler;

fn main() {
    init_tracing(TintHandler::new(std::io::sink())).expect("install subscriber");

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        error!(iteration = i, "default load test error");
    }

    let elapsed = start.elapsed();
    println!("default config: rendered {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );
}
