use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::error;

use tracing_slack_sink::init::{init_tracing_with_config, SlackConfig};
use tracing_slack_sink::transport::NoopTransport;

#[tokio::main]
async fn main() {
    let transport = Arc::new(NoopTransport);
    init_tracing_with_config(transport, SlackConfig { enable_stdout: false, ..SlackConfig::default() });

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        error!(iteration = i, "default load test error");
    }

    let elapsed = start.elapsed();
    println!("default config: rendered {} notifications in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    // Give detached sends a little time to finish
    sleep(Duration::from_secs(2)).await;
}
