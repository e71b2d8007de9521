use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{error, info_span};

use tracing_slack_sink::init::{init_tracing_with_config, SlackConfig};
use tracing_slack_sink::level::Level;
use tracing_slack_sink::transport::RecordingTransport;

#[tokio::main]
async fn main() {
    let transport = RecordingTransport::new();

    let config = SlackConfig {
        min_level: Level::Warn,
        stacktrace_level: Some(Level::Error),
        footer: Some("custom-load".to_string()),
        enable_stdout: false,
        ..SlackConfig::default()
    };

    init_tracing_with_config(Arc::new(transport.clone()), config);

    let n: u64 = 10_000;
    let start = Instant::now();

    let span = info_span!("load", run = "custom", worker = 1);
    let _guard = span.enter();
    for i in 0..n {
        error!(iteration = i, elapsed = ?start.elapsed(), "custom load test error");
    }

    let elapsed = start.elapsed();
    println!("custom config: rendered {} notifications with backtraces in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    let delivered = transport.wait_for(n as usize, Duration::from_secs(5)).await;
    println!("delivered {} of {}", delivered.len(), n);

    sleep(Duration::from_millis(100)).await;
}
