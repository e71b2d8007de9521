use tokio::time::{sleep, Duration};
use tracing::{error, info, info_span, warn};

use tracing_slack_sink::init::{init_webhook, SlackConfig};

/// Reads `SLACK_WEBHOOK_URL` (and the optional `SLACK_*` variables) and
/// posts every `warn!`/`error!` to that channel.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = SlackConfig::from_env()?;
    init_webhook(config)?;

    info!("starting service");

    let span = info_span!("checkout", order_id = 123, customer = "acme");
    let _guard = span.enter();

    warn!(latency_ms = 870, "payment provider slow");
    error!(
        user_id = 42,
        reason = "invalid password",
        "authentication failed"
    );

    // Sends run on detached tasks; keep the runtime alive long enough.
    sleep(Duration::from_secs(2)).await;
    Ok(())
}
