use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};
use tracing_slack_sink::{
    init::init_tracing,
    message::Message,
    transport::Transport,
};

/// Example of delivering notifications somewhere other than Slack by
/// implementing the `Transport` trait directly. Here every payload is
/// printed as the JSON a webhook would have received.
struct StdoutTransport;

#[async_trait]
impl Transport for StdoutTransport {
    async fn send(&self, message: &Message) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        println!("[stdout-transport] {}", serde_json::to_string_pretty(message)?);
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    let transport: Arc<dyn Transport> = Arc::new(StdoutTransport);

    init_tracing(transport);

    info!("custom transport example started");
    error!(db = "primary", "simulated error sent via custom transport");

    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
}
