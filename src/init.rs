use crate::error::ConfigError;
use crate::layer::SlackLayer;
use crate::level::Level;
use crate::sink::SlackSink;
use crate::transport::Transport;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Configuration of the Slack layer.
///
/// **Fields**
/// - `webhook_url`: incoming-webhook URL; only needed when the webhook
///   transport is built from this config.
/// - `min_level`: events below this level are not sent.
/// - `stacktrace_level`: events at or above it carry a backtrace row.
/// - `footer`: attachment footer; `None` uses the process name.
/// - `timeout`: per-request timeout of the webhook client.
/// - `enable_stdout`: if `true`, a `tracing_subscriber::fmt::Layer` is
///   installed next to the Slack layer so events also reach the console.
/// - `report_delivery_errors`: print failed deliveries to stderr.
#[derive(Clone, Debug)]
pub struct SlackConfig {
    pub webhook_url: Option<String>,
    pub min_level: Level,
    pub stacktrace_level: Option<Level>,
    pub footer: Option<String>,
    pub timeout: Option<Duration>,
    pub enable_stdout: bool,
    pub report_delivery_errors: bool,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            min_level: Level::Error,
            stacktrace_level: None,
            footer: None,
            timeout: Some(Duration::from_secs(10)),
            enable_stdout: true,
            report_delivery_errors: false,
        }
    }
}

impl SlackConfig {
    /// Check the webhook URL, if set, looks like an HTTP(S) URL.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.webhook_url {
            Some(url) if !(url.starts_with("http://") || url.starts_with("https://")) => {
                Err(ConfigError::InvalidUrl(url.clone()))
            }
            _ => Ok(()),
        }
    }
}

/// Build a [`SlackLayer`] delivering through `transport` according to
/// `config`, without installing it.
pub fn build_layer(transport: Arc<dyn Transport>, config: &SlackConfig) -> SlackLayer {
    let mut sink = SlackSink::new(config.min_level, transport)
        .with_delivery_error_reporting(config.report_delivery_errors);
    if let Some(footer) = &config.footer {
        sink = sink.with_footer(footer.clone());
    }
    SlackLayer::new(sink).with_stacktrace_level(config.stacktrace_level)
}

/// Initialize global `tracing` subscriber using the provided transport and
/// [`SlackConfig`].
///
/// **Effects**
///
/// Installs a [`Registry`] combined with [`SlackLayer`] as the global
/// default subscriber, so all `tracing` events in the process are
/// observed by the layer.
///
/// **Panics**
///
/// If a global subscriber was already installed.
pub fn init_tracing_with_config(transport: Arc<dyn Transport>, config: SlackConfig) {
    let layer = build_layer(transport, &config);

    if config.enable_stdout {
        let fmt_layer = tracing_subscriber::fmt::layer();
        let subscriber = Registry::default().with(layer).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber).expect("set global subscriber");
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber).expect("set global subscriber");
    }
}

/// Initialize tracing with sensible defaults: only `error` events are
/// sent and console output stays enabled.
pub fn init_tracing(transport: Arc<dyn Transport>) {
    init_tracing_with_config(transport, SlackConfig::default());
}

/// Initialize tracing posting to the webhook named in `config`.
#[cfg(feature = "webhook")]
pub fn init_webhook(config: SlackConfig) -> Result<(), ConfigError> {
    use crate::webhook::{WebhookClient, WebhookConfig};

    config.validate()?;
    let url = config
        .webhook_url
        .clone()
        .ok_or(ConfigError::MissingVar(crate::env::SLACK_WEBHOOK_URL_ENV))?;
    let client = WebhookClient::from_config(&WebhookConfig { url, timeout: config.timeout })
        .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
    init_tracing_with_config(Arc::new(client), config);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::NoopTransport;

    #[test]
    fn defaults_send_errors_only() {
        let config = SlackConfig::default();
        let layer = build_layer(Arc::new(NoopTransport), &config);
        assert!(layer.sink().enabled(Level::Error));
        assert!(!layer.sink().enabled(Level::Warn));
    }

    #[test]
    fn footer_override() {
        let config = SlackConfig { footer: Some("worker-3".to_string()), ..SlackConfig::default() };
        let layer = build_layer(Arc::new(NoopTransport), &config);
        assert_eq!(layer.sink().footer(), "worker-3");
    }

    #[test]
    fn validate_url_scheme() {
        let ok = SlackConfig { webhook_url: Some("https://hooks.slack.com/x".into()), ..Default::default() };
        assert!(ok.validate().is_ok());
        let bad = SlackConfig { webhook_url: Some("hooks.slack.com/x".into()), ..Default::default() };
        assert!(matches!(bad.validate(), Err(ConfigError::InvalidUrl(_))));
    }
}
