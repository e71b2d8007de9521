use std::time::Duration;

use crate::error::ConfigError;
use crate::init::SlackConfig;
use crate::level::Level;

/// Slack incoming-webhook URL. Required by [`SlackConfig::from_env`].
pub const SLACK_WEBHOOK_URL_ENV: &str = "SLACK_WEBHOOK_URL";

/// Minimum level that produces a notification, e.g. `warn`.
pub const SLACK_MIN_LEVEL_ENV: &str = "SLACK_MIN_LEVEL";

/// Minimum level for which a backtrace is attached.
pub const SLACK_STACKTRACE_LEVEL_ENV: &str = "SLACK_STACKTRACE_LEVEL";

/// Footer text; defaults to the process name.
pub const SLACK_FOOTER_ENV: &str = "SLACK_FOOTER";

/// Webhook request timeout in milliseconds.
pub const SLACK_TIMEOUT_MS_ENV: &str = "SLACK_TIMEOUT_MS";

// Variable names are plain helpers; `SlackSink` and the transports never
// read the environment themselves.
impl SlackConfig {
    /// Build a configuration from `SLACK_*` environment variables,
    /// starting from [`SlackConfig::default`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`SlackConfig::from_env`] with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = SlackConfig::default();

        let url = lookup(SLACK_WEBHOOK_URL_ENV).ok_or(ConfigError::MissingVar(SLACK_WEBHOOK_URL_ENV))?;
        config.webhook_url = Some(url);

        if let Some(level) = lookup(SLACK_MIN_LEVEL_ENV) {
            config.min_level = level.parse::<Level>()?;
        }
        if let Some(level) = lookup(SLACK_STACKTRACE_LEVEL_ENV) {
            config.stacktrace_level = Some(level.parse::<Level>()?);
        }
        if let Some(footer) = lookup(SLACK_FOOTER_ENV) {
            config.footer = Some(footer);
        }
        if let Some(ms) = lookup(SLACK_TIMEOUT_MS_ENV) {
            let millis = ms
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidValue { var: SLACK_TIMEOUT_MS_ENV, value: ms.clone() })?;
            config.timeout = Some(Duration::from_millis(millis));
        }

        config.validate()?;
        Ok(config)
    }
}
