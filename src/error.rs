/// Error returned by the field encoder.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// The value has no textual representation and cannot be flattened.
    #[error("field `{key}`: type cannot be formatted as string")]
    UnsupportedType { key: String },
}

/// Error type returned when building configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),

    #[error("invalid log level: {0:?}")]
    InvalidLevel(String),

    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },

    #[error("webhook URL must start with http:// or https://, got {0:?}")]
    InvalidUrl(String),

    #[error("cannot build HTTP client: {0}")]
    HttpClient(String),
}

/// Failure delivering a notification to the webhook endpoint.
///
/// Only ever observed inside the detached dispatch task; it is never
/// returned to the code that emitted the log event.
#[derive(thiserror::Error, Debug)]
pub enum DeliveryError {
    #[cfg(feature = "webhook")]
    #[error("webhook request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webhook responded with status {status}: {body}")]
    Status { status: u16, body: String },
}
