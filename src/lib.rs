pub mod error;
pub mod level;
pub mod field;
pub mod encoder;
pub mod entry;
pub mod message;
pub mod transport;
pub mod sink;
pub mod layer;

#[cfg(feature = "webhook")]
pub mod webhook;

pub mod env;
pub mod init;
