use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::entry::Entry;
use crate::level::Level;

/// Marker wrapped around stack traces so Slack renders them as code.
const CODE_FENCE: &str = "```";

/// Top-level body posted to an incoming webhook.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attachment {
    pub title: String,
    pub fields: Vec<AttachmentField>,
    pub color: Color,
    /// Entry time in seconds since the epoch as decimal text, written to
    /// the payload as a bare JSON number.
    #[serde(serialize_with = "serialize_ts")]
    pub ts: String,
    pub footer: String,
    pub mrkdwn_in: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachmentField {
    pub title: String,
    pub value: String,
    pub short: bool,
}

/// Empty text is written as `0`, anything else must parse as a number.
fn serialize_ts<S>(ts: &str, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if ts.is_empty() {
        return serializer.serialize_i64(0);
    }
    if let Ok(secs) = ts.parse::<i64>() {
        return serializer.serialize_i64(secs);
    }
    match ts.parse::<f64>() {
        Ok(secs) if secs.is_finite() => serializer.serialize_f64(secs),
        _ => Err(serde::ser::Error::custom(format!("ts is not a number: {:?}", ts))),
    }
}

impl AttachmentField {
    pub fn new(title: impl Into<String>, value: impl Into<String>) -> Self {
        AttachmentField { title: title.into(), value: value.into(), short: false }
    }
}

/// Attachment side-bar colors understood by Slack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Good,
    Warning,
    Danger,
}

/// Fixed severity to color table. `Trace` has no dedicated color and
/// falls back to neutral.
pub fn level_color(level: Level) -> Color {
    match level {
        Level::Debug | Level::Info => Color::Good,
        Level::Warn => Color::Warning,
        Level::Error | Level::DPanic | Level::Panic | Level::Fatal => Color::Danger,
        Level::Trace => Color::Good,
    }
}

/// Renders a notification from entry metadata, the merged flattened
/// fields and the footer text. Pluggable on [`crate::sink::SlackSink`].
pub type MessageFn = Arc<dyn Fn(&Entry, &BTreeMap<String, String>, &str) -> Message + Send + Sync>;

/// Default rendering: one row per field, then `Caller`, then
/// `Stack trace` when the entry carries one.
pub fn default_message(entry: &Entry, fields: &BTreeMap<String, String>, footer: &str) -> Message {
    let mut rows: Vec<AttachmentField> = fields
        .iter()
        .map(|(k, v)| AttachmentField::new(title_case(k), v.clone()))
        .collect();

    rows.push(AttachmentField::new("Caller", entry.caller.trimmed_path()));

    if let Some(stack) = entry.stack.as_deref().filter(|s| !s.is_empty()) {
        rows.push(AttachmentField::new(
            "Stack trace",
            format!("{}{}{}", CODE_FENCE, stack, CODE_FENCE),
        ));
    }

    Message {
        attachments: vec![Attachment {
            title: format!("{}: {}", entry.level.capital_str(), entry.message),
            fields: rows,
            color: level_color(entry.level),
            ts: entry.time.timestamp().to_string(),
            footer: footer.to_string(),
            mrkdwn_in: vec!["fields".to_string()],
        }],
    }
}

/// Upper-cases the first letter of every word. Word boundaries are
/// whitespace and ASCII punctuation other than `_`.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_boundary = true;
    for c in s.chars() {
        if at_boundary {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_boundary = is_word_separator(c);
    }
    out
}

fn is_word_separator(c: char) -> bool {
    if c.is_ascii() {
        return !(c.is_ascii_alphanumeric() || c == '_');
    }
    if c.is_alphanumeric() {
        return false;
    }
    c.is_whitespace()
}
