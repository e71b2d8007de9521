use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::encoder::StringObjectEncoder;
use crate::entry::Entry;
use crate::error::DeliveryError;
use crate::field::{Field, ObjectEncoder};
use crate::level::{Level, LevelEnabler};
use crate::message::{default_message, Message, MessageFn};
use crate::transport::Transport;

/// One logging sink identity: a level predicate, a message renderer and
/// the fields accumulated through [`SlackSink::with`].
///
/// A sink is never mutated after construction. `with` returns a new sink
/// holding a copy of the fields, so parent and child stay independently
/// usable and can be shared across threads without locking.
///
/// Writes are fire-and-forget: each accepted entry is rendered and handed
/// to the transport on a detached task. Notifications of concurrent
/// writes may arrive in any order.
#[derive(Clone)]
pub struct SlackSink {
    enabler: Arc<dyn LevelEnabler>,
    message_fn: MessageFn,
    enc: StringObjectEncoder,
    transport: Arc<dyn Transport>,
    footer: Arc<str>,
    report_delivery_errors: bool,
}

impl SlackSink {
    /// Create a sink with no fields, the default renderer and the process
    /// name as footer.
    pub fn new<E>(enabler: E, transport: Arc<dyn Transport>) -> Self
    where
        E: LevelEnabler + 'static,
    {
        Self {
            enabler: Arc::new(enabler),
            message_fn: Arc::new(default_message),
            enc: StringObjectEncoder::new(),
            transport,
            footer: Arc::from(process_name()),
            report_delivery_errors: false,
        }
    }

    /// Replace the renderer used for every notification.
    pub fn with_message_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&Entry, &BTreeMap<String, String>, &str) -> Message + Send + Sync + 'static,
    {
        self.message_fn = Arc::new(f);
        self
    }

    pub fn with_footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Arc::from(footer.into());
        self
    }

    /// Print failed deliveries to stderr instead of dropping them silently.
    /// Never routed through `tracing`, which would feed back into this sink.
    pub fn with_delivery_error_reporting(mut self, enabled: bool) -> Self {
        self.report_delivery_errors = enabled;
        self
    }

    pub fn enabled(&self, level: Level) -> bool {
        self.enabler.enabled(level)
    }

    /// Whether [`SlackSink::write`] would act on this entry.
    pub fn check(&self, entry: &Entry) -> bool {
        self.enabled(entry.level)
    }

    /// Fields accumulated by `with` calls.
    pub fn fields(&self) -> &BTreeMap<String, String> {
        self.enc.fields()
    }

    pub fn footer(&self) -> &str {
        &self.footer
    }

    /// Derive a sink whose fields are a copy of this sink's fields
    /// extended by `fields`, applied in order. A field that cannot be
    /// encoded leaves a `<key>Error` entry instead. `self` is left untouched.
    pub fn with(&self, fields: &[Field]) -> SlackSink {
        let mut clone = self.clone();
        clone.enc.add_fields(fields);
        clone
    }

    /// Same as [`SlackSink::with`] for fields already flattened, e.g. the
    /// recorded fields of a `tracing` span.
    pub fn with_flattened<'a, I>(&self, fields: I) -> SlackSink
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut clone = self.clone();
        for (k, v) in fields {
            clone.enc.add_string(k, v);
        }
        clone
    }

    /// Render the notification `write` would send, without sending it.
    /// Call-local `fields` are merged into a temporary copy of the
    /// accumulated fields.
    pub fn render(&self, entry: &Entry, fields: &[Field]) -> Message {
        let mut merged = self.enc.clone();
        merged.add_fields(fields);
        (self.message_fn)(entry, merged.fields(), &self.footer)
    }

    /// Send `entry` with call-local `fields` if its level is enabled.
    ///
    /// Returns `Ok` as soon as delivery is scheduled; delivery failures
    /// are never reported here. Call-local fields do not persist into
    /// `self`.
    pub fn write(&self, entry: &Entry, fields: &[Field]) -> Result<(), DeliveryError> {
        if self.check(entry) {
            self.dispatch(self.render(entry, fields));
        }
        Ok(())
    }

    /// Nothing is buffered, so there is nothing to flush.
    pub fn sync(&self) -> Result<(), DeliveryError> {
        Ok(())
    }

    fn dispatch(&self, message: Message) {
        let transport = Arc::clone(&self.transport);
        let report = self.report_delivery_errors;
        let task = async move {
            if let Err(e) = transport.send(&message).await {
                if report {
                    eprintln!("slack notification dropped: {}", e);
                }
            }
        };

        // Outside a runtime a detached thread drives the send instead.
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(task);
            }
            Err(_) => {
                std::thread::spawn(move || {
                    match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                        Ok(rt) => rt.block_on(task),
                        Err(e) => {
                            if report {
                                eprintln!("slack notification dropped, no runtime: {}", e);
                            }
                        }
                    }
                });
            }
        }
    }
}

impl fmt::Debug for SlackSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlackSink")
            .field("fields", self.enc.fields())
            .field("namespace", &self.enc.namespace())
            .field("footer", &self.footer)
            .finish_non_exhaustive()
    }
}

/// Invocation name of the running process, used as default footer.
pub fn process_name() -> String {
    std::env::args().next().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Color;
    use crate::transport::NoopTransport;

    fn sink() -> SlackSink {
        SlackSink::new(|_: Level| true, Arc::new(NoopTransport)).with_footer("test")
    }

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn with_leaves_parent_untouched() {
        let c = sink().with(&[Field::i64("a", 1)]);
        let c2 = c.with(&[Field::i64("b", 2)]);
        let c3 = c.with(&[Field::i64("c", 3)]);

        assert_eq!(c.fields(), &map(&[("a", "1")]));
        assert_eq!(c2.fields(), &map(&[("a", "1"), ("b", "2")]));
        assert_eq!(c3.fields(), &map(&[("a", "1"), ("c", "3")]));
    }

    #[test]
    fn with_records_common_field_kinds() {
        let err = std::io::Error::new(std::io::ErrorKind::Other, "v");
        let c = sink().with(&[
            Field::string("k", "v"),
            Field::error(&err),
            Field::stringer("s", "v"),
        ]);
        assert_eq!(c.fields(), &map(&[("error", "v"), ("k", "v"), ("s", "v")]));
    }

    #[test]
    fn with_later_fields_overwrite() {
        let c = sink().with(&[Field::string("k", "first"), Field::string("k", "second")]);
        assert_eq!(c.fields(), &map(&[("k", "second")]));
    }

    #[test]
    fn with_records_unsupported_values_as_errors() {
        let c = sink().with(&[Field::any("opaque", vec![1u8]), Field::bool("ok", true)]);
        assert_eq!(
            c.fields(),
            &map(&[
                ("ok", "true"),
                ("opaqueError", "field `opaque`: type cannot be formatted as string"),
            ])
        );
    }

    #[test]
    fn namespace_carries_into_children() {
        let c = sink().with(&[Field::namespace("req"), Field::string("id", "7")]);
        let c2 = c.with(&[Field::string("path", "/")]);
        assert_eq!(c2.fields(), &map(&[("req.id", "7"), ("req.path", "/")]));
    }

    #[test]
    fn write_does_not_persist_call_fields() {
        let c = sink().with(&[Field::string("a", "1")]);
        let entry = Entry::new(Level::Error, "boom");
        c.write(&entry, &[Field::string("b", "2")]).unwrap();
        assert_eq!(c.fields(), &map(&[("a", "1")]));
    }

    #[test]
    fn render_merges_context_and_call_fields() {
        let c = sink().with(&[Field::string("service", "api"), Field::string("k", "old")]);
        let entry = Entry::new(Level::Warn, "slow");
        let msg = c.render(&entry, &[Field::string("k", "new")]);

        let att = &msg.attachments[0];
        assert_eq!(att.title, "WARN: slow");
        assert_eq!(att.color, Color::Warning);
        assert_eq!(att.footer, "test");
        let value = |t: &str| att.fields.iter().find(|f| f.title == t).map(|f| f.value.clone());
        assert_eq!(value("Service").as_deref(), Some("api"));
        assert_eq!(value("K").as_deref(), Some("new"));
        assert_eq!(value("Caller").as_deref(), Some("undefined"));
    }

    #[test]
    fn write_accepts_unencodable_call_field() {
        let c = sink();
        let entry = Entry::new(Level::Error, "boom");
        assert!(c.write(&entry, &[Field::any("bad", ())]).is_ok());

        let msg = c.render(&entry, &[Field::any("bad", ()), Field::string("k", "v")]);
        let rows = &msg.attachments[0].fields;
        let value = |t: &str| rows.iter().find(|f| f.title == t).map(|f| f.value.clone());
        assert_eq!(
            value("BadError").as_deref(),
            Some("field `bad`: type cannot be formatted as string")
        );
        assert_eq!(value("Bad"), None);
        assert_eq!(value("K").as_deref(), Some("v"));
        assert!(c.fields().is_empty());
    }

    #[test]
    fn custom_message_fn_is_used() {
        let c = sink().with_message_fn(|entry, _, _| Message {
            attachments: vec![crate::message::Attachment {
                title: entry.message.to_uppercase(),
                fields: Vec::new(),
                color: Color::Good,
                ts: String::new(),
                footer: String::new(),
                mrkdwn_in: Vec::new(),
            }],
        });
        let msg = c.render(&Entry::new(Level::Info, "hi"), &[]);
        assert_eq!(msg.attachments[0].title, "HI");
    }

    #[test]
    fn level_gate() {
        let c = SlackSink::new(Level::Error, Arc::new(NoopTransport));
        assert!(c.check(&Entry::new(Level::Error, "x")));
        assert!(!c.check(&Entry::new(Level::Info, "x")));
        assert!(c.sync().is_ok());
    }
}
