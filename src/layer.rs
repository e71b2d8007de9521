use crate::sink::SlackSink;
use crate::encoder::StringObjectEncoder;
use crate::entry::{Caller, Entry};
use crate::field::Field;
use crate::level::Level;
use chrono::Utc;
use std::backtrace::Backtrace;
use std::fmt;
use tracing::field::{Field as TracingField, Visit};
use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// `tracing_subscriber` layer that turns events into Slack notifications
/// through a [`SlackSink`].
///
/// Fields recorded on enclosing spans act as context: they are merged
/// (root span first) with the event's own fields for that one
/// notification only. The sink itself is never modified by an event.
#[derive(Debug, Clone)]
pub struct SlackLayer {
    sink: SlackSink,
    stacktrace_level: Option<Level>,
}

impl SlackLayer {
    pub fn new(sink: SlackSink) -> Self {
        Self { sink, stacktrace_level: None }
    }

    /// Capture a backtrace for events at or above `level`.
    pub fn with_stacktrace_level(mut self, level: Option<Level>) -> Self {
        self.stacktrace_level = level;
        self
    }

    /// Derive a layer whose sink carries additional fields.
    pub fn with_fields(&self, fields: &[Field]) -> Self {
        Self { sink: self.sink.with(fields), stacktrace_level: self.stacktrace_level }
    }

    pub fn sink(&self) -> &SlackSink {
        &self.sink
    }
}

/// Flattened fields of a span, kept in its extensions.
#[derive(Debug, Default)]
struct SpanFields(StringObjectEncoder);

impl<S> Layer<S> for SlackLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else { return };
        let mut fields = SpanFields::default();
        attrs.record(&mut fields.0);
        span.extensions_mut().insert(fields);
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else { return };
        let mut extensions = span.extensions_mut();
        match extensions.get_mut::<SpanFields>() {
            Some(fields) => values.record(&mut fields.0),
            None => {
                let mut fields = SpanFields::default();
                values.record(&mut fields.0);
                extensions.insert(fields);
            }
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let meta = event.metadata();
        let level = Level::from(*meta.level());
        if !self.sink.enabled(level) {
            return;
        }

        let mut span_fields: Vec<(String, String)> = Vec::new();
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope.from_root() {
                if let Some(fields) = span.extensions().get::<SpanFields>() {
                    span_fields.extend(fields.0.fields().iter().map(|(k, v)| (k.clone(), v.clone())));
                }
            }
        }
        let sink = self
            .sink
            .with_flattened(span_fields.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let stack = match self.stacktrace_level {
            Some(min) if level >= min => Some(Backtrace::force_capture().to_string()),
            _ => None,
        };

        let entry = Entry {
            level,
            time: Utc::now(),
            message: visitor.message.unwrap_or_default(),
            caller: Caller { file: meta.file().map(|s| s.to_string()), line: meta.line() },
            stack,
        };

        let fields: Vec<Field> = visitor
            .fields
            .into_fields()
            .into_iter()
            .map(|(k, v)| Field::string(k, v))
            .collect();

        let _ = sink.write(&entry, &fields);
    }
}

/// Splits the `message` field from the rest of an event's fields.
#[derive(Default)]
struct EventVisitor {
    fields: StringObjectEncoder,
    message: Option<String>,
}

impl Visit for EventVisitor {
    fn record_f64(&mut self, field: &TracingField, value: f64) {
        self.fields.record_f64(field, value);
    }

    fn record_i64(&mut self, field: &TracingField, value: i64) {
        self.fields.record_i64(field, value);
    }

    fn record_u64(&mut self, field: &TracingField, value: u64) {
        self.fields.record_u64(field, value);
    }

    fn record_i128(&mut self, field: &TracingField, value: i128) {
        self.fields.record_i128(field, value);
    }

    fn record_u128(&mut self, field: &TracingField, value: u128) {
        self.fields.record_u128(field, value);
    }

    fn record_bool(&mut self, field: &TracingField, value: bool) {
        self.fields.record_bool(field, value);
    }

    fn record_str(&mut self, field: &TracingField, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields.record_str(field, value);
        }
    }

    fn record_bytes(&mut self, field: &TracingField, value: &[u8]) {
        self.fields.record_bytes(field, value);
    }

    fn record_error(&mut self, field: &TracingField, value: &(dyn std::error::Error + 'static)) {
        self.fields.record_error(field, value);
    }

    fn record_debug(&mut self, field: &TracingField, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{:?}", value));
        } else {
            self.fields.record_debug(field, value);
        }
    }
}
