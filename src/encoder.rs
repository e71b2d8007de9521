use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use base64::engine::general_purpose;
use base64::Engine;
use chrono::{DateTime, FixedOffset};
use tracing::field::{Field as TracingField, Visit};

use crate::error::EncodeError;
use crate::field::{Field, FieldValue, ObjectEncoder, Reflected};

/// Layout used for time-valued fields: full sub-second precision plus offset.
/// The fraction is padded to 3, 6 or 9 digits and no zone name is printed.
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f %z";

/// [`ObjectEncoder`] that stores every value as a string keyed by its
/// fully-namespaced name.
///
/// Cloning produces an independent deep copy of the field map and the
/// currently open namespace path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringObjectEncoder {
    fields: BTreeMap<String, String>,
    ns: String,
}

impl StringObjectEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flattened fields recorded so far.
    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn into_fields(self) -> BTreeMap<String, String> {
        self.fields
    }

    /// Dot-joined namespace path currently open; empty if none.
    pub fn namespace(&self) -> &str {
        &self.ns
    }

    /// Apply every field in order. A field that fails to encode is
    /// recorded as `<key>Error` holding the error text instead.
    pub fn add_fields(&mut self, fields: &[Field]) {
        for field in fields {
            if let Err(e) = field.add_to(self) {
                self.add_string(&format!("{}Error", field.key), &e.to_string());
            }
        }
    }

    fn key_ns(&self, key: &str) -> String {
        if self.ns.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.ns, key)
        }
    }

    fn put(&mut self, key: &str, value: String) {
        let key = self.key_ns(key);
        self.fields.insert(key, value);
    }
}

impl ObjectEncoder for StringObjectEncoder {
    /// Arrays are not flattened; nothing is recorded.
    fn add_array(&mut self, _key: &str, _values: &[FieldValue]) -> Result<(), EncodeError> {
        Ok(())
    }

    /// Nested objects are not flattened; nothing is recorded.
    fn add_object(&mut self, _key: &str, _fields: &[Field]) -> Result<(), EncodeError> {
        Ok(())
    }

    fn add_reflected(&mut self, key: &str, value: &Reflected) -> Result<(), EncodeError> {
        let text = value
            .as_display()
            .map(|d| d.to_string())
            .ok_or_else(|| EncodeError::UnsupportedType { key: self.key_ns(key) })?;
        self.put(key, text);
        Ok(())
    }

    fn add_binary(&mut self, key: &str, v: &[u8]) {
        self.put(key, general_purpose::STANDARD.encode(v));
    }

    fn add_byte_string(&mut self, key: &str, v: &[u8]) {
        self.put(key, String::from_utf8_lossy(v).into_owned());
    }

    fn add_bool(&mut self, key: &str, v: bool) {
        self.put(key, v.to_string());
    }

    fn add_duration(&mut self, key: &str, v: Duration) {
        self.put(key, format_duration(v));
    }

    fn add_complex128(&mut self, key: &str, re: f64, im: f64) {
        self.put(key, format!("{}+{}i", format_f64(re), format_f64(im)));
    }

    fn add_complex64(&mut self, key: &str, re: f32, im: f32) {
        self.put(key, format!("{}+{}i", format_f32(re), format_f32(im)));
    }

    fn add_f64(&mut self, key: &str, v: f64) {
        self.put(key, format_f64(v));
    }

    fn add_f32(&mut self, key: &str, v: f32) {
        self.put(key, format_f32(v));
    }

    fn add_i64(&mut self, key: &str, v: i64) {
        self.put(key, v.to_string());
    }

    fn add_u64(&mut self, key: &str, v: u64) {
        self.put(key, v.to_string());
    }

    fn add_string(&mut self, key: &str, v: &str) {
        self.put(key, v.to_string());
    }

    fn add_time(&mut self, key: &str, v: &DateTime<FixedOffset>) {
        self.put(key, v.format(TIME_FORMAT).to_string());
    }

    fn open_namespace(&mut self, key: &str) {
        if self.ns.is_empty() {
            self.ns = key.to_string();
        } else {
            self.ns.push('.');
            self.ns.push_str(key);
        }
    }
}

/// Values recorded through `tracing` use the same canonical forms as the
/// typed operations above.
impl Visit for StringObjectEncoder {
    fn record_f64(&mut self, field: &TracingField, value: f64) {
        self.add_f64(field.name(), value);
    }

    fn record_i64(&mut self, field: &TracingField, value: i64) {
        self.add_i64(field.name(), value);
    }

    fn record_u64(&mut self, field: &TracingField, value: u64) {
        self.add_u64(field.name(), value);
    }

    fn record_i128(&mut self, field: &TracingField, value: i128) {
        self.put(field.name(), value.to_string());
    }

    fn record_u128(&mut self, field: &TracingField, value: u128) {
        self.put(field.name(), value.to_string());
    }

    fn record_bool(&mut self, field: &TracingField, value: bool) {
        self.add_bool(field.name(), value);
    }

    fn record_str(&mut self, field: &TracingField, value: &str) {
        self.add_string(field.name(), value);
    }

    fn record_bytes(&mut self, field: &TracingField, value: &[u8]) {
        self.add_binary(field.name(), value);
    }

    fn record_error(&mut self, field: &TracingField, value: &(dyn std::error::Error + 'static)) {
        self.put(field.name(), value.to_string());
    }

    fn record_debug(&mut self, field: &TracingField, value: &dyn fmt::Debug) {
        self.put(field.name(), format!("{:?}", value));
    }
}

/// Shortest decimal form that parses back to the same `f64`.
pub fn format_f64(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v.is_infinite() {
        if v.is_sign_positive() { "+Inf" } else { "-Inf" }.to_string()
    } else {
        v.to_string()
    }
}

/// Shortest decimal form that parses back to the same `f32`.
pub fn format_f32(v: f32) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v.is_infinite() {
        if v.is_sign_positive() { "+Inf" } else { "-Inf" }.to_string()
    } else {
        v.to_string()
    }
}

/// Compact unit form: `0s`, `1.5µs`, `1ms`, `2.5s`, `1m30s`, `1h0m0s`.
pub fn format_duration(d: Duration) -> String {
    let nanos = d.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }

    if nanos < 1_000_000_000 {
        let (unit, scale) = if nanos < 1_000 {
            ("ns", 1)
        } else if nanos < 1_000_000 {
            ("µs", 1_000)
        } else {
            ("ms", 1_000_000)
        };
        return format!("{}{}", decimal(nanos, scale), unit);
    }

    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = u128::from(total_secs % 60) * 1_000_000_000 + u128::from(d.subsec_nanos());

    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{}h", hours));
    }
    if hours > 0 || minutes > 0 {
        out.push_str(&format!("{}m", minutes));
    }
    out.push_str(&decimal(seconds, 1_000_000_000));
    out.push('s');
    out
}

// `value / scale` with the remainder as trailing-zero-trimmed decimals.
fn decimal(value: u128, scale: u128) -> String {
    let whole = value / scale;
    let frac = value % scale;
    if frac == 0 {
        return whole.to_string();
    }
    let width = scale.to_string().len() - 1;
    let digits = format!("{:0width$}", frac, width = width);
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}
