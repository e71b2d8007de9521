use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, TimeZone};

use crate::error::EncodeError;

/// Value that is only accepted if it exposes a textual representation.
///
/// `Display` values can be flattened; `Opaque` values only carry `Debug`
/// and are rejected by the string encoder.
#[derive(Clone)]
pub enum Reflected {
    Display(Arc<dyn fmt::Display + Send + Sync>),
    Opaque(Arc<dyn fmt::Debug + Send + Sync>),
}

impl Reflected {
    /// Returns the textual representation capability, if the value has one.
    pub fn as_display(&self) -> Option<&(dyn fmt::Display + Send + Sync)> {
        match self {
            Reflected::Display(v) => Some(v.as_ref()),
            Reflected::Opaque(_) => None,
        }
    }
}

impl fmt::Debug for Reflected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reflected::Display(v) => write!(f, "Display({})", v),
            Reflected::Opaque(v) => write!(f, "Opaque({:?})", v),
        }
    }
}

#[derive(Debug, Clone)]
pub enum FieldValue {
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    Usize(usize),
    F32(f32),
    F64(f64),
    Complex64(f32, f32),
    Complex128(f64, f64),
    String(String),
    /// UTF-8 text carried as raw bytes.
    ByteString(Vec<u8>),
    /// Arbitrary binary data, rendered base64.
    Binary(Vec<u8>),
    Duration(Duration),
    Time(DateTime<FixedOffset>),
    Reflected(Reflected),
    Object(Vec<Field>),
    Array(Vec<FieldValue>),
    /// Display text of an error.
    Error(String),
    /// Opens a namespace on the encoder instead of recording a value.
    Namespace,
}

/// Typed key/value pair attached to a log entry, applied to an encoder
/// with [`Field::add_to`].
#[derive(Debug, Clone)]
pub struct Field {
    pub key: String,
    pub value: FieldValue,
}

impl Field {
    pub fn new(key: impl Into<String>, value: FieldValue) -> Self {
        Field { key: key.into(), value }
    }

    pub fn bool(key: impl Into<String>, v: bool) -> Self {
        Field::new(key, FieldValue::Bool(v))
    }

    pub fn i8(key: impl Into<String>, v: i8) -> Self {
        Field::new(key, FieldValue::I8(v))
    }

    pub fn i16(key: impl Into<String>, v: i16) -> Self {
        Field::new(key, FieldValue::I16(v))
    }

    pub fn i32(key: impl Into<String>, v: i32) -> Self {
        Field::new(key, FieldValue::I32(v))
    }

    pub fn i64(key: impl Into<String>, v: i64) -> Self {
        Field::new(key, FieldValue::I64(v))
    }

    pub fn u8(key: impl Into<String>, v: u8) -> Self {
        Field::new(key, FieldValue::U8(v))
    }

    pub fn u16(key: impl Into<String>, v: u16) -> Self {
        Field::new(key, FieldValue::U16(v))
    }

    pub fn u32(key: impl Into<String>, v: u32) -> Self {
        Field::new(key, FieldValue::U32(v))
    }

    pub fn u64(key: impl Into<String>, v: u64) -> Self {
        Field::new(key, FieldValue::U64(v))
    }

    pub fn usize(key: impl Into<String>, v: usize) -> Self {
        Field::new(key, FieldValue::Usize(v))
    }

    pub fn f32(key: impl Into<String>, v: f32) -> Self {
        Field::new(key, FieldValue::F32(v))
    }

    pub fn f64(key: impl Into<String>, v: f64) -> Self {
        Field::new(key, FieldValue::F64(v))
    }

    pub fn complex64(key: impl Into<String>, re: f32, im: f32) -> Self {
        Field::new(key, FieldValue::Complex64(re, im))
    }

    pub fn complex128(key: impl Into<String>, re: f64, im: f64) -> Self {
        Field::new(key, FieldValue::Complex128(re, im))
    }

    pub fn string(key: impl Into<String>, v: impl Into<String>) -> Self {
        Field::new(key, FieldValue::String(v.into()))
    }

    pub fn byte_string(key: impl Into<String>, v: impl Into<Vec<u8>>) -> Self {
        Field::new(key, FieldValue::ByteString(v.into()))
    }

    pub fn binary(key: impl Into<String>, v: impl Into<Vec<u8>>) -> Self {
        Field::new(key, FieldValue::Binary(v.into()))
    }

    pub fn duration(key: impl Into<String>, v: Duration) -> Self {
        Field::new(key, FieldValue::Duration(v))
    }

    /// Time field in any timezone; the offset is kept for rendering.
    pub fn time<Tz: TimeZone>(key: impl Into<String>, v: DateTime<Tz>) -> Self {
        Field::new(key, FieldValue::Time(v.fixed_offset()))
    }

    /// Value flattened through its `Display` implementation.
    pub fn stringer<T>(key: impl Into<String>, v: T) -> Self
    where
        T: fmt::Display + Send + Sync + 'static,
    {
        Field::new(key, FieldValue::Reflected(Reflected::Display(Arc::new(v))))
    }

    /// Value with no textual representation. Encoding it into a string
    /// map fails with [`EncodeError::UnsupportedType`].
    pub fn any<T>(key: impl Into<String>, v: T) -> Self
    where
        T: fmt::Debug + Send + Sync + 'static,
    {
        Field::new(key, FieldValue::Reflected(Reflected::Opaque(Arc::new(v))))
    }

    pub fn object(key: impl Into<String>, fields: Vec<Field>) -> Self {
        Field::new(key, FieldValue::Object(fields))
    }

    pub fn array(key: impl Into<String>, values: Vec<FieldValue>) -> Self {
        Field::new(key, FieldValue::Array(values))
    }

    /// Error recorded under the conventional `"error"` key.
    pub fn error(err: &dyn std::error::Error) -> Self {
        Field::named_error("error", err)
    }

    pub fn named_error(key: impl Into<String>, err: &dyn std::error::Error) -> Self {
        Field::new(key, FieldValue::Error(err.to_string()))
    }

    pub fn namespace(name: impl Into<String>) -> Self {
        Field::new(name, FieldValue::Namespace)
    }

    /// Apply this field to `enc` through the operation matching its type.
    pub fn add_to(&self, enc: &mut dyn ObjectEncoder) -> Result<(), EncodeError> {
        let k = self.key.as_str();
        match &self.value {
            FieldValue::Bool(v) => enc.add_bool(k, *v),
            FieldValue::I8(v) => enc.add_i8(k, *v),
            FieldValue::I16(v) => enc.add_i16(k, *v),
            FieldValue::I32(v) => enc.add_i32(k, *v),
            FieldValue::I64(v) => enc.add_i64(k, *v),
            FieldValue::U8(v) => enc.add_u8(k, *v),
            FieldValue::U16(v) => enc.add_u16(k, *v),
            FieldValue::U32(v) => enc.add_u32(k, *v),
            FieldValue::U64(v) => enc.add_u64(k, *v),
            FieldValue::Usize(v) => enc.add_usize(k, *v),
            FieldValue::F32(v) => enc.add_f32(k, *v),
            FieldValue::F64(v) => enc.add_f64(k, *v),
            FieldValue::Complex64(re, im) => enc.add_complex64(k, *re, *im),
            FieldValue::Complex128(re, im) => enc.add_complex128(k, *re, *im),
            FieldValue::String(v) => enc.add_string(k, v),
            FieldValue::ByteString(v) => enc.add_byte_string(k, v),
            FieldValue::Binary(v) => enc.add_binary(k, v),
            FieldValue::Duration(v) => enc.add_duration(k, *v),
            FieldValue::Time(v) => enc.add_time(k, v),
            FieldValue::Reflected(v) => return enc.add_reflected(k, v),
            FieldValue::Object(v) => return enc.add_object(k, v),
            FieldValue::Array(v) => return enc.add_array(k, v),
            FieldValue::Error(v) => enc.add_string(k, v),
            FieldValue::Namespace => enc.open_namespace(k),
        }
        Ok(())
    }
}

/// Typed visitor receiving one operation per value kind.
///
/// Narrow integer widths default to their 64-bit counterparts.
pub trait ObjectEncoder {
    fn add_array(&mut self, key: &str, values: &[FieldValue]) -> Result<(), EncodeError>;
    fn add_object(&mut self, key: &str, fields: &[Field]) -> Result<(), EncodeError>;
    fn add_reflected(&mut self, key: &str, value: &Reflected) -> Result<(), EncodeError>;

    fn add_binary(&mut self, key: &str, v: &[u8]);
    fn add_byte_string(&mut self, key: &str, v: &[u8]);
    fn add_bool(&mut self, key: &str, v: bool);
    fn add_duration(&mut self, key: &str, v: Duration);
    fn add_complex128(&mut self, key: &str, re: f64, im: f64);
    fn add_f64(&mut self, key: &str, v: f64);
    fn add_f32(&mut self, key: &str, v: f32);
    fn add_i64(&mut self, key: &str, v: i64);
    fn add_u64(&mut self, key: &str, v: u64);
    fn add_string(&mut self, key: &str, v: &str);
    fn add_time(&mut self, key: &str, v: &DateTime<FixedOffset>);
    fn open_namespace(&mut self, key: &str);

    fn add_complex64(&mut self, key: &str, re: f32, im: f32) {
        self.add_complex128(key, f64::from(re), f64::from(im));
    }

    fn add_i32(&mut self, key: &str, v: i32) {
        self.add_i64(key, i64::from(v));
    }

    fn add_i16(&mut self, key: &str, v: i16) {
        self.add_i64(key, i64::from(v));
    }

    fn add_i8(&mut self, key: &str, v: i8) {
        self.add_i64(key, i64::from(v));
    }

    fn add_u32(&mut self, key: &str, v: u32) {
        self.add_u64(key, u64::from(v));
    }

    fn add_u16(&mut self, key: &str, v: u16) {
        self.add_u64(key, u64::from(v));
    }

    fn add_u8(&mut self, key: &str, v: u8) {
        self.add_u64(key, u64::from(v));
    }

    fn add_usize(&mut self, key: &str, v: usize) {
        self.add_u64(key, v as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CallLog(Vec<String>);

    impl ObjectEncoder for CallLog {
        fn add_array(&mut self, key: &str, _: &[FieldValue]) -> Result<(), EncodeError> {
            self.0.push(format!("array {key}"));
            Ok(())
        }
        fn add_object(&mut self, key: &str, _: &[Field]) -> Result<(), EncodeError> {
            self.0.push(format!("object {key}"));
            Ok(())
        }
        fn add_reflected(&mut self, key: &str, v: &Reflected) -> Result<(), EncodeError> {
            match v.as_display() {
                Some(d) => {
                    self.0.push(format!("reflected {key}={d}"));
                    Ok(())
                }
                None => Err(EncodeError::UnsupportedType { key: key.to_string() }),
            }
        }
        fn add_binary(&mut self, key: &str, _: &[u8]) {
            self.0.push(format!("binary {key}"));
        }
        fn add_byte_string(&mut self, key: &str, _: &[u8]) {
            self.0.push(format!("bytes {key}"));
        }
        fn add_bool(&mut self, key: &str, v: bool) {
            self.0.push(format!("bool {key}={v}"));
        }
        fn add_duration(&mut self, key: &str, _: Duration) {
            self.0.push(format!("duration {key}"));
        }
        fn add_complex128(&mut self, key: &str, re: f64, im: f64) {
            self.0.push(format!("complex {key}={re},{im}"));
        }
        fn add_f64(&mut self, key: &str, v: f64) {
            self.0.push(format!("f64 {key}={v}"));
        }
        fn add_f32(&mut self, key: &str, v: f32) {
            self.0.push(format!("f32 {key}={v}"));
        }
        fn add_i64(&mut self, key: &str, v: i64) {
            self.0.push(format!("i64 {key}={v}"));
        }
        fn add_u64(&mut self, key: &str, v: u64) {
            self.0.push(format!("u64 {key}={v}"));
        }
        fn add_string(&mut self, key: &str, v: &str) {
            self.0.push(format!("string {key}={v}"));
        }
        fn add_time(&mut self, key: &str, _: &DateTime<FixedOffset>) {
            self.0.push(format!("time {key}"));
        }
        fn open_namespace(&mut self, key: &str) {
            self.0.push(format!("ns {key}"));
        }
    }

    #[test]
    fn narrow_widths_widen_to_64_bits() {
        let mut log = CallLog::default();
        Field::i8("a", -3).add_to(&mut log).unwrap();
        Field::u16("b", 7).add_to(&mut log).unwrap();
        Field::usize("c", 9).add_to(&mut log).unwrap();
        Field::complex64("d", 1.0, 2.0).add_to(&mut log).unwrap();
        assert_eq!(log.0, vec!["i64 a=-3", "u64 b=7", "u64 c=9", "complex d=1,2"]);
    }

    #[test]
    fn error_and_namespace_fields_dispatch() {
        let mut log = CallLog::default();
        let err = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        Field::error(&err).add_to(&mut log).unwrap();
        Field::namespace("req").add_to(&mut log).unwrap();
        assert_eq!(log.0, vec!["string error=boom", "ns req"]);
    }

    #[test]
    fn reflected_failure_propagates() {
        let mut log = CallLog::default();
        let err = Field::any("k", vec![1, 2]).add_to(&mut log).unwrap_err();
        assert_eq!(err, EncodeError::UnsupportedType { key: "k".to_string() });
        Field::stringer("s", 42).add_to(&mut log).unwrap();
        assert_eq!(log.0, vec!["reflected s=42"]);
    }
}
