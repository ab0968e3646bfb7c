//! Dynamic values exchanged between entities and serialized records.
//!
//! Entities expose their attributes as [`Value`]s, the serialization engine
//! assembles them into ordered [`Record`]s, and the population engine converts
//! payload values back into typed fields through [`ColumnValue`].
//!
//! ```rust
//! use modelmap_core::{record, ColumnValue, Value};
//!
//! let payload = record! {
//!     "pk" => 1,
//!     "name" => "parent",
//!     "birthday" => "2020-03-14",
//! };
//!
//! let birthday = chrono::NaiveDate::from_value(payload["birthday"].clone()).unwrap();
//! assert_eq!(birthday.to_value().render(), "2020-03-14");
//! ```

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::ser::{Serialize, Serializer};
use thiserror::Error;
use uuid::Uuid;

/// An ordered map from attribute name to value.
pub type Record = IndexMap<String, Value>;

/// Function applied to a non-null column value when stringification is on.
pub type ValueSerializer = fn(&Value) -> Value;

/// Type tag of a column, synonym or computed property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    /// Integer column.
    Integer,
    /// Floating point column.
    Float,
    /// Fixed precision decimal column.
    Numeric,
    /// Boolean column.
    Boolean,
    /// Text column.
    String,
    /// Calendar date.
    Date,
    /// Date and time without time zone.
    DateTime,
    /// Time of day.
    Time,
    /// Date and time with time zone.
    Timestamp,
    /// UUID column.
    Uuid,
    /// JSON document.
    Json,
    /// Array column.
    Array,
    /// Spatial column. Never serialized nor populated.
    Geometry,
    /// Anything else. Serialized as is.
    Other,
}

impl ColumnType {
    /// Get the lowercase name of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Numeric => "numeric",
            Self::Boolean => "boolean",
            Self::String => "string",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::Time => "time",
            Self::Timestamp => "timestamp",
            Self::Uuid => "uuid",
            Self::Json => "json",
            Self::Array => "array",
            Self::Geometry => "geometry",
            Self::Other => "other",
        }
    }

    /// Check if values of this type are spatial.
    pub fn is_geometry(&self) -> bool {
        matches!(self, Self::Geometry)
    }

    /// Get the serializer used when stringification is on.
    ///
    /// Temporal, UUID and decimal types render as strings; every other type
    /// has no serializer and is emitted unchanged.
    pub fn serializer(&self) -> Option<ValueSerializer> {
        match self {
            Self::Date
            | Self::DateTime
            | Self::Time
            | Self::Timestamp
            | Self::Uuid
            | Self::Numeric => Some(Value::stringified),
            _ => None,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dynamically typed attribute value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Null / missing value.
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// String value.
    String(String),
    /// Calendar date.
    Date(NaiveDate),
    /// Naive date and time.
    DateTime(NaiveDateTime),
    /// Time of day.
    Time(NaiveTime),
    /// Date and time with offset.
    Timestamp(DateTime<FixedOffset>),
    /// UUID value.
    Uuid(Uuid),
    /// Decimal value.
    Numeric(Decimal),
    /// Raw JSON document.
    Json(serde_json::Value),
    /// List of values.
    List(Vec<Value>),
    /// Nested record.
    Record(Record),
}

impl Value {
    /// Check if the value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Check if the value is null or an empty string, list or record.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::String(s) => s.is_empty(),
            Self::List(items) => items.is_empty(),
            Self::Record(record) => record.is_empty(),
            _ => false,
        }
    }

    /// Name of the variant, used in conversion errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Date(_) => "date",
            Self::DateTime(_) => "datetime",
            Self::Time(_) => "time",
            Self::Timestamp(_) => "timestamp",
            Self::Uuid(_) => "uuid",
            Self::Numeric(_) => "numeric",
            Self::Json(_) => "json",
            Self::List(_) => "list",
            Self::Record(_) => "record",
        }
    }

    /// Borrow the inner string, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the inner integer, if any.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Borrow the inner record, if any.
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Borrow the inner list, if any.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Render a scalar value as text.
    ///
    /// Temporal values use `YYYY-MM-DD HH:MM:SS[.ffffff]` (with `+HH:MM` for
    /// timestamps); fractional seconds only appear when non-zero.
    pub fn render(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::String(s) => s.clone(),
            Self::Date(d) => d.format("%Y-%m-%d").to_string(),
            Self::DateTime(dt) => {
                if dt.nanosecond() / 1_000 == 0 {
                    dt.format("%Y-%m-%d %H:%M:%S").to_string()
                } else {
                    dt.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
                }
            }
            Self::Time(t) => {
                if t.nanosecond() / 1_000 == 0 {
                    t.format("%H:%M:%S").to_string()
                } else {
                    t.format("%H:%M:%S%.6f").to_string()
                }
            }
            Self::Timestamp(ts) => {
                if ts.nanosecond() / 1_000 == 0 {
                    ts.format("%Y-%m-%d %H:%M:%S%:z").to_string()
                } else {
                    ts.format("%Y-%m-%d %H:%M:%S%.6f%:z").to_string()
                }
            }
            Self::Uuid(u) => u.hyphenated().to_string(),
            Self::Numeric(d) => d.to_string(),
            Self::Json(j) => j.to_string(),
            Self::List(_) | Self::Record(_) => {
                serde_json::to_string(self).unwrap_or_default()
            }
        }
    }

    /// Convert temporal, UUID and decimal values into their string rendering.
    pub fn stringified(&self) -> Value {
        match self {
            Self::Date(_)
            | Self::DateTime(_)
            | Self::Time(_)
            | Self::Timestamp(_)
            | Self::Uuid(_)
            | Self::Numeric(_) => Self::String(self.render()),
            other => other.clone(),
        }
    }

    /// Canonical text used to match primary keys.
    ///
    /// Returns `None` for null. Keys compare by their rendering, so `1` and
    /// `"1"` identify the same record.
    pub fn key(&self) -> Option<String> {
        match self {
            Self::Null => None,
            other => Some(other.render()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            other => f.write_str(&other.render()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::String(s) => serializer.serialize_str(s),
            Self::Json(j) => j.serialize(serializer),
            Self::List(items) => serializer.collect_seq(items),
            Self::Record(record) => serializer.collect_map(record),
            other => serializer.serialize_str(&other.render()),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Self::Record(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Self::Date(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Self::DateTime(v)
    }
}

impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        Self::Time(v)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(v: DateTime<FixedOffset>) -> Self {
        Self::Timestamp(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Self::Uuid(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Self::Numeric(v)
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Self {
        Self::Record(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::List(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

/// Errors converting a [`Value`] into a typed attribute.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValueError {
    /// The value variant cannot represent the column type.
    #[error("expected a {expected} value, found {found}")]
    TypeMismatch {
        /// Column type of the attribute.
        expected: ColumnType,
        /// Variant name of the offending value.
        found: &'static str,
    },
    /// A string could not be parsed into the column type.
    #[error("cannot parse {input:?} as {expected}: {reason}")]
    Parse {
        /// Column type of the attribute.
        expected: ColumnType,
        /// The offending input.
        input: String,
        /// Parser message.
        reason: String,
    },
    /// An integer does not fit the attribute's width.
    #[error("integer {value} is out of range for {target}")]
    OutOfRange {
        /// The offending value.
        value: i64,
        /// Rust type of the attribute.
        target: &'static str,
    },
}

impl ValueError {
    fn mismatch(expected: ColumnType, found: &Value) -> Self {
        Self::TypeMismatch {
            expected,
            found: found.type_name(),
        }
    }

    fn parse(expected: ColumnType, input: &str, reason: impl fmt::Display) -> Self {
        Self::Parse {
            expected,
            input: input.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// A Rust attribute type that maps onto a column.
///
/// Conversion from a [`Value`] accepts the native variant and its string
/// rendering, so JSON payloads with stringified dates or UUIDs populate typed
/// fields.
pub trait ColumnValue: Sized {
    /// Column type tag of this Rust type.
    const COLUMN_TYPE: ColumnType;

    /// Convert the attribute into a value.
    fn to_value(&self) -> Value;

    /// Convert a value into the attribute type.
    fn from_value(value: Value) -> Result<Self, ValueError>;
}

/// Column type of the value returned by a computed property getter.
pub fn column_type_of<E: ?Sized, T: ColumnValue>(_getter: fn(&E) -> T) -> ColumnType {
    T::COLUMN_TYPE
}

macro_rules! impl_integer_column {
    ($($ty:ty),+) => {
        $(
            impl ColumnValue for $ty {
                const COLUMN_TYPE: ColumnType = ColumnType::Integer;

                fn to_value(&self) -> Value {
                    Value::Int(*self as i64)
                }

                fn from_value(value: Value) -> Result<Self, ValueError> {
                    let wide = match value {
                        Value::Int(i) => i,
                        Value::String(ref s) => s
                            .trim()
                            .parse::<i64>()
                            .map_err(|e| ValueError::parse(ColumnType::Integer, s, e))?,
                        ref other => return Err(ValueError::mismatch(ColumnType::Integer, other)),
                    };
                    <$ty>::try_from(wide).map_err(|_| ValueError::OutOfRange {
                        value: wide,
                        target: stringify!($ty),
                    })
                }
            }
        )+
    };
}

impl_integer_column!(i16, i32, i64, u32);

impl ColumnValue for f64 {
    const COLUMN_TYPE: ColumnType = ColumnType::Float;

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Float(f) => Ok(f),
            Value::Int(i) => Ok(i as f64),
            Value::String(ref s) => s
                .trim()
                .parse::<f64>()
                .map_err(|e| ValueError::parse(ColumnType::Float, s, e)),
            ref other => Err(ValueError::mismatch(ColumnType::Float, other)),
        }
    }
}

impl ColumnValue for f32 {
    const COLUMN_TYPE: ColumnType = ColumnType::Float;

    fn to_value(&self) -> Value {
        Value::Float(*self as f64)
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        f64::from_value(value).map(|f| f as f32)
    }
}

impl ColumnValue for bool {
    const COLUMN_TYPE: ColumnType = ColumnType::Boolean;

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Bool(b) => Ok(b),
            Value::String(ref s) => match s.to_lowercase().as_str() {
                "true" | "1" => Ok(true),
                "false" | "0" => Ok(false),
                _ => Err(ValueError::parse(ColumnType::Boolean, s, "not a boolean")),
            },
            ref other => Err(ValueError::mismatch(ColumnType::Boolean, other)),
        }
    }
}

impl ColumnValue for String {
    const COLUMN_TYPE: ColumnType = ColumnType::String;

    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::String(s) => Ok(s),
            Value::Null | Value::List(_) | Value::Record(_) | Value::Json(_) => {
                Err(ValueError::mismatch(ColumnType::String, &value))
            }
            scalar => Ok(scalar.render()),
        }
    }
}

impl ColumnValue for NaiveDate {
    const COLUMN_TYPE: ColumnType = ColumnType::Date;

    fn to_value(&self) -> Value {
        Value::Date(*self)
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Date(d) => Ok(d),
            Value::DateTime(dt) => Ok(dt.date()),
            Value::String(ref s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .map_err(|e| ValueError::parse(ColumnType::Date, s, e)),
            ref other => Err(ValueError::mismatch(ColumnType::Date, other)),
        }
    }
}

impl ColumnValue for NaiveDateTime {
    const COLUMN_TYPE: ColumnType = ColumnType::DateTime;

    fn to_value(&self) -> Value {
        Value::DateTime(*self)
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::DateTime(dt) => Ok(dt),
            Value::Date(d) => Ok(d.and_time(NaiveTime::MIN)),
            Value::String(ref s) => {
                let s_trim = s.trim();
                NaiveDateTime::parse_from_str(s_trim, "%Y-%m-%d %H:%M:%S%.f")
                    .or_else(|_| NaiveDateTime::parse_from_str(s_trim, "%Y-%m-%dT%H:%M:%S%.f"))
                    .map_err(|e| ValueError::parse(ColumnType::DateTime, s, e))
            }
            ref other => Err(ValueError::mismatch(ColumnType::DateTime, other)),
        }
    }
}

impl ColumnValue for NaiveTime {
    const COLUMN_TYPE: ColumnType = ColumnType::Time;

    fn to_value(&self) -> Value {
        Value::Time(*self)
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Time(t) => Ok(t),
            Value::String(ref s) => NaiveTime::parse_from_str(s.trim(), "%H:%M:%S%.f")
                .map_err(|e| ValueError::parse(ColumnType::Time, s, e)),
            ref other => Err(ValueError::mismatch(ColumnType::Time, other)),
        }
    }
}

impl ColumnValue for DateTime<FixedOffset> {
    const COLUMN_TYPE: ColumnType = ColumnType::Timestamp;

    fn to_value(&self) -> Value {
        Value::Timestamp(*self)
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Timestamp(ts) => Ok(ts),
            Value::String(ref s) => {
                let s_trim = s.trim();
                DateTime::parse_from_str(s_trim, "%Y-%m-%d %H:%M:%S%.f%:z")
                    .or_else(|_| DateTime::parse_from_rfc3339(s_trim))
                    .map_err(|e| ValueError::parse(ColumnType::Timestamp, s, e))
            }
            ref other => Err(ValueError::mismatch(ColumnType::Timestamp, other)),
        }
    }
}

impl ColumnValue for DateTime<Utc> {
    const COLUMN_TYPE: ColumnType = ColumnType::Timestamp;

    fn to_value(&self) -> Value {
        Value::Timestamp(self.fixed_offset())
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        DateTime::<FixedOffset>::from_value(value).map(|ts| ts.with_timezone(&Utc))
    }
}

impl ColumnValue for Uuid {
    const COLUMN_TYPE: ColumnType = ColumnType::Uuid;

    fn to_value(&self) -> Value {
        Value::Uuid(*self)
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Uuid(u) => Ok(u),
            Value::String(ref s) => {
                Uuid::parse_str(s.trim()).map_err(|e| ValueError::parse(ColumnType::Uuid, s, e))
            }
            ref other => Err(ValueError::mismatch(ColumnType::Uuid, other)),
        }
    }
}

impl ColumnValue for Decimal {
    const COLUMN_TYPE: ColumnType = ColumnType::Numeric;

    fn to_value(&self) -> Value {
        Value::Numeric(*self)
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Numeric(d) => Ok(d),
            Value::Int(i) => Ok(Decimal::from(i)),
            Value::Float(f) => Decimal::try_from(f)
                .map_err(|e| ValueError::parse(ColumnType::Numeric, &f.to_string(), e)),
            Value::String(ref s) => s
                .trim()
                .parse::<Decimal>()
                .map_err(|e| ValueError::parse(ColumnType::Numeric, s, e)),
            ref other => Err(ValueError::mismatch(ColumnType::Numeric, other)),
        }
    }
}

impl ColumnValue for serde_json::Value {
    const COLUMN_TYPE: ColumnType = ColumnType::Json;

    fn to_value(&self) -> Value {
        Value::Json(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Json(j) => Ok(j),
            other => serde_json::to_value(&other)
                .map_err(|e| ValueError::parse(ColumnType::Json, &other.render(), e)),
        }
    }
}

impl<T: ColumnValue> ColumnValue for Option<T> {
    const COLUMN_TYPE: ColumnType = T::COLUMN_TYPE;

    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: ColumnValue> ColumnValue for Vec<T> {
    const COLUMN_TYPE: ColumnType = ColumnType::Array;

    fn to_value(&self) -> Value {
        Value::List(self.iter().map(ColumnValue::to_value).collect())
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(ValueError::mismatch(ColumnType::Array, &other)),
        }
    }
}

/// Spatial value in well-known text.
///
/// Geometry columns are skipped by both engines; the type only exists so
/// entities can declare them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Geometry(pub String);

impl ColumnValue for Geometry {
    const COLUMN_TYPE: ColumnType = ColumnType::Geometry;

    fn to_value(&self) -> Value {
        Value::String(self.0.clone())
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::String(s) => Ok(Self(s)),
            other => Err(ValueError::mismatch(ColumnType::Geometry, &other)),
        }
    }
}

/// Build a [`Record`] from `key => value` pairs.
///
/// ```rust
/// use modelmap_core::{record, Value};
///
/// let r = record! { "pk" => 1, "name" => "child" };
/// assert_eq!(r["pk"], Value::Int(1));
/// ```
#[macro_export]
macro_rules! record {
    () => {
        $crate::value::Record::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut record = $crate::value::Record::new();
        $(
            record.insert(::std::string::String::from($key), $crate::value::Value::from($value));
        )+
        record
    }};
}
