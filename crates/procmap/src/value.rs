//! Dynamically typed cell values and the conversions between them and field types.

use crate::error::{OrmError, OrmResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single cell read from a row cursor or bound as a command parameter.
///
/// `Null` is the database-null sentinel.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    Text(String),
    Bytes(Vec<u8>),
    Uuid(Uuid),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Json(serde_json::Value),
}

/// The declared kind of a mapped field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    Decimal,
    Text,
    Bytes,
    Uuid,
    Date,
    Timestamp,
    TimestampTz,
    Json,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The kind of a non-null value.
    pub fn kind(&self) -> Option<ValueKind> {
        Some(match self {
            Value::Null => return None,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Decimal(_) => ValueKind::Decimal,
            Value::Text(_) => ValueKind::Text,
            Value::Bytes(_) => ValueKind::Bytes,
            Value::Uuid(_) => ValueKind::Uuid,
            Value::Date(_) => ValueKind::Date,
            Value::Timestamp(_) => ValueKind::Timestamp,
            Value::TimestampTz(_) => ValueKind::TimestampTz,
            Value::Json(_) => ValueKind::Json,
        })
    }

    /// Integer view used for foreign-key correlation.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Decimal(d) if d.fract().is_zero() => d.to_i64(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "bool",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Decimal(_) => "decimal",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Uuid(_) => "uuid",
            Value::Date(_) => "date",
            Value::Timestamp(_) => "timestamp",
            Value::TimestampTz(_) => "timestamptz",
            Value::Json(_) => "json",
        }
    }
}

fn mismatch(expected: &str, got: &Value) -> OrmError {
    OrmError::decode("", format!("expected {expected}, got {}", got.describe()))
}

/// A Rust type that can live in a mapped field.
///
/// Setters produced by the derive macro call [`FieldValue::from_value`]; getters
/// call [`FieldValue::to_value`].
pub trait FieldValue: Sized {
    /// Kind reported in field metadata.
    const KIND: ValueKind;

    fn from_value(value: Value) -> OrmResult<Self>;

    fn to_value(&self) -> Value;
}

macro_rules! int_field_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FieldValue for $ty {
                const KIND: ValueKind = ValueKind::Int;

                fn from_value(value: Value) -> OrmResult<Self> {
                    match value {
                        Value::Int(v) => <$ty>::try_from(v).map_err(|_| {
                            OrmError::decode("", format!("{v} out of range for {}", stringify!($ty)))
                        }),
                        Value::Decimal(d) if d.fract().is_zero() => d
                            .to_i64()
                            .and_then(|v| <$ty>::try_from(v).ok())
                            .ok_or_else(|| OrmError::decode("", format!("{d} out of range for {}", stringify!($ty)))),
                        other => Err(mismatch("integer", &other)),
                    }
                }

                fn to_value(&self) -> Value {
                    Value::Int(i64::from(*self))
                }
            }
        )*
    };
}

int_field_value!(i8, i16, i32, i64, u8, u16, u32);

impl FieldValue for f64 {
    const KIND: ValueKind = ValueKind::Float;

    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Float(v) => Ok(v),
            Value::Int(v) => Ok(v as f64),
            Value::Decimal(d) => d
                .to_f64()
                .ok_or_else(|| OrmError::decode("", format!("{d} does not fit f64"))),
            other => Err(mismatch("float", &other)),
        }
    }

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }
}

impl FieldValue for f32 {
    const KIND: ValueKind = ValueKind::Float;

    fn from_value(value: Value) -> OrmResult<Self> {
        f64::from_value(value).map(|v| v as f32)
    }

    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }
}

impl FieldValue for Decimal {
    const KIND: ValueKind = ValueKind::Decimal;

    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Decimal(d) => Ok(d),
            Value::Int(v) => Ok(Decimal::from(v)),
            Value::Float(v) => Decimal::from_f64(v)
                .ok_or_else(|| OrmError::decode("", format!("{v} does not fit a decimal"))),
            Value::Text(s) => s
                .parse()
                .map_err(|e: rust_decimal::Error| OrmError::decode("", e.to_string())),
            other => Err(mismatch("decimal", &other)),
        }
    }

    fn to_value(&self) -> Value {
        Value::Decimal(*self)
    }
}

impl FieldValue for bool {
    const KIND: ValueKind = ValueKind::Bool;

    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Bool(v) => Ok(v),
            Value::Int(v) => Ok(v != 0),
            other => Err(mismatch("bool", &other)),
        }
    }

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl FieldValue for String {
    const KIND: ValueKind = ValueKind::Text;

    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Text(s) => Ok(s),
            other => Err(mismatch("text", &other)),
        }
    }

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }
}

impl FieldValue for Vec<u8> {
    const KIND: ValueKind = ValueKind::Bytes;

    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Bytes(b) => Ok(b),
            other => Err(mismatch("bytes", &other)),
        }
    }

    fn to_value(&self) -> Value {
        Value::Bytes(self.clone())
    }
}

impl FieldValue for Uuid {
    const KIND: ValueKind = ValueKind::Uuid;

    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Uuid(u) => Ok(u),
            Value::Text(s) => {
                Uuid::parse_str(&s).map_err(|e| OrmError::decode("", e.to_string()))
            }
            other => Err(mismatch("uuid", &other)),
        }
    }

    fn to_value(&self) -> Value {
        Value::Uuid(*self)
    }
}

impl FieldValue for NaiveDate {
    const KIND: ValueKind = ValueKind::Date;

    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Date(d) => Ok(d),
            Value::Timestamp(ts) => Ok(ts.date()),
            other => Err(mismatch("date", &other)),
        }
    }

    fn to_value(&self) -> Value {
        Value::Date(*self)
    }
}

impl FieldValue for NaiveDateTime {
    const KIND: ValueKind = ValueKind::Timestamp;

    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Timestamp(ts) => Ok(ts),
            Value::TimestampTz(ts) => Ok(ts.naive_utc()),
            other => Err(mismatch("timestamp", &other)),
        }
    }

    fn to_value(&self) -> Value {
        Value::Timestamp(*self)
    }
}

impl FieldValue for DateTime<Utc> {
    const KIND: ValueKind = ValueKind::TimestampTz;

    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::TimestampTz(ts) => Ok(ts),
            Value::Timestamp(ts) => Ok(ts.and_utc()),
            other => Err(mismatch("timestamptz", &other)),
        }
    }

    fn to_value(&self) -> Value {
        Value::TimestampTz(*self)
    }
}

impl FieldValue for serde_json::Value {
    const KIND: ValueKind = ValueKind::Json;

    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Json(v) => Ok(v),
            Value::Text(s) => {
                serde_json::from_str(&s).map_err(|e| OrmError::decode("", e.to_string()))
            }
            other => Err(mismatch("json", &other)),
        }
    }

    fn to_value(&self) -> Value {
        Value::Json(self.clone())
    }
}

fn from_json<T: DeserializeOwned>(value: Value) -> OrmResult<T> {
    let json = match value {
        Value::Json(v) => v,
        Value::Text(s) => {
            serde_json::from_str(&s).map_err(|e| OrmError::decode("", e.to_string()))?
        }
        other => return Err(mismatch("json", &other)),
    };
    serde_json::from_value(json).map_err(|e| OrmError::decode("", e.to_string()))
}

fn to_json<T: Serialize>(value: &T) -> Value {
    match serde_json::to_value(value) {
        Ok(json) => Value::Json(json),
        Err(e) => {
            tracing::warn!(
                target: "procmap.meta",
                error = %e,
                "field did not serialize; binding NULL"
            );
            Value::Null
        }
    }
}

/// A field stored as one JSON document.
///
/// ```ignore
/// #[derive(Debug, Default, Clone, Entity)]
/// struct Profile {
///     settings: Json<Settings>,
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Json<T>(pub T);

impl<T> From<T> for Json<T> {
    fn from(v: T) -> Self {
        Json(v)
    }
}

impl<T: Serialize + DeserializeOwned> FieldValue for Json<T> {
    const KIND: ValueKind = ValueKind::Json;

    fn from_value(value: Value) -> OrmResult<Self> {
        from_json(value).map(Json)
    }

    fn to_value(&self) -> Value {
        to_json(&self.0)
    }
}

// `#[orm(scalar)]` lists travel as JSON arrays.
macro_rules! json_array_field_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FieldValue for Vec<$ty> {
                const KIND: ValueKind = ValueKind::Json;

                fn from_value(value: Value) -> OrmResult<Self> {
                    from_json(value)
                }

                fn to_value(&self) -> Value {
                    to_json(self)
                }
            }
        )*
    };
}

json_array_field_value!(String, bool, i16, i32, i64, f64, Uuid);

// Option<T> delegates to the inner type; None is the database-null sentinel.
impl<T: FieldValue> FieldValue for Option<T> {
    const KIND: ValueKind = T::KIND;

    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }

    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v.into())
                }
            }
        )*
    };
}

value_from!(
    bool => Bool,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u32 => Int,
    f64 => Float,
    Decimal => Decimal,
    String => Text,
    Vec<u8> => Bytes,
    Uuid => Uuid,
    NaiveDate => Date,
    NaiveDateTime => Timestamp,
    DateTime<Utc> => TimestampTz,
    serde_json::Value => Json,
);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
