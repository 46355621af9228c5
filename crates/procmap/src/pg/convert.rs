//! Conversions between [`Value`] and PostgreSQL wire types.

use crate::error::{OrmError, OrmResult};
use crate::value::Value;
use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use std::error::Error;
use tokio_postgres::Row;
use tokio_postgres::types::{FromSql, IsNull, ToSql, Type};
use uuid::Uuid;

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(v) => v.to_sql_checked(ty, out),
            Value::Int(v) => match *ty {
                Type::INT2 => i16::try_from(*v)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*v)?.to_sql(ty, out),
                Type::OID => u32::try_from(*v)?.to_sql(ty, out),
                Type::FLOAT4 => (*v as f32).to_sql(ty, out),
                Type::FLOAT8 => (*v as f64).to_sql(ty, out),
                Type::NUMERIC => Decimal::from(*v).to_sql(ty, out),
                _ => v.to_sql_checked(ty, out),
            },
            Value::Float(v) => match *ty {
                Type::FLOAT4 => (*v as f32).to_sql(ty, out),
                Type::NUMERIC => Decimal::try_from(*v)?.to_sql(ty, out),
                _ => v.to_sql_checked(ty, out),
            },
            Value::Decimal(v) => v.to_sql_checked(ty, out),
            Value::Text(v) => v.to_sql_checked(ty, out),
            Value::Bytes(v) => v.to_sql_checked(ty, out),
            Value::Uuid(v) => v.to_sql_checked(ty, out),
            Value::Date(v) => v.to_sql_checked(ty, out),
            Value::Timestamp(v) => v.to_sql_checked(ty, out),
            Value::TimestampTz(v) => v.to_sql_checked(ty, out),
            Value::Json(v) => v.to_sql_checked(ty, out),
        }
    }

    // The variant decides; mismatches are reported by the inner checked encoders.
    fn accepts(_ty: &Type) -> bool {
        true
    }

    tokio_postgres::types::to_sql_checked!();
}

/// A refcursor name returned by a multi-result routine.
pub(crate) struct CursorName(pub(crate) String);

impl<'a> FromSql<'a> for CursorName {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        Ok(CursorName(std::str::from_utf8(raw)?.to_string()))
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::REFCURSOR || <String as FromSql>::accepts(ty)
    }
}

fn get<'a, T: FromSql<'a>>(row: &'a Row, idx: usize) -> OrmResult<Option<T>> {
    row.try_get::<_, Option<T>>(idx)
        .map_err(|e| OrmError::decode(row.columns()[idx].name(), e.to_string()))
}

/// Read cell `idx` of `row` as a [`Value`], choosing the variant by column type.
pub(crate) fn cell(row: &Row, idx: usize) -> OrmResult<Value> {
    let column = &row.columns()[idx];
    let ty = column.type_();
    let value = match *ty {
        Type::BOOL => get::<bool>(row, idx)?.map(Value::Bool),
        Type::CHAR => get::<i8>(row, idx)?.map(|v| Value::Int(v.into())),
        Type::INT2 => get::<i16>(row, idx)?.map(|v| Value::Int(v.into())),
        Type::INT4 => get::<i32>(row, idx)?.map(|v| Value::Int(v.into())),
        Type::INT8 => get::<i64>(row, idx)?.map(Value::Int),
        Type::OID => get::<u32>(row, idx)?.map(|v| Value::Int(v.into())),
        Type::FLOAT4 => get::<f32>(row, idx)?.map(|v| Value::Float(v.into())),
        Type::FLOAT8 => get::<f64>(row, idx)?.map(Value::Float),
        Type::NUMERIC => get::<Decimal>(row, idx)?.map(Value::Decimal),
        Type::BYTEA => get::<Vec<u8>>(row, idx)?.map(Value::Bytes),
        Type::UUID => get::<Uuid>(row, idx)?.map(Value::Uuid),
        Type::DATE => get::<NaiveDate>(row, idx)?.map(Value::Date),
        Type::TIMESTAMP => get::<NaiveDateTime>(row, idx)?.map(Value::Timestamp),
        Type::TIMESTAMPTZ => get::<DateTime<Utc>>(row, idx)?.map(Value::TimestampTz),
        Type::JSON | Type::JSONB => get::<serde_json::Value>(row, idx)?.map(Value::Json),
        Type::REFCURSOR => get::<CursorName>(row, idx)?.map(|c| Value::Text(c.0)),
        _ if <String as FromSql>::accepts(ty) => get::<String>(row, idx)?.map(Value::Text),
        _ => {
            return Err(OrmError::decode(
                column.name(),
                format!("unsupported PostgreSQL type `{ty}`"),
            ));
        }
    };
    Ok(value.unwrap_or(Value::Null))
}
