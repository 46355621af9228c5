//! Demultiplexing flattened join rows.
//!
//! A flattened inner join returns one result set carrying the columns of every
//! participating type as `<Prefix>_<column>`. A parent's columns repeat on every
//! row of each of its children, so each type keeps the identities it has already
//! materialized and skips repeats.

use crate::cursor::RowValues;
use crate::entity::Entity;
use crate::error::{ConfigError, OrmResult};
use crate::loader::{ColumnLookup, RowLoader, qualify};
use crate::meta::metadata;
use crate::value::Value;
use std::collections::HashSet;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum IdentityKey {
    Int(i64),
    Text(String),
    Uuid(Uuid),
    Bytes(Vec<u8>),
}

impl IdentityKey {
    fn from_value(value: Value) -> Option<Self> {
        if let Some(v) = value.as_i64() {
            return Some(IdentityKey::Int(v));
        }
        match value {
            Value::Text(s) => Some(IdentityKey::Text(s)),
            Value::Uuid(u) => Some(IdentityKey::Uuid(u)),
            Value::Bytes(b) => Some(IdentityKey::Bytes(b)),
            Value::Null => None,
            other => Some(IdentityKey::Text(format!("{other:?}"))),
        }
    }
}

/// The distinct `T` objects found in a flattened join, in first-seen order.
pub struct JoinedSet<T: 'static> {
    loader: RowLoader<T>,
    identity_column: Option<String>,
    seen: HashSet<IdentityKey>,
    items: Vec<T>,
}

impl<T: Entity> JoinedSet<T> {
    /// Prepare for a result with the given columns.
    ///
    /// Fails when `T` declares no identity field: without one, repeated parent
    /// columns cannot be told apart from distinct parents.
    pub fn new(columns: &[String]) -> OrmResult<Self> {
        let meta = metadata::<T>();
        let identity = meta.identity().ok_or(ConfigError::MissingIdentity {
            type_name: meta.type_name(),
        })?;

        let lookup = ColumnLookup::new(columns);
        let identity_column = lookup
            .find(&qualify(Some(meta.prefix()), identity.column()))
            .map(str::to_string);

        Ok(Self {
            loader: RowLoader::for_join(columns),
            identity_column,
            seen: HashSet::new(),
            items: Vec::new(),
        })
    }

    /// Materialize this row's `T`, unless its identity is NULL or already seen.
    pub fn accept(&mut self, row: &impl RowValues) -> OrmResult<()> {
        let Some(column) = &self.identity_column else {
            return Ok(());
        };
        let Some(key) = IdentityKey::from_value(row.value(column)?) else {
            return Ok(());
        };
        if self.seen.contains(&key) {
            return Ok(());
        }
        let item = self.loader.load_new(row)?;
        self.seen.insert(key);
        self.items.push(item);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::{MemoryCursor, ResultSet, RowCursor};
    use crate::entity::{EntityDescriptor, FieldDef};
    use crate::error::OrmError;
    use crate::value::FieldValue;

    #[derive(Debug, Default, Clone)]
    struct Album {
        id: i64,
        title: String,
    }

    impl Entity for Album {
        fn describe() -> EntityDescriptor<Self> {
            EntityDescriptor::new("Album")
                .field(
                    FieldDef::<Album>::of::<i64>("id")
                        .identity()
                        .getter(|a| a.id.to_value())
                        .setter(|a, v| {
                            a.id = FieldValue::from_value(v)?;
                            Ok(())
                        }),
                )
                .field(
                    FieldDef::<Album>::of::<String>("title")
                        .getter(|a| a.title.to_value())
                        .setter(|a, v| {
                            a.title = FieldValue::from_value(v)?;
                            Ok(())
                        }),
                )
        }
    }

    #[derive(Debug, Default, Clone)]
    struct Loose {
        name: String,
    }

    impl Entity for Loose {
        fn describe() -> EntityDescriptor<Self> {
            EntityDescriptor::new("Loose")
                .field(FieldDef::<Loose>::of::<String>("name").getter(|l| l.name.to_value()))
        }
    }

    #[test]
    fn repeated_identity_is_materialized_once() {
        let mut cur = MemoryCursor::single(
            ResultSet::new(["Album_id", "Album_title", "Track_id"])
                .row([Value::Int(1), Value::from("Kind of Blue"), Value::Int(10)])
                .row([Value::Int(1), Value::from("Kind of Blue"), Value::Int(11)])
                .row([Value::Int(2), Value::from("Blue Train"), Value::Int(12)])
                .row([Value::Null, Value::Null, Value::Int(13)]),
        );
        let mut albums = JoinedSet::<Album>::new(&RowCursor::columns(&cur)).unwrap();
        while RowCursor::next_row(&mut cur).unwrap() {
            albums.accept(&cur).unwrap();
        }
        let albums = albums.into_items();
        assert_eq!(albums.len(), 2);
        assert_eq!(albums[0].title, "Kind of Blue");
        assert_eq!(albums[1].id, 2);
    }

    #[test]
    fn identity_is_required() {
        let err = JoinedSet::<Loose>::new(&["Loose_name".to_string()])
            .err()
            .unwrap();
        assert!(matches!(
            err,
            OrmError::Config(ConfigError::MissingIdentity { type_name: "Loose" })
        ));
    }

    #[test]
    fn absent_identity_column_yields_nothing() {
        let mut cur = MemoryCursor::single(ResultSet::new(["Other_id"]).row([1_i64]));
        let mut albums = JoinedSet::<Album>::new(&RowCursor::columns(&cur)).unwrap();
        RowCursor::next_row(&mut cur).unwrap();
        albums.accept(&cur).unwrap();
        assert!(albums.is_empty());
    }
}
