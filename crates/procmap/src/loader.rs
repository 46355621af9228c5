//! Loading cursor rows into entities.
//!
//! A [`RowLoader`] resolves, once per result set, which of a type's fields can
//! be filled from the columns actually present, then applies that plan to each
//! row. A field is filled when all of these hold:
//!
//! - it has no CRUD annotation, or its annotation admits `READ` (or is `ALL`);
//! - it has a setter;
//! - its effective column (with the join prefix, if any) is among the result's columns;
//! - the row's value for that column is not NULL.
//!
//! The presence and NULL checks apply to annotated fields exactly as they do to
//! unannotated ones. Otherwise the field keeps its current value.

use crate::cursor::RowValues;
use crate::entity::{Entity, Setter};
use crate::error::{OrmError, OrmResult};
use crate::meta::{EntityMeta, FieldMeta, metadata};
use std::collections::HashMap;

struct Step<T> {
    field: &'static str,
    column: String,
    set: Setter<T>,
}

/// Applies one result set's columns to entities of type `T`.
pub struct RowLoader<T: 'static> {
    meta: &'static EntityMeta<T>,
    prefix: Option<String>,
    plan: Vec<Step<T>>,
}

impl<T: Entity> RowLoader<T> {
    /// Plan over every mapped field of `T`.
    pub fn new(columns: &[String]) -> Self {
        let meta = metadata::<T>();
        Self::build(meta, meta.fields().iter(), columns, None)
    }

    /// Plan over the named fields only. Unknown names are ignored.
    pub fn with_fields(fields: &[&str], columns: &[String]) -> Self {
        let meta = metadata::<T>();
        let selected = fields.iter().filter_map(|name| meta.field(name));
        Self::build(meta, selected, columns, None)
    }

    /// Plan for a flattened join, where `T`'s columns appear as `<prefix>_<column>`.
    pub fn prefixed(prefix: &str, columns: &[String]) -> Self {
        let meta = metadata::<T>();
        Self::build(meta, meta.fields().iter(), columns, Some(prefix.to_string()))
    }

    /// Prefixed plan using `T`'s declared join prefix.
    pub fn for_join(columns: &[String]) -> Self {
        Self::prefixed(metadata::<T>().prefix(), columns)
    }

    fn build<'a>(
        meta: &'static EntityMeta<T>,
        fields: impl Iterator<Item = &'a FieldMeta<T>>,
        columns: &[String],
        prefix: Option<String>,
    ) -> Self {
        let present = ColumnLookup::new(columns);
        let plan = fields
            .filter(|field| field.is_readable())
            .filter_map(|field| {
                let set = field.setter()?;
                let wanted = qualify(prefix.as_deref(), field.column());
                let column = present.find(&wanted)?;
                Some(Step {
                    field: field.name(),
                    column: column.to_string(),
                    set,
                })
            })
            .collect();

        Self { meta, prefix, plan }
    }

    /// Copy the row's eligible, non-NULL values into `target`.
    pub fn load(&self, row: &impl RowValues, target: &mut T) -> OrmResult<()> {
        for step in &self.plan {
            let value = row.value(&step.column)?;
            if value.is_null() {
                continue;
            }
            (step.set)(target, value).map_err(|e| match e {
                OrmError::Decode { message, .. } => OrmError::decode(
                    &step.column,
                    format!("{}.{}: {message}", self.meta.type_name(), step.field),
                ),
                other => other,
            })?;
        }
        Ok(())
    }

    /// Default-construct a `T` and load the row into it.
    pub fn load_new(&self, row: &impl RowValues) -> OrmResult<T> {
        let mut target = T::default();
        self.load(row, &mut target)?;
        Ok(target)
    }

    /// Names of the fields this plan fills, in declaration order.
    pub fn mapped_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.plan.iter().map(|step| step.field)
    }

    /// Whether no field of `T` can be filled from these columns.
    pub fn is_empty(&self) -> bool {
        self.plan.is_empty()
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }
}

/// Load one row into `target` without keeping the plan around.
pub fn load_row<T: Entity>(
    row: &impl RowValues,
    target: &mut T,
    columns: &[String],
) -> OrmResult<()> {
    RowLoader::<T>::new(columns).load(row, target)
}

pub(crate) fn qualify(prefix: Option<&str>, column: &str) -> String {
    match prefix {
        Some(prefix) => format!("{prefix}_{column}"),
        None => column.to_string(),
    }
}

/// ASCII case-insensitive column lookup: PostgreSQL folds unquoted aliases to
/// lower case, so `User_id` comes back as `user_id`. The first of several
/// case-variants wins.
pub(crate) struct ColumnLookup<'a> {
    exact: HashMap<&'a str, &'a str>,
    folded: HashMap<String, &'a str>,
}

impl<'a> ColumnLookup<'a> {
    pub(crate) fn new(columns: &'a [String]) -> Self {
        let mut exact = HashMap::with_capacity(columns.len());
        let mut folded = HashMap::with_capacity(columns.len());
        for column in columns {
            exact.entry(column.as_str()).or_insert(column.as_str());
            folded
                .entry(column.to_ascii_lowercase())
                .or_insert(column.as_str());
        }
        Self { exact, folded }
    }

    pub(crate) fn find(&self, wanted: &str) -> Option<&'a str> {
        self.exact
            .get(wanted)
            .or_else(|| self.folded.get(&wanted.to_ascii_lowercase()))
            .copied()
    }
}
