//! Row cursor abstraction.
//!
//! Executors hand back cursors; the engine only needs named-column access to the
//! current row plus forward movement across rows and result sets. The blocking
//! and suspend-at-I/O flavours share [`RowValues`], so row mapping is the same
//! code in both.

use crate::error::{OrmError, OrmResult};
use crate::value::Value;
use std::collections::HashMap;
use std::future::Future;

/// Named-column access to the row a cursor is positioned on.
pub trait RowValues {
    /// The value at `column`, `Value::Null` for SQL NULL.
    ///
    /// Asking for a column the result does not carry is an error; the loader
    /// only asks for columns listed by the cursor.
    fn value(&self, column: &str) -> OrmResult<Value>;
}

/// A forward-only, blocking row cursor.
pub trait RowCursor: RowValues {
    /// Column names of the current result set, in result order.
    fn columns(&self) -> Vec<String>;

    /// Advance to the next row. `false` at the end of the current result set.
    fn next_row(&mut self) -> OrmResult<bool>;

    /// Advance to the next result set. `false` if there is none.
    fn next_result_set(&mut self) -> OrmResult<bool>;

    /// Value of an output parameter, readable once the rows are drained.
    fn output(&self, name: &str) -> Option<Value> {
        let _ = name;
        None
    }
}

/// A forward-only row cursor whose movement may suspend on I/O.
pub trait AsyncRowCursor: RowValues + Send {
    fn columns(&self) -> Vec<String>;

    fn next_row(&mut self) -> impl Future<Output = OrmResult<bool>> + Send;

    fn next_result_set(&mut self) -> impl Future<Output = OrmResult<bool>> + Send;

    fn output(&self, name: &str) -> Option<Value> {
        let _ = name;
        None
    }
}

/// One buffered result set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl ResultSet {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row. Short rows are padded with NULL, long rows truncated.
    pub fn row<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.push_row(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn push_row(&mut self, mut values: Vec<Value>) {
        values.resize(self.columns.len(), Value::Null);
        self.rows.push(values);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A cursor over fully buffered result sets.
///
/// Executors that read whole results up front (such as the PostgreSQL adapter)
/// return this; it also serves as a test double.
#[derive(Debug, Clone, Default)]
pub struct MemoryCursor {
    sets: Vec<ResultSet>,
    set: usize,
    row: Option<usize>,
    outputs: HashMap<String, Value>,
}

impl MemoryCursor {
    pub fn new(sets: Vec<ResultSet>) -> Self {
        Self {
            sets,
            set: 0,
            row: None,
            outputs: HashMap::new(),
        }
    }

    pub fn single(set: ResultSet) -> Self {
        Self::new(vec![set])
    }

    pub fn with_output(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.outputs.insert(name.into(), value.into());
        self
    }

    pub fn result_sets(&self) -> &[ResultSet] {
        &self.sets
    }

    fn current_set(&self) -> Option<&ResultSet> {
        self.sets.get(self.set)
    }

    fn step_row(&mut self) -> bool {
        let Some(len) = self.current_set().map(ResultSet::len) else {
            return false;
        };
        let next = self.row.map_or(0, |r| r + 1);
        if next < len {
            self.row = Some(next);
            true
        } else {
            self.row = Some(len);
            false
        }
    }

    fn step_set(&mut self) -> bool {
        if self.set + 1 < self.sets.len() {
            self.set += 1;
            self.row = None;
            true
        } else {
            self.set = self.sets.len();
            false
        }
    }

    fn column_names(&self) -> Vec<String> {
        self.current_set()
            .map(|s| s.columns.clone())
            .unwrap_or_default()
    }
}

impl RowValues for MemoryCursor {
    fn value(&self, column: &str) -> OrmResult<Value> {
        let set = self
            .current_set()
            .ok_or_else(|| OrmError::cursor("no current result set"))?;
        let row = self
            .row
            .and_then(|r| set.rows.get(r))
            .ok_or_else(|| OrmError::cursor("cursor is not positioned on a row"))?;
        let idx = set
            .columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| OrmError::cursor(format!("no column named '{column}'")))?;
        Ok(row[idx].clone())
    }
}

impl RowCursor for MemoryCursor {
    fn columns(&self) -> Vec<String> {
        self.column_names()
    }

    fn next_row(&mut self) -> OrmResult<bool> {
        Ok(self.step_row())
    }

    fn next_result_set(&mut self) -> OrmResult<bool> {
        Ok(self.step_set())
    }

    fn output(&self, name: &str) -> Option<Value> {
        self.outputs.get(name).cloned()
    }
}

impl AsyncRowCursor for MemoryCursor {
    fn columns(&self) -> Vec<String> {
        self.column_names()
    }

    async fn next_row(&mut self) -> OrmResult<bool> {
        Ok(self.step_row())
    }

    async fn next_result_set(&mut self) -> OrmResult<bool> {
        Ok(self.step_set())
    }

    fn output(&self, name: &str) -> Option<Value> {
        self.outputs.get(name).cloned()
    }
}
