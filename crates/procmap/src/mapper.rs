//! Public entry points: run a command through an executor and map its results.
//!
//! [`Mapper`] blocks, [`AsyncMapper`] suspends at database I/O. Both feed rows
//! through the same reader, so mapping behaves identically. Every
//! failure leaves through [`MapError`], naming the mapped type and the command.

use crate::columns::{ColumnNameCache, ColumnNames};
use crate::command::Command;
use crate::config::MapperConfig;
use crate::cursor::{AsyncRowCursor, RowCursor, RowValues};
use crate::entity::Entity;
use crate::error::{MapError, MapResult, OrmError, OrmResult};
use crate::executor::{AsyncExecutor, Executor};
use crate::join::JoinedSet;
use crate::loader::{ColumnLookup, RowLoader};
use crate::page::ObjectListResult;
use crate::relation::correlate;
use crate::value::{FieldValue, Value};
use std::any::type_name;
use std::time::Instant;

// ============================================================================
// Shared reading
// ============================================================================

/// Per-call reading state shared by both mapper flavours.
struct ResultReader<'a> {
    config: &'a MapperConfig,
    command: &'a Command,
}

impl<'a> ResultReader<'a> {
    fn new(config: &'a MapperConfig, command: &'a Command) -> Self {
        Self { config, command }
    }

    fn columns(&self, index: usize, live: impl FnOnce() -> Vec<String>) -> ColumnNames {
        let bypass = !self.config.column_cache || self.command.is_column_cache_bypassed();
        ColumnNameCache::global().resolve(self.command.cache_key(), index, bypass, live)
    }

    fn set<T: Entity>(&self, index: usize, live: impl FnOnce() -> Vec<String>) -> SetReader<T> {
        SetReader::new(&self.columns(index, live))
    }

    fn read<T: Entity, C: RowCursor>(&self, cursor: &mut C, index: usize) -> OrmResult<Vec<T>> {
        let mut set = self.set::<T>(index, || cursor.columns());
        while cursor.next_row()? {
            set.push(&*cursor)?;
        }
        Ok(set.finish())
    }

    /// Advance to result set `index` and read it; no such set reads as empty.
    fn read_next<T: Entity, C: RowCursor>(
        &self,
        cursor: &mut C,
        index: usize,
    ) -> OrmResult<Vec<T>> {
        if cursor.next_result_set()? {
            self.read(cursor, index)
        } else {
            Ok(Vec::new())
        }
    }

    async fn read_async<T: Entity, C: AsyncRowCursor>(
        &self,
        cursor: &mut C,
        index: usize,
    ) -> OrmResult<Vec<T>> {
        let mut set = self.set::<T>(index, || cursor.columns());
        while cursor.next_row().await? {
            set.push(&*cursor)?;
        }
        Ok(set.finish())
    }

    async fn read_next_async<T: Entity, C: AsyncRowCursor>(
        &self,
        cursor: &mut C,
        index: usize,
    ) -> OrmResult<Vec<T>> {
        if cursor.next_result_set().await? {
            self.read_async(cursor, index).await
        } else {
            Ok(Vec::new())
        }
    }

    fn first_column(&self, live: impl FnOnce() -> Vec<String>) -> Option<String> {
        self.columns(0, live).first().cloned()
    }
}

/// Collects the `T`s of one result set.
struct SetReader<T: 'static> {
    loader: RowLoader<T>,
    items: Vec<T>,
    watch: Option<String>,
    watched: Option<Value>,
    columns: ColumnNames,
}

impl<T: Entity> SetReader<T> {
    fn new(columns: &ColumnNames) -> Self {
        Self {
            loader: RowLoader::new(columns),
            items: Vec::new(),
            watch: None,
            watched: None,
            columns: columns.clone(),
        }
    }

    /// Also capture the first row's value of `column`, if the result carries it.
    fn watch(mut self, column: &str) -> Self {
        self.watch = ColumnLookup::new(&self.columns)
            .find(column)
            .map(str::to_string);
        self
    }

    fn push(&mut self, row: &impl RowValues) -> OrmResult<()> {
        if self.items.is_empty() {
            if let Some(column) = &self.watch {
                self.watched = Some(row.value(column)?);
            }
        }
        self.items.push(self.loader.load_new(row)?);
        Ok(())
    }

    fn finish(self) -> Vec<T> {
        tracing::trace!(
            target: "procmap.command",
            rows = self.items.len(),
            fields = self.loader.mapped_fields().count(),
            "mapped result set"
        );
        self.items
    }
}

fn decode_scalar<V: FieldValue>(column: &str, value: Value) -> OrmResult<V> {
    V::from_value(value).map_err(|e| match e {
        OrmError::Decode { message, .. } => OrmError::decode(column, message),
        other => other,
    })
}

fn page_total(output: Option<Value>, watched: Option<Value>) -> i64 {
    output
        .filter(|v| !v.is_null())
        .or(watched)
        .and_then(|v| v.as_i64())
        .unwrap_or(0)
}

/// Logs one command and turns its root cause into a [`MapError`].
struct Trace<'a> {
    config: &'a MapperConfig,
    command: &'a Command,
    started: Instant,
}

impl<'a> Trace<'a> {
    fn start(config: &'a MapperConfig, command: &'a Command) -> Self {
        if config.log_commands {
            tracing::debug!(
                target: "procmap.command",
                kind = ?command.kind(),
                param_count = command.params().len(),
                command = %config.log_text(command.command_text()),
                "running command"
            );
        }
        Self {
            config,
            command,
            started: Instant::now(),
        }
    }

    fn finish<R>(self, type_name: &'static str, result: OrmResult<R>) -> MapResult<R> {
        let elapsed = self.started.elapsed();
        if let Some(threshold) = self.config.slow_command_threshold {
            if elapsed > threshold {
                tracing::warn!(
                    target: "procmap.command",
                    elapsed_ms = elapsed.as_millis() as u64,
                    threshold_ms = threshold.as_millis() as u64,
                    command = %self.config.log_text(self.command.command_text()),
                    "slow command"
                );
            }
        }
        result.map_err(|source| {
            tracing::debug!(
                target: "procmap.command",
                mapped_type = type_name,
                command = %self.config.log_text(self.command.command_text()),
                error = %source,
                "command failed"
            );
            MapError::new(type_name, self.command.command_text(), source)
        })
    }
}

// ============================================================================
// Blocking mapper
// ============================================================================

/// Maps command results through a blocking [`Executor`].
///
/// # Example
///
/// ```ignore
/// let mapper = Mapper::new(HandlePool::new(|| open_connection()));
/// let users: Vec<User> = mapper.fetch_all(&Command::procedure("list_users"))?;
/// ```
#[derive(Debug)]
pub struct Mapper<E> {
    executor: E,
    config: MapperConfig,
}

impl<E: Executor> Mapper<E> {
    pub fn new(executor: E) -> Self {
        Self::with_config(executor, MapperConfig::default())
    }

    pub fn with_config(executor: E, config: MapperConfig) -> Self {
        Self { executor, config }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    fn run<R>(
        &self,
        type_name: &'static str,
        command: &Command,
        body: impl FnOnce(&ResultReader<'_>) -> OrmResult<R>,
    ) -> MapResult<R> {
        let trace = Trace::start(&self.config, command);
        let result = body(&ResultReader::new(&self.config, command));
        trace.finish(type_name, result)
    }

    /// The first row as a `T`, or `None` if there are no rows.
    pub fn fetch_one<T: Entity>(&self, command: &Command) -> MapResult<Option<T>> {
        self.run(type_name::<T>(), command, |reader| {
            let mut cursor = self.executor.query(command)?;
            let set = reader.set::<T>(0, || cursor.columns());
            if !cursor.next_row()? {
                return Ok(None);
            }
            set.loader.load_new(&cursor).map(Some)
        })
    }

    /// Load the first row into an existing `target`. Returns whether there was a row.
    pub fn fetch_one_into<T: Entity>(&self, command: &Command, target: &mut T) -> MapResult<bool> {
        self.run(type_name::<T>(), command, |reader| {
            let mut cursor = self.executor.query(command)?;
            let set = reader.set::<T>(0, || cursor.columns());
            if !cursor.next_row()? {
                return Ok(false);
            }
            set.loader.load(&cursor, target)?;
            Ok(true)
        })
    }

    /// Every row of the first result set, in order.
    pub fn fetch_all<T: Entity>(&self, command: &Command) -> MapResult<Vec<T>> {
        self.run(type_name::<T>(), command, |reader| {
            let mut cursor = self.executor.query(command)?;
            reader.read(&mut cursor, 0)
        })
    }

    /// One page of `T` plus the total reported under `total`.
    ///
    /// The total is read from the output parameter `total` once the rows are
    /// drained, falling back to a `total` column on the first row, else 0.
    pub fn fetch_page<T: Entity>(
        &self,
        command: &Command,
        total: &str,
    ) -> MapResult<ObjectListResult<T>> {
        self.run(type_name::<T>(), command, |reader| {
            let mut cursor = self.executor.query(command)?;
            let mut set = reader.set::<T>(0, || cursor.columns()).watch(total);
            while cursor.next_row()? {
                set.push(&cursor)?;
            }
            while cursor.next_result_set()? {}
            let watched = set.watched.take();
            let virtual_total = page_total(cursor.output(total), watched);
            Ok(ObjectListResult::new(set.finish(), virtual_total))
        })
    }

    /// The first column of every row. NULL cells are skipped.
    pub fn fetch_scalars<V: FieldValue>(&self, command: &Command) -> MapResult<Vec<V>> {
        self.run(type_name::<V>(), command, |reader| {
            let mut cursor = self.executor.query(command)?;
            let Some(column) = reader.first_column(|| cursor.columns()) else {
                return Ok(Vec::new());
            };
            let mut values = Vec::new();
            while cursor.next_row()? {
                let value = cursor.value(&column)?;
                if !value.is_null() {
                    values.push(decode_scalar(&column, value)?);
                }
            }
            Ok(values)
        })
    }

    /// The first column of the first row.
    pub fn scalar<V: FieldValue>(&self, command: &Command) -> MapResult<V> {
        self.run(type_name::<V>(), command, |_| {
            let value = self.executor.scalar(command)?;
            decode_scalar(command.command_text(), value)
        })
    }

    /// Run for side effects; returns the rows affected.
    pub fn execute(&self, command: &Command) -> MapResult<u64> {
        self.run(type_name::<u64>(), command, |_| self.executor.execute(command))
    }

    /// Parents from result set 0, children from result set 1, correlated.
    pub fn fetch_related<P: Entity, C: Entity>(&self, command: &Command) -> MapResult<Vec<P>> {
        self.run(type_name::<P>(), command, |reader| {
            let mut cursor = self.executor.query(command)?;
            let mut parents = reader.read::<P, _>(&mut cursor, 0)?;
            let children = reader.read_next::<C, _>(&mut cursor, 1)?;
            correlate(&mut parents, &children)?;
            Ok(parents)
        })
    }

    /// Parents from result set 0, two child types from sets 1 and 2.
    pub fn fetch_related2<P: Entity, C1: Entity, C2: Entity>(
        &self,
        command: &Command,
    ) -> MapResult<Vec<P>> {
        self.run(type_name::<P>(), command, |reader| {
            let mut cursor = self.executor.query(command)?;
            let mut parents = reader.read::<P, _>(&mut cursor, 0)?;
            let first = reader.read_next::<C1, _>(&mut cursor, 1)?;
            let second = reader.read_next::<C2, _>(&mut cursor, 2)?;
            correlate(&mut parents, &first)?;
            correlate(&mut parents, &second)?;
            Ok(parents)
        })
    }

    /// Parents from result set 0, three child types from sets 1 to 3.
    pub fn fetch_related3<P: Entity, C1: Entity, C2: Entity, C3: Entity>(
        &self,
        command: &Command,
    ) -> MapResult<Vec<P>> {
        self.run(type_name::<P>(), command, |reader| {
            let mut cursor = self.executor.query(command)?;
            let mut parents = reader.read::<P, _>(&mut cursor, 0)?;
            let first = reader.read_next::<C1, _>(&mut cursor, 1)?;
            let second = reader.read_next::<C2, _>(&mut cursor, 2)?;
            let third = reader.read_next::<C3, _>(&mut cursor, 3)?;
            correlate(&mut parents, &first)?;
            correlate(&mut parents, &second)?;
            correlate(&mut parents, &third)?;
            Ok(parents)
        })
    }

    /// Distinct parents and children from one flattened join, correlated.
    pub fn fetch_joined<P: Entity, C: Entity>(&self, command: &Command) -> MapResult<Vec<P>> {
        self.run(type_name::<P>(), command, |reader| {
            let mut cursor = self.executor.query(command)?;
            let columns = reader.columns(0, || cursor.columns());
            let mut parents = JoinedSet::<P>::new(&columns)?;
            let mut children = JoinedSet::<C>::new(&columns)?;
            while cursor.next_row()? {
                parents.accept(&cursor)?;
                children.accept(&cursor)?;
            }
            let mut parents = parents.into_items();
            correlate(&mut parents, &children.into_items())?;
            Ok(parents)
        })
    }

    /// Flattened join over a parent and two child types.
    pub fn fetch_joined2<P: Entity, C1: Entity, C2: Entity>(
        &self,
        command: &Command,
    ) -> MapResult<Vec<P>> {
        self.run(type_name::<P>(), command, |reader| {
            let mut cursor = self.executor.query(command)?;
            let columns = reader.columns(0, || cursor.columns());
            let mut parents = JoinedSet::<P>::new(&columns)?;
            let mut first = JoinedSet::<C1>::new(&columns)?;
            let mut second = JoinedSet::<C2>::new(&columns)?;
            while cursor.next_row()? {
                parents.accept(&cursor)?;
                first.accept(&cursor)?;
                second.accept(&cursor)?;
            }
            let mut parents = parents.into_items();
            correlate(&mut parents, &first.into_items())?;
            correlate(&mut parents, &second.into_items())?;
            Ok(parents)
        })
    }
}

// ============================================================================
// Async mapper
// ============================================================================

/// Maps command results through an [`AsyncExecutor`].
///
/// Same operations and semantics as [`Mapper`]; only cursor movement and
/// command execution suspend.
#[derive(Debug)]
pub struct AsyncMapper<E> {
    executor: E,
    config: MapperConfig,
}

impl<E: AsyncExecutor> AsyncMapper<E> {
    pub fn new(executor: E) -> Self {
        Self::with_config(executor, MapperConfig::default())
    }

    pub fn with_config(executor: E, config: MapperConfig) -> Self {
        Self { executor, config }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    pub async fn fetch_one<T: Entity>(&self, command: &Command) -> MapResult<Option<T>> {
        let trace = Trace::start(&self.config, command);
        let reader = ResultReader::new(&self.config, command);
        let result: OrmResult<_> = async {
            let mut cursor = self.executor.query(command).await?;
            let set = reader.set::<T>(0, || cursor.columns());
            if !cursor.next_row().await? {
                return Ok(None);
            }
            set.loader.load_new(&cursor).map(Some)
        }
        .await;
        trace.finish(type_name::<T>(), result)
    }

    pub async fn fetch_one_into<T: Entity>(
        &self,
        command: &Command,
        target: &mut T,
    ) -> MapResult<bool> {
        let trace = Trace::start(&self.config, command);
        let reader = ResultReader::new(&self.config, command);
        let result: OrmResult<_> = async {
            let mut cursor = self.executor.query(command).await?;
            let set = reader.set::<T>(0, || cursor.columns());
            if !cursor.next_row().await? {
                return Ok(false);
            }
            set.loader.load(&cursor, target)?;
            Ok(true)
        }
        .await;
        trace.finish(type_name::<T>(), result)
    }

    pub async fn fetch_all<T: Entity>(&self, command: &Command) -> MapResult<Vec<T>> {
        let trace = Trace::start(&self.config, command);
        let reader = ResultReader::new(&self.config, command);
        let result: OrmResult<_> = async {
            let mut cursor = self.executor.query(command).await?;
            reader.read_async(&mut cursor, 0).await
        }
        .await;
        trace.finish(type_name::<T>(), result)
    }

    pub async fn fetch_page<T: Entity>(
        &self,
        command: &Command,
        total: &str,
    ) -> MapResult<ObjectListResult<T>> {
        let trace = Trace::start(&self.config, command);
        let reader = ResultReader::new(&self.config, command);
        let result: OrmResult<_> = async {
            let mut cursor = self.executor.query(command).await?;
            let mut set = reader.set::<T>(0, || cursor.columns()).watch(total);
            while cursor.next_row().await? {
                set.push(&cursor)?;
            }
            while cursor.next_result_set().await? {}
            let watched = set.watched.take();
            let virtual_total = page_total(cursor.output(total), watched);
            Ok(ObjectListResult::new(set.finish(), virtual_total))
        }
        .await;
        trace.finish(type_name::<T>(), result)
    }

    pub async fn fetch_scalars<V: FieldValue>(&self, command: &Command) -> MapResult<Vec<V>> {
        let trace = Trace::start(&self.config, command);
        let reader = ResultReader::new(&self.config, command);
        let result: OrmResult<_> = async {
            let mut cursor = self.executor.query(command).await?;
            let Some(column) = reader.first_column(|| cursor.columns()) else {
                return Ok(Vec::new());
            };
            let mut values = Vec::new();
            while cursor.next_row().await? {
                let value = cursor.value(&column)?;
                if !value.is_null() {
                    values.push(decode_scalar(&column, value)?);
                }
            }
            Ok(values)
        }
        .await;
        trace.finish(type_name::<V>(), result)
    }

    pub async fn scalar<V: FieldValue>(&self, command: &Command) -> MapResult<V> {
        let trace = Trace::start(&self.config, command);
        let result = match self.executor.scalar(command).await {
            Ok(value) => decode_scalar(command.command_text(), value),
            Err(e) => Err(e),
        };
        trace.finish(type_name::<V>(), result)
    }

    pub async fn execute(&self, command: &Command) -> MapResult<u64> {
        let trace = Trace::start(&self.config, command);
        let result = self.executor.execute(command).await;
        trace.finish(type_name::<u64>(), result)
    }

    pub async fn fetch_related<P: Entity, C: Entity>(
        &self,
        command: &Command,
    ) -> MapResult<Vec<P>> {
        let trace = Trace::start(&self.config, command);
        let reader = ResultReader::new(&self.config, command);
        let result: OrmResult<_> = async {
            let mut cursor = self.executor.query(command).await?;
            let mut parents = reader.read_async::<P, _>(&mut cursor, 0).await?;
            let children = reader.read_next_async::<C, _>(&mut cursor, 1).await?;
            correlate(&mut parents, &children)?;
            Ok(parents)
        }
        .await;
        trace.finish(type_name::<P>(), result)
    }

    pub async fn fetch_related2<P: Entity, C1: Entity, C2: Entity>(
        &self,
        command: &Command,
    ) -> MapResult<Vec<P>> {
        let trace = Trace::start(&self.config, command);
        let reader = ResultReader::new(&self.config, command);
        let result: OrmResult<_> = async {
            let mut cursor = self.executor.query(command).await?;
            let mut parents = reader.read_async::<P, _>(&mut cursor, 0).await?;
            let first = reader.read_next_async::<C1, _>(&mut cursor, 1).await?;
            let second = reader.read_next_async::<C2, _>(&mut cursor, 2).await?;
            correlate(&mut parents, &first)?;
            correlate(&mut parents, &second)?;
            Ok(parents)
        }
        .await;
        trace.finish(type_name::<P>(), result)
    }

    pub async fn fetch_related3<P: Entity, C1: Entity, C2: Entity, C3: Entity>(
        &self,
        command: &Command,
    ) -> MapResult<Vec<P>> {
        let trace = Trace::start(&self.config, command);
        let reader = ResultReader::new(&self.config, command);
        let result: OrmResult<_> = async {
            let mut cursor = self.executor.query(command).await?;
            let mut parents = reader.read_async::<P, _>(&mut cursor, 0).await?;
            let first = reader.read_next_async::<C1, _>(&mut cursor, 1).await?;
            let second = reader.read_next_async::<C2, _>(&mut cursor, 2).await?;
            let third = reader.read_next_async::<C3, _>(&mut cursor, 3).await?;
            correlate(&mut parents, &first)?;
            correlate(&mut parents, &second)?;
            correlate(&mut parents, &third)?;
            Ok(parents)
        }
        .await;
        trace.finish(type_name::<P>(), result)
    }

    pub async fn fetch_joined<P: Entity, C: Entity>(&self, command: &Command) -> MapResult<Vec<P>> {
        let trace = Trace::start(&self.config, command);
        let reader = ResultReader::new(&self.config, command);
        let result: OrmResult<_> = async {
            let mut cursor = self.executor.query(command).await?;
            let columns = reader.columns(0, || cursor.columns());
            let mut parents = JoinedSet::<P>::new(&columns)?;
            let mut children = JoinedSet::<C>::new(&columns)?;
            while cursor.next_row().await? {
                parents.accept(&cursor)?;
                children.accept(&cursor)?;
            }
            let mut parents = parents.into_items();
            correlate(&mut parents, &children.into_items())?;
            Ok(parents)
        }
        .await;
        trace.finish(type_name::<P>(), result)
    }

    pub async fn fetch_joined2<P: Entity, C1: Entity, C2: Entity>(
        &self,
        command: &Command,
    ) -> MapResult<Vec<P>> {
        let trace = Trace::start(&self.config, command);
        let reader = ResultReader::new(&self.config, command);
        let result: OrmResult<_> = async {
            let mut cursor = self.executor.query(command).await?;
            let columns = reader.columns(0, || cursor.columns());
            let mut parents = JoinedSet::<P>::new(&columns)?;
            let mut first = JoinedSet::<C1>::new(&columns)?;
            let mut second = JoinedSet::<C2>::new(&columns)?;
            while cursor.next_row().await? {
                parents.accept(&cursor)?;
                first.accept(&cursor)?;
                second.accept(&cursor)?;
            }
            let mut parents = parents.into_items();
            correlate(&mut parents, &first.into_items())?;
            correlate(&mut parents, &second.into_items())?;
            Ok(parents)
        }
        .await;
        trace.finish(type_name::<P>(), result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_total_prefers_output_then_column() {
        assert_eq!(page_total(Some(Value::Int(5)), Some(Value::Int(9))), 5);
        assert_eq!(page_total(Some(Value::Null), Some(Value::Int(9))), 9);
        assert_eq!(page_total(None, None), 0);
        assert_eq!(page_total(None, Some(Value::from("x"))), 0);
    }

    #[test]
    fn scalar_decode_failure_names_the_column() {
        let err = decode_scalar::<i64>("total", Value::from("many")).unwrap_err();
        assert!(matches!(err, OrmError::Decode { ref column, .. } if column == "total"));
    }
}
