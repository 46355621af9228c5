//! Executor traits: the engine's only door to a database.

use crate::command::Command;
use crate::cursor::{AsyncRowCursor, RowCursor, RowValues};
use crate::error::OrmResult;
use crate::value::Value;
use std::future::Future;
use std::sync::Arc;

/// Runs commands and hands back cursors, blocking the calling thread.
///
/// The cursor is owned by the caller; dropping it closes it.
pub trait Executor: Send + Sync {
    /// Owns everything it reads from.
    ///
    /// A cursor must not borrow the connection or handle that produced it:
    /// [`HandlePool`](crate::HandlePool) puts the handle back as soon as
    /// `query` returns, while the mapper is still draining the cursor.
    type Cursor: RowCursor;

    /// Run a command that returns rows.
    fn query(&self, command: &Command) -> OrmResult<Self::Cursor>;

    /// Run a command for its side effects and return the rows affected.
    fn execute(&self, command: &Command) -> OrmResult<u64>;

    /// Run a command and return the first column of its first row.
    ///
    /// `Value::Null` if there are no rows.
    fn scalar(&self, command: &Command) -> OrmResult<Value> {
        let mut cursor = self.query(command)?;
        if !cursor.next_row()? {
            return Ok(Value::Null);
        }
        match cursor.columns().first() {
            Some(column) => cursor.value(column),
            None => Ok(Value::Null),
        }
    }
}

/// Same as [`Executor`], but every database round trip may suspend.
pub trait AsyncExecutor: Send + Sync {
    /// Owns everything it reads from, as [`Executor::Cursor`] does.
    type Cursor: AsyncRowCursor;

    fn query(&self, command: &Command)
    -> impl Future<Output = OrmResult<Self::Cursor>> + Send;

    fn execute(&self, command: &Command) -> impl Future<Output = OrmResult<u64>> + Send;

    fn scalar(&self, command: &Command) -> impl Future<Output = OrmResult<Value>> + Send {
        async move {
            let mut cursor = self.query(command).await?;
            if !cursor.next_row().await? {
                return Ok(Value::Null);
            }
            match cursor.columns().first() {
                Some(column) => cursor.value(column),
                None => Ok(Value::Null),
            }
        }
    }
}

impl<E: Executor + ?Sized> Executor for &E {
    type Cursor = E::Cursor;

    fn query(&self, command: &Command) -> OrmResult<Self::Cursor> {
        (**self).query(command)
    }

    fn execute(&self, command: &Command) -> OrmResult<u64> {
        (**self).execute(command)
    }

    fn scalar(&self, command: &Command) -> OrmResult<Value> {
        (**self).scalar(command)
    }
}

impl<E: Executor + ?Sized> Executor for Arc<E> {
    type Cursor = E::Cursor;

    fn query(&self, command: &Command) -> OrmResult<Self::Cursor> {
        (**self).query(command)
    }

    fn execute(&self, command: &Command) -> OrmResult<u64> {
        (**self).execute(command)
    }

    fn scalar(&self, command: &Command) -> OrmResult<Value> {
        (**self).scalar(command)
    }
}

impl<E: AsyncExecutor> AsyncExecutor for &E {
    type Cursor = E::Cursor;

    fn query(&self, command: &Command) -> impl Future<Output = OrmResult<Self::Cursor>> + Send {
        (**self).query(command)
    }

    fn execute(&self, command: &Command) -> impl Future<Output = OrmResult<u64>> + Send {
        (**self).execute(command)
    }

    fn scalar(&self, command: &Command) -> impl Future<Output = OrmResult<Value>> + Send {
        (**self).scalar(command)
    }
}

impl<E: AsyncExecutor> AsyncExecutor for Arc<E> {
    type Cursor = E::Cursor;

    fn query(&self, command: &Command) -> impl Future<Output = OrmResult<Self::Cursor>> + Send {
        (**self).query(command)
    }

    fn execute(&self, command: &Command) -> impl Future<Output = OrmResult<u64>> + Send {
        (**self).execute(command)
    }

    fn scalar(&self, command: &Command) -> impl Future<Output = OrmResult<Value>> + Send {
        (**self).scalar(command)
    }
}
