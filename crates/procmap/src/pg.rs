//! PostgreSQL executor over a `deadpool-postgres` pool.
//!
//! Text commands run as written, with input parameters bound positionally as
//! `$1..$n`. Stored routines are called as set-returning functions using named
//! notation:
//!
//! ```text
//! SELECT * FROM get_orders(customer_id => $1, page_index => $2, rows_per_page => $3)
//! ```
//!
//! A routine marked [`Command::returns_cursors`] returns one `refcursor` per
//! result set; the executor opens a transaction, reads the cursor names, and
//! `FETCH ALL`s each one in order.

mod convert;

use crate::command::{Command, CommandKind};
use crate::cursor::{AsyncRowCursor, RowValues};
use crate::error::{OrmError, OrmResult};
use crate::executor::AsyncExecutor;
use crate::value::Value;
use convert::{CursorName, cell};
use deadpool_postgres::Pool;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

/// [`AsyncExecutor`] backed by a `deadpool_postgres::Pool`.
///
/// Each operation checks a connection out of the pool for its duration; the
/// connection goes back when the operation completes or fails.
#[derive(Clone)]
pub struct PgExecutor {
    pool: Pool,
}

impl PgExecutor {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }
}

impl std::fmt::Debug for PgExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgExecutor")
            .field("status", &self.pool.status())
            .finish()
    }
}

impl AsyncExecutor for PgExecutor {
    type Cursor = PgCursor;

    async fn query(&self, command: &Command) -> OrmResult<PgCursor> {
        let sql = render_sql(command);
        let params = bind_params(command);
        let mut client = self.pool.get().await?;

        if command.is_cursor_routine() {
            let tx = client.transaction().await?;
            let names = tx.query(sql.as_str(), &params).await?;
            let mut sets = Vec::with_capacity(names.len());
            for row in &names {
                let Some(CursorName(name)) = row.try_get::<_, Option<CursorName>>(0)? else {
                    continue;
                };
                let stmt = tx.prepare(&format!("FETCH ALL FROM {}", quote_ident(&name))).await?;
                let rows = tx.query(&stmt, &[]).await?;
                sets.push(PgResultSet::new(column_names(stmt.columns()), rows));
            }
            tx.commit().await?;
            return Ok(PgCursor::new(sets));
        }

        let stmt = client.prepare_cached(&sql).await?;
        let rows = client.query(&stmt, &params).await?;
        Ok(PgCursor::new(vec![PgResultSet::new(
            column_names(stmt.columns()),
            rows,
        )]))
    }

    async fn execute(&self, command: &Command) -> OrmResult<u64> {
        let sql = render_sql(command);
        let params = bind_params(command);
        let client = self.pool.get().await?;
        let stmt = client.prepare_cached(&sql).await?;
        Ok(client.execute(&stmt, &params).await?)
    }
}

/// Statement text for `command`.
pub fn render_sql(command: &Command) -> String {
    match command.kind() {
        CommandKind::Text => command.command_text().to_string(),
        CommandKind::StoredProcedure => {
            let args: Vec<String> = command
                .input_params()
                .enumerate()
                .map(|(i, p)| {
                    if p.name.is_empty() {
                        format!("${}", i + 1)
                    } else {
                        format!("{} => ${}", p.name, i + 1)
                    }
                })
                .collect();
            format!(
                "SELECT * FROM {}({})",
                command.command_text(),
                args.join(", ")
            )
        }
    }
}

fn bind_params(command: &Command) -> Vec<&(dyn ToSql + Sync)> {
    command
        .input_params()
        .map(|p| &p.value as &(dyn ToSql + Sync))
        .collect()
}

fn column_names(columns: &[tokio_postgres::Column]) -> Vec<String> {
    columns.iter().map(|c| c.name().to_string()).collect()
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

struct PgResultSet {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl PgResultSet {
    fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }
}

/// Cursor over the rows a [`PgExecutor`] fetched.
///
/// Rows stay in wire form; a cell is converted to a [`Value`] only when the
/// loader asks for its column.
pub struct PgCursor {
    sets: Vec<PgResultSet>,
    set: usize,
    row: Option<usize>,
}

impl PgCursor {
    fn new(sets: Vec<PgResultSet>) -> Self {
        Self {
            sets,
            set: 0,
            row: None,
        }
    }

    /// Number of result sets fetched.
    pub fn result_set_count(&self) -> usize {
        self.sets.len()
    }
}

impl RowValues for PgCursor {
    fn value(&self, column: &str) -> OrmResult<Value> {
        let set = self
            .sets
            .get(self.set)
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
        cell(row, idx)
    }
}

impl AsyncRowCursor for PgCursor {
    fn columns(&self) -> Vec<String> {
        self.sets
            .get(self.set)
            .map(|s| s.columns.clone())
            .unwrap_or_default()
    }

    async fn next_row(&mut self) -> OrmResult<bool> {
        let Some(len) = self.sets.get(self.set).map(|s| s.rows.len()) else {
            return Ok(false);
        };
        let next = self.row.map_or(0, |r| r + 1);
        self.row = Some(next.min(len));
        Ok(next < len)
    }

    async fn next_result_set(&mut self) -> OrmResult<bool> {
        if self.set + 1 < self.sets.len() {
            self.set += 1;
            self.row = None;
            Ok(true)
        } else {
            self.set = self.sets.len();
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::PageRequest;

    #[test]
    fn text_commands_render_verbatim() {
        let cmd = Command::text("SELECT id FROM users WHERE id = $1").bind("id", 1_i64);
        assert_eq!(render_sql(&cmd), "SELECT id FROM users WHERE id = $1");
        assert_eq!(bind_params(&cmd).len(), 1);
    }

    #[test]
    fn routines_use_named_notation_for_inputs_only() {
        let cmd = Command::procedure("get_orders")
            .bind("customer_id", 42_i64)
            .page(PageRequest::new(0, 20))
            .output("total_rows");
        assert_eq!(
            render_sql(&cmd),
            "SELECT * FROM get_orders(customer_id => $1, page_index => $2, rows_per_page => $3)"
        );
        assert_eq!(bind_params(&cmd).len(), 3);
    }

    #[test]
    fn routine_without_params() {
        assert_eq!(
            render_sql(&Command::procedure("list_users")),
            "SELECT * FROM list_users()"
        );
    }

    #[test]
    fn cursor_names_are_quoted() {
        assert_eq!(quote_ident("<unnamed portal 1>"), "\"<unnamed portal 1>\"");
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
    }

    #[tokio::test]
    async fn empty_cursor_has_no_rows() {
        let mut cur = PgCursor::new(vec![PgResultSet::new(vec!["id".into()], Vec::new())]);
        assert_eq!(cur.columns(), ["id"]);
        assert!(!cur.next_row().await.unwrap());
        assert!(cur.value("id").is_err());
        assert!(!cur.next_result_set().await.unwrap());
        assert!(cur.columns().is_empty());
    }
}
