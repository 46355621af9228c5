#![allow(dead_code)]

use procmap::{
    AsyncExecutor, Command, Entity, Executor, MemoryCursor, OrmError, OrmResult, ResultSet,
};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default, Clone, PartialEq, Entity)]
pub struct Customer {
    #[orm(identity)]
    pub id: i64,
    pub name: String,
    #[orm(column = "email_address")]
    pub email: Option<String>,
    #[orm(crud = "create")]
    pub password: String,
    pub orders: Vec<Order>,
}

#[derive(Debug, Default, Clone, PartialEq, Entity)]
pub struct Order {
    #[orm(identity)]
    pub id: i64,
    #[orm(foreign_key = "Customer.id")]
    pub customer_id: i64,
    pub amount: Decimal,
}

/// Canned responses keyed by command text.
#[derive(Clone, Default)]
pub struct ScriptedExecutor {
    cursors: Arc<Mutex<HashMap<String, MemoryCursor>>>,
    affected: Arc<Mutex<HashMap<String, u64>>>,
    seen: Arc<Mutex<Vec<Command>>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, command: &str, cursor: MemoryCursor) -> Self {
        self.cursors
            .lock()
            .unwrap()
            .insert(command.to_string(), cursor);
        self
    }

    pub fn on_set(self, command: &str, set: ResultSet) -> Self {
        self.on(command, MemoryCursor::single(set))
    }

    pub fn on_execute(self, command: &str, rows: u64) -> Self {
        self.affected
            .lock()
            .unwrap()
            .insert(command.to_string(), rows);
        self
    }

    /// Commands received so far, in order.
    pub fn seen(&self) -> Vec<Command> {
        self.seen.lock().unwrap().clone()
    }

    fn respond(&self, command: &Command) -> OrmResult<MemoryCursor> {
        self.seen.lock().unwrap().push(command.clone());
        self.cursors
            .lock()
            .unwrap()
            .get(command.command_text())
            .cloned()
            .ok_or_else(|| OrmError::Other(format!("no script for `{}`", command.command_text())))
    }

    fn affected(&self, command: &Command) -> OrmResult<u64> {
        self.seen.lock().unwrap().push(command.clone());
        self.affected
            .lock()
            .unwrap()
            .get(command.command_text())
            .copied()
            .ok_or_else(|| OrmError::Other(format!("no script for `{}`", command.command_text())))
    }
}

impl Executor for ScriptedExecutor {
    type Cursor = MemoryCursor;

    fn query(&self, command: &Command) -> OrmResult<MemoryCursor> {
        self.respond(command)
    }

    fn execute(&self, command: &Command) -> OrmResult<u64> {
        self.affected(command)
    }
}

impl AsyncExecutor for ScriptedExecutor {
    type Cursor = MemoryCursor;

    async fn query(&self, command: &Command) -> OrmResult<MemoryCursor> {
        self.respond(command)
    }

    async fn execute(&self, command: &Command) -> OrmResult<u64> {
        self.affected(command)
    }
}

pub fn customers_set(rows: &[(i64, &str)]) -> ResultSet {
    rows.iter().fold(
        ResultSet::new(["id", "name", "email_address"]),
        |set, (id, name)| set.row([(*id).into(), (*name).into(), procmap::Value::Null]),
    )
}

pub fn orders_set(rows: &[(i64, i64)]) -> ResultSet {
    rows.iter()
        .fold(ResultSet::new(["id", "customer_id", "amount"]), |set, (id, customer)| {
            set.row([(*id).into(), (*customer).into(), procmap::Value::from(Decimal::from(*id))])
        })
}
