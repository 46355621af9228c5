//! Commands handed to executors.

use crate::crud::Crud;
use crate::entity::Entity;
use crate::params::to_parameters;
use crate::value::Value;

/// How an executor should interpret [`Command::text`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Raw statement text.
    Text,
    /// Name of a stored routine.
    StoredProcedure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamDirection {
    Input,
    Output,
}

/// A named command parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub value: Value,
    pub direction: ParamDirection,
}

impl Param {
    pub fn input(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            direction: ParamDirection::Input,
        }
    }

    pub fn output(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Value::Null,
            direction: ParamDirection::Output,
        }
    }

    pub fn is_input(&self) -> bool {
        self.direction == ParamDirection::Input
    }
}

/// Page window for paged routines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page_index: i64,
    pub rows_per_page: i64,
}

impl PageRequest {
    pub const PAGE_INDEX: &'static str = "page_index";
    pub const ROWS_PER_PAGE: &'static str = "rows_per_page";

    pub fn new(page_index: i64, rows_per_page: i64) -> Self {
        Self {
            page_index,
            rows_per_page,
        }
    }

    /// Rows to skip before this page.
    pub fn offset(&self) -> i64 {
        self.page_index.saturating_mul(self.rows_per_page)
    }
}

/// A parameterized command: statement text or routine name plus ordered parameters.
///
/// # Example
///
/// ```ignore
/// let cmd = Command::procedure("get_orders_for_customer")
///     .bind("customer_id", 42_i64)
///     .page(PageRequest::new(0, 20))
///     .output("total_rows");
/// ```
#[derive(Debug, Clone)]
pub struct Command {
    text: String,
    kind: CommandKind,
    params: Vec<Param>,
    signature: Option<String>,
    bypass_column_cache: bool,
    returns_cursors: bool,
}

impl Command {
    pub fn new(text: impl Into<String>, kind: CommandKind) -> Self {
        Self {
            text: text.into(),
            kind,
            params: Vec::new(),
            signature: None,
            bypass_column_cache: false,
            returns_cursors: false,
        }
    }

    /// A raw statement.
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(text, CommandKind::Text)
    }

    /// A stored routine call.
    pub fn procedure(name: impl Into<String>) -> Self {
        Self::new(name, CommandKind::StoredProcedure)
    }

    /// Bind a named input parameter.
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.push(Param::input(name, value));
        self
    }

    /// Bind every field of `source` that takes part in `direction`.
    pub fn bind_entity<T: Entity>(mut self, source: &T, direction: Crud) -> Self {
        self.params.extend(to_parameters(source, direction));
        self
    }

    /// Bind the page window as `page_index` / `rows_per_page`.
    pub fn page(self, page: PageRequest) -> Self {
        self.bind(PageRequest::PAGE_INDEX, page.page_index)
            .bind(PageRequest::ROWS_PER_PAGE, page.rows_per_page)
    }

    /// Declare an output parameter.
    pub fn output(mut self, name: impl Into<String>) -> Self {
        self.params.push(Param::output(name));
        self
    }

    /// Key under which column names are cached. Defaults to the command text.
    pub fn signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    /// Derive column names from the live cursor on every call.
    ///
    /// Needed when one command can return differently shaped results.
    pub fn bypass_column_cache(mut self) -> Self {
        self.bypass_column_cache = true;
        self
    }

    /// The routine returns one refcursor per result set.
    pub fn returns_cursors(mut self) -> Self {
        self.returns_cursors = true;
        self
    }

    pub fn command_text(&self) -> &str {
        &self.text
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn input_params(&self) -> impl Iterator<Item = &Param> {
        self.params.iter().filter(|p| p.is_input())
    }

    pub fn param(&self, name: &str) -> Option<&Param> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn cache_key(&self) -> &str {
        self.signature.as_deref().unwrap_or(&self.text)
    }

    pub fn is_column_cache_bypassed(&self) -> bool {
        self.bypass_column_cache
    }

    pub fn is_cursor_routine(&self) -> bool {
        self.returns_cursors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_binds_window_in_order() {
        let cmd = Command::procedure("list_users")
            .bind("status", "active")
            .page(PageRequest::new(2, 25))
            .output("total");

        let names: Vec<&str> = cmd.params().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["status", "page_index", "rows_per_page", "total"]);
        assert_eq!(cmd.input_params().count(), 3);
        assert_eq!(cmd.param("rows_per_page").unwrap().value, Value::Int(25));
        assert_eq!(PageRequest::new(2, 25).offset(), 50);
    }

    #[test]
    fn signature_defaults_to_text() {
        let cmd = Command::text("SELECT 1");
        assert_eq!(cmd.cache_key(), "SELECT 1");
        assert_eq!(cmd.kind(), CommandKind::Text);
        let cmd = cmd.signature("probe").bypass_column_cache();
        assert_eq!(cmd.cache_key(), "probe");
        assert!(cmd.is_column_cache_bypassed());
    }
}
