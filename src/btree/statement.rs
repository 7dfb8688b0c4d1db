//! Thin statement adapters that drive a table for typed callers. Input
//! validation lives on [`Table`] itself; statements only shape the call.

use eyre::Result;

use super::{Cursor, KeyType, Table};

/// A database operation that does not return results.
pub trait Statement {
    /// Executes this statement.
    fn execute(&self, table: &mut Table) -> Result<()>;
}

/// A database operation that returns a cursor over results.
pub trait Query {
    /// Executes this query.
    fn query<'t>(&self, table: &'t mut Table) -> Result<Cursor<'t>>;
}

/// Inserts a single record.
pub struct InsertStatement {
    key: KeyType,
    value: Vec<u8>,
}

impl InsertStatement {
    pub fn new(key: KeyType, value: Vec<u8>) -> Self {
        Self { key, value }
    }
}

impl Statement for InsertStatement {
    fn execute(&self, table: &mut Table) -> Result<()> {
        table.insert(self.key, &self.value)
    }
}

/// Selects every record in the table. No filtering happens here; callers
/// typically apply a matcher to each value as they drain the cursor.
pub struct SelectStatement;

impl SelectStatement {
    /// An unfiltered select statement for the whole table.
    pub fn entire_table() -> Self {
        SelectStatement
    }
}

impl Query for SelectStatement {
    fn query<'t>(&self, table: &'t mut Table) -> Result<Cursor<'t>> {
        table.start()
    }
}
