// Query Executor
// Runs bound queries against the in-memory table catalog.
// The catalog is what the store file holds; see `store` for loading and saving it.

use super::parser::{Projection, Query};
use crate::error::{Error, Result};
use crate::storage::{table::Table, Row, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// The table catalog and the operations on it
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryExecutor {
    tables: BTreeMap<String, Table>,
}

impl QueryExecutor {
    /// An empty database
    pub fn new() -> Self {
        Self::default()
    }

    /// Execute a query whose placeholders have all been bound
    pub fn execute(&mut self, query: Query) -> Result<QueryResult> {
        match query {
            Query::CreateTable {
                name,
                schema,
                if_not_exists,
            } => {
                if self.tables.contains_key(&name) {
                    if if_not_exists {
                        return Ok(QueryResult::Message(format!(
                            "Table '{name}' already exists"
                        )));
                    }
                    return Err(Error::TableExists(name));
                }

                debug!(table = %name, columns = schema.columns.len(), "creating table");
                self.tables
                    .insert(name.clone(), Table::new(name.clone(), schema));
                Ok(QueryResult::Message(format!("Table '{name}' created")))
            }

            Query::DropTable { name, if_exists } => match self.tables.remove(&name) {
                Some(_) => {
                    debug!(table = %name, "dropped table");
                    Ok(QueryResult::Message(format!("Table '{name}' dropped")))
                }
                None if if_exists => Ok(QueryResult::Message(format!(
                    "Table '{name}' does not exist"
                ))),
                None => Err(Error::NoSuchTable(name)),
            },

            Query::Insert {
                table_name,
                columns,
                rows,
            } => {
                let table = self
                    .tables
                    .get_mut(&table_name)
                    .ok_or_else(|| Error::NoSuchTable(table_name.clone()))?;

                // Map each supplied value to its schema position
                let positions = match &columns {
                    Some(columns) => columns
                        .iter()
                        .map(|c| {
                            table
                                .schema
                                .column_index(c)
                                .ok_or_else(|| Error::NoSuchColumn(format!("{table_name}.{c}")))
                        })
                        .collect::<Result<Vec<_>>>()?,
                    None => (0..table.schema.columns.len()).collect(),
                };

                let count = rows.len();
                for row in rows {
                    if row.len() != positions.len() {
                        return Err(Error::ConstraintViolation(format!(
                            "{} values for {} columns",
                            row.len(),
                            positions.len()
                        )));
                    }
                    let mut values = vec![Value::Null; table.schema.columns.len()];
                    for (position, expr) in positions.iter().zip(row) {
                        values[*position] = expr.eval(None)?;
                    }
                    table.insert(values)?;
                }

                Ok(QueryResult::Message(format!(
                    "{count} row(s) inserted into '{table_name}'"
                )))
            }

            Query::Select {
                table_name,
                projection,
                filter,
            } => {
                let table = self
                    .tables
                    .get(&table_name)
                    .ok_or_else(|| Error::NoSuchTable(table_name.clone()))?;

                let rows = table.select(filter.as_ref())?;

                match projection {
                    Projection::All => Ok(QueryResult::Rows {
                        column_names: table.schema().column_names(),
                        rows,
                    }),
                    Projection::Columns(column_names) => {
                        let indices = column_names
                            .iter()
                            .map(|c| {
                                table
                                    .schema()
                                    .column_index(c)
                                    .ok_or_else(|| Error::NoSuchColumn(c.clone()))
                            })
                            .collect::<Result<Vec<_>>>()?;

                        let rows = rows
                            .into_iter()
                            .map(|row| Row {
                                values: indices.iter().map(|&i| row.values[i].clone()).collect(),
                            })
                            .collect();

                        Ok(QueryResult::Rows { column_names, rows })
                    }
                }
            }
        }
    }

    /// Table names in sorted order
    pub fn list_tables(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    /// Make a catalog read back from disk usable: check every table against
    /// its schema, then rebuild the indexes, which are not serialized.
    pub(crate) fn restore(&mut self) -> Result<()> {
        for (name, table) in &mut self.tables {
            if *name != table.name {
                return Err(Error::ConstraintViolation(format!(
                    "table {} is stored under the name {name}",
                    table.name
                )));
            }
            table.validate()?;
            table.rebuild_indexes();
        }
        Ok(())
    }
}

/// Represents the result of a query execution
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    /// Rows returned from a SELECT query
    Rows {
        column_names: Vec<String>,
        rows: Vec<Row>,
    },
    /// A message (for CREATE, DROP, INSERT)
    Message(String),
}

impl QueryResult {
    /// Returned rows; empty for statements that return none
    pub fn rows(&self) -> &[Row] {
        match self {
            QueryResult::Rows { rows, .. } => rows,
            QueryResult::Message(_) => &[],
        }
    }

    /// The values of the first column of every row
    pub fn first_column(&self) -> Vec<Value> {
        self.rows()
            .iter()
            .filter_map(|row| row.values.first().cloned())
            .collect()
    }

    /// Format the result as a box-drawn table (or the message)
    pub fn format(&self) -> String {
        match self {
            QueryResult::Message(msg) => msg.clone(),
            QueryResult::Rows { rows, column_names } => {
                if rows.is_empty() {
                    return "No rows found".to_string();
                }

                let mut widths: Vec<usize> =
                    column_names.iter().map(|c| c.chars().count()).collect();
                for row in rows {
                    for (i, value) in row.values.iter().enumerate() {
                        widths[i] = widths[i].max(value.to_string().chars().count());
                    }
                }

                let border = |left: &str, mid: &str, right: &str| {
                    let cells: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
                    format!("{left}{}{right}\n", cells.join(mid))
                };
                let line = |cells: Vec<String>| {
                    let cells: Vec<String> = cells
                        .iter()
                        .zip(&widths)
                        .map(|(cell, &width)| format!(" {cell:<width$} "))
                        .collect();
                    format!("│{}│\n", cells.join("│"))
                };

                let mut result = border("┌", "┬", "┐");
                result.push_str(&line(column_names.clone()));
                result.push_str(&border("├", "┼", "┤"));
                for row in rows {
                    result.push_str(&line(row.values.iter().map(Value::to_string).collect()));
                }
                result.push_str(&border("└", "┴", "┘"));
                result.push_str(&format!("\n{} row(s) returned", rows.len()));

                result
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Params, QueryParser};

    fn run(db: &mut QueryExecutor, sql: &str, params: Params) -> Result<QueryResult> {
        let query = QueryParser::parse(sql)?.bind(&params)?;
        db.execute(query)
    }

    fn seeded() -> QueryExecutor {
        let mut db = QueryExecutor::new();
        run(
            &mut db,
            "CREATE TABLE users (name TEXT NOT NULL UNIQUE, secret TEXT NOT NULL)",
            Params::default(),
        )
        .unwrap();
        for name in ["Alice", "Bob", "Carol"] {
            run(
                &mut db,
                "INSERT INTO users(name, secret) VALUES(?, ?)",
                Params::positional([name.to_string(), format!("{name} secret info")]),
            )
            .unwrap();
        }
        db
    }

    #[test]
    fn test_select_projection_and_filter() {
        let mut db = seeded();
        let result = run(
            &mut db,
            "SELECT secret FROM users WHERE name = ?",
            Params::positional(["Carol"]),
        )
        .unwrap();

        assert_eq!(result.first_column(), vec![Value::from("Carol secret info")]);
        match result {
            QueryResult::Rows { column_names, .. } => assert_eq!(column_names, vec!["secret"]),
            other => panic!("expected rows, got {other:?}"),
        }
    }

    #[test]
    fn test_create_and_drop_rules() {
        let mut db = seeded();
        assert!(matches!(
            run(&mut db, "CREATE TABLE users (name TEXT)", Params::default()),
            Err(Error::TableExists(_))
        ));
        assert!(run(
            &mut db,
            "CREATE TABLE IF NOT EXISTS users (name TEXT)",
            Params::default()
        )
        .is_ok());

        run(&mut db, "DROP TABLE users", Params::default()).unwrap();
        assert!(db.list_tables().is_empty());
        assert!(matches!(
            run(&mut db, "DROP TABLE users", Params::default()),
            Err(Error::NoSuchTable(_))
        ));
        assert!(run(&mut db, "DROP TABLE IF EXISTS users", Params::default()).is_ok());
    }

    #[test]
    fn test_insert_with_column_subset_fills_nulls() {
        let mut db = QueryExecutor::new();
        run(
            &mut db,
            "CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT)",
            Params::default(),
        )
        .unwrap();
        run(&mut db, "INSERT INTO notes (id) VALUES (1)", Params::default()).unwrap();

        let result = run(
            &mut db,
            "SELECT * FROM notes WHERE body IS NULL",
            Params::default(),
        )
        .unwrap();
        assert_eq!(result.rows().len(), 1);
        assert_eq!(result.rows()[0].values, vec![Value::Integer(1), Value::Null]);
    }

    #[test]
    fn test_unknown_column_and_table() {
        let mut db = seeded();
        assert!(matches!(
            run(&mut db, "SELECT password FROM users", Params::default()),
            Err(Error::NoSuchColumn(_))
        ));
        assert!(matches!(
            run(&mut db, "SELECT * FROM accounts", Params::default()),
            Err(Error::NoSuchTable(_))
        ));
    }

    #[test]
    fn test_format_renders_rows() {
        let mut db = seeded();
        let result = run(&mut db, "SELECT name FROM users", Params::default()).unwrap();
        let text = result.format();

        assert!(text.contains("│ name  │"));
        assert!(text.contains("│ Carol │"));
        assert!(text.ends_with("3 row(s) returned"));
    }

    #[test]
    fn test_restore_rebuilds_indexes_and_rejects_bad_rows() {
        let json = serde_json::to_value(seeded()).unwrap();

        let mut db: QueryExecutor = serde_json::from_value(json.clone()).unwrap();
        db.restore().unwrap();
        let result = run(
            &mut db,
            "SELECT secret FROM users WHERE name = ?",
            Params::positional(["Carol"]),
        )
        .unwrap();
        assert_eq!(result.first_column(), vec![Value::from("Carol secret info")]);

        let mut broken = json;
        broken["tables"]["users"]["pages"]["pages"][0]["rows"][0]["values"] =
            serde_json::json!([]);
        let mut db: QueryExecutor = serde_json::from_value(broken).unwrap();
        assert!(matches!(db.restore(), Err(Error::ConstraintViolation(_))));
    }
}
