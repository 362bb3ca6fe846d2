// Table implementation
// A table combines its schema, paged rows and the indexes over its unique columns

use super::{btree::BTreeIndex, page::PageManager, Column, Row, Schema, Value};
use crate::error::{Error, Result};
use crate::query::expr::{Expr, RowContext};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

const ROWS_PER_PAGE: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub schema: Schema,
    pages: PageManager,
    /// Rebuilt from the pages after loading, never persisted
    #[serde(skip)]
    indexes: HashMap<String, BTreeIndex>,
}

impl Table {
    pub fn new(name: String, schema: Schema) -> Self {
        let mut table = Self {
            name,
            schema,
            pages: PageManager::new(ROWS_PER_PAGE),
            indexes: HashMap::new(),
        };
        table.rebuild_indexes();
        table
    }

    /// Index every unique column from the stored rows
    pub fn rebuild_indexes(&mut self) {
        self.indexes.clear();

        for (col_index, column) in self.schema.columns.iter().enumerate() {
            if !column.is_unique() {
                continue;
            }
            let mut index = BTreeIndex::new();
            for (row_id, row) in self.pages.scan() {
                if let Some(value) = row.values.get(col_index) {
                    index.insert(value.clone(), row_id);
                }
            }
            self.indexes.insert(column.name.clone(), index);
        }
    }

    /// Insert one full row (values in schema order). Returns the row id.
    pub fn insert(&mut self, values: Vec<Value>) -> Result<usize> {
        if values.len() != self.schema.columns.len() {
            return Err(Error::ConstraintViolation(format!(
                "table {} has {} columns but {} values were supplied",
                self.name,
                self.schema.columns.len(),
                values.len()
            )));
        }

        for (column, value) in self.schema.columns.iter().zip(&values) {
            self.check_value(column, value)?;
            // SQL lets any number of NULLs share a unique column
            if value.is_null() {
                continue;
            }
            if let Some(index) = self.indexes.get(&column.name) {
                if index.contains(value) {
                    return Err(self.unique_violation(column));
                }
            }
        }

        let row = Row { values };
        let row_id = self.pages.append(row.clone());

        for (column, value) in self.schema.columns.iter().zip(row.values) {
            if let Some(index) = self.indexes.get_mut(&column.name) {
                index.insert(value, row_id);
            }
        }

        Ok(row_id)
    }

    /// Rows matching `filter` (all rows when `None`), in insertion order.
    /// `indexed_column = literal` filters are answered from the index.
    pub fn select(&self, filter: Option<&Expr>) -> Result<Vec<Row>> {
        let Some(filter) = filter else {
            return Ok(self.pages.scan().map(|(_, row)| row.clone()).collect());
        };

        // `col = NULL` is never true, so it must not hit the index
        if let Some((column, value)) = filter.equality_lookup().filter(|(_, v)| !v.is_null()) {
            if let Some(index) = self.indexes.get(column) {
                return Ok(index
                    .lookup(value)
                    .iter()
                    .filter_map(|&row_id| self.pages.get(row_id))
                    .cloned()
                    .collect());
            }
        }

        let mut rows = Vec::new();
        for (_, row) in self.pages.scan() {
            let ctx = RowContext {
                schema: &self.schema,
                row,
            };
            if filter.matches(ctx)? {
                rows.push(row.clone());
            }
        }
        Ok(rows)
    }

    pub fn row_count(&self) -> usize {
        self.pages.total_rows()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn has_index(&self, column: &str) -> bool {
        self.indexes.contains_key(column)
    }

    /// Check rows read back from disk against the schema: page layout,
    /// arity, types, NOT NULL and UNIQUE.
    pub fn validate(&self) -> Result<()> {
        self.pages.validate().map_err(|reason| {
            Error::ConstraintViolation(format!("table {}: {reason}", self.name))
        })?;

        let mut seen: Vec<HashSet<&Value>> = vec![HashSet::new(); self.schema.columns.len()];
        for (row_id, row) in self.pages.scan() {
            if row.values.len() != self.schema.columns.len() {
                return Err(Error::ConstraintViolation(format!(
                    "row {row_id} of table {} has {} values, expected {}",
                    self.name,
                    row.values.len(),
                    self.schema.columns.len()
                )));
            }
            for ((column, value), seen) in
                self.schema.columns.iter().zip(&row.values).zip(&mut seen)
            {
                self.check_value(column, value)?;
                if column.is_unique() && !value.is_null() && !seen.insert(value) {
                    return Err(self.unique_violation(column));
                }
            }
        }
        Ok(())
    }

    fn check_value(&self, column: &Column, value: &Value) -> Result<()> {
        if value.is_null() {
            if !column.nullable {
                return Err(Error::ConstraintViolation(format!(
                    "NOT NULL constraint failed: {}.{}",
                    self.name, column.name
                )));
            }
            return Ok(());
        }
        if !column.data_type.accepts(value) {
            return Err(Error::ConstraintViolation(format!(
                "column {}.{} is {} but got '{}'",
                self.name, column.name, column.data_type, value
            )));
        }
        Ok(())
    }

    fn unique_violation(&self, column: &Column) -> Error {
        Error::ConstraintViolation(format!(
            "UNIQUE constraint failed: {}.{}",
            self.name, column.name
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::expr::BinaryOp;
    use crate::storage::DataType;

    fn users() -> Table {
        let schema = Schema::new(vec![
            Column {
                name: "name".to_string(),
                data_type: DataType::Text,
                primary_key: false,
                unique: true,
                nullable: false,
            },
            Column {
                name: "secret".to_string(),
                data_type: DataType::Text,
                primary_key: false,
                unique: false,
                nullable: false,
            },
        ]);
        let mut table = Table::new("users".to_string(), schema);
        for name in ["Alice", "Bob", "Carol"] {
            table
                .insert(vec![
                    Value::from(name),
                    Value::from(format!("{name} secret info")),
                ])
                .unwrap();
        }
        table
    }

    fn name_eq(v: &str) -> Expr {
        Expr::binary(
            Expr::Column("name".to_string()),
            BinaryOp::Eq,
            Expr::Literal(Value::from(v)),
        )
    }

    #[test]
    fn test_unique_column_is_indexed_and_enforced() {
        let mut table = users();
        assert!(table.has_index("name"));
        assert!(!table.has_index("secret"));

        let err = table
            .insert(vec![Value::from("Bob"), Value::from("another")])
            .unwrap_err();
        assert!(matches!(err, Error::ConstraintViolation(_)));
        assert_eq!(table.row_count(), 3);
    }

    #[test]
    fn test_not_null_and_type_checks() {
        let mut table = users();
        assert!(matches!(
            table.insert(vec![Value::from("Dave"), Value::Null]),
            Err(Error::ConstraintViolation(_))
        ));
        assert!(matches!(
            table.insert(vec![Value::Integer(4), Value::from("x")]),
            Err(Error::ConstraintViolation(_))
        ));
        assert!(matches!(
            table.insert(vec![Value::from("Dave")]),
            Err(Error::ConstraintViolation(_))
        ));
    }

    #[test]
    fn test_select_by_index_and_scan_agree() {
        let table = users();

        let by_index = table.select(Some(&name_eq("Bob"))).unwrap();
        assert_eq!(by_index.len(), 1);
        assert_eq!(by_index[0].values[1], Value::from("Bob secret info"));

        let by_scan = table
            .select(Some(&Expr::binary(
                Expr::Column("secret".to_string()),
                BinaryOp::Eq,
                Expr::Literal(Value::from("Bob secret info")),
            )))
            .unwrap();
        assert_eq!(by_index, by_scan);

        assert!(table.select(Some(&name_eq("Dave"))).unwrap().is_empty());
        assert_eq!(table.select(None).unwrap().len(), 3);
    }

    #[test]
    fn test_indexes_are_rebuilt_after_loading() {
        let table = users();
        let json = serde_json::to_string(&table).unwrap();
        let mut loaded: Table = serde_json::from_str(&json).unwrap();
        assert!(!loaded.has_index("name"));

        loaded.rebuild_indexes();
        assert!(loaded.has_index("name"));
        assert_eq!(loaded.select(Some(&name_eq("Carol"))).unwrap().len(), 1);
    }

    #[test]
    fn test_validate_accepts_inserted_rows() {
        assert!(users().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_short_row() {
        let mut table = users();
        table.pages.append(Row { values: vec![] });
        assert!(matches!(table.validate(), Err(Error::ConstraintViolation(_))));

        // Indexing a short row must not panic either
        table.rebuild_indexes();
        assert!(table.has_index("name"));
    }

    #[test]
    fn test_validate_rejects_duplicate_unique_value() {
        let mut table = users();
        table.pages.append(Row {
            values: vec![Value::from("Alice"), Value::from("Alice secret info")],
        });
        let err = table.validate().unwrap_err();
        assert!(err.to_string().contains("UNIQUE constraint failed: users.name"));
    }

    #[test]
    fn test_validate_rejects_wrong_type_and_null() {
        let mut wrong_type = users();
        wrong_type.pages.append(Row {
            values: vec![Value::Integer(7), Value::from("x")],
        });
        assert!(wrong_type.validate().is_err());

        let mut null = users();
        null.pages.append(Row {
            values: vec![Value::from("Dave"), Value::Null],
        });
        let err = null.validate().unwrap_err();
        assert!(err.to_string().contains("NOT NULL"));
    }
}
