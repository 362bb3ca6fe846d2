// SQL Parser
// Converts SQL text into a `Query` using the sqlparser crate.
// Placeholders (`?`, `?NNN`, `$NNN`, `:name`) are kept as slots in the tree;
// values are only ever attached afterwards by `Query::bind`.

use super::expr::{BinaryOp, Expr};
use super::params::{Params, Placeholder};
use crate::error::{Error, Result};
use crate::storage::{Column, DataType, Schema, Value};
use sqlparser::ast::{
    BinaryOperator, ColumnOption, DataType as SqlDataType, Expr as SqlExpr, Ident, ObjectName,
    ObjectType, SelectItem, SetExpr, Statement, TableFactor, UnaryOperator, Value as SqlValue,
};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

/// The statements the record store understands
#[derive(Debug, Clone)]
pub enum Query {
    /// CREATE TABLE [IF NOT EXISTS] name (col TYPE [NOT NULL] [UNIQUE | PRIMARY KEY], ...)
    CreateTable {
        name: String,
        schema: Schema,
        if_not_exists: bool,
    },
    /// DROP TABLE [IF EXISTS] name
    DropTable { name: String, if_exists: bool },
    /// INSERT INTO name [(cols)] VALUES (...), (...)
    Insert {
        table_name: String,
        columns: Option<Vec<String>>,
        rows: Vec<Vec<Expr>>,
    },
    /// SELECT * | cols FROM name [WHERE expr]
    Select {
        table_name: String,
        projection: Projection,
        filter: Option<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    All,
    Columns(Vec<String>),
}

impl Query {
    /// Placeholders in the order they appear in the text
    pub fn placeholders(&self) -> Vec<&Placeholder> {
        let mut out = Vec::new();
        match self {
            Query::Insert { rows, .. } => {
                for expr in rows.iter().flatten() {
                    expr.placeholders(&mut out);
                }
            }
            Query::Select {
                filter: Some(filter),
                ..
            } => filter.placeholders(&mut out),
            _ => {}
        }
        out
    }

    /// Attach bound values to the placeholder slots.
    /// Fails unless `params` covers the slots exactly.
    pub fn bind(self, params: &Params) -> Result<Query> {
        params.check(&self.placeholders())?;

        Ok(match self {
            Query::Insert {
                table_name,
                columns,
                rows,
            } => Query::Insert {
                table_name,
                columns,
                rows: rows
                    .into_iter()
                    .map(|row| {
                        row.into_iter()
                            .map(|e| e.bind(params))
                            .collect::<Result<Vec<_>>>()
                    })
                    .collect::<Result<Vec<_>>>()?,
            },
            Query::Select {
                table_name,
                projection,
                filter,
            } => Query::Select {
                table_name,
                projection,
                filter: filter.map(|f| f.bind(params)).transpose()?,
            },
            other => other,
        })
    }

    pub fn is_read_only(&self) -> bool {
        matches!(self, Query::Select { .. })
    }
}

/// The query parser
///
/// Tracks the highest positional slot seen so that a bare `?` takes the next
/// number after it, the way SQLite numbers them.
#[derive(Debug, Default)]
pub struct QueryParser {
    highest_position: usize,
}

impl QueryParser {
    /// Parse exactly one SQL statement
    pub fn parse(sql: &str) -> Result<Query> {
        let dialect = GenericDialect {};
        let ast = Parser::parse_sql(&dialect, sql).map_err(|e| Error::Parse(e.to_string()))?;

        match ast.as_slice() {
            [statement] => Self::default().parse_statement(statement),
            _ => Err(Error::Unsupported(format!(
                "expected exactly one statement, found {}",
                ast.len()
            ))),
        }
    }

    fn parse_statement(&mut self, statement: &Statement) -> Result<Query> {
        match statement {
            Statement::CreateTable(create_table) => Self::parse_create_table(create_table),
            Statement::Drop {
                object_type,
                if_exists,
                names,
                ..
            } => Self::parse_drop(object_type, *if_exists, names),
            Statement::Insert(insert) => self.parse_insert(insert),
            Statement::Query(query) => self.parse_select(query),
            other => Err(Error::Unsupported(format!("statement '{other}'"))),
        }
    }

    fn parse_create_table(create_table: &sqlparser::ast::CreateTable) -> Result<Query> {
        if !create_table.constraints.is_empty() {
            return Err(Error::Unsupported("table constraints".to_string()));
        }

        let mut columns: Vec<Column> = Vec::new();
        for column_def in &create_table.columns {
            let mut column = Column {
                name: ident_name(&column_def.name),
                data_type: Self::parse_data_type(&column_def.data_type)?,
                primary_key: false,
                unique: false,
                nullable: true,
            };

            for option_def in &column_def.options {
                match &option_def.option {
                    ColumnOption::NotNull => column.nullable = false,
                    ColumnOption::Null => column.nullable = true,
                    ColumnOption::Unique {
                        is_primary: true, ..
                    } => {
                        column.primary_key = true;
                        column.nullable = false;
                    }
                    ColumnOption::Unique { .. } => column.unique = true,
                    other => {
                        return Err(Error::Unsupported(format!("column option '{other}'")));
                    }
                }
            }

            if columns.iter().any(|c| c.name == column.name) {
                return Err(Error::Unsupported(format!(
                    "duplicate column name: {}",
                    column.name
                )));
            }
            columns.push(column);
        }

        Ok(Query::CreateTable {
            name: object_name(&create_table.name),
            schema: Schema::new(columns),
            if_not_exists: create_table.if_not_exists,
        })
    }

    fn parse_drop(object_type: &ObjectType, if_exists: bool, names: &[ObjectName]) -> Result<Query> {
        if !matches!(object_type, ObjectType::Table) {
            return Err(Error::Unsupported(format!("DROP {object_type}")));
        }
        match names {
            [name] => Ok(Query::DropTable {
                name: object_name(name),
                if_exists,
            }),
            _ => Err(Error::Unsupported(
                "DROP TABLE takes exactly one table".to_string(),
            )),
        }
    }

    fn parse_insert(&mut self, insert: &sqlparser::ast::Insert) -> Result<Query> {
        let table_name = object_name(&insert.table_name);
        let columns = if insert.columns.is_empty() {
            None
        } else {
            Some(insert.columns.iter().map(ident_name).collect())
        };

        let source = insert
            .source
            .as_ref()
            .ok_or_else(|| Error::Unsupported("INSERT without VALUES".to_string()))?;
        let values = match source.body.as_ref() {
            SetExpr::Values(values) if !values.rows.is_empty() => values,
            _ => return Err(Error::Unsupported("INSERT without VALUES".to_string())),
        };

        let mut rows = Vec::with_capacity(values.rows.len());
        for row in &values.rows {
            rows.push(
                row.iter()
                    .map(|expr| self.parse_expr(expr))
                    .collect::<Result<Vec<_>>>()?,
            );
        }

        Ok(Query::Insert {
            table_name,
            columns,
            rows,
        })
    }

    fn parse_select(&mut self, query: &sqlparser::ast::Query) -> Result<Query> {
        let select = match query.body.as_ref() {
            SetExpr::Select(select) => select,
            _ => return Err(Error::Unsupported("compound SELECT".to_string())),
        };

        let table_name = match select.from.as_slice() {
            [from] if from.joins.is_empty() => match &from.relation {
                TableFactor::Table { name, .. } => object_name(name),
                _ => return Err(Error::Unsupported("table reference".to_string())),
            },
            [] => return Err(Error::Unsupported("SELECT without FROM".to_string())),
            _ => return Err(Error::Unsupported("joins".to_string())),
        };

        let projection = Self::parse_projection(&select.projection)?;
        let filter = select
            .selection
            .as_ref()
            .map(|expr| self.parse_expr(expr))
            .transpose()?;

        Ok(Query::Select {
            table_name,
            projection,
            filter,
        })
    }

    fn parse_projection(items: &[SelectItem]) -> Result<Projection> {
        if let [SelectItem::Wildcard(_)] = items {
            return Ok(Projection::All);
        }

        items
            .iter()
            .map(|item| match item {
                SelectItem::UnnamedExpr(SqlExpr::Identifier(ident)) => Ok(ident_name(ident)),
                other => Err(Error::Unsupported(format!("select item '{other}'"))),
            })
            .collect::<Result<Vec<_>>>()
            .map(Projection::Columns)
    }

    fn parse_data_type(sql_type: &SqlDataType) -> Result<DataType> {
        match sql_type {
            SqlDataType::Int(_) | SqlDataType::Integer(_) | SqlDataType::BigInt(_) => {
                Ok(DataType::Integer)
            }
            SqlDataType::Text | SqlDataType::Varchar(_) | SqlDataType::String(_) => {
                Ok(DataType::Text)
            }
            SqlDataType::Boolean => Ok(DataType::Boolean),
            other => Err(Error::Unsupported(format!("data type {other}"))),
        }
    }

    fn parse_expr(&mut self, expr: &SqlExpr) -> Result<Expr> {
        match expr {
            SqlExpr::Identifier(ident) => Ok(Expr::Column(ident_name(ident))),
            SqlExpr::Nested(inner) => self.parse_expr(inner),
            SqlExpr::Value(value) => self.parse_value(value),
            SqlExpr::UnaryOp {
                op: UnaryOperator::Not,
                expr,
            } => Ok(Expr::Not(Box::new(self.parse_expr(expr)?))),
            SqlExpr::UnaryOp {
                op: UnaryOperator::Minus,
                expr,
            } => match expr.as_ref() {
                SqlExpr::Value(SqlValue::Number(n, _)) => parse_integer(&format!("-{n}")),
                other => Err(Error::Unsupported(format!("negation of '{other}'"))),
            },
            SqlExpr::IsNull(inner) => Ok(Expr::IsNull {
                expr: Box::new(self.parse_expr(inner)?),
                negated: false,
            }),
            SqlExpr::IsNotNull(inner) => Ok(Expr::IsNull {
                expr: Box::new(self.parse_expr(inner)?),
                negated: true,
            }),
            SqlExpr::BinaryOp { left, op, right } => {
                let op = match op {
                    BinaryOperator::Eq => BinaryOp::Eq,
                    BinaryOperator::NotEq => BinaryOp::NotEq,
                    BinaryOperator::Lt => BinaryOp::Lt,
                    BinaryOperator::LtEq => BinaryOp::LtEq,
                    BinaryOperator::Gt => BinaryOp::Gt,
                    BinaryOperator::GtEq => BinaryOp::GtEq,
                    BinaryOperator::And => BinaryOp::And,
                    BinaryOperator::Or => BinaryOp::Or,
                    other => return Err(Error::Unsupported(format!("operator {other}"))),
                };
                // Left before right keeps anonymous `?` numbering in text order
                let left = self.parse_expr(left)?;
                let right = self.parse_expr(right)?;
                Ok(Expr::binary(left, op, right))
            }
            other => Err(Error::Unsupported(format!("expression '{other}'"))),
        }
    }

    fn parse_value(&mut self, value: &SqlValue) -> Result<Expr> {
        match value {
            SqlValue::Number(n, _) => parse_integer(n),
            SqlValue::SingleQuotedString(s) => Ok(Expr::Literal(Value::Text(s.clone()))),
            SqlValue::Boolean(b) => Ok(Expr::Literal(Value::Boolean(*b))),
            SqlValue::Null => Ok(Expr::Literal(Value::Null)),
            SqlValue::Placeholder(text) => self.parse_placeholder(text),
            other => Err(Error::Unsupported(format!("literal {other}"))),
        }
    }

    fn parse_placeholder(&mut self, text: &str) -> Result<Expr> {
        if text == "?" {
            self.highest_position += 1;
            return Ok(Expr::Placeholder(Placeholder::Position(
                self.highest_position,
            )));
        }

        if let Some(digits) = text.strip_prefix('?').or_else(|| text.strip_prefix('$')) {
            let position = digits
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| Error::Unsupported(format!("placeholder {text}")))?;
            self.highest_position = self.highest_position.max(position);
            return Ok(Expr::Placeholder(Placeholder::Position(position)));
        }

        match text.strip_prefix(':') {
            Some(name) if !name.is_empty() => {
                Ok(Expr::Placeholder(Placeholder::Named(name.to_string())))
            }
            _ => Err(Error::Unsupported(format!("placeholder {text}"))),
        }
    }
}

fn parse_integer(text: &str) -> Result<Expr> {
    text.parse::<i64>()
        .map(|i| Expr::Literal(Value::Integer(i)))
        .map_err(|_| Error::Unsupported(format!("numeric literal {text}")))
}

/// Unquoted identifiers are case-insensitive
fn ident_name(ident: &Ident) -> String {
    match ident.quote_style {
        Some(_) => ident.value.clone(),
        None => ident.value.to_lowercase(),
    }
}

fn object_name(name: &ObjectName) -> String {
    name.0.iter().map(ident_name).collect::<Vec<_>>().join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str) -> Expr {
        Expr::Column(name.to_string())
    }

    fn slot(n: usize) -> Expr {
        Expr::Placeholder(Placeholder::Position(n))
    }

    #[test]
    fn test_parse_create_table_with_constraints() {
        let query = QueryParser::parse(
            "CREATE TABLE IF NOT EXISTS users (name TEXT NOT NULL UNIQUE, secret TEXT NOT NULL)",
        )
        .unwrap();

        let Query::CreateTable {
            name,
            schema,
            if_not_exists,
        } = query
        else {
            panic!("expected CREATE TABLE");
        };
        assert_eq!(name, "users");
        assert!(if_not_exists);
        assert_eq!(schema.column_names(), vec!["name", "secret"]);
        assert!(schema.columns[0].unique && !schema.columns[0].nullable);
        assert!(!schema.columns[1].unique && !schema.columns[1].nullable);
    }

    #[test]
    fn test_parse_drop_table() {
        let query = QueryParser::parse("DROP TABLE IF EXISTS users").unwrap();
        assert!(matches!(
            query,
            Query::DropTable { ref name, if_exists: true } if name == "users"
        ));
    }

    #[test]
    fn test_parse_select_with_placeholder() {
        let query = QueryParser::parse("SELECT secret FROM users WHERE name = ?").unwrap();

        let Query::Select {
            table_name,
            projection,
            filter,
        } = query
        else {
            panic!("expected SELECT");
        };
        assert_eq!(table_name, "users");
        assert_eq!(projection, Projection::Columns(vec!["secret".to_string()]));
        assert_eq!(
            filter,
            Some(Expr::binary(column("name"), BinaryOp::Eq, slot(1)))
        );
    }

    #[test]
    fn test_anonymous_placeholders_are_numbered_in_order() {
        let query =
            QueryParser::parse("INSERT INTO users(name, secret) VALUES(?, ?), (?3, ?)").unwrap();

        let Query::Insert { columns, rows, .. } = query else {
            panic!("expected INSERT");
        };
        assert_eq!(
            columns,
            Some(vec!["name".to_string(), "secret".to_string()])
        );
        assert_eq!(rows, vec![vec![slot(1), slot(2)], vec![slot(3), slot(4)]]);
    }

    #[test]
    fn test_named_placeholder() {
        let query = QueryParser::parse("SELECT * FROM users WHERE name = :name").unwrap();
        let placeholders = query.placeholders();
        assert_eq!(
            placeholders,
            vec![&Placeholder::Named("name".to_string())]
        );
    }

    #[test]
    fn test_spliced_payload_changes_the_predicate() {
        // What the naive lookup produces for the injection payload
        let query =
            QueryParser::parse("SELECT secret FROM users WHERE name = 'Alice' OR 1=1; -- '")
                .unwrap();

        let Query::Select { filter, .. } = query else {
            panic!("expected SELECT");
        };
        assert_eq!(
            filter,
            Some(Expr::binary(
                Expr::binary(
                    column("name"),
                    BinaryOp::Eq,
                    Expr::Literal(Value::from("Alice"))
                ),
                BinaryOp::Or,
                Expr::binary(
                    Expr::Literal(Value::Integer(1)),
                    BinaryOp::Eq,
                    Expr::Literal(Value::Integer(1))
                ),
            ))
        );
    }

    #[test]
    fn test_multiple_statements_rejected() {
        let err = QueryParser::parse("SELECT * FROM users; DROP TABLE users").unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
    }

    #[test]
    fn test_bind_checks_counts() {
        let query = QueryParser::parse("SELECT secret FROM users WHERE name = ?").unwrap();
        let err = query.clone().bind(&Params::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::BindingCount {
                expected: 1,
                supplied: 0
            }
        ));

        let bound = query.bind(&Params::positional(["Bob"])).unwrap();
        assert!(bound.placeholders().is_empty());
    }

    #[test]
    fn test_unsupported_statement() {
        assert!(matches!(
            QueryParser::parse("UPDATE users SET secret = 'x' WHERE name = 'Bob'"),
            Err(Error::Unsupported(_))
        ));
        assert!(matches!(
            QueryParser::parse("SELEC secret"),
            Err(Error::Parse(_))
        ));
    }
}
