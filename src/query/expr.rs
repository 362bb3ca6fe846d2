// Expressions
// WHERE predicates and INSERT values after parsing.
// Placeholders stay symbolic until `bind` replaces them with literal values.

use super::params::{Params, Placeholder};
use crate::error::{Error, Result};
use crate::storage::{Row, Schema, Value};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column(String),
    Literal(Value),
    Placeholder(Placeholder),
    Not(Box<Expr>),
    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
}

/// The row an expression is evaluated against
#[derive(Debug, Clone, Copy)]
pub struct RowContext<'a> {
    pub schema: &'a Schema,
    pub row: &'a Row,
}

impl Expr {
    pub fn binary(left: Expr, op: BinaryOp, right: Expr) -> Self {
        Expr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    /// Collect every placeholder in evaluation order
    pub fn placeholders<'a>(&'a self, out: &mut Vec<&'a Placeholder>) {
        match self {
            Expr::Placeholder(p) => out.push(p),
            Expr::Column(_) | Expr::Literal(_) => {}
            Expr::Not(inner) | Expr::IsNull { expr: inner, .. } => inner.placeholders(out),
            Expr::Binary { left, right, .. } => {
                left.placeholders(out);
                right.placeholders(out);
            }
        }
    }

    /// Replace placeholders with the supplied values.
    /// The values become literals of the tree; they are never re-read as SQL.
    pub fn bind(self, params: &Params) -> Result<Expr> {
        Ok(match self {
            Expr::Placeholder(p) => Expr::Literal(params.resolve(&p)?),
            Expr::Column(_) | Expr::Literal(_) => self,
            Expr::Not(inner) => Expr::Not(Box::new(inner.bind(params)?)),
            Expr::IsNull { expr, negated } => Expr::IsNull {
                expr: Box::new(expr.bind(params)?),
                negated,
            },
            Expr::Binary { left, op, right } => Expr::Binary {
                left: Box::new(left.bind(params)?),
                op,
                right: Box::new(right.bind(params)?),
            },
        })
    }

    /// `column = literal` (either side), the shape an index can answer
    pub fn equality_lookup(&self) -> Option<(&str, &Value)> {
        match self {
            Expr::Binary {
                left,
                op: BinaryOp::Eq,
                right,
            } => match (left.as_ref(), right.as_ref()) {
                (Expr::Column(c), Expr::Literal(v)) | (Expr::Literal(v), Expr::Column(c)) => {
                    Some((c.as_str(), v))
                }
                _ => None,
            },
            _ => None,
        }
    }

    /// Evaluate with SQL three-valued logic; NULL propagates through comparisons
    pub fn eval(&self, ctx: Option<RowContext<'_>>) -> Result<Value> {
        match self {
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Placeholder(p) => Err(Error::MissingParameter(p.to_string())),
            Expr::Column(name) => {
                let ctx = ctx.ok_or_else(|| Error::NoSuchColumn(name.clone()))?;
                let index = ctx
                    .schema
                    .column_index(name)
                    .ok_or_else(|| Error::NoSuchColumn(name.clone()))?;
                Ok(ctx.row.values[index].clone())
            }
            Expr::Not(inner) => Ok(match inner.eval(ctx)? {
                Value::Null => Value::Null,
                v => Value::Boolean(!v.is_truthy()),
            }),
            Expr::IsNull { expr, negated } => {
                Ok(Value::Boolean(expr.eval(ctx)?.is_null() != *negated))
            }
            Expr::Binary { left, op, right } => {
                let l = left.eval(ctx)?;
                let r = right.eval(ctx)?;
                Ok(match op {
                    BinaryOp::And => and(&l, &r),
                    BinaryOp::Or => or(&l, &r),
                    _ if l.is_null() || r.is_null() => Value::Null,
                    _ => Value::Boolean(compare(*op, l.cmp(&r))),
                })
            }
        }
    }

    /// True only when the predicate evaluates to a true value
    pub fn matches(&self, ctx: RowContext<'_>) -> Result<bool> {
        Ok(self.eval(Some(ctx))?.is_truthy())
    }
}

fn compare(op: BinaryOp, ordering: Ordering) -> bool {
    match op {
        BinaryOp::Eq => ordering == Ordering::Equal,
        BinaryOp::NotEq => ordering != Ordering::Equal,
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::LtEq => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        BinaryOp::GtEq => ordering != Ordering::Less,
        BinaryOp::And | BinaryOp::Or => false,
    }
}

fn and(l: &Value, r: &Value) -> Value {
    if (!l.is_null() && !l.is_truthy()) || (!r.is_null() && !r.is_truthy()) {
        Value::Boolean(false)
    } else if l.is_null() || r.is_null() {
        Value::Null
    } else {
        Value::Boolean(true)
    }
}

fn or(l: &Value, r: &Value) -> Value {
    if l.is_truthy() || r.is_truthy() {
        Value::Boolean(true)
    } else if l.is_null() || r.is_null() {
        Value::Null
    } else {
        Value::Boolean(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Column, DataType};

    fn users_schema() -> Schema {
        Schema::new(vec![
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
                nullable: true,
            },
        ])
    }

    fn col(name: &str) -> Expr {
        Expr::Column(name.to_string())
    }

    fn lit(v: impl Into<Value>) -> Expr {
        Expr::Literal(v.into())
    }

    #[test]
    fn test_equality_against_row() {
        let schema = users_schema();
        let row = Row {
            values: vec![Value::from("Alice"), Value::from("s")],
        };
        let ctx = RowContext {
            schema: &schema,
            row: &row,
        };

        assert!(Expr::binary(col("name"), BinaryOp::Eq, lit("Alice"))
            .matches(ctx)
            .unwrap());
        assert!(!Expr::binary(col("name"), BinaryOp::Eq, lit("Bob"))
            .matches(ctx)
            .unwrap());
    }

    #[test]
    fn test_tautology_matches_every_row() {
        let schema = users_schema();
        let row = Row {
            values: vec![Value::from("Bob"), Value::from("s")],
        };
        let ctx = RowContext {
            schema: &schema,
            row: &row,
        };
        let predicate = Expr::binary(
            Expr::binary(col("name"), BinaryOp::Eq, lit("Alice")),
            BinaryOp::Or,
            Expr::binary(lit(1i64), BinaryOp::Eq, lit(1i64)),
        );

        assert!(predicate.matches(ctx).unwrap());
    }

    #[test]
    fn test_null_comparisons_are_unknown() {
        let schema = users_schema();
        let row = Row {
            values: vec![Value::from("Carol"), Value::Null],
        };
        let ctx = RowContext {
            schema: &schema,
            row: &row,
        };

        let eq = Expr::binary(col("secret"), BinaryOp::Eq, lit(Value::Null));
        assert_eq!(eq.eval(Some(ctx)).unwrap(), Value::Null);
        assert!(!Expr::Not(Box::new(eq)).matches(ctx).unwrap());

        let is_null = Expr::IsNull {
            expr: Box::new(col("secret")),
            negated: false,
        };
        assert!(is_null.matches(ctx).unwrap());

        let or = Expr::binary(lit(Value::Null), BinaryOp::Or, lit(true));
        assert_eq!(or.eval(None).unwrap(), Value::Boolean(true));
        let and = Expr::binary(lit(Value::Null), BinaryOp::And, lit(false));
        assert_eq!(and.eval(None).unwrap(), Value::Boolean(false));
    }

    #[test]
    fn test_bind_turns_placeholders_into_literals() {
        let payload = "Alice' OR 1=1; -- ";
        let expr = Expr::binary(
            col("name"),
            BinaryOp::Eq,
            Expr::Placeholder(Placeholder::Position(1)),
        );

        let bound = expr.bind(&Params::positional([payload])).unwrap();
        assert_eq!(bound, Expr::binary(col("name"), BinaryOp::Eq, lit(payload)));
        assert_eq!(bound.equality_lookup(), Some(("name", &Value::from(payload))));
    }

    #[test]
    fn test_unbound_placeholder_does_not_evaluate() {
        let expr = Expr::Placeholder(Placeholder::Named("name".to_string()));
        assert!(matches!(expr.eval(None), Err(Error::MissingParameter(_))));
    }
}
