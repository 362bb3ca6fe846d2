//! The `users` table: name → secret records and the three ways of looking them up.
//!
//! [`lookup_secrets`] and [`lookup_secrets_template`] bind the name as a
//! parameter. [`naive_lookup_secrets`] splices it into the SQL text and is
//! only here to show what that allows.

use crate::error::Result;
use crate::query::{Params, QueryResult};
use crate::storage::Value;
use crate::store::{with_connection, StoreConfig};
use std::fs;
use tracing::{info, warn};

pub const CREATE_TABLE: &str =
    "CREATE TABLE IF NOT EXISTS users (name TEXT NOT NULL UNIQUE, secret TEXT NOT NULL)";

pub const SELECT_SECRET: &str = "SELECT secret FROM users WHERE name = ?";

/// The records written by [`reset_store`]
pub const SEED_RECORDS: [(&str, &str); 3] = [
    ("Alice", "Alice secret info"),
    ("Bob", "Bob secret info"),
    ("Carol", "Carol secret info"),
];

/// Drop and recreate `users`, then insert [`SEED_RECORDS`].
/// Creates the store's directory if needed. Returns the number of records written.
pub fn reset_store(config: &StoreConfig) -> Result<usize> {
    if let Some(parent) = config.path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let count = with_connection(config, |conn| {
        conn.execute("DROP TABLE IF EXISTS users", ())?;
        conn.execute(CREATE_TABLE, ())?;
        for (name, secret) in SEED_RECORDS {
            conn.execute(
                "INSERT INTO users(name, secret) VALUES(?, ?)",
                vec![Value::from(name), Value::from(secret)],
            )?;
        }
        Ok(SEED_RECORDS.len())
    })?;

    info!(store = %config.path.display(), records = count, "store reset");
    Ok(count)
}

/// Add one record
pub fn insert_record(config: &StoreConfig, name: &str, secret: &str) -> Result<()> {
    with_connection(config, |conn| {
        conn.execute(
            "INSERT INTO users(name, secret) VALUES(:name, :secret)",
            Params::named([("name", name), ("secret", secret)]),
        )?;
        Ok(())
    })
}

/// Secrets for `name`, with the name bound to an explicit placeholder
pub fn lookup_secrets(config: &StoreConfig, name: &str) -> Result<Vec<String>> {
    with_connection(config, |conn| {
        let result = conn.execute(SELECT_SECRET, vec![Value::from(name)])?;
        Ok(secrets(&result))
    })
}

/// Secrets for `name`, written as a structured template
pub fn lookup_secrets_template(config: &StoreConfig, name: &str) -> Result<Vec<String>> {
    with_connection(config, |conn| {
        let result =
            conn.execute_template(crate::template!("SELECT secret FROM users WHERE name = ", {name}))?;
        Ok(secrets(&result))
    })
}

/// Secrets for `name`, with the name pasted into the SQL text.
///
/// Vulnerable to SQL injection: `Alice' OR 1=1; -- ` returns every secret.
pub fn naive_lookup_secrets(config: &StoreConfig, name: &str) -> Result<Vec<String>> {
    let sql = format!("SELECT secret FROM users WHERE name = '{name}'");
    warn!(%sql, "running a query built by string splicing");

    with_connection(config, |conn| {
        let result = conn.execute(&sql, ())?;
        Ok(secrets(&result))
    })
}

fn secrets(result: &QueryResult) -> Vec<String> {
    result
        .first_column()
        .into_iter()
        .map(|value| match value {
            Value::Text(s) => s,
            other => other.to_string(),
        })
        .collect()
}
