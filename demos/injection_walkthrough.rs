// Example: the same lookup written three ways
// Run with: cargo run --example injection_walkthrough

use secretdb::{sanitize, template, users, Connection, StoreConfig, Value};

fn main() -> anyhow::Result<()> {
    println!("=== secretdb Injection Walkthrough ===\n");

    let dir = tempfile::tempdir()?;
    let config = StoreConfig::new(dir.path().join("test.db"));

    // 1. Create and seed the users table
    println!("1. Setting up the store at {}...", config.path.display());
    let count = users::reset_store(&config)?;
    println!("{count} record(s) written\n");

    let payload = "Alice' OR 1=1; -- ";

    // 2. Splice the name into the SQL text
    println!("2. String splicing:");
    println!("   SELECT secret FROM users WHERE name = '{payload}'");
    println!("   -> {:?}\n", users::naive_lookup_secrets(&config, payload)?);

    // 3. Bind the name to a placeholder
    println!("3. Bound parameter:");
    println!("   {}  with [{payload:?}]", users::SELECT_SECRET);
    println!("   -> {:?}\n", users::lookup_secrets(&config, payload)?);

    // 4. Structured template: decomposed into the same text and arguments
    println!("4. Structured template:");
    let (sql, args) = sanitize(template!("SELECT secret FROM users WHERE name = ", {payload}))?;
    println!("   sanitized to {sql:?} with {args:?}");
    assert_eq!(sql, users::SELECT_SECRET);
    assert_eq!(args, vec![Value::from(payload)]);
    println!("   -> {:?}\n", users::lookup_secrets_template(&config, payload)?);

    // 5. Plain strings are refused by the template entry point
    println!("5. Passing a plain string where a template is expected:");
    let mut conn = Connection::open(&config)?;
    let spliced = format!("SELECT secret FROM users WHERE name = '{payload}'");
    match conn.execute_template(spliced) {
        Ok(result) => println!("   unexpectedly ran:\n{}", result.format()),
        Err(e) => println!("   {e}"),
    }
    drop(conn);

    println!("\n=== Example Complete ===");
    Ok(())
}
