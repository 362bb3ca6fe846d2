// Main entry point for the secretdb CLI
// Sets up the record store, runs lookups, and hosts an interactive SQL shell

use anyhow::{Context, Result};
use clap::{Parser as ClapParser, Subcommand, ValueEnum};
use secretdb::store::DEFAULT_STORE_PATH;
use secretdb::{text, users, with_connection, StoreConfig};
use std::io::{self, Write};
use std::path::PathBuf;

const INJECTION_PAYLOAD: &str = "Alice' OR 1=1; -- ";

/// secretdb - SQL injection versus bound parameters on a small record store
#[derive(ClapParser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path of the record store file
    #[arg(long, env = "SECRETDB_PATH", default_value = DEFAULT_STORE_PATH, global = true)]
    db: PathBuf,

    /// Log debug events to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Drop and recreate the users table with its three records
    Setup,
    /// Print the secrets stored for a name
    Lookup {
        name: String,

        /// How the name reaches the query
        #[arg(short, long, value_enum, default_value_t = Mode::Safe)]
        mode: Mode,
    },
    /// Reset the store, then run every lookup style with a plain name and an injection payload
    Walkthrough,
    /// Interactive SQL shell over the store
    Shell {
        /// Execute a single SQL command and exit
        #[arg(short, long)]
        execute: Option<String>,
    },
    /// Print the string formatting examples
    Text,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    /// Bound to an explicit `?` placeholder
    Safe,
    /// Interpolated into a structured template
    Template,
    /// Pasted into the SQL text (vulnerable)
    Naive,
}

impl Mode {
    fn lookup(self, config: &StoreConfig, name: &str) -> secretdb::Result<Vec<String>> {
        match self {
            Mode::Safe => users::lookup_secrets(config, name),
            Mode::Template => users::lookup_secrets_template(config, name),
            Mode::Naive => users::naive_lookup_secrets(config, name),
        }
    }

    fn label(self) -> &'static str {
        match self {
            Mode::Safe => "bound parameter",
            Mode::Template => "structured template",
            Mode::Naive => "string splicing",
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "secretdb=debug"
    } else {
        "secretdb=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(io::stderr)
        .init();

    let config = StoreConfig::new(args.db);

    match args.command {
        Command::Setup => {
            let count = users::reset_store(&config)
                .with_context(|| format!("failed to set up {}", config.path.display()))?;
            println!("{count} record(s) written to {}", config.path.display());
        }
        Command::Lookup { name, mode } => {
            for secret in mode.lookup(&config, &name)? {
                println!("{secret}");
            }
        }
        Command::Walkthrough => run_walkthrough(&config)?,
        Command::Shell { execute } => run_shell(&config, execute)?,
        Command::Text => print_text_examples(),
    }

    Ok(())
}

/// Every lookup style against a plain name and the injection payload
fn run_walkthrough(config: &StoreConfig) -> Result<()> {
    users::reset_store(config).context("failed to reset the store")?;

    for mode in [Mode::Naive, Mode::Safe, Mode::Template] {
        for name in ["Alice", INJECTION_PAYLOAD] {
            println!("{} lookup for {name:?}:", mode.label());
            let secrets = mode.lookup(config, name)?;
            if secrets.is_empty() {
                println!("  (no rows)");
            }
            for secret in secrets {
                println!("  {secret}");
            }
        }
        println!();
    }

    Ok(())
}

/// Run the shell, or a single statement when `execute` is given
fn run_shell(config: &StoreConfig, execute: Option<String>) -> Result<()> {
    if let Some(sql) = execute {
        return execute_statement(config, &sql);
    }

    println!("╔════════════════════════════════════════════╗");
    println!("║          secretdb Interactive Shell        ║");
    println!("╚════════════════════════════════════════════╝");
    println!();
    println!("Store: {}", config.path.display());
    println!("Type SQL commands or '.help' for help");
    println!("Type '.exit' to quit");
    println!();

    repl(|line| match line {
        ".tables" => {
            let tables = with_connection(config, |conn| Ok(conn.tables()))?;
            for table in tables {
                println!("{table}");
            }
            Ok(())
        }
        sql => execute_statement(config, sql),
    })
}

/// REPL (Read-Eval-Print Loop)
///
/// `.exit`, `.quit` and `.help` are handled here; every other line,
/// including the remaining dot commands, goes to `execute_fn`.
fn repl<F>(mut execute_fn: F) -> Result<()>
where
    F: FnMut(&str) -> Result<()>,
{
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("secretdb> ");
        stdout.flush()?;

        let mut input = String::new();
        if stdin.read_line(&mut input)? == 0 {
            // EOF
            println!();
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        match input {
            ".exit" | ".quit" => {
                println!("Goodbye!");
                break;
            }
            ".help" => {
                print_help();
                continue;
            }
            ".tables" => {}
            _ if input.starts_with('.') => {
                println!("Unknown command: {input}");
                println!("Type '.help' for help");
                continue;
            }
            _ => {}
        }

        // Errors are reported and the shell keeps going
        if let Err(e) = execute_fn(input) {
            eprintln!("Error: {e:#}");
        }
    }

    Ok(())
}

/// One statement in its own connection; changes are committed on success
fn execute_statement(config: &StoreConfig, sql: &str) -> Result<()> {
    let result = with_connection(config, |conn| conn.execute(sql, ()))?;
    println!("{}", result.format());
    Ok(())
}

fn print_text_examples() {
    println!("{}", text::greeting("World"));
    println!("{}", text::location(45.9711247890, -91.44125437908));
    println!("{}", text::utm_location("15N", 491993.112, 4977445.948));
    for line in text::population_table() {
        println!("{line}");
    }
}

fn print_help() {
    println!("╔════════════════════════════════════════════╗");
    println!("║              secretdb Help                 ║");
    println!("╚════════════════════════════════════════════╝");
    println!();
    println!("Special Commands:");
    println!("  .help              Show this help message");
    println!("  .tables            List tables in the store");
    println!("  .exit, .quit       Exit the shell");
    println!();
    println!("Supported SQL Commands:");
    println!();
    println!("  CREATE TABLE:");
    println!("    CREATE TABLE [IF NOT EXISTS] users (");
    println!("      name TEXT NOT NULL UNIQUE,");
    println!("      secret TEXT NOT NULL");
    println!("    )");
    println!();
    println!("  DROP TABLE:");
    println!("    DROP TABLE [IF EXISTS] users");
    println!();
    println!("  INSERT:");
    println!("    INSERT INTO users(name, secret) VALUES ('Dave', 'Dave secret info')");
    println!();
    println!("  SELECT:");
    println!("    SELECT * FROM users");
    println!("    SELECT secret FROM users WHERE name = 'Bob'");
    println!();
    println!("Notes:");
    println!("  - Keywords and unquoted names are case-insensitive");
    println!("  - String values must be in single quotes");
    println!("  - WHERE supports = <> < <= > >=, AND, OR, NOT, IS [NOT] NULL");
    println!("  - Each statement is committed as soon as it succeeds");
    println!();
}
