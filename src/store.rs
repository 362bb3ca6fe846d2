//! Single-file record store
//!
//! A [`Connection`] holds an exclusive OS lock on `<path>.lock` for its whole
//! lifetime and works on an in-memory copy of the table catalog. The catalog
//! is written back only on [`Connection::commit`]. Dropping a connection
//! without committing discards its changes and releases the lock.
//!
//! The lock file itself stays on disk. Only a live holder blocks other
//! connections, so a process that dies mid-operation leaves nothing stuck.

use crate::error::{Error, Result};
use crate::query::{Params, QueryExecutor, QueryParser, QueryResult};
use crate::template::{sanitize, QueryInput};
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions, TryLockError};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const DEFAULT_STORE_PATH: &str = "data/test.db";

/// Where the record store lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub path: PathBuf,
}

impl StoreConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The lock file next to the store: `<path>.lock`
    pub fn lock_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".lock");
        PathBuf::from(name)
    }

    fn directory(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new(DEFAULT_STORE_PATH)
    }
}

/// Exclusive lock on `<path>.lock`, released when dropped or when the
/// process exits
#[derive(Debug)]
struct StoreLock {
    path: PathBuf,
    file: File,
}

impl StoreLock {
    fn acquire(config: &StoreConfig) -> Result<Self> {
        let path = config.lock_path();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| {
                Error::connection(&config.path, format!("unable to open database file: {e}"))
            })?;

        match file.try_lock() {
            Ok(()) => {
                debug!(lock = %path.display(), "acquired store lock");
                Ok(Self { path, file })
            }
            Err(TryLockError::WouldBlock) => {
                Err(Error::connection(&config.path, "database is locked"))
            }
            Err(TryLockError::Error(e)) => Err(Error::connection(
                &config.path,
                format!("unable to lock database file: {e}"),
            )),
        }
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            warn!(lock = %self.path.display(), error = %e, "failed to release store lock");
        } else {
            debug!(lock = %self.path.display(), "released store lock");
        }
    }
}

/// Read and check the catalog in the store file. A missing or empty file is
/// an empty store.
fn load_catalog(path: &Path) -> Result<QueryExecutor> {
    let mut db = match fs::read(path) {
        Ok(bytes) if bytes.is_empty() => return Ok(QueryExecutor::new()),
        Ok(bytes) => {
            serde_json::from_slice::<QueryExecutor>(&bytes).map_err(|e| not_a_store(path, e))?
        }
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(QueryExecutor::new()),
        Err(e) => {
            return Err(Error::connection(
                path,
                format!("unable to read database file: {e}"),
            ))
        }
    };
    db.restore().map_err(|e| not_a_store(path, e))?;
    Ok(db)
}

fn not_a_store(path: &Path, reason: impl std::fmt::Display) -> Error {
    Error::connection(path, format!("file is not a record store: {reason}"))
}

/// An open, locked record store
#[derive(Debug)]
pub struct Connection {
    config: StoreConfig,
    db: QueryExecutor,
    dirty: bool,
    // Declared last so the catalog is gone before the lock is released
    _lock: StoreLock,
}

impl Connection {
    /// Lock and load the store. A missing file opens as an empty store.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let lock = StoreLock::acquire(config)?;
        let db = load_catalog(&config.path)?;

        debug!(store = %config.path.display(), tables = db.list_tables().len(), "opened store");
        Ok(Self {
            config: config.clone(),
            db,
            dirty: false,
            _lock: lock,
        })
    }

    /// Parse `sql`, bind `params` into its placeholders and run it.
    ///
    /// Bound values are attached to the parsed statement and are never
    /// tokenized, so they cannot change its structure.
    pub fn execute(&mut self, sql: &str, params: impl Into<Params>) -> Result<QueryResult> {
        let params = params.into();
        let query = QueryParser::parse(sql)?.bind(&params)?;

        debug!(sql, params = params.len(), "executing statement");
        let read_only = query.is_read_only();
        let result = self.db.execute(query)?;
        if !read_only {
            self.dirty = true;
        }
        Ok(result)
    }

    /// Run a structured template: sanitize it, then bind its values positionally
    pub fn execute_template(&mut self, input: impl Into<QueryInput>) -> Result<QueryResult> {
        let (sql, args) = sanitize(input)?;
        self.execute(&sql, args)
    }

    /// Write the catalog back to the store file, atomically
    pub fn commit(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }

        let bytes = serde_json::to_vec_pretty(&self.db)?;
        let mut tmp = tempfile::NamedTempFile::new_in(self.config.directory())?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.config.path).map_err(|e| e.error)?;

        self.dirty = false;
        debug!(store = %self.config.path.display(), bytes = bytes.len(), "committed");
        Ok(())
    }

    /// Discard uncommitted changes by reloading from disk
    pub fn rollback(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        self.db = load_catalog(&self.config.path)?;
        self.dirty = false;
        Ok(())
    }

    pub fn tables(&self) -> Vec<String> {
        self.db.list_tables()
    }

    /// Whether there are changes not yet committed
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

/// Run `f` on a freshly opened connection.
///
/// Changes are committed when `f` succeeds and discarded when it fails; the
/// lock is released either way.
pub fn with_connection<T>(
    config: &StoreConfig,
    f: impl FnOnce(&mut Connection) -> Result<T>,
) -> Result<T> {
    let mut conn = Connection::open(config)?;
    let value = f(&mut conn)?;
    conn.commit()?;
    Ok(value)
}
