// secretdb - SQL injection and bound parameters, demonstrated on a small record store
// This is the library root that exposes the public API

pub mod error;
pub mod query;
pub mod storage;
pub mod store;
pub mod template;
pub mod text;
pub mod users;

// Re-export commonly used types for convenience
pub use error::{Error, Result};
pub use query::{Params, Placeholder, QueryExecutor, QueryParser, QueryResult};
pub use storage::{Column, DataType, Row, Schema, Value};
pub use store::{with_connection, Connection, StoreConfig};
pub use template::{sanitize, QueryInput, Template, TemplatePart};
