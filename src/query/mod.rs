// Query module - parsing, parameter binding and execution
pub mod executor;
pub mod expr;
pub mod params;
pub mod parser;

pub use executor::{QueryExecutor, QueryResult};
pub use params::{Params, Placeholder};
pub use parser::{Query, QueryParser};
