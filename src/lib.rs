#![crate_type = "lib"]
#![crate_name = "sqlra"]

pub mod column;
pub mod config;
pub mod driver;
pub mod error;
pub mod eval;
pub mod format;
pub mod iter;
pub mod plan;
pub mod provider;
pub mod ra;
pub mod rewrite;
pub mod row;
pub mod sql2ra;
pub mod value;

pub use driver::{execute, ExecuteOptions, QueryResult};
pub use error::{Error, Result};
pub use provider::{TableCatalog, TableProvider};
