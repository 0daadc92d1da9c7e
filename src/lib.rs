//! # YCSB binding for YDB
//!
//! This crate lets a YCSB-style benchmark harness drive a YDB database. It
//! renders a fixed set of YQL statements, binds typed parameters, runs them
//! through a pooled client with retries, and hands rows back as
//! `column -> bytes` maps.
//!
//! ## Features
//!
//! - `http` (default) - HTTP transport through the YDB viewer JSON API
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! ycsb-ydb = "0.1"
//! ```
//!
//! ```no_run
//! use std::collections::HashMap;
//! use ycsb_ydb::{Db, DbCreator, YdbCreator};
//!
//! # async fn run() -> ycsb_ydb::Result<()> {
//! // `grpc://` DSNs are accepted; requests go to the node's viewer port
//! // (`ydb.viewerport`, default 8765), not to 2136.
//! let props = HashMap::from([
//!     ("ydb.dsn".to_string(), "grpc://localhost:2136/local".to_string()),
//!     ("ydb.viewerport".to_string(), "8765".to_string()),
//!     ("dropdata".to_string(), "true".to_string()),
//! ]);
//! let db = YdbCreator.create(&props).await?;
//!
//! let row = HashMap::from([("field0".to_string(), b"value".to_vec())]);
//! db.insert("usertable", "user1", row).await?;
//! let found = db.read("usertable", "user1", &[]).await?;
//! assert!(found.is_some());
//! db.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod cache;
pub mod concurrency;
pub mod config;
pub mod db;
pub mod driver;
pub mod error;
pub mod executor;
pub mod params;
pub mod query;
mod query_builder;
pub mod retry;
pub mod row;
pub mod tracing_support;
pub mod value;

// HTTP-specific modules
#[cfg(feature = "http")]
mod http_connection;

// Re-exports
pub use config::{Properties, YdbConfig};
pub use db::{BatchDb, Db, DbCreator, Record, YDB_DRIVER_NAME};
pub use driver::YdbDb;
pub use error::{Error, Result};
pub use executor::{Executor, QueryMode};
pub use query::{Request, Template};
pub use row::ResultSet;
pub use value::{Value, YdbType};

#[cfg(feature = "http")]
pub use driver::{creator_for, YdbCreator};
#[cfg(feature = "http")]
pub use http_connection::{YdbHttpConfig, YdbHttpConnection};
