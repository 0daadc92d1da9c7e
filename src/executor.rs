//! The client seam
//!
//! `Executor` is the one place the binding touches the network. The HTTP
//! connection implements it; tests substitute an in-memory recorder.

use std::fmt;

use async_trait::async_trait;

use crate::error::Result;
use crate::query::Request;
use crate::row::ResultSet;

/// How YDB should run a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QueryMode {
    /// Interactive data query (point reads and writes)
    #[default]
    Data,
    /// Streaming scan query (large reads)
    Scan,
    /// Schema change (`CREATE`/`DROP TABLE`)
    Scheme,
}

impl QueryMode {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryMode::Data => "data",
            QueryMode::Scan => "scan",
            QueryMode::Scheme => "scheme",
        }
    }
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runs rendered requests against a database
#[async_trait]
pub trait Executor: Send + Sync {
    /// Path of the database, used as the table path prefix
    fn database_path(&self) -> &str;

    /// Run a request that returns no rows
    async fn execute(&self, mode: QueryMode, request: &Request) -> Result<()>;

    /// Run a request and return its first result set
    async fn query(&self, mode: QueryMode, request: &Request) -> Result<ResultSet>;

    /// Release any resources held by the executor
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
