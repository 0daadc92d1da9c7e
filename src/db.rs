//! Benchmark harness interface
//!
//! The harness drives every binding through these traits: one `Db` per run,
//! shared by all worker threads, created by name through a `DbCreator`.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::config::Properties;
use crate::error::Result;

/// Registry name of the YDB binding
pub const YDB_DRIVER_NAME: &str = "ydb";

/// A row as the harness sees it: column name to raw bytes
pub type Record = HashMap<String, Vec<u8>>;

/// Single-row operations
#[async_trait]
pub trait Db: Send + Sync {
    /// Called once per worker thread before it issues requests
    async fn init_thread(&self, _thread_id: usize, _thread_count: usize) -> Result<()> {
        Ok(())
    }

    /// Called once per worker thread after its last request
    async fn cleanup_thread(&self, _thread_id: usize) -> Result<()> {
        Ok(())
    }

    /// Read one row; `None` when the key does not exist
    async fn read(&self, table: &str, key: &str, fields: &[String]) -> Result<Option<Record>>;

    /// Read up to `count` rows with keys after `start_key`
    async fn scan(
        &self,
        table: &str,
        start_key: &str,
        count: usize,
        fields: &[String],
    ) -> Result<Vec<Record>>;

    /// Insert one row
    async fn insert(&self, table: &str, key: &str, values: Record) -> Result<()>;

    /// Overwrite the given columns of one row
    async fn update(&self, table: &str, key: &str, values: Record) -> Result<()>;

    /// Delete one row
    async fn delete(&self, table: &str, key: &str) -> Result<()>;

    /// Release all resources; later calls fail
    async fn close(&self) -> Result<()>;
}

/// Multi-row operations
#[async_trait]
pub trait BatchDb: Db {
    /// Read every row whose key is in `keys`
    async fn batch_read(
        &self,
        table: &str,
        keys: &[String],
        fields: &[String],
    ) -> Result<Vec<Record>>;

    /// Insert or replace rows; `keys` and `values` are parallel
    async fn batch_insert(&self, table: &str, keys: &[String], values: Vec<Record>)
        -> Result<()>;

    /// Update existing rows; `keys` and `values` are parallel
    async fn batch_update(&self, table: &str, keys: &[String], values: Vec<Record>)
        -> Result<()>;

    /// Delete every row whose key is in `keys`
    async fn batch_delete(&self, table: &str, keys: &[String]) -> Result<()>;
}

/// Builds a binding from harness properties
#[async_trait]
pub trait DbCreator: Send + Sync {
    /// Connect and prepare the benchmark table
    async fn create(&self, props: &Properties) -> Result<Box<dyn BatchDb>>;
}
