//! The YDB binding
//!
//! `YdbDb` turns harness operations into rendered requests and runs them
//! through an [`Executor`]. Every request:
//!
//! 1. takes a permit from the concurrency governor
//! 2. runs inside the retry helper
//! 3. produces one span for the span emitter
//!
//! Point reads and writes run as data queries. `batch_read` and `scan` run
//! as scan queries. Table DDL runs as scheme queries.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::batch::{BatchRow, RowBatch};
use crate::concurrency::QueryGovernor;
use crate::config::YdbConfig;
use crate::db::{BatchDb, Db, Record};
use crate::error::{Error, Result};
use crate::executor::{Executor, QueryMode};
use crate::query::{QueryRenderer, Request};
use crate::retry::{retry, RetryPolicy};
use crate::row::ResultSet;
use crate::tracing_support::{SpanEmitter, SpanTimer, TracingSpanEmitter};

/// YDB benchmark binding over any executor
pub struct YdbDb<E: Executor> {
    executor: E,
    config: YdbConfig,
    database_path: String,
    renderer: QueryRenderer,
    retry_policy: RetryPolicy,
    governor: QueryGovernor,
    emitter: Arc<dyn SpanEmitter>,
    closed: AtomicBool,
}

impl<E: Executor> YdbDb<E> {
    /// Wrap an executor without touching the database
    pub fn new(executor: E, config: YdbConfig) -> Self {
        let database_path = executor.database_path().to_string();
        Self {
            renderer: QueryRenderer::new(config.cache_config()),
            retry_policy: config.retry_policy(),
            governor: QueryGovernor::new(config.pool().max_open()),
            emitter: Arc::new(TracingSpanEmitter),
            closed: AtomicBool::new(false),
            database_path,
            executor,
            config,
        }
    }

    /// Wrap an executor and create the benchmark table
    pub async fn open(executor: E, config: YdbConfig) -> Result<Self> {
        let db = Self::new(executor, config);
        db.create_table().await?;
        Ok(db)
    }

    /// Replace the span emitter
    pub fn with_span_emitter(mut self, emitter: Arc<dyn SpanEmitter>) -> Self {
        self.emitter = emitter;
        self
    }

    /// Replace the retry policy
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// The resolved configuration
    pub fn config(&self) -> &YdbConfig {
        &self.config
    }

    /// Table path prefix used by every query
    pub fn database_path(&self) -> &str {
        &self.database_path
    }

    /// The underlying executor
    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// The query renderer and its cache
    pub fn renderer(&self) -> &QueryRenderer {
        &self.renderer
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Create the benchmark table, dropping it first when `dropdata` is set
    ///
    /// A failed drop is ignored; the table may not exist yet.
    pub async fn create_table(&self) -> Result<()> {
        let table = self.config.table();

        if self.config.drop_data() {
            let request = self.renderer.drop_table(&self.database_path, table);
            if let Err(e) = self.run_statement(QueryMode::Scheme, &request).await {
                tracing::debug!(table, error = %e, "drop table failed, continuing");
            }
        }

        let request =
            self.renderer
                .create_table(&self.database_path, table, self.config.field_count());
        self.exec_query(QueryMode::Scheme, &request).await
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Closed);
        }
        Ok(())
    }

    fn log_request(&self, mode: QueryMode, request: &Request) {
        if self.config.verbose() {
            tracing::info!(
                operation = %request.template(),
                mode = %mode,
                args = %request.params().describe(),
                "{}",
                request.query()
            );
        }
    }

    fn log_failure(&self, mode: QueryMode, request: &Request, error: &Error) {
        tracing::error!(
            operation = %request.template(),
            mode = %mode,
            error.class = %error.class(),
            error = %error,
            "ydb request failed"
        );
    }

    fn finish(&self, timer: SpanTimer, result: std::result::Result<usize, &Error>, attempts: u32) {
        let span = match result {
            Ok(rows) => timer.finish_success(rows, attempts),
            Err(e) => timer.finish_error(e.class(), e.to_string(), attempts),
        };
        self.emitter.emit_span(&span);
    }

    /// Run a statement without logging its failure
    async fn run_statement(&self, mode: QueryMode, request: &Request) -> Result<()> {
        self.ensure_open()?;
        self.log_request(mode, request);

        let _permit = self.governor.acquire().await?;
        let timer = SpanTimer::start(request.template(), mode);
        let executor = &self.executor;
        let outcome = retry(&self.retry_policy, move |_| executor.execute(mode, request)).await;

        self.finish(timer, outcome.result.as_ref().map(|_| 0), outcome.attempts);
        outcome.result
    }

    async fn exec_query(&self, mode: QueryMode, request: &Request) -> Result<()> {
        self.run_statement(mode, request)
            .await
            .inspect_err(|e| self.log_failure(mode, request, e))
    }

    async fn query_rows(&self, mode: QueryMode, request: &Request) -> Result<Vec<Record>> {
        self.ensure_open()?;
        self.log_request(mode, request);

        let _permit = self.governor.acquire().await?;
        let timer = SpanTimer::start(request.template(), mode);
        let executor = &self.executor;
        let outcome = retry(&self.retry_policy, move |_| executor.query(mode, request)).await;
        let result = outcome.result.and_then(ResultSet::into_records);

        self.finish(timer, result.as_ref().map(Vec::len), outcome.attempts);
        result.inspect_err(|e| self.log_failure(mode, request, e))
    }
}

#[async_trait]
impl<E: Executor> Db for YdbDb<E> {
    async fn read(&self, table: &str, key: &str, fields: &[String]) -> Result<Option<Record>> {
        let request = self.renderer.read(&self.database_path, table, fields, key);
        let rows = self.query_rows(QueryMode::Data, &request).await?;
        Ok(rows.into_iter().next())
    }

    async fn scan(
        &self,
        table: &str,
        start_key: &str,
        count: usize,
        fields: &[String],
    ) -> Result<Vec<Record>> {
        let request =
            self.renderer
                .scan(&self.database_path, table, fields, start_key, count as u64);
        self.query_rows(QueryMode::Scan, &request).await
    }

    async fn insert(&self, table: &str, key: &str, values: Record) -> Result<()> {
        let rows = BatchRow::new(key, values).into_value()?;
        let request = self.renderer.insert(&self.database_path, table, rows);
        self.exec_query(QueryMode::Data, &request).await
    }

    async fn update(&self, table: &str, key: &str, values: Record) -> Result<()> {
        let rows = BatchRow::new(key, values).into_value()?;
        let request = self.renderer.update(&self.database_path, table, rows);
        self.exec_query(QueryMode::Data, &request).await
    }

    async fn delete(&self, table: &str, key: &str) -> Result<()> {
        let request = self.renderer.delete(&self.database_path, table, key);
        self.exec_query(QueryMode::Data, &request).await
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.governor.close();
        self.executor.close().await
    }
}

#[async_trait]
impl<E: Executor> BatchDb for YdbDb<E> {
    async fn batch_read(
        &self,
        table: &str,
        keys: &[String],
        fields: &[String],
    ) -> Result<Vec<Record>> {
        if keys.is_empty() {
            self.ensure_open()?;
            return Ok(Vec::new());
        }
        let request = self
            .renderer
            .batch_read(&self.database_path, table, fields, keys);
        self.query_rows(QueryMode::Scan, &request).await
    }

    async fn batch_insert(&self, table: &str, keys: &[String], values: Vec<Record>) -> Result<()> {
        let batch = RowBatch::from_parts(keys, values)?;
        if batch.is_empty() {
            return self.ensure_open();
        }
        let request = self
            .renderer
            .batch_insert(&self.database_path, table, batch.into_value()?);
        self.exec_query(QueryMode::Data, &request).await
    }

    async fn batch_update(&self, table: &str, keys: &[String], values: Vec<Record>) -> Result<()> {
        let batch = RowBatch::from_parts(keys, values)?;
        if batch.is_empty() {
            return self.ensure_open();
        }
        let request = self
            .renderer
            .batch_update(&self.database_path, table, batch.into_value()?);
        self.exec_query(QueryMode::Data, &request).await
    }

    async fn batch_delete(&self, table: &str, keys: &[String]) -> Result<()> {
        if keys.is_empty() {
            return self.ensure_open();
        }
        let request = self.renderer.batch_delete(&self.database_path, table, keys);
        self.exec_query(QueryMode::Data, &request).await
    }
}

#[cfg(feature = "http")]
pub use self::http::{creator_for, YdbCreator};

#[cfg(feature = "http")]
mod http {
    use super::*;
    use crate::config::Properties;
    use crate::db::{DbCreator, YDB_DRIVER_NAME};
    use crate::http_connection::YdbHttpConnection;

    /// Creates HTTP-backed YDB bindings from harness properties
    #[derive(Debug, Clone, Copy, Default)]
    pub struct YdbCreator;

    #[async_trait]
    impl DbCreator for YdbCreator {
        async fn create(&self, props: &Properties) -> Result<Box<dyn BatchDb>> {
            let config = YdbConfig::from_properties(props)?;
            let client = config.transport_policy().create_client()?;
            let connection = YdbHttpConnection::with_client(config.http_config(), client);

            tracing::info!(
                endpoint = config.endpoint(),
                database = config.database(),
                table = config.table(),
                threads = config.thread_count(),
                "opening ydb binding"
            );

            let db = YdbDb::open(connection, config).await?;
            Ok(Box::new(db))
        }
    }

    /// Look up a creator by its registry name
    pub fn creator_for(name: &str) -> Option<Box<dyn DbCreator>> {
        match name {
            YDB_DRIVER_NAME => Some(Box::new(YdbCreator)),
            _ => None,
        }
    }
}
