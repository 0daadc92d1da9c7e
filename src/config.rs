//! Binding configuration
//!
//! The benchmark harness hands every binding a flat `key -> value` property
//! map. `YdbConfig` picks out the keys this binding understands, applies
//! defaults, and rejects malformed values up front.
//!
//! | Property                | Default                       |
//! |-------------------------|-------------------------------|
//! | `ydb.dsn`               | `http://localhost:8765/local` |
//! | `ydb.token`             | none                          |
//! | `ydb.viewerport`        | 8765                          |
//! | `ydb.retry.maxattempts` | 5                             |
//! | `ydb.requesttimeout`    | 30 (seconds)                  |
//! | `ydb.cache.maxentries`  | 128                           |
//! | `table`                 | `usertable`                   |
//! | `fieldcount`            | 10                            |
//! | `threadcount`           | 1                             |
//! | `verbose`               | false                         |
//! | `dropdata`              | false                         |
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use ycsb_ydb::YdbConfig;
//!
//! let props = HashMap::from([
//!     ("ydb.dsn".to_string(), "grpc://ydb:2136/Root/bench".to_string()),
//!     ("threadcount".to_string(), "8".to_string()),
//! ]);
//! let config = YdbConfig::from_properties(&props).unwrap();
//! assert_eq!(config.endpoint(), "http://ydb:8765");
//! assert_eq!(config.database(), "/Root/bench");
//! assert_eq!(config.pool().max_open(), 16);
//! ```

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::cache::RenderCacheConfig;
use crate::concurrency::PoolConfig;
use crate::error::{Error, Result};
use crate::retry::{RetryPolicy, DEFAULT_MAX_ATTEMPTS};

/// Harness properties
pub type Properties = HashMap<String, String>;

/// Connection string
pub const DSN: &str = "ydb.dsn";
/// Bearer token
pub const TOKEN: &str = "ydb.token";
/// HTTP monitoring port substituted into `grpc`/`grpcs` DSNs
pub const VIEWER_PORT: &str = "ydb.viewerport";
/// Attempts per request, including the first
pub const RETRY_MAX_ATTEMPTS: &str = "ydb.retry.maxattempts";
/// Per-request timeout in seconds
pub const REQUEST_TIMEOUT: &str = "ydb.requesttimeout";
/// Render cache capacity; 0 disables the cache
pub const CACHE_MAX_ENTRIES: &str = "ydb.cache.maxentries";
/// Table name
pub const TABLE_NAME: &str = "table";
/// Number of `FIELDn` columns
pub const FIELD_COUNT: &str = "fieldcount";
/// Number of harness worker threads
pub const THREAD_COUNT: &str = "threadcount";
/// Log every query and its arguments
pub const VERBOSE: &str = "verbose";
/// Drop the table before creating it
pub const DROP_DATA: &str = "dropdata";

/// Default connection string
pub const DEFAULT_DSN: &str = "http://localhost:8765/local";
/// Default HTTP monitoring port of a YDB node
pub const DEFAULT_VIEWER_PORT: u16 = 8765;
/// Default table name
pub const DEFAULT_TABLE_NAME: &str = "usertable";
/// Default number of `FIELDn` columns
pub const DEFAULT_FIELD_COUNT: usize = 10;
/// Default per-request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
/// Default render cache capacity
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 128;

/// Resolved binding configuration
#[derive(Clone, PartialEq, Eq)]
pub struct YdbConfig {
    endpoint: String,
    database: String,
    token: Option<String>,
    table: String,
    field_count: usize,
    thread_count: usize,
    verbose: bool,
    drop_data: bool,
    retry_max_attempts: u32,
    request_timeout: Duration,
    cache_max_entries: usize,
}

impl Default for YdbConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8765".to_string(),
            database: "/local".to_string(),
            token: None,
            table: DEFAULT_TABLE_NAME.to_string(),
            field_count: DEFAULT_FIELD_COUNT,
            thread_count: 1,
            verbose: false,
            drop_data: false,
            retry_max_attempts: DEFAULT_MAX_ATTEMPTS,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            cache_max_entries: DEFAULT_CACHE_MAX_ENTRIES,
        }
    }
}

impl std::fmt::Debug for YdbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YdbConfig")
            .field("endpoint", &self.endpoint)
            .field("database", &self.database)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("table", &self.table)
            .field("field_count", &self.field_count)
            .field("thread_count", &self.thread_count)
            .field("verbose", &self.verbose)
            .field("drop_data", &self.drop_data)
            .field("retry_max_attempts", &self.retry_max_attempts)
            .field("request_timeout", &self.request_timeout)
            .field("cache_max_entries", &self.cache_max_entries)
            .finish()
    }
}

impl YdbConfig {
    /// Create a builder starting from the defaults
    pub fn builder() -> YdbConfigBuilder {
        YdbConfigBuilder::default()
    }

    /// Resolve configuration from harness properties
    pub fn from_properties(props: &Properties) -> Result<Self> {
        let dsn = props.get(DSN).map(String::as_str).unwrap_or(DEFAULT_DSN);
        let viewer_port = parse_prop(props, VIEWER_PORT, DEFAULT_VIEWER_PORT)?;
        let (endpoint, database) = parse_dsn(dsn, viewer_port)?;

        let mut builder = Self::builder()
            .endpoint(endpoint)
            .database(database)
            .table(
                props
                    .get(TABLE_NAME)
                    .map(String::as_str)
                    .unwrap_or(DEFAULT_TABLE_NAME),
            )
            .field_count(parse_prop(props, FIELD_COUNT, DEFAULT_FIELD_COUNT)?)
            .thread_count(parse_prop(props, THREAD_COUNT, 1)?)
            .verbose(parse_bool(props, VERBOSE, false)?)
            .drop_data(parse_bool(props, DROP_DATA, false)?)
            .retry_max_attempts(parse_prop(props, RETRY_MAX_ATTEMPTS, DEFAULT_MAX_ATTEMPTS)?)
            .request_timeout(Duration::from_secs(parse_prop(
                props,
                REQUEST_TIMEOUT,
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?))
            .cache_max_entries(parse_prop(
                props,
                CACHE_MAX_ENTRIES,
                DEFAULT_CACHE_MAX_ENTRIES,
            )?);

        if let Some(token) = props.get(TOKEN).filter(|t| !t.is_empty()) {
            builder = builder.token(token.clone());
        }

        builder.build()
    }

    /// Base URL of the YDB node
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Database path
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Bearer token, if any
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Table name
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Number of `FIELDn` columns
    pub fn field_count(&self) -> usize {
        self.field_count
    }

    /// Number of harness worker threads
    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    /// Whether queries are logged
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Whether the table is dropped before it is created
    pub fn drop_data(&self) -> bool {
        self.drop_data
    }

    /// Per-request timeout
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Pool sizing for the configured thread count
    pub fn pool(&self) -> PoolConfig {
        PoolConfig::for_threads(self.thread_count)
    }

    /// Retry policy
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::builder()
            .max_attempts(self.retry_max_attempts)
            .build()
    }

    /// Render cache configuration
    pub fn cache_config(&self) -> RenderCacheConfig {
        if self.cache_max_entries == 0 {
            RenderCacheConfig::disabled()
        } else {
            RenderCacheConfig::new(self.cache_max_entries)
        }
    }

    /// HTTP connection settings
    #[cfg(feature = "http")]
    pub fn http_config(&self) -> crate::http_connection::YdbHttpConfig {
        let config = crate::http_connection::YdbHttpConfig::new(&self.endpoint, &self.database);
        match &self.token {
            Some(token) => config.with_token(token.clone()),
            None => config,
        }
    }

    /// HTTP transport settings
    #[cfg(feature = "http")]
    pub fn transport_policy(&self) -> crate::concurrency::HttpTransportPolicy {
        crate::concurrency::HttpTransportPolicy::new(self.pool(), self.request_timeout)
    }
}

/// Builder for YdbConfig
#[derive(Debug, Default)]
pub struct YdbConfigBuilder {
    endpoint: Option<String>,
    database: Option<String>,
    token: Option<String>,
    table: Option<String>,
    field_count: Option<usize>,
    thread_count: Option<usize>,
    verbose: Option<bool>,
    drop_data: Option<bool>,
    retry_max_attempts: Option<u32>,
    request_timeout: Option<Duration>,
    cache_max_entries: Option<usize>,
}

impl YdbConfigBuilder {
    /// Set the base URL of the YDB node
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the database path
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Set the bearer token
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the table name
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Set the number of `FIELDn` columns
    pub fn field_count(mut self, count: usize) -> Self {
        self.field_count = Some(count);
        self
    }

    /// Set the number of harness worker threads
    pub fn thread_count(mut self, count: usize) -> Self {
        self.thread_count = Some(count);
        self
    }

    /// Enable or disable query logging
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = Some(verbose);
        self
    }

    /// Drop the table before creating it
    pub fn drop_data(mut self, drop_data: bool) -> Self {
        self.drop_data = Some(drop_data);
        self
    }

    /// Set the number of attempts per request
    pub fn retry_max_attempts(mut self, attempts: u32) -> Self {
        self.retry_max_attempts = Some(attempts);
        self
    }

    /// Set the per-request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Set the render cache capacity; 0 disables the cache
    pub fn cache_max_entries(mut self, max: usize) -> Self {
        self.cache_max_entries = Some(max);
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<YdbConfig> {
        let default = YdbConfig::default();
        let config = YdbConfig {
            endpoint: self.endpoint.unwrap_or(default.endpoint),
            database: self.database.unwrap_or(default.database),
            token: self.token.or(default.token),
            table: self.table.unwrap_or(default.table),
            field_count: self.field_count.unwrap_or(default.field_count),
            thread_count: self.thread_count.unwrap_or(default.thread_count),
            verbose: self.verbose.unwrap_or(default.verbose),
            drop_data: self.drop_data.unwrap_or(default.drop_data),
            retry_max_attempts: self.retry_max_attempts.unwrap_or(default.retry_max_attempts),
            request_timeout: self.request_timeout.unwrap_or(default.request_timeout),
            cache_max_entries: self.cache_max_entries.unwrap_or(default.cache_max_entries),
        };

        if config.table.is_empty() {
            return Err(Error::configuration("table name cannot be empty"));
        }
        if config.thread_count == 0 {
            return Err(Error::configuration("threadcount must be at least 1"));
        }
        if config.retry_max_attempts == 0 {
            return Err(Error::configuration(
                "ydb.retry.maxattempts must be at least 1",
            ));
        }
        if !config.database.starts_with('/') {
            return Err(Error::configuration(format!(
                "database path must be absolute: {}",
                config.database
            )));
        }

        Ok(config)
    }
}

/// Split a DSN into an HTTP endpoint and a database path
///
/// `grpc` and `grpcs` map to `http` and `https` on `viewer_port`, since the
/// gRPC listener does not serve the viewer endpoint. `http` and `https`
/// DSNs keep their own port. The database comes from a `database` query
/// parameter when present, otherwise from the URL path.
pub fn parse_dsn(dsn: &str, viewer_port: u16) -> Result<(String, String)> {
    let url = Url::parse(dsn)
        .map_err(|e| Error::configuration(format!("invalid {} {:?}: {}", DSN, dsn, e)))?;

    let (scheme, port) = match url.scheme() {
        "http" => ("http", url.port()),
        "https" => ("https", url.port()),
        "grpc" => ("http", Some(viewer_port)),
        "grpcs" => ("https", Some(viewer_port)),
        other => {
            return Err(Error::configuration(format!(
                "unsupported {} scheme: {}",
                DSN, other
            )))
        }
    };

    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| Error::configuration(format!("{} has no host: {}", DSN, dsn)))?;

    let endpoint = match port {
        Some(port) => format!("{}://{}:{}", scheme, host, port),
        None => format!("{}://{}", scheme, host),
    };

    let database = url
        .query_pairs()
        .find(|(k, _)| k == "database")
        .map(|(_, v)| v.into_owned())
        .unwrap_or_else(|| url.path().to_string());
    let database = database.trim_end_matches('/');

    if database.is_empty() {
        return Err(Error::configuration(format!(
            "{} has no database path: {}",
            DSN, dsn
        )));
    }

    let database = if database.starts_with('/') {
        database.to_string()
    } else {
        format!("/{}", database)
    };

    Ok((endpoint, database))
}

fn parse_prop<T>(props: &Properties, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match props.get(key).map(|v| v.trim()) {
        None | Some("") => Ok(default),
        Some(raw) => raw.parse().map_err(|e| {
            Error::configuration(format!("invalid value for {}: {:?} ({})", key, raw, e))
        }),
    }
}

fn parse_bool(props: &Properties, key: &str, default: bool) -> Result<bool> {
    match props.get(key).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(raw) => match raw.as_str() {
            "" => Ok(default),
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(Error::configuration(format!(
                "invalid boolean for {}: {:?}",
                key, raw
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(pairs: &[(&str, &str)]) -> Properties {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = YdbConfig::from_properties(&Properties::new()).unwrap();
        assert_eq!(config.endpoint(), "http://localhost:8765");
        assert_eq!(config.database(), "/local");
        assert_eq!(config.table(), "usertable");
        assert_eq!(config.field_count(), 10);
        assert_eq!(config.thread_count(), 1);
        assert!(!config.verbose());
        assert!(!config.drop_data());
        assert!(config.token().is_none());
        assert_eq!(config.retry_policy().max_attempts(), 5);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.cache_config().max_entries(), 128);
    }

    #[test]
    fn test_from_properties() {
        let config = YdbConfig::from_properties(&props(&[
            ("ydb.dsn", "grpcs://ydb.example.com:2135/ru-central1/b1g/etn"),
            ("ydb.token", "t0ken"),
            ("ydb.viewerport", "8443"),
            ("table", "bench"),
            ("fieldcount", "3"),
            ("threadcount", "16"),
            ("verbose", "true"),
            ("dropdata", "1"),
            ("ydb.retry.maxattempts", "2"),
            ("ydb.requesttimeout", "5"),
            ("ydb.cache.maxentries", "0"),
        ]))
        .unwrap();

        assert_eq!(config.endpoint(), "https://ydb.example.com:8443");
        assert_eq!(config.database(), "/ru-central1/b1g/etn");
        assert_eq!(config.token(), Some("t0ken"));
        assert_eq!(config.table(), "bench");
        assert_eq!(config.field_count(), 3);
        assert_eq!(config.pool().max_open(), 32);
        assert_eq!(config.pool().max_idle(), 17);
        assert!(config.verbose());
        assert!(config.drop_data());
        assert_eq!(config.retry_policy().max_attempts(), 2);
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert!(!config.cache_config().enabled());
    }

    #[test]
    fn test_malformed_numbers() {
        let err = YdbConfig::from_properties(&props(&[("fieldcount", "ten")])).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
        assert!(err.to_string().contains("fieldcount"));

        assert!(YdbConfig::from_properties(&props(&[("threadcount", "-1")])).is_err());
        assert!(YdbConfig::from_properties(&props(&[("threadcount", "0")])).is_err());
    }

    #[test]
    fn test_grpc_dsn_uses_viewer_port() {
        let config =
            YdbConfig::from_properties(&props(&[("ydb.dsn", "grpc://localhost:2136/local")]))
                .unwrap();
        assert_eq!(config.endpoint(), "http://localhost:8765");
        assert_eq!(config.database(), "/local");

        let err = YdbConfig::from_properties(&props(&[("ydb.viewerport", "http")])).unwrap_err();
        assert!(err.to_string().contains("ydb.viewerport"));
    }

    #[test]
    fn test_malformed_bool() {
        let err = YdbConfig::from_properties(&props(&[("verbose", "maybe")])).unwrap_err();
        assert!(err.to_string().contains("verbose"));
    }

    #[test]
    fn test_parse_dsn_schemes() {
        assert_eq!(
            parse_dsn("grpc://localhost:2136/local", 8765).unwrap(),
            ("http://localhost:8765".to_string(), "/local".to_string())
        );
        assert_eq!(
            parse_dsn("grpcs://ydb.example.com/Root", 8443).unwrap(),
            ("https://ydb.example.com:8443".to_string(), "/Root".to_string())
        );
        assert_eq!(
            parse_dsn("http://localhost:9000/local", 8765).unwrap(),
            ("http://localhost:9000".to_string(), "/local".to_string())
        );
        assert_eq!(
            parse_dsn("https://ydb.example.com/Root/db/", 8765).unwrap(),
            ("https://ydb.example.com".to_string(), "/Root/db".to_string())
        );
        assert!(parse_dsn("postgres://localhost/db", 8765).is_err());
        assert!(parse_dsn("not a url", 8765).is_err());
    }

    #[test]
    fn test_parse_dsn_database_query_param() {
        let (endpoint, database) =
            parse_dsn(
                "grpcs://ydb.serverless.yandexcloud.net:2135/?database=/ru-central1/b1g/etn",
                8765,
            )
            .unwrap();
        assert_eq!(endpoint, "https://ydb.serverless.yandexcloud.net:8765");
        assert_eq!(database, "/ru-central1/b1g/etn");
    }

    #[test]
    fn test_parse_dsn_missing_database() {
        assert!(parse_dsn("grpc://localhost:2136", 8765).is_err());
        assert!(parse_dsn("grpc://localhost:2136/", 8765).is_err());
    }

    #[test]
    fn test_builder_validation() {
        assert!(YdbConfig::builder().table("").build().is_err());
        assert!(YdbConfig::builder().database("local").build().is_err());
        assert!(YdbConfig::builder().retry_max_attempts(0).build().is_err());
        assert!(YdbConfig::builder().build().is_ok());
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = YdbConfig::builder().token("s3cr3t").build().unwrap();
        assert!(!format!("{:?}", config).contains("s3cr3t"));
    }

    #[cfg(feature = "http")]
    #[test]
    fn test_http_config() {
        let config = YdbConfig::builder()
            .endpoint("http://ydb:8765")
            .database("/Root")
            .token("abc")
            .thread_count(3)
            .build()
            .unwrap();
        let http = config.http_config();
        assert_eq!(http.endpoint, "http://ydb:8765");
        assert_eq!(http.database, "/Root");
        assert_eq!(http.token.as_deref(), Some("abc"));
        assert_eq!(config.transport_policy().pool_idle_connections(), 4);
    }
}
