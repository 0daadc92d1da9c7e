//! HTTP-based YDB connection
//!
//! This module provides the YdbHttpConnection type that runs YQL through the
//! YDB viewer's JSON query endpoint. It lets the binding reach a database
//! from any environment that can make HTTP requests.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{Error, Result};
use crate::executor::{Executor, QueryMode};
use crate::query::Request;
use crate::row::ResultSet;

/// Configuration for a YDB HTTP connection
///
/// # Example
///
/// ```
/// use ycsb_ydb::YdbHttpConfig;
///
/// let config = YdbHttpConfig::new("http://localhost:8765", "/local")
///     .with_token("secret");
/// assert_eq!(
///     config.query_url(),
///     "http://localhost:8765/viewer/json/query?schema=multi&base64=true"
/// );
/// ```
#[derive(Clone)]
pub struct YdbHttpConfig {
    /// Base URL of the YDB node, e.g. `http://localhost:8765`
    pub endpoint: String,
    /// Database path, e.g. `/local`
    pub database: String,
    /// Optional bearer token
    pub token: Option<String>,
}

impl YdbHttpConfig {
    /// Create a new configuration without authentication
    pub fn new(endpoint: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            database: database.into(),
            token: None,
        }
    }

    /// Authenticate with a bearer token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Build the query URL for this endpoint
    pub fn query_url(&self) -> String {
        format!(
            "{}/viewer/json/query?schema=multi&base64=true",
            self.endpoint.trim_end_matches('/')
        )
    }
}

impl std::fmt::Debug for YdbHttpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YdbHttpConfig")
            .field("endpoint", &self.endpoint)
            .field("database", &self.database)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Query request body
#[derive(Serialize, Debug)]
struct QueryRequest<'a> {
    query: &'a str,
    database: &'a str,
    action: &'static str,
    syntax: &'static str,
    #[serde(skip_serializing_if = "is_empty_object")]
    parameters: JsonValue,
}

fn is_empty_object(value: &JsonValue) -> bool {
    value.as_object().map(|o| o.is_empty()).unwrap_or(false)
}

/// Query response body
#[derive(Deserialize, Debug)]
struct QueryResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    issues: Vec<QueryIssue>,
    #[serde(default)]
    result: Vec<ResultSet>,
}

/// A diagnostic attached to a response
#[derive(Deserialize, Debug)]
struct QueryIssue {
    #[serde(default)]
    message: String,
    #[allow(dead_code)]
    #[serde(default)]
    severity: Option<u32>,
}

fn action_for(mode: QueryMode) -> &'static str {
    match mode {
        QueryMode::Data => "execute-data",
        QueryMode::Scan => "execute-scan",
        QueryMode::Scheme => "execute-scheme",
    }
}

fn request_body<'a>(database: &'a str, mode: QueryMode, request: &'a Request) -> QueryRequest<'a> {
    QueryRequest {
        query: request.query(),
        database,
        action: action_for(mode),
        syntax: "yql_v1",
        parameters: request.params().to_json(),
    }
}

/// Decode a 2xx response body into its result sets
fn parse_response(body: &str) -> Result<Vec<ResultSet>> {
    let response: QueryResponse = serde_json::from_str(body)
        .map_err(|e| Error::decode(format!("failed to parse response: {}", e)))?;

    let status = response.status.as_deref().unwrap_or("SUCCESS");
    if status != "SUCCESS" {
        let message = response
            .issues
            .iter()
            .map(|i| i.message.as_str())
            .filter(|m| !m.is_empty())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(Error::status(status, message));
    }

    Ok(response.result)
}

/// YDB connection using the viewer HTTP API
///
/// # Example
///
/// ```no_run
/// use ycsb_ydb::{YdbHttpConfig, YdbHttpConnection};
///
/// let config = YdbHttpConfig::new("http://localhost:8765", "/local");
/// let conn = YdbHttpConnection::new(config);
/// ```
pub struct YdbHttpConnection {
    client: Client,
    config: YdbHttpConfig,
}

impl YdbHttpConnection {
    /// Create a new HTTP connection with the given configuration
    pub fn new(config: YdbHttpConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Create a new HTTP connection with a custom reqwest client
    pub fn with_client(config: YdbHttpConfig, client: Client) -> Self {
        Self { client, config }
    }

    /// The connection configuration
    pub fn config(&self) -> &YdbHttpConfig {
        &self.config
    }

    /// Post a request and return every result set
    async fn send(&self, mode: QueryMode, request: &Request) -> Result<Vec<ResultSet>> {
        let body = request_body(&self.config.database, mode, request);

        let mut builder = self
            .client
            .post(self.config.query_url())
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(token) = &self.config.token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(Error::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        parse_response(&text)
    }
}

#[async_trait]
impl Executor for YdbHttpConnection {
    fn database_path(&self) -> &str {
        &self.config.database
    }

    async fn execute(&self, mode: QueryMode, request: &Request) -> Result<()> {
        self.send(mode, request).await?;
        Ok(())
    }

    async fn query(&self, mode: QueryMode, request: &Request) -> Result<ResultSet> {
        Ok(self
            .send(mode, request)
            .await?
            .into_iter()
            .next()
            .unwrap_or_default())
    }
}
