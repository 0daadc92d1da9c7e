//! Query templates
//!
//! The eleven YQL statements the binding issues. Every rendered query has
//! the same layout:
//!
//! ```text
//! PRAGMA TablePathPrefix("/local");
//! DECLARE $key AS Utf8;
//!
//! SELECT `FIELD0`, `FIELD1` FROM usertable WHERE YCSB_KEY = $key;
//! ```
//!
//! Column lists are sorted and upper-cased before rendering so the same
//! logical request always produces the same text and hits the render cache.

use std::fmt::{self, Write};
use std::sync::Arc;

use crate::cache::{RenderCache, RenderCacheConfig};
use crate::params::Params;
use crate::query_builder::YqlQueryBuilder;
use crate::value::Value;

/// Name of the primary key column
pub const KEY_COLUMN: &str = "YCSB_KEY";

/// Prefix of the generated value columns (`FIELD0`, `FIELD1`, ...)
pub const FIELD_PREFIX: &str = "FIELD";

/// The fixed set of statements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Template {
    /// `CREATE TABLE`
    CreateTable,
    /// `DROP TABLE`
    DropTable,
    /// Point lookup by key
    Read,
    /// Lookup of a key list
    BatchRead,
    /// Range read starting after a key
    Scan,
    /// `INSERT` of a struct list
    Insert,
    /// `UPSERT` of a struct list
    BatchInsert,
    /// `UPSERT` of a single-row struct list
    Update,
    /// `UPDATE ON` of a struct list
    BatchUpdate,
    /// Point delete by key
    Delete,
    /// Delete of a key list
    BatchDelete,
}

impl Template {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Template::CreateTable => "create_table",
            Template::DropTable => "drop_table",
            Template::Read => "read",
            Template::BatchRead => "batch_read",
            Template::Scan => "scan",
            Template::Insert => "insert",
            Template::BatchInsert => "batch_insert",
            Template::Update => "update",
            Template::BatchUpdate => "batch_update",
            Template::Delete => "delete",
            Template::BatchDelete => "batch_delete",
        }
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rendered query together with its parameter bindings
#[derive(Debug, Clone)]
pub struct Request {
    template: Template,
    query: Arc<str>,
    params: Params,
}

impl Request {
    /// The template this request was rendered from
    pub fn template(&self) -> Template {
        self.template
    }

    /// The YQL text
    pub fn query(&self) -> &str {
        &self.query
    }

    /// The bound parameters
    pub fn params(&self) -> &Params {
        &self.params
    }
}

/// Everything substituted into a template
struct TemplateData<'a> {
    table_path_prefix: &'a str,
    table_name: &'a str,
    declares: Vec<String>,
    columns: Vec<String>,
}

impl TemplateData<'_> {
    /// Every part is length-prefixed and every list is counted, so no two
    /// distinct inputs share a key whatever characters they contain.
    fn cache_key(&self, template: Template) -> String {
        let mut key = String::from(template.as_str());
        push_key_part(&mut key, self.table_path_prefix);
        push_key_part(&mut key, self.table_name);
        for list in [&self.columns, &self.declares] {
            let _ = write!(key, "|#{}", list.len());
            for part in list {
                push_key_part(&mut key, part);
            }
        }
        key
    }
}

fn push_key_part(key: &mut String, part: &str) {
    let _ = write!(key, "|{}:{}", part.len(), part);
}

/// Renders requests, memoising the query text per shape
#[derive(Debug, Default)]
pub struct QueryRenderer {
    cache: RenderCache,
}

impl QueryRenderer {
    /// Create a renderer with the given cache configuration
    pub fn new(cache: RenderCacheConfig) -> Self {
        Self {
            cache: RenderCache::new(cache),
        }
    }

    /// The underlying render cache
    pub fn cache(&self) -> &RenderCache {
        &self.cache
    }

    /// `CREATE TABLE` with a text key and `field_count` byte columns
    pub fn create_table(&self, prefix: &str, table: &str, field_count: usize) -> Request {
        let columns = (0..field_count)
            .map(|i| format!("{}{}", FIELD_PREFIX, i))
            .collect();
        self.render(
            Template::CreateTable,
            prefix,
            table,
            columns,
            Params::new(),
        )
    }

    /// `DROP TABLE`
    pub fn drop_table(&self, prefix: &str, table: &str) -> Request {
        self.render(Template::DropTable, prefix, table, Vec::new(), Params::new())
    }

    /// Read one row by key; empty `columns` selects everything
    pub fn read(&self, prefix: &str, table: &str, columns: &[String], key: &str) -> Request {
        let params = Params::new().bind("key", key);
        self.render(Template::Read, prefix, table, normalize_columns(columns), params)
    }

    /// Read every row whose key is in `keys`
    pub fn batch_read(
        &self,
        prefix: &str,
        table: &str,
        columns: &[String],
        keys: &[String],
    ) -> Request {
        let params = Params::new().bind("keys", keys.to_vec());
        self.render(
            Template::BatchRead,
            prefix,
            table,
            normalize_columns(columns),
            params,
        )
    }

    /// Read up to `limit` rows with keys greater than `key`
    pub fn scan(
        &self,
        prefix: &str,
        table: &str,
        columns: &[String],
        key: &str,
        limit: u64,
    ) -> Request {
        let params = Params::new().bind("key", key).bind("limit", limit);
        self.render(Template::Scan, prefix, table, normalize_columns(columns), params)
    }

    /// `INSERT` the rows of a struct list
    pub fn insert(&self, prefix: &str, table: &str, values: Value) -> Request {
        self.render_values(Template::Insert, prefix, table, values)
    }

    /// `UPSERT` the rows of a struct list
    pub fn batch_insert(&self, prefix: &str, table: &str, values: Value) -> Request {
        self.render_values(Template::BatchInsert, prefix, table, values)
    }

    /// `UPSERT` the rows of a struct list
    pub fn update(&self, prefix: &str, table: &str, values: Value) -> Request {
        self.render_values(Template::Update, prefix, table, values)
    }

    /// `UPDATE ON` the rows of a struct list
    pub fn batch_update(&self, prefix: &str, table: &str, values: Value) -> Request {
        self.render_values(Template::BatchUpdate, prefix, table, values)
    }

    /// Delete one row by key
    pub fn delete(&self, prefix: &str, table: &str, key: &str) -> Request {
        let params = Params::new().bind("key", key);
        self.render(Template::Delete, prefix, table, Vec::new(), params)
    }

    /// Delete every row whose key is in `keys`
    pub fn batch_delete(&self, prefix: &str, table: &str, keys: &[String]) -> Request {
        let params = Params::new().bind("keys", keys.to_vec());
        self.render(Template::BatchDelete, prefix, table, Vec::new(), params)
    }

    fn render_values(&self, template: Template, prefix: &str, table: &str, values: Value) -> Request {
        let params = Params::new().bind("values", values);
        self.render(template, prefix, table, Vec::new(), params)
    }

    fn render(
        &self,
        template: Template,
        prefix: &str,
        table: &str,
        columns: Vec<String>,
        params: Params,
    ) -> Request {
        let data = TemplateData {
            table_path_prefix: prefix,
            table_name: table,
            declares: params.declares(),
            columns,
        };
        let query = self
            .cache
            .get_or_render(&data.cache_key(template), || render_template(template, &data));
        Request {
            template,
            query,
            params,
        }
    }
}

/// Sort then upper-case, leaving the caller's slice untouched
fn normalize_columns(columns: &[String]) -> Vec<String> {
    let mut columns = columns.to_vec();
    columns.sort();
    columns.iter().map(|c| c.to_uppercase()).collect()
}

fn render_template(template: Template, data: &TemplateData<'_>) -> String {
    let mut qb = YqlQueryBuilder::new();
    qb.push_table_path_prefix(data.table_path_prefix);
    qb.push_declares(&data.declares);
    qb.push_line("");

    let table = data.table_name;
    match template {
        Template::CreateTable => {
            qb.push_line(&format!("CREATE TABLE {} (", table));
            qb.push_line(&format!("    {} Text NOT NULL,", KEY_COLUMN));
            for column in &data.columns {
                qb.push_sql("    ");
                qb.push_identifier(column);
                qb.push_line(" Bytes,");
            }
            qb.push_line(&format!("    PRIMARY KEY ({})", KEY_COLUMN));
            qb.push_line(");");
        }
        Template::DropTable => {
            qb.push_line(&format!("DROP TABLE {};", table));
        }
        Template::Read | Template::BatchRead | Template::Scan => {
            qb.push_sql("SELECT ");
            qb.push_columns(&data.columns);
            let filter = match template {
                Template::Read => "= $key;",
                Template::BatchRead => "IN $keys;",
                _ => "> $key LIMIT $limit;",
            };
            qb.push_line(&format!(" FROM {} WHERE {} {}", table, KEY_COLUMN, filter));
        }
        Template::Insert => {
            qb.push_line(&format!("INSERT INTO {} SELECT * FROM AS_TABLE($values);", table));
        }
        Template::BatchInsert | Template::Update => {
            qb.push_line(&format!("UPSERT INTO {} SELECT * FROM AS_TABLE($values);", table));
        }
        Template::BatchUpdate => {
            qb.push_line(&format!("UPDATE {} ON SELECT * FROM AS_TABLE($values);", table));
        }
        Template::Delete => {
            qb.push_line(&format!("DELETE FROM {} WHERE {} = $key;", table, KEY_COLUMN));
        }
        Template::BatchDelete => {
            qb.push_line(&format!("DELETE FROM {} WHERE {} IN $keys;", table, KEY_COLUMN));
        }
    }

    qb.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREFIX: &str = "/local";
    const TABLE: &str = "ycsbtable";

    fn split_and_simplify(request: &Request) -> Vec<String> {
        request
            .query()
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect()
    }

    fn shuffled_columns() -> Vec<String> {
        ["col0", "col5", "col3", "col1", "col2", "col4"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn sample_values() -> Value {
        Value::list_from(vec![Value::struct_value(vec![
            ("key".to_string(), Value::text("")),
            ("value".to_string(), Value::uint64(0)),
        ])])
        .unwrap()
    }

    #[test]
    fn test_scan() {
        let renderer = QueryRenderer::default();

        let got = split_and_simplify(&renderer.scan(PREFIX, TABLE, &[], "", 5));
        assert_eq!(
            got,
            vec![
                "PRAGMA TablePathPrefix(\"/local\");",
                "DECLARE $key AS Utf8;",
                "DECLARE $limit AS Uint64;",
                "SELECT * FROM ycsbtable WHERE YCSB_KEY > $key LIMIT $limit;",
            ]
        );

        let got = split_and_simplify(&renderer.scan(PREFIX, TABLE, &shuffled_columns(), "", 5));
        assert_eq!(
            got,
            vec![
                "PRAGMA TablePathPrefix(\"/local\");",
                "DECLARE $key AS Utf8;",
                "DECLARE $limit AS Uint64;",
                "SELECT `COL0`, `COL1`, `COL2`, `COL3`, `COL4`, `COL5` FROM ycsbtable WHERE YCSB_KEY > $key LIMIT $limit;",
            ]
        );
    }

    #[test]
    fn test_read() {
        let renderer = QueryRenderer::default();

        let got = split_and_simplify(&renderer.read(PREFIX, TABLE, &[], ""));
        assert_eq!(
            got,
            vec![
                "PRAGMA TablePathPrefix(\"/local\");",
                "DECLARE $key AS Utf8;",
                "SELECT * FROM ycsbtable WHERE YCSB_KEY = $key;",
            ]
        );

        let got = split_and_simplify(&renderer.read(PREFIX, TABLE, &shuffled_columns(), ""));
        assert_eq!(
            got,
            vec![
                "PRAGMA TablePathPrefix(\"/local\");",
                "DECLARE $key AS Utf8;",
                "SELECT `COL0`, `COL1`, `COL2`, `COL3`, `COL4`, `COL5` FROM ycsbtable WHERE YCSB_KEY = $key;",
            ]
        );
    }

    #[test]
    fn test_batch_read() {
        let renderer = QueryRenderer::default();
        let keys = vec![String::new()];

        let got = split_and_simplify(&renderer.batch_read(PREFIX, TABLE, &[], &keys));
        assert_eq!(
            got,
            vec![
                "PRAGMA TablePathPrefix(\"/local\");",
                "DECLARE $keys AS List<Utf8>;",
                "SELECT * FROM ycsbtable WHERE YCSB_KEY IN $keys;",
            ]
        );

        let got =
            split_and_simplify(&renderer.batch_read(PREFIX, TABLE, &shuffled_columns(), &keys));
        assert_eq!(
            got,
            vec![
                "PRAGMA TablePathPrefix(\"/local\");",
                "DECLARE $keys AS List<Utf8>;",
                "SELECT `COL0`, `COL1`, `COL2`, `COL3`, `COL4`, `COL5` FROM ycsbtable WHERE YCSB_KEY IN $keys;",
            ]
        );
    }

    #[test]
    fn test_create_table() {
        let renderer = QueryRenderer::default();

        let got = split_and_simplify(&renderer.create_table(PREFIX, TABLE, 0));
        assert_eq!(
            got,
            vec![
                "PRAGMA TablePathPrefix(\"/local\");",
                "CREATE TABLE ycsbtable (",
                "YCSB_KEY Text NOT NULL,",
                "PRIMARY KEY (YCSB_KEY)",
                ");",
            ]
        );

        let got = split_and_simplify(&renderer.create_table(PREFIX, TABLE, 2));
        assert_eq!(
            got,
            vec![
                "PRAGMA TablePathPrefix(\"/local\");",
                "CREATE TABLE ycsbtable (",
                "YCSB_KEY Text NOT NULL,",
                "`FIELD0` Bytes,",
                "`FIELD1` Bytes,",
                "PRIMARY KEY (YCSB_KEY)",
                ");",
            ]
        );

        let got = split_and_simplify(&renderer.create_table(PREFIX, TABLE, 5));
        assert_eq!(got.len(), 10);
        assert_eq!(got[7], "`FIELD4` Bytes,");
    }

    #[test]
    fn test_drop_table() {
        let renderer = QueryRenderer::default();
        let got = split_and_simplify(&renderer.drop_table(PREFIX, TABLE));
        assert_eq!(
            got,
            vec!["PRAGMA TablePathPrefix(\"/local\");", "DROP TABLE ycsbtable;"]
        );
    }

    #[test]
    fn test_delete() {
        let renderer = QueryRenderer::default();
        let got = split_and_simplify(&renderer.delete(PREFIX, TABLE, ""));
        assert_eq!(
            got,
            vec![
                "PRAGMA TablePathPrefix(\"/local\");",
                "DECLARE $key AS Utf8;",
                "DELETE FROM ycsbtable WHERE YCSB_KEY = $key;",
            ]
        );
    }

    #[test]
    fn test_batch_delete() {
        let renderer = QueryRenderer::default();
        let got = split_and_simplify(&renderer.batch_delete(PREFIX, TABLE, &[String::new()]));
        assert_eq!(
            got,
            vec![
                "PRAGMA TablePathPrefix(\"/local\");",
                "DECLARE $keys AS List<Utf8>;",
                "DELETE FROM ycsbtable WHERE YCSB_KEY IN $keys;",
            ]
        );
    }

    #[test]
    fn test_value_statements() {
        let renderer = QueryRenderer::default();
        let cases = [
            (
                renderer.insert(PREFIX, TABLE, sample_values()),
                "INSERT INTO ycsbtable SELECT * FROM AS_TABLE($values);",
            ),
            (
                renderer.batch_insert(PREFIX, TABLE, sample_values()),
                "UPSERT INTO ycsbtable SELECT * FROM AS_TABLE($values);",
            ),
            (
                renderer.update(PREFIX, TABLE, sample_values()),
                "UPSERT INTO ycsbtable SELECT * FROM AS_TABLE($values);",
            ),
            (
                renderer.batch_update(PREFIX, TABLE, sample_values()),
                "UPDATE ycsbtable ON SELECT * FROM AS_TABLE($values);",
            ),
        ];

        for (request, statement) in cases {
            assert_eq!(
                split_and_simplify(&request),
                vec![
                    "PRAGMA TablePathPrefix(\"/local\");",
                    "DECLARE $values AS List<Struct<key:Utf8,value:Uint64>>;",
                    statement,
                ]
            );
        }
    }

    #[test]
    fn test_params_bound() {
        let renderer = QueryRenderer::default();
        let request = renderer.scan(PREFIX, TABLE, &[], "user10", 7);
        assert_eq!(request.template(), Template::Scan);
        assert_eq!(request.params().get("key"), Some(&Value::text("user10")));
        assert_eq!(request.params().get("limit"), Some(&Value::uint64(7)));
    }

    #[test]
    fn test_columns_not_mutated() {
        let renderer = QueryRenderer::default();
        let columns = shuffled_columns();
        renderer.read(PREFIX, TABLE, &columns, "");
        assert_eq!(columns, shuffled_columns());
    }

    #[test]
    fn test_same_shape_hits_cache() {
        let renderer = QueryRenderer::default();

        let a = renderer.read(PREFIX, TABLE, &[], "user1");
        let b = renderer.read(PREFIX, TABLE, &[], "user2");
        assert_eq!(a.query(), b.query());

        renderer.read(PREFIX, "othertable", &[], "user1");

        let stats = renderer.cache().stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
        assert_eq!(renderer.cache().len(), 2);
    }

    #[test]
    fn test_separator_characters_do_not_share_cached_text() {
        let renderer = QueryRenderer::default();

        renderer.drop_table("/x|y", "z");
        let got = split_and_simplify(&renderer.drop_table("/x", "y|z"));
        assert_eq!(
            got,
            vec!["PRAGMA TablePathPrefix(\"/x\");", "DROP TABLE y|z;"]
        );

        let joined = vec!["a,b".to_string()];
        let split = vec!["a".to_string(), "b".to_string()];
        renderer.read(PREFIX, TABLE, &joined, "");
        let got = split_and_simplify(&renderer.read(PREFIX, TABLE, &split, ""));
        assert_eq!(
            got[2],
            "SELECT `A`, `B` FROM ycsbtable WHERE YCSB_KEY = $key;"
        );

        renderer.read(PREFIX, "t", &["|1:u".to_string()], "");
        let got = split_and_simplify(&renderer.read(PREFIX, "t|1:u", &[], ""));
        assert_eq!(got[2], "SELECT * FROM t|1:u WHERE YCSB_KEY = $key;");

        assert_eq!(renderer.cache().stats().hits, 0);
        assert_eq!(renderer.cache().len(), 6);
    }

    #[test]
    fn test_different_value_shape_renders_new_text() {
        let renderer = QueryRenderer::default();
        let narrow = Value::list_from(vec![Value::struct_value(vec![(
            "YCSB_KEY".to_string(),
            Value::text("k"),
        )])])
        .unwrap();

        let a = renderer.insert(PREFIX, TABLE, narrow);
        let b = renderer.insert(PREFIX, TABLE, sample_values());
        assert_ne!(a.query(), b.query());
    }
}
