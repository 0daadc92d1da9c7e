//! The YQL query builder
//!
//! Low-level text assembly shared by every query template: the table path
//! pragma, `DECLARE` clauses, quoted identifiers and column lists.

/// Constructs YQL query text line by line
#[derive(Default)]
pub struct YqlQueryBuilder {
    pub(crate) sql: String,
}

impl YqlQueryBuilder {
    /// Construct a new query builder with an empty query
    pub fn new() -> Self {
        YqlQueryBuilder::default()
    }

    /// Get the current query text
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Append raw text
    pub fn push_sql(&mut self, sql: &str) {
        self.sql.push_str(sql);
    }

    /// Append raw text followed by a newline
    pub fn push_line(&mut self, sql: &str) {
        self.sql.push_str(sql);
        self.sql.push('\n');
    }

    /// Append a backtick-quoted identifier
    pub fn push_identifier(&mut self, identifier: &str) {
        self.push_sql("`");
        self.push_sql(&identifier.replace('`', "``"));
        self.push_sql("`");
    }

    /// Append `PRAGMA TablePathPrefix("<prefix>");`
    pub fn push_table_path_prefix(&mut self, prefix: &str) {
        self.push_sql("PRAGMA TablePathPrefix(\"");
        self.push_sql(&prefix.replace('\\', "\\\\").replace('"', "\\\""));
        self.push_line("\");");
    }

    /// Append one `DECLARE ...;` line per clause
    pub fn push_declares(&mut self, declares: &[String]) {
        for declare in declares {
            self.push_sql(declare);
            self.push_line(";");
        }
    }

    /// Append a comma-separated list of quoted columns, or `*` when empty
    pub fn push_columns(&mut self, columns: &[String]) {
        if columns.is_empty() {
            self.push_sql("*");
            return;
        }
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                self.push_sql(", ");
            }
            self.push_identifier(column);
        }
    }

    /// Consume the builder and return the query text
    pub fn finish(self) -> String {
        self.sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_builder_new() {
        let qb = YqlQueryBuilder::new();
        assert!(qb.sql().is_empty());
    }

    #[test]
    fn test_push_identifier() {
        let mut qb = YqlQueryBuilder::new();
        qb.push_identifier("FIELD0");
        assert_eq!(qb.sql(), "`FIELD0`");
    }

    #[test]
    fn test_push_identifier_with_backticks() {
        let mut qb = YqlQueryBuilder::new();
        qb.push_identifier("FIE`LD");
        assert_eq!(qb.sql(), "`FIE``LD`");
    }

    #[test]
    fn test_push_table_path_prefix() {
        let mut qb = YqlQueryBuilder::new();
        qb.push_table_path_prefix("/local");
        assert_eq!(qb.sql(), "PRAGMA TablePathPrefix(\"/local\");\n");
    }

    #[test]
    fn test_push_table_path_prefix_escapes_quotes() {
        let mut qb = YqlQueryBuilder::new();
        qb.push_table_path_prefix("/a\"b");
        assert_eq!(qb.sql(), "PRAGMA TablePathPrefix(\"/a\\\"b\");\n");
    }

    #[test]
    fn test_push_columns() {
        let mut qb = YqlQueryBuilder::new();
        qb.push_columns(&[]);
        assert_eq!(qb.sql(), "*");

        let mut qb = YqlQueryBuilder::new();
        qb.push_columns(&["A".to_string(), "B".to_string()]);
        assert_eq!(qb.sql(), "`A`, `B`");
    }

    #[test]
    fn test_finish() {
        let mut qb = YqlQueryBuilder::new();
        qb.push_declares(&["DECLARE $key AS Utf8".to_string()]);
        qb.push_sql("SELECT ");
        qb.push_columns(&["ID".to_string()]);
        qb.push_line(" FROM users WHERE YCSB_KEY = $key;");
        assert_eq!(
            qb.finish(),
            "DECLARE $key AS Utf8;\nSELECT `ID` FROM users WHERE YCSB_KEY = $key;\n"
        );
    }
}
