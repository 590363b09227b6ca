// Copyright (c) 2025 pg-sql-lsp contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Metadata queries
//!
//! Queries are keyed by the minimum `server_version_num` they work on. A
//! battery for a given server takes, per query, the entry with the highest
//! key not above the server version.
//!
//! Privilege and system-schema filtering happens inside the SQL so only
//! objects the credential can use ever leave the server.

/// Reads the numeric server version
pub const SERVER_VERSION: &str =
    "SELECT current_setting('server_version_num') AS server_version_num;";

/// Schemas the credential can use and create in
pub const SCHEMAS: &str = r#"
SELECT nspname AS name
FROM pg_catalog.pg_namespace
WHERE
  nspname NOT IN ('information_schema', 'pg_catalog', 'pg_toast')
  AND nspname NOT LIKE 'pg_temp_%'
  AND nspname NOT LIKE 'pg_toast_temp_%'
  AND has_schema_privilege(oid, 'CREATE, USAGE')
ORDER BY nspname;"#;

/// Tables and views with their live columns aggregated as JSON
pub const TABLES: &str = r#"
SELECT
  tbl.schemaname,
  tbl.tablename,
  tbl.quoted_name,
  tbl.is_table,
  COALESCE(json_agg(a ORDER BY a.attnum) FILTER (WHERE a IS NOT NULL), '[]') AS columns
FROM (
  SELECT
    schemaname,
    tablename,
    (quote_ident(schemaname) || '.' || quote_ident(tablename)) AS quoted_name,
    true AS is_table
  FROM pg_catalog.pg_tables
  WHERE
    schemaname NOT IN ('information_schema', 'pg_catalog', 'pg_toast')
    AND schemaname NOT LIKE 'pg_temp_%'
    AND schemaname NOT LIKE 'pg_toast_temp_%'
    AND has_schema_privilege(quote_ident(schemaname), 'USAGE')
    AND has_table_privilege(quote_ident(schemaname) || '.' || quote_ident(tablename), 'SELECT')
  UNION ALL
  SELECT
    schemaname,
    viewname AS tablename,
    (quote_ident(schemaname) || '.' || quote_ident(viewname)) AS quoted_name,
    false AS is_table
  FROM pg_catalog.pg_views
  WHERE
    schemaname NOT IN ('information_schema', 'pg_catalog', 'pg_toast')
    AND schemaname NOT LIKE 'pg_temp_%'
    AND schemaname NOT LIKE 'pg_toast_temp_%'
    AND has_schema_privilege(quote_ident(schemaname), 'USAGE')
    AND has_table_privilege(quote_ident(schemaname) || '.' || quote_ident(viewname), 'SELECT')
) AS tbl
LEFT JOIN (
  SELECT
    attrelid,
    attname,
    format_type(atttypid, atttypmod) AS data_type,
    attnum,
    attisdropped
  FROM pg_catalog.pg_attribute
) AS a ON (
  a.attrelid = tbl.quoted_name::regclass
  AND a.attnum > 0
  AND NOT a.attisdropped
)
GROUP BY schemaname, tablename, quoted_name, is_table
ORDER BY schemaname, tablename;"#;

/// Functions for servers before 11, which flag aggregates with `proisagg`
const FUNCTIONS_LEGACY: &str = r#"
SELECT n.nspname AS "schema",
  p.proname AS "name",
  d.description,
  pg_catalog.pg_get_function_result(p.oid) AS "result_type",
  pg_catalog.pg_get_function_arguments(p.oid) AS "argument_types",
  CASE
    WHEN p.proisagg THEN 'agg'
    WHEN p.proiswindow THEN 'window'
    WHEN p.prorettype = 'pg_catalog.trigger'::pg_catalog.regtype THEN 'trigger'
    ELSE 'normal'
  END AS "type"
FROM pg_catalog.pg_proc p
  LEFT JOIN pg_catalog.pg_namespace n ON n.oid = p.pronamespace
  LEFT JOIN pg_catalog.pg_description d ON p.oid = d.objoid AND d.objsubid = 0
WHERE n.nspname <> 'information_schema'
  AND pg_catalog.pg_function_is_visible(p.oid)
  AND p.prorettype <> 'pg_catalog.trigger'::pg_catalog.regtype
  AND has_schema_privilege(quote_ident(n.nspname), 'USAGE')
  AND has_function_privilege(p.oid, 'execute')
ORDER BY 1, 2, 4;"#;

/// Functions for servers from 11 on, where `pg_proc.prokind` replaced the flags
const FUNCTIONS_PROKIND: &str = r#"
SELECT n.nspname AS "schema",
  p.proname AS "name",
  d.description,
  pg_catalog.pg_get_function_result(p.oid) AS "result_type",
  pg_catalog.pg_get_function_arguments(p.oid) AS "argument_types",
  CASE
    WHEN p.prokind = 'a' THEN 'agg'
    WHEN p.prokind = 'w' THEN 'window'
    WHEN p.prorettype = 'pg_catalog.trigger'::pg_catalog.regtype THEN 'trigger'
    ELSE 'normal'
  END AS "type"
FROM pg_catalog.pg_proc p
  LEFT JOIN pg_catalog.pg_namespace n ON n.oid = p.pronamespace
  LEFT JOIN pg_catalog.pg_description d ON p.oid = d.objoid AND d.objsubid = 0
WHERE n.nspname <> 'information_schema'
  AND pg_catalog.pg_function_is_visible(p.oid)
  AND p.prorettype <> 'pg_catalog.trigger'::pg_catalog.regtype
  AND has_schema_privilege(quote_ident(n.nspname), 'USAGE')
  AND has_function_privilege(p.oid, 'execute')
ORDER BY 1, 2, 4;"#;

/// Reserved and unreserved keywords of the server's grammar
pub const KEYWORDS: &str = "SELECT word FROM pg_catalog.pg_get_keywords();";

/// Databases the credential may connect to and create temp tables in
pub const DATABASES: &str = r#"
SELECT datname
FROM pg_catalog.pg_database
WHERE
  datistemplate = false
  AND has_database_privilege(quote_ident(datname), 'TEMP, CONNECT')
ORDER BY datname;"#;

/// Function queries keyed by minimum server version
const FUNCTION_QUERIES: &[(u32, &str)] = &[(0, FUNCTIONS_LEGACY), (110_000, FUNCTIONS_PROKIND)];

/// The full set of metadata queries for one server version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryBattery {
    pub schemas: &'static str,
    pub tables: &'static str,
    pub functions: &'static str,
    pub keywords: &'static str,
    pub databases: &'static str,
}

impl QueryBattery {
    /// Select the queries suitable for `server_version_num`
    pub fn for_version(version: u32) -> Self {
        Self {
            schemas: SCHEMAS,
            tables: TABLES,
            functions: pick(FUNCTION_QUERIES, version),
            keywords: KEYWORDS,
            databases: DATABASES,
        }
    }
}

/// Highest-keyed query whose key does not exceed `version`
fn pick(versions: &[(u32, &'static str)], version: u32) -> &'static str {
    versions
        .iter()
        .take_while(|(min, _)| *min <= version)
        .last()
        .or(versions.first())
        .map_or("", |(_, sql)| sql)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_query_by_version() {
        assert!(QueryBattery::for_version(90_624).functions.contains("proisagg"));
        assert!(QueryBattery::for_version(100_023).functions.contains("proisagg"));
        assert!(QueryBattery::for_version(110_000).functions.contains("prokind"));
        assert!(QueryBattery::for_version(160_002).functions.contains("prokind"));
    }

    #[test]
    fn test_queries_filter_system_objects() {
        for sql in [SCHEMAS, TABLES] {
            assert!(sql.contains("'information_schema', 'pg_catalog', 'pg_toast'"));
            assert!(sql.contains("pg_temp_%"));
            assert!(sql.contains("pg_toast_temp_%"));
        }
        assert!(TABLES.contains("NOT a.attisdropped"));
        for sql in [FUNCTIONS_LEGACY, FUNCTIONS_PROKIND] {
            assert!(sql.contains("p.prorettype <> 'pg_catalog.trigger'"));
            assert!(sql.contains("has_function_privilege"));
        }
    }
}
