// Copyright (c) 2025 pg-sql-lsp contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Mock query executor for testing
//!
//! Replies are keyed by SQL fragment: the most recently registered rule whose
//! fragment occurs in the executed statement answers it. `EXPLAIN` statements with
//! no matching rule succeed with an empty plan; any other unmatched statement
//! is rejected by the "engine".

use std::sync::Mutex;
use std::time::Duration;

use pg_sql_lsp_catalog::{
    ExecuteError, FieldDescriptor, QueryExecutor, QueryResult, Row, SchemaCatalog,
};
use serde_json::json;

#[derive(Debug, Clone)]
enum Reply {
    Rows(QueryResult),
    Error(ExecuteError),
    /// Engine error positioned at the first occurrence of the fragment
    RejectAt(String),
}

#[derive(Debug, Clone)]
struct Rule {
    fragment: String,
    reply: Reply,
}

/// In-memory executor with scripted replies
#[derive(Debug, Default)]
pub struct MockExecutor {
    rules: Mutex<Vec<Rule>>,
    executed: Mutex<Vec<String>>,
    dry_runs: Mutex<Vec<String>>,
    latency: Mutex<Option<Duration>>,
}

impl MockExecutor {
    /// Create an executor with no rules
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an executor serving the metadata queries for `catalog`
    pub fn with_catalog(catalog: &SchemaCatalog, server_version: u32) -> Self {
        let executor = Self::new();
        executor.serve_catalog(catalog, server_version);
        executor
    }

    /// Answer the metadata battery from `catalog`
    ///
    /// The function rule is registered last so its `pg_proc` fragment wins over
    /// the namespace join it shares with the schema query.
    pub fn serve_catalog(&self, catalog: &SchemaCatalog, server_version: u32) {
        self.respond(
            "server_version_num",
            QueryResult::from_text(&["server_version_num"], &[&[&server_version.to_string()]]),
        );

        let schemas: Vec<&str> = catalog.schemas.iter().map(|s| s.name.as_str()).collect();
        self.respond("pg_namespace\nWHERE", single_column("name", &schemas));

        let tables = QueryResult::new(
            fields(&["schemaname", "tablename", "quoted_name", "is_table", "columns"]),
            catalog
                .tables
                .iter()
                .map(|table| {
                    let columns: Vec<_> = table
                        .columns
                        .iter()
                        .map(|column| {
                            json!({
                                "attname": column.name,
                                "data_type": column.data_type,
                                "attnum": column.ordinal,
                                "attisdropped": column.is_dropped,
                            })
                        })
                        .collect();
                    Row::new(vec![
                        Some(table.schema.clone()),
                        Some(table.name.clone()),
                        Some(table.quoted_name.clone()),
                        Some(if table.is_table { "t" } else { "f" }.to_string()),
                        Some(json!(columns).to_string()),
                    ])
                })
                .collect(),
        );
        self.respond("pg_tables", tables);

        let keywords: Vec<String> = catalog.keywords.iter().map(|k| k.to_lowercase()).collect();
        let keywords: Vec<&str> = keywords.iter().map(String::as_str).collect();
        self.respond("pg_get_keywords", single_column("word", &keywords));

        let databases: Vec<&str> = catalog.databases.iter().map(String::as_str).collect();
        self.respond("pg_database", single_column("datname", &databases));

        let functions = QueryResult::new(
            fields(&["schema", "name", "description", "result_type", "argument_types", "type"]),
            catalog
                .functions
                .iter()
                .flat_map(|function| {
                    function.overloads.iter().map(move |overload| {
                        Row::new(vec![
                            Some(function.schema.clone()),
                            Some(function.name.clone()),
                            overload.description.clone(),
                            Some(function.result_type.clone()),
                            Some(overload.arg_types.join(", ")),
                            Some(function.kind.as_str().to_string()),
                        ])
                    })
                })
                .collect(),
        );
        self.respond("pg_proc", functions);
    }

    /// Answer statements containing `fragment` with `result`
    pub fn respond(&self, fragment: impl Into<String>, result: QueryResult) {
        self.push(fragment.into(), Reply::Rows(result));
    }

    /// Fail statements containing `fragment` with `error`
    pub fn fail(&self, fragment: impl Into<String>, error: ExecuteError) {
        self.push(fragment.into(), Reply::Error(error));
    }

    /// Reject statements containing `token` with an engine error whose
    /// 1-based position points at the token
    pub fn reject_token(&self, token: impl Into<String>, message: impl Into<String>) {
        let token = token.into();
        let rule = Reply::RejectAt(message.into());
        self.push(token, rule);
    }

    /// Delay every reply by `latency`
    pub fn set_latency(&self, latency: Duration) {
        *lock(&self.latency) = Some(latency);
    }

    /// Statements executed so far, in order
    pub fn executed(&self) -> Vec<String> {
        lock(&self.executed).clone()
    }

    /// Statements submitted through [`QueryExecutor::dry_run`], in order
    ///
    /// These also appear in [`executed`](Self::executed).
    pub fn dry_runs(&self) -> Vec<String> {
        lock(&self.dry_runs).clone()
    }

    /// Executed statements containing `fragment`
    pub fn executed_matching(&self, fragment: &str) -> usize {
        lock(&self.executed)
            .iter()
            .filter(|sql| sql.contains(fragment))
            .count()
    }

    fn push(&self, fragment: String, reply: Reply) {
        lock(&self.rules).push(Rule { fragment, reply });
    }

    fn reply_for(&self, sql: &str) -> Result<QueryResult, ExecuteError> {
        let rules = lock(&self.rules);
        let Some(rule) = rules.iter().rev().find(|rule| sql.contains(&rule.fragment)) else {
            if sql.starts_with("EXPLAIN ") {
                return Ok(single_column("QUERY PLAN", &["Result  (cost=0.00..0.01 rows=1 width=4)"]));
            }
            return Err(ExecuteError::engine(
                format!("no scripted reply for: {sql}"),
                None,
            ));
        };

        match &rule.reply {
            Reply::Rows(result) => Ok(result.clone()),
            Reply::Error(error) => Err(error.clone()),
            Reply::RejectAt(message) => {
                let position = sql
                    .find(&rule.fragment)
                    .map(|byte| sql[..byte].chars().count() + 1);
                Err(ExecuteError::engine(message.clone(), position))
            }
        }
    }
}

#[async_trait::async_trait]
impl QueryExecutor for MockExecutor {
    async fn execute(&self, sql: &str) -> Result<QueryResult, ExecuteError> {
        lock(&self.executed).push(sql.to_string());

        let latency = *lock(&self.latency);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        self.reply_for(sql)
    }

    async fn dry_run(&self, sql: &str) -> Result<QueryResult, ExecuteError> {
        lock(&self.dry_runs).push(sql.to_string());
        self.execute(sql).await
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn fields(names: &[&str]) -> Vec<FieldDescriptor> {
    names.iter().map(|name| FieldDescriptor::new(*name)).collect()
}

fn single_column(name: &str, values: &[&str]) -> QueryResult {
    let rows: Vec<&[&str]> = values.iter().map(std::slice::from_ref).collect();
    QueryResult::from_text(&[name], &rows)
}
