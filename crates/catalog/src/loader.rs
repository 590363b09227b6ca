// Copyright (c) 2025 pg-sql-lsp contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Catalog loader
//!
//! Runs the metadata query battery against a [`QueryExecutor`] and materializes
//! a [`SchemaCatalog`]. The five metadata queries are independent and run
//! concurrently; the catalog is only returned once every one has succeeded.

use std::collections::HashMap;
use std::time::Instant;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{CatalogError, CatalogResult};
use crate::metadata::{
    ColumnEntry, FunctionEntry, FunctionKind, Overload, SchemaCatalog, SchemaEntry, TableEntry,
};
use crate::queries::{self, QueryBattery};
use crate::r#trait::QueryExecutor;

/// Column object as produced by `json_agg` over `pg_attribute`
#[derive(Debug, Deserialize)]
struct RawColumn {
    attname: String,
    data_type: String,
    attnum: i32,
    #[serde(default)]
    attisdropped: bool,
}

impl From<RawColumn> for ColumnEntry {
    fn from(raw: RawColumn) -> Self {
        Self {
            name: raw.attname,
            data_type: raw.data_type,
            ordinal: raw.attnum,
            is_dropped: raw.attisdropped,
        }
    }
}

/// Loads schema catalogs through a borrowed executor
pub struct CatalogLoader<'a> {
    executor: &'a dyn QueryExecutor,
}

impl<'a> CatalogLoader<'a> {
    pub fn new(executor: &'a dyn QueryExecutor) -> Self {
        Self { executor }
    }

    /// Read `server_version_num`
    pub async fn server_version(&self) -> CatalogResult<u32> {
        let result = self.executor.execute(queries::SERVER_VERSION).await?;
        let record = result
            .records("server_version")
            .next()
            .ok_or_else(|| CatalogError::InvalidRow {
                query: "server_version",
                reason: "no rows".to_string(),
            })?;

        let raw = record.text("server_version_num")?;
        raw.trim().parse().map_err(|_| CatalogError::InvalidRow {
            query: "server_version",
            reason: format!("not a version number: {raw}"),
        })
    }

    /// Load a complete catalog
    ///
    /// Any failing query fails the whole load; no partial catalog is returned.
    pub async fn load(&self) -> CatalogResult<SchemaCatalog> {
        let started = Instant::now();
        let version = self.server_version().await?;
        let battery = QueryBattery::for_version(version);
        debug!(version, "Selected metadata queries");

        let (schemas, tables, functions, keywords, databases) = tokio::try_join!(
            self.load_schemas(&battery),
            self.load_tables(&battery),
            self.load_functions(&battery),
            self.load_keywords(&battery),
            self.load_databases(&battery),
        )?;

        info!(
            version,
            schemas = schemas.len(),
            tables = tables.len(),
            functions = functions.len(),
            keywords = keywords.len(),
            databases = databases.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Schema catalog loaded"
        );

        Ok(SchemaCatalog {
            schemas,
            tables,
            functions,
            keywords,
            databases,
        })
    }

    async fn load_schemas(&self, battery: &QueryBattery) -> CatalogResult<Vec<SchemaEntry>> {
        let result = self.executor.execute(battery.schemas).await?;
        result
            .records("schemas")
            .map(|record| Ok(SchemaEntry::new(record.text("name")?)))
            .collect()
    }

    async fn load_tables(&self, battery: &QueryBattery) -> CatalogResult<Vec<TableEntry>> {
        let result = self.executor.execute(battery.tables).await?;
        let mut tables = Vec::with_capacity(result.rows.len());

        for record in result.records("tables") {
            let columns: Vec<RawColumn> = serde_json::from_str(record.text("columns")?)
                .map_err(|e| CatalogError::SerializationError(e.to_string()))?;

            tables.push(TableEntry {
                schema: record.text("schemaname")?.to_string(),
                name: record.text("tablename")?.to_string(),
                quoted_name: record.text("quoted_name")?.to_string(),
                is_table: record.flag("is_table")?,
                columns: Vec::new(),
            }
            .with_columns(columns.into_iter().map(ColumnEntry::from).collect()));
        }

        Ok(tables)
    }

    async fn load_functions(&self, battery: &QueryBattery) -> CatalogResult<Vec<FunctionEntry>> {
        let result = self.executor.execute(battery.functions).await?;
        let mut functions: Vec<FunctionEntry> = Vec::new();
        let mut index: HashMap<(String, String), usize> = HashMap::new();

        for record in result.records("functions") {
            let schema = record.text("schema")?.to_string();
            let name = record.text("name")?.to_string();
            let overload = Overload::from_arguments(
                record.get("argument_types")?.unwrap_or_default(),
                record.get("description")?.map(str::to_string),
            );

            // Overloads merge on (schema, name); the first row fixes result type and kind
            match index.get(&(schema.clone(), name.clone())) {
                Some(&slot) => functions[slot].overloads.push(overload),
                None => {
                    let entry = FunctionEntry::new(
                        schema.clone(),
                        name.clone(),
                        record.get("result_type")?.unwrap_or_default(),
                    )
                    .with_kind(FunctionKind::parse(record.text("type")?))
                    .with_overload(overload);

                    index.insert((schema, name), functions.len());
                    functions.push(entry);
                }
            }
        }

        Ok(functions)
    }

    async fn load_keywords(&self, battery: &QueryBattery) -> CatalogResult<Vec<String>> {
        let result = self.executor.execute(battery.keywords).await?;
        result
            .records("keywords")
            .map(|record| Ok(record.text("word")?.to_uppercase()))
            .collect()
    }

    async fn load_databases(&self, battery: &QueryBattery) -> CatalogResult<Vec<String>> {
        let result = self.executor.execute(battery.databases).await?;
        result
            .records("databases")
            .map(|record| Ok(record.text("datname")?.to_string()))
            .collect()
    }
}
