// Copyright (c) 2025 pg-sql-lsp contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Catalog manager
//!
//! Owns the active connection and the schema catalog loaded through it.
//!
//! The executor and catalog form one session that is replaced as a unit.
//! A reload builds the new catalog off to the side and swaps the session
//! pointer only once loading has fully succeeded, so readers holding a
//! snapshot see either the old catalog or the new one. A failed reload leaves
//! the previous session in place.

use std::sync::Arc;
use std::time::Instant;

use pg_sql_lsp_catalog::{
    CatalogError, CatalogLoader, CatalogResult, ConnectionConfig, PgExecutor, QueryExecutor,
    SchemaCatalog,
};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

#[derive(Clone, Default)]
struct Session {
    executor: Option<Arc<dyn QueryExecutor>>,
    catalog: Arc<SchemaCatalog>,
}

/// Catalog manager
#[derive(Default)]
pub struct CatalogManager {
    session: RwLock<Session>,
    /// Serializes reloads so the last requested connection wins
    reload: Mutex<()>,
}

impl CatalogManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a live connection and load its catalog
    pub async fn connect(&self, config: &ConnectionConfig) -> CatalogResult<Arc<SchemaCatalog>> {
        info!(target = %config.describe(), "Connecting");
        let executor = PgExecutor::connect(config).await?;
        self.install(Arc::new(executor)).await
    }

    /// Load a catalog through `executor` and make both current
    pub async fn install(
        &self,
        executor: Arc<dyn QueryExecutor>,
    ) -> CatalogResult<Arc<SchemaCatalog>> {
        let _guard = self.reload.lock().await;
        let catalog = Self::load(executor.as_ref()).await?;

        let mut session = self.session.write().await;
        *session = Session {
            executor: Some(executor),
            catalog: catalog.clone(),
        };

        Ok(catalog)
    }

    /// Reload the catalog of the current connection
    pub async fn refresh(&self) -> CatalogResult<Arc<SchemaCatalog>> {
        let _guard = self.reload.lock().await;
        let executor = self
            .session
            .read()
            .await
            .executor
            .clone()
            .ok_or(CatalogError::NotConnected)?;

        let catalog = Self::load(executor.as_ref()).await?;
        self.session.write().await.catalog = catalog.clone();

        Ok(catalog)
    }

    async fn load(executor: &dyn QueryExecutor) -> CatalogResult<Arc<SchemaCatalog>> {
        let started = Instant::now();
        match CatalogLoader::new(executor).load().await {
            Ok(catalog) => Ok(Arc::new(catalog)),
            Err(e) => {
                warn!(
                    error = %e,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Catalog reload failed; keeping the previous catalog"
                );
                Err(e)
            }
        }
    }

    /// The current catalog; empty until a connection has loaded one
    pub async fn snapshot(&self) -> Arc<SchemaCatalog> {
        self.session.read().await.catalog.clone()
    }

    /// The current executor, if connected
    pub async fn executor(&self) -> Option<Arc<dyn QueryExecutor>> {
        self.session.read().await.executor.clone()
    }

    pub async fn is_connected(&self) -> bool {
        self.session.read().await.executor.is_some()
    }
}
