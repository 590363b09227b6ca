// Copyright (c) 2025 pg-sql-lsp contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Catalog swapping under concurrent readers

use std::sync::Arc;
use std::time::Duration;

use pg_sql_lsp_catalog::{ExecuteError, QueryExecutor, SchemaCatalog, SchemaEntry, TableEntry};
use pg_sql_lsp_lsp::CatalogManager;
use pg_sql_lsp_test_utils::{CatalogFixtures, MockExecutor};

fn small_catalog() -> SchemaCatalog {
    SchemaCatalog {
        schemas: vec![SchemaEntry::new("archive")],
        tables: vec![TableEntry::new("archive", "events")],
        ..SchemaCatalog::default()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_readers_see_whole_catalogs_only() {
    let full = Arc::new(MockExecutor::with_catalog(&CatalogFixtures::catalog(), 160_002));
    let small = Arc::new(MockExecutor::with_catalog(&small_catalog(), 130_004));
    full.set_latency(Duration::from_millis(1));
    small.set_latency(Duration::from_millis(1));

    let manager = Arc::new(CatalogManager::new());
    manager.install(full.clone()).await.unwrap();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let manager = manager.clone();
            tokio::spawn(async move {
                for _ in 0..200 {
                    let catalog = manager.snapshot().await;
                    let shape = (catalog.schemas.len(), catalog.tables.len(), catalog.functions.len());
                    assert!(
                        shape == (2, 3, 4) || shape == (1, 1, 0),
                        "torn catalog {shape:?}"
                    );
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    for round in 0..10 {
        let executor = if round % 2 == 0 { small.clone() } else { full.clone() };
        manager.install(executor).await.unwrap();
    }

    for reader in readers {
        reader.await.unwrap();
    }
    assert_eq!(manager.snapshot().await.tables.len(), 3);
}

#[tokio::test]
async fn test_failed_load_keeps_previous_executor() {
    let first = Arc::new(MockExecutor::with_catalog(&CatalogFixtures::catalog(), 160_002));
    let manager = CatalogManager::new();
    manager.install(first.clone()).await.unwrap();

    let second = Arc::new(MockExecutor::with_catalog(&small_catalog(), 160_002));
    second.fail("pg_proc", ExecuteError::engine("permission denied for table pg_proc", None));
    assert!(manager.install(second.clone()).await.is_err());

    assert_eq!(manager.snapshot().await.tables.len(), 3);

    let executor = manager.executor().await.unwrap();
    executor.execute("EXPLAIN SELECT 1").await.unwrap();
    assert_eq!(first.executed_matching("EXPLAIN SELECT 1"), 1);
    assert_eq!(second.executed_matching("EXPLAIN"), 0);
}

#[tokio::test]
async fn test_refresh_picks_up_new_objects() {
    let executor = Arc::new(MockExecutor::with_catalog(&small_catalog(), 160_002));
    let manager = CatalogManager::new();
    manager.install(executor.clone()).await.unwrap();
    assert_eq!(manager.snapshot().await.tables.len(), 1);

    executor.serve_catalog(&CatalogFixtures::catalog(), 160_002);
    let catalog = manager.refresh().await.unwrap();

    assert_eq!(catalog.tables.len(), 3);
    assert_eq!(manager.snapshot().await.functions.len(), 4);
}
