// Copyright (c) 2025 pg-sql-lsp contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Shared helpers for the LSP integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use pg_sql_lsp_lsp::DiagnosticSink;
use tokio::sync::Notify;
use tower_lsp::lsp_types::{Diagnostic, Url};

/// One `publishDiagnostics` notification
#[derive(Debug, Clone)]
pub struct Published {
    pub uri: Url,
    pub diagnostics: Vec<Diagnostic>,
    pub version: Option<i32>,
}

/// Diagnostic sink that records every publication
#[derive(Debug, Default)]
pub struct RecordingSink {
    published: Mutex<Vec<Published>>,
    notify: Notify,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn published(&self) -> Vec<Published> {
        self.published.lock().unwrap().clone()
    }

    /// Wait until at least `count` publications were recorded
    pub async fn wait_for(&self, count: usize) -> Vec<Published> {
        let wait = async {
            loop {
                let notified = self.notify.notified();
                if self.published.lock().unwrap().len() >= count {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(Duration::from_secs(10), wait)
            .await
            .unwrap_or_else(|_| panic!("expected {count} publications, got {:?}", self.published()));
        self.published()
    }
}

#[async_trait::async_trait]
impl DiagnosticSink for RecordingSink {
    async fn publish(&self, uri: Url, diagnostics: Vec<Diagnostic>, version: Option<i32>) {
        self.published.lock().unwrap().push(Published {
            uri,
            diagnostics,
            version,
        });
        self.notify.notify_waiters();
    }
}

pub fn uri(name: &str) -> Url {
    Url::parse(&format!("file:///workspace/{name}")).unwrap()
}
