// Copyright (c) 2025 pg-sql-lsp contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Validation scheduling
//!
//! Each open document gets one worker task fed by a channel of document
//! snapshots. The worker always validates the newest snapshot it has, and a
//! snapshot arriving while a pass is in flight cancels that pass, so
//! diagnostics from a superseded version are never published.
//!
//! ```text
//! didChange --> [channel] --> worker: latest snapshot --> validate --> publish
//!                                 ^                          |
//!                                 +------ newer snapshot ----+ (cancel)
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tower_lsp::Client;
use tower_lsp::lsp_types::{Diagnostic, Url};
use tracing::debug;

use crate::catalog_manager::CatalogManager;
use crate::diagnostic::{DiagnosticValidator, PassOutcome};
use crate::document::Document;

/// Destination of published diagnostics
#[async_trait::async_trait]
pub trait DiagnosticSink: Send + Sync + 'static {
    /// Replace all diagnostics of `uri`
    async fn publish(&self, uri: Url, diagnostics: Vec<Diagnostic>, version: Option<i32>);
}

#[async_trait::async_trait]
impl DiagnosticSink for Client {
    async fn publish(&self, uri: Url, diagnostics: Vec<Diagnostic>, version: Option<i32>) {
        self.publish_diagnostics(uri, diagnostics, version).await;
    }
}

struct Worker {
    sender: mpsc::UnboundedSender<Document>,
    handle: JoinHandle<()>,
}

/// Per-document validation workers
pub struct ValidationScheduler {
    catalog: Arc<CatalogManager>,
    sink: Arc<dyn DiagnosticSink>,
    workers: Mutex<HashMap<Url, Worker>>,
}

impl ValidationScheduler {
    pub fn new(catalog: Arc<CatalogManager>, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            catalog,
            sink,
            workers: Mutex::new(HashMap::new()),
        }
    }

    /// Queue a snapshot for validation, starting the document's worker if needed
    pub async fn schedule(&self, document: Document) {
        let mut workers = self.workers.lock().await;
        let uri = document.uri().clone();

        let document = match workers.get(&uri) {
            Some(worker) => match worker.sender.send(document) {
                Ok(()) => return,
                // The worker is gone; start a fresh one with the snapshot
                Err(mpsc::error::SendError(document)) => document,
            },
            None => document,
        };

        workers.insert(uri, self.spawn(document));
    }

    fn spawn(&self, document: Document) -> Worker {
        let (sender, receiver) = mpsc::unbounded_channel();
        let uri = document.uri().clone();
        // An unbounded channel only rejects sends once the receiver is dropped
        let _ = sender.send(document);

        let handle = tokio::spawn(run_worker(
            uri,
            receiver,
            self.catalog.clone(),
            self.sink.clone(),
        ));

        Worker { sender, handle }
    }

    /// Stop the document's worker and clear its diagnostics
    pub async fn close(&self, uri: &Url) {
        let worker = self.workers.lock().await.remove(uri);

        if let Some(worker) = worker {
            drop(worker.sender);
            worker.handle.abort();
            // Wait for the task so nothing it publishes can follow the clear
            let _ = worker.handle.await;
        }

        self.sink.publish(uri.clone(), Vec::new(), None).await;
    }

    /// Number of documents with a live worker
    pub async fn active_workers(&self) -> usize {
        self.workers.lock().await.len()
    }
}

async fn run_worker(
    uri: Url,
    mut receiver: mpsc::UnboundedReceiver<Document>,
    catalog: Arc<CatalogManager>,
    sink: Arc<dyn DiagnosticSink>,
) {
    let mut pending: Option<Document> = None;

    loop {
        let mut document = match pending.take() {
            Some(document) => document,
            None => match receiver.recv().await {
                Some(document) => document,
                None => break,
            },
        };
        while let Ok(newer) = receiver.try_recv() {
            document = newer;
        }

        let Some(executor) = catalog.executor().await else {
            debug!(%uri, "No connection; skipping validation");
            continue;
        };

        let text = document.get_content();
        let pass = async {
            let mut validator = DiagnosticValidator::new(executor.as_ref());
            validator.validate(&text).await
        };

        tokio::select! {
            report = pass => {
                if let PassOutcome::Aborted { statement, .. } = &report.outcome {
                    debug!(%uri, statement, "Publishing diagnostics of an aborted pass");
                }
                let diagnostics = report
                    .diagnostics
                    .iter()
                    .map(|diagnostic| diagnostic.to_lsp(&document))
                    .collect();
                sink.publish(uri.clone(), diagnostics, Some(document.version())).await;
            }
            next = receiver.recv() => match next {
                Some(newer) => {
                    debug!(%uri, superseded = document.version(), by = newer.version(), "Validation pass cancelled");
                    pending = Some(newer);
                }
                None => break,
            },
        }
    }

    debug!(%uri, "Validation worker stopped");
}
