// Copyright (c) 2025 pg-sql-lsp contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # LSP Backend Implementation
//!
//! The main LSP server backend using tower-lsp.
//!
//! ## Architecture
//!
//! ```text
//! Client -> LspBackend -> DocumentStore
//!               |
//!               +-> CatalogManager (connection + catalog snapshot)
//!               |       ^
//!               |       +-- completion / signature help read snapshots
//!               |
//!               +-> ValidationScheduler -> DiagnosticValidator -> publishDiagnostics
//! ```
//!
//! ## Supported LSP Features
//!
//! - textDocument/didOpen, didChange, didClose
//! - textDocument/completion (triggers `' '`, `.`, `"`)
//! - textDocument/signatureHelp (triggers `(`, `,`)
//! - workspace/didChangeConfiguration
//! - `pgSqlLsp/setConnection` and `pgSqlLsp/refreshCatalog` requests
//!
//! ## Example
//!
//! ```rust,ignore
//! use pg_sql_lsp_lsp::LspBackend;
//! use tower_lsp::Server;
//!
//! let (service, socket) = LspBackend::service();
//! Server::new(tokio::io::stdin(), tokio::io::stdout(), socket)
//!     .serve(service)
//!     .await;
//! ```

use std::sync::Arc;

use pg_sql_lsp_catalog::{
    CatalogError, CatalogResult, ConfigError, ConnectionConfig, QueryExecutor, SchemaCatalog,
};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tower_lsp::jsonrpc::{self, Result};
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, ClientSocket, LanguageServer, LspService};
use tracing::{debug, error, info, warn};

use crate::catalog_manager::CatalogManager;
use crate::completion::CompletionResolver;
use crate::config::{ServerConfig, connection_from_value};
use crate::document::{DocumentError, DocumentStore};
use crate::signature::SignatureResolver;
use crate::validation::{DiagnosticSink, ValidationScheduler};

/// Request replacing the active connection
pub const SET_CONNECTION_METHOD: &str = "pgSqlLsp/setConnection";

/// Request reloading the catalog of the active connection
pub const REFRESH_CATALOG_METHOD: &str = "pgSqlLsp/refreshCatalog";

/// Summary of the loaded catalog returned by the custom requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogStatus {
    pub schemas: usize,
    pub tables: usize,
    pub functions: usize,
    pub keywords: usize,
    pub databases: usize,
}

impl From<&SchemaCatalog> for CatalogStatus {
    fn from(catalog: &SchemaCatalog) -> Self {
        Self {
            schemas: catalog.schemas.len(),
            tables: catalog.tables.len(),
            functions: catalog.functions.len(),
            keywords: catalog.keywords.len(),
            databases: catalog.databases.len(),
        }
    }
}

/// LSP backend implementation
pub struct LspBackend {
    /// LSP client for sending notifications
    client: Client,

    /// Open documents
    documents: Arc<DocumentStore>,

    /// Connection sources
    config: Arc<RwLock<ServerConfig>>,

    /// Active connection and catalog snapshot
    catalog_manager: Arc<CatalogManager>,

    /// Per-document validation workers
    validation: Arc<ValidationScheduler>,
}

impl LspBackend {
    /// Create a backend reading fallback connection settings from the environment
    pub fn new(client: Client) -> Self {
        let sink: Arc<dyn DiagnosticSink> = Arc::new(client.clone());
        Self::with_parts(client, ServerConfig::from_env(), sink)
    }

    /// Create a backend with explicit configuration and diagnostic sink
    pub fn with_parts(client: Client, config: ServerConfig, sink: Arc<dyn DiagnosticSink>) -> Self {
        let catalog_manager = Arc::new(CatalogManager::new());
        let validation = Arc::new(ValidationScheduler::new(catalog_manager.clone(), sink));

        Self {
            client,
            documents: Arc::new(DocumentStore::new()),
            config: Arc::new(RwLock::new(config)),
            catalog_manager,
            validation,
        }
    }

    /// Build the tower-lsp service with the custom requests registered
    pub fn service() -> (LspService<Self>, ClientSocket) {
        Self::register(LspService::build(Self::new))
    }

    /// Register the custom requests on a service builder
    pub fn register(
        builder: tower_lsp::LspServiceBuilder<Self>,
    ) -> (LspService<Self>, ClientSocket) {
        builder
            .custom_method(SET_CONNECTION_METHOD, Self::set_connection)
            .custom_method(REFRESH_CATALOG_METHOD, Self::refresh_catalog)
            .finish()
    }

    pub fn documents(&self) -> &DocumentStore {
        &self.documents
    }

    pub fn catalog_manager(&self) -> &Arc<CatalogManager> {
        &self.catalog_manager
    }

    pub fn validation(&self) -> &ValidationScheduler {
        &self.validation
    }

    /// Handle `pgSqlLsp/setConnection`
    ///
    /// Params are a connection URL or a connection object.
    pub async fn set_connection(&self, params: Value) -> Result<CatalogStatus> {
        let connection = connection_from_value(&params).map_err(|e| {
            let mut err = jsonrpc::Error::invalid_params(e.to_string());
            err.data = Some(params.clone());
            err
        })?;

        self.config.write().await.set_request(connection);
        self.connect().await.map_err(rpc_error)
    }

    /// Handle `pgSqlLsp/refreshCatalog`
    pub async fn refresh_catalog(&self) -> Result<CatalogStatus> {
        info!("Refreshing catalog");
        let result = self.catalog_manager.refresh().await;
        self.catalog_loaded(result).await.map_err(rpc_error)
    }

    /// Connect with the merged configuration and load its catalog
    pub async fn connect(&self) -> std::result::Result<CatalogStatus, LspError> {
        let connection = self.config.read().await.resolve()?;
        self.connect_with(&connection).await
    }

    async fn connect_with(
        &self,
        connection: &ConnectionConfig,
    ) -> std::result::Result<CatalogStatus, LspError> {
        let result = self.catalog_manager.connect(connection).await;
        self.catalog_loaded(result).await
    }

    /// Make `executor` the active connection
    pub async fn install_executor(
        &self,
        executor: Arc<dyn QueryExecutor>,
    ) -> std::result::Result<CatalogStatus, LspError> {
        let result = self.catalog_manager.install(executor).await;
        self.catalog_loaded(result).await
    }

    /// Report a reload and revalidate open documents after a successful one
    async fn catalog_loaded(
        &self,
        result: CatalogResult<Arc<SchemaCatalog>>,
    ) -> std::result::Result<CatalogStatus, LspError> {
        match result {
            Ok(catalog) => {
                let status = CatalogStatus::from(catalog.as_ref());
                info!(?status, "Catalog ready");
                self.log_message(
                    &format!(
                        "Catalog loaded: {} schemas, {} tables, {} functions",
                        status.schemas, status.tables, status.functions
                    ),
                    MessageType::INFO,
                )
                .await;
                self.revalidate_all().await;
                Ok(status)
            }
            Err(e) => {
                error!(error = %e, "Catalog load failed");
                self.log_message(&format!("Catalog load failed: {e}"), MessageType::ERROR)
                    .await;
                Err(e.into())
            }
        }
    }

    async fn revalidate_all(&self) {
        for uri in self.documents.list_uris().await {
            if let Some(document) = self.documents.get_document(&uri).await {
                self.validation.schedule(document).await;
            }
        }
    }

    /// Log a message to the client
    async fn log_message(&self, message: &str, message_type: MessageType) {
        self.client.log_message(message_type, message).await;
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for LspBackend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        info!(client = ?params.client_info, "Initializing LSP server");

        if let Err(e) = self
            .config
            .write()
            .await
            .set_init_options(params.initialization_options.as_ref())
        {
            warn!(error = %e, "Ignoring invalid initializationOptions");
        }

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                completion_provider: Some(CompletionOptions {
                    resolve_provider: Some(false),
                    trigger_characters: Some(vec![
                        " ".to_string(),
                        ".".to_string(),
                        "\"".to_string(),
                    ]),
                    ..Default::default()
                }),
                signature_help_provider: Some(SignatureHelpOptions {
                    trigger_characters: Some(vec!["(".to_string(), ",".to_string()]),
                    retrigger_characters: None,
                    work_done_progress_options: WorkDoneProgressOptions::default(),
                }),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: crate::SERVER_NAME.to_string(),
                version: Some(crate::VERSION.to_string()),
            }),
        })
    }

    async fn initialized(&self, _params: InitializedParams) {
        info!("LSP server initialized");

        match self.connect().await {
            Ok(_) => {}
            Err(LspError::Config(ConfigError::MissingConnection)) => {
                info!("No connection configured yet; waiting for settings");
            }
            Err(e) => warn!(error = %e, "Initial connection failed"),
        }
    }

    async fn shutdown(&self) -> Result<()> {
        info!("Shutting down LSP server");
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let doc = params.text_document;
        info!(uri = %doc.uri, version = doc.version, "Document opened");

        self.documents
            .open_document(doc.uri.clone(), doc.text, doc.version, doc.language_id)
            .await;

        if let Some(document) = self.documents.get_document(&doc.uri).await {
            self.validation.schedule(document).await;
        }
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let identifier = params.text_document;
        debug!(uri = %identifier.uri, version = identifier.version, "Document changed");

        match self
            .documents
            .update_document(&identifier, &params.content_changes)
            .await
        {
            Ok(document) => self.validation.schedule(document).await,
            Err(DocumentError::DocumentNotFound(uri)) => {
                warn!(%uri, "Document not found for change");
            }
            Err(e) => {
                error!(error = %e, "Failed to update document");
                self.log_message(&format!("Failed to update document: {e}"), MessageType::ERROR)
                    .await;
            }
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        info!(%uri, "Document closed");

        if !self.documents.close_document(&uri).await {
            warn!(%uri, "Document not found for close");
        }
        self.validation.close(&uri).await;
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;
        let trigger = params.context.and_then(|context| context.trigger_character);

        debug!(%uri, line = position.line, character = position.character, ?trigger, "Completion requested");

        let Some(document) = self.documents.get_document(&uri).await else {
            warn!(%uri, "Document not found for completion");
            return Ok(None);
        };

        let catalog = self.catalog_manager.snapshot().await;
        let items = CompletionResolver::new(&catalog).resolve(
            &document.get_content(),
            document.char_offset(position),
            trigger.as_deref(),
        );

        Ok(Some(CompletionResponse::Array(items)))
    }

    async fn signature_help(&self, params: SignatureHelpParams) -> Result<Option<SignatureHelp>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;

        let Some(document) = self.documents.get_document(&uri).await else {
            warn!(%uri, "Document not found for signature help");
            return Ok(None);
        };

        let catalog = self.catalog_manager.snapshot().await;
        Ok(SignatureResolver::new(&catalog)
            .resolve(&document.get_content(), document.char_offset(position)))
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        let applied = self.config.write().await.apply_settings(&params.settings);

        match applied {
            Ok(true) => {
                info!("Connection settings changed");
                if let Err(e) = self.connect().await {
                    warn!(error = %e, "Reconnect after settings change failed");
                }
            }
            Ok(false) => debug!("Settings carry no pgSqlLsp section"),
            Err(e) => {
                warn!(error = %e, "Invalid connection settings");
                self.log_message(&format!("Invalid connection settings: {e}"), MessageType::ERROR)
                    .await;
            }
        }
    }
}

fn rpc_error(err: LspError) -> jsonrpc::Error {
    match err {
        LspError::Config(e) => jsonrpc::Error::invalid_params(e.to_string()),
        other => jsonrpc::Error {
            code: jsonrpc::ErrorCode::InternalError,
            message: other.to_string().into(),
            data: None,
        },
    }
}

/// LSP backend errors
#[derive(Debug, thiserror::Error)]
pub enum LspError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
}
