//! Infrastructure layer for the document store, HTTP probing, configuration and logging
//!
//! Concrete adapters for the repository and probe traits live here; nothing
//! above this layer knows about SQLite or reqwest.

pub mod config;
pub mod database_connection;
pub mod document_store;
pub mod http_client;
pub mod logging;

// Re-export commonly used items
pub use config::{AppConfig, ConfigManager, LoggingConfig, ProbeConfig, ReportConfig, StoreConfig};
pub use database_connection::DatabaseConnection;
pub use document_store::SqliteDocumentStore;
pub use http_client::HttpProbeClient;
