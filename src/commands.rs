//! CLI commands
//!
//! Each subcommand lives in its own file under `commands/` and exposes an
//! `Args` struct plus an `execute` entry point. Commands that touch the store
//! receive an open [`CommandContext`].

pub mod backups;
pub mod clean;
pub mod config_commands;
pub mod presenter;
pub mod probe;
pub mod report;
pub mod validate;

use anyhow::{Context, Result};
use std::process::ExitCode;
use std::sync::Arc;

use crate::application::use_cases::ImageSyncUseCases;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::database_connection::DatabaseConnection;
use crate::infrastructure::document_store::SqliteDocumentStore;

/// Exit status for drift found under `--fail-on-drift`.
pub const EXIT_DRIFT: u8 = 2;

/// How a successful command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Completed,
    DriftFound,
}

impl CommandStatus {
    pub fn exit_code(self) -> ExitCode {
        match self {
            Self::Completed => ExitCode::SUCCESS,
            Self::DriftFound => ExitCode::from(EXIT_DRIFT),
        }
    }
}

/// Store connection and wiring shared by one command run
pub struct CommandContext {
    pub config: AppConfig,
    connection: DatabaseConnection,
    store: Arc<SqliteDocumentStore>,
}

impl CommandContext {
    pub async fn open(config: AppConfig) -> Result<Self> {
        let connection = DatabaseConnection::with_options(
            &config.store.database_url,
            config.store.max_connections,
            config.store.operation_timeout(),
        )
        .await?;
        connection
            .migrate()
            .await
            .context("Failed to prepare document store schema")?;

        let store = Arc::new(SqliteDocumentStore::new(connection.pool().clone(), &config.store));
        Ok(Self {
            config,
            connection,
            store,
        })
    }

    pub fn store(&self) -> &SqliteDocumentStore {
        &self.store
    }

    pub fn use_cases(&self) -> ImageSyncUseCases {
        ImageSyncUseCases::new(self.store.clone(), self.store.clone(), self.store.clone())
    }

    pub async fn close(self) {
        self.connection.close().await;
    }
}
