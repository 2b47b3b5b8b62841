//! Shared startup for commands that talk to the catalogue.
//!
//! [`CliRunner`] loads the config file, installs logging and starts a tokio
//! runtime. Commands then ask it for a repository or controller; everything
//! is constructed here explicitly and passed down by `Arc`.

use std::future::Future;
use std::sync::Arc;

use tokio::runtime::Runtime;
use tracing::info;

use plantwatch::config::{config_file_path, ConfigFile};
use plantwatch::logging::{init_logging, LoggingGuard};
use plantwatch::service::HttpPlantService;
use plantwatch::store::MemoryPlantStore;
use plantwatch::{PlantListController, PlantRepository};

use crate::error::CliError;

/// Config, logging and runtime for one command invocation.
pub struct CliRunner {
    config: ConfigFile,
    runtime: Runtime,
    _logging: LoggingGuard,
}

impl CliRunner {
    /// Load config, start logging and build the runtime.
    pub fn new() -> Result<Self, CliError> {
        let config = ConfigFile::load()?;
        let logging = init_logging(&config.logging_config())?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("plantwatch")
            .build()
            .map_err(|e| CliError::Runtime(e.to_string()))?;

        Ok(Self {
            config,
            runtime,
            _logging: logging,
        })
    }

    /// Log the command being run.
    pub fn log_startup(&self, command: &str) {
        info!(
            version = plantwatch::VERSION,
            command,
            config = %config_file_path().display(),
            "PlantWatch starting"
        );
    }

    /// The loaded configuration.
    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Build a repository over the HTTP catalogue and an in-memory store.
    ///
    /// `refresh` overrides `refresh.enabled` when given.
    pub fn create_repository(
        &self,
        refresh: Option<bool>,
    ) -> Result<Arc<PlantRepository>, CliError> {
        let service = HttpPlantService::new(&self.config.service_config())?;
        let store = MemoryPlantStore::new();
        let enabled = refresh.unwrap_or(self.config.refresh.enabled);

        Ok(Arc::new(
            PlantRepository::new(Arc::new(store), Arc::new(service))
                .with_refresh_enabled(enabled),
        ))
    }

    /// Build a controller on this runner's runtime.
    pub fn create_controller(&self, repository: Arc<PlantRepository>) -> PlantListController {
        PlantListController::new(repository, self.runtime.handle().clone())
    }

    /// Run `future` to completion on the runtime.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}
