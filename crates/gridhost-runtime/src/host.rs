//! Host orchestration.
//!
//! [`GridHost`] ties the registries, the extension manager and the loaded
//! configuration together. The rendering layer keeps a host for the lifetime
//! of the grid and consults `host.registries()` at each paint, click and edit.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use gridhost_runtime::GridHost;
//!
//! // Loads gridhost.toml from the current directory, installs logging and
//! // registers every built-in extension that is not disabled.
//! let host = GridHost::builder().build()?;
//! host.run().await?;
//! ```

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use gridhost_core::Registries;
use gridhost_framework::{
    Extension, ExtensionError, ExtensionManager, ExtensionState, builtin_extensions,
};
use serde::Serialize;
use tokio::signal;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::config::{ConfigLoader, ConfigResult, GridHostConfig};
use crate::error::RuntimeResult;
use crate::logging;

/// Snapshot of host state for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HostStats {
    pub extensions: usize,
    pub active_extensions: usize,
    /// Entries currently held across all registries.
    pub registry_entries: usize,
    pub running: bool,
}

/// The extension host.
pub struct GridHost {
    config: GridHostConfig,
    manager: ExtensionManager,
    running: RwLock<bool>,
}

impl GridHost {
    /// Creates a host builder for custom configuration.
    pub fn builder() -> HostBuilder {
        HostBuilder::new()
    }

    /// Creates a host on the process-wide registries.
    ///
    /// Initializes logging from `config.logging` unless a subscriber is
    /// already installed.
    pub fn from_config(config: &GridHostConfig) -> Self {
        logging::init_from_config(&config.logging);

        info!(
            log_level = %config.logging.level,
            log_format = ?config.logging.format,
            "Host initialized from configuration"
        );

        Self::with_registries(config, Registries::global().clone())
    }

    /// Creates a host on a private set of registries.
    ///
    /// Logging is left untouched.
    pub fn with_registries(config: &GridHostConfig, registries: Registries) -> Self {
        let manager = ExtensionManager::new(registries)
            .with_configs(config.extensions.settings.clone());
        let host = Self {
            config: config.clone(),
            manager,
            running: RwLock::new(false),
        };
        host.register_builtins();
        host
    }

    fn register_builtins(&self) {
        for extension in builtin_extensions() {
            let id = extension.manifest().id;
            if self.config.extensions.is_disabled(&id) {
                info!(extension = %id, "Built-in extension disabled by configuration");
                continue;
            }
            if let Err(e) = self.manager.register(extension) {
                error!(extension = %id, error = %e, "Failed to register built-in extension");
            }
        }
        debug!(count = self.manager.len(), "Built-in extensions registered");
    }

    pub fn config(&self) -> &GridHostConfig {
        &self.config
    }

    pub fn registries(&self) -> &Registries {
        self.manager.registries()
    }

    pub fn manager(&self) -> &ExtensionManager {
        &self.manager
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    // =========================================================================
    // Extension Management
    // =========================================================================

    /// Registers an extension supplied by the embedding application.
    ///
    /// If the host is already running and `activate_on_start` is set, the
    /// extension is activated immediately.
    pub async fn register(&self, extension: Arc<dyn Extension>) -> RuntimeResult<()> {
        let id = extension.manifest().id;
        self.manager.register(extension)?;
        if self.config.extensions.activate_on_start && self.is_running().await {
            self.manager.activate(&id).await?;
        }
        Ok(())
    }

    /// Deactivates (if needed) and removes an extension.
    pub async fn unregister(&self, id: &str) -> RuntimeResult<()> {
        self.manager.unregister(id).await?;
        Ok(())
    }

    pub async fn activate(&self, id: &str) -> RuntimeResult<()> {
        self.manager.activate(id).await?;
        Ok(())
    }

    /// Returns the number of failed cleanups.
    pub async fn deactivate(&self, id: &str) -> RuntimeResult<usize> {
        Ok(self.manager.deactivate(id).await?)
    }

    pub async fn stats(&self) -> HostStats {
        let list = self.manager.list();
        HostStats {
            extensions: list.len(),
            active_extensions: list
                .iter()
                .filter(|info| info.state == ExtensionState::Active)
                .count(),
            registry_entries: self.registries().total_entries(),
            running: self.is_running().await,
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Starts the host, activating every registered extension when
    /// `activate_on_start` is set.
    ///
    /// Activation failures are rolled back by the manager and returned; the
    /// remaining extensions still start.
    pub async fn start(&self) -> Vec<ExtensionError> {
        {
            let mut running = self.running.write().await;
            if *running {
                warn!("Host is already running");
                return Vec::new();
            }
            *running = true;
        }

        info!(extensions = self.manager.len(), "Starting Gridhost");

        let failures = if self.config.extensions.activate_on_start {
            self.manager.activate_all().await
        } else {
            debug!("Automatic activation disabled by configuration");
            Vec::new()
        };

        info!(failed = failures.len(), "Host started");
        failures
    }

    /// Deactivates every extension in reverse order and empties the
    /// registries.
    ///
    /// Returns the number of failed cleanups.
    pub async fn shutdown(&self) -> usize {
        {
            let mut running = self.running.write().await;
            if !*running {
                warn!("Host is not running");
                return 0;
            }
            *running = false;
        }

        info!("Stopping Gridhost");
        let failures = self.manager.deactivate_all().await;

        let leftover = self.registries().total_entries();
        if leftover > 0 {
            debug!(leftover, "Clearing entries registered outside extensions");
        }
        self.registries().clear();

        info!(cleanup_failures = failures, "Host stopped");
        failures
    }

    /// Runs the host until Ctrl+C or SIGTERM.
    pub async fn run(&self) -> RuntimeResult<()> {
        self.start().await;
        info!("Gridhost is now running. Press Ctrl+C to stop.");
        let waited = wait_for_shutdown().await;
        self.shutdown().await;
        waited
    }

    /// Runs the host until `shutdown` completes.
    pub async fn run_until<F>(&self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        self.start().await;
        shutdown.await;
        self.shutdown().await;
        Ok(())
    }
}

impl std::fmt::Debug for GridHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridHost")
            .field("extensions", &self.manager.ids())
            .finish_non_exhaustive()
    }
}

/// Waits for Ctrl+C, or SIGTERM on unix.
async fn wait_for_shutdown() -> RuntimeResult<()> {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
        tokio::select! {
            result = signal::ctrl_c() => {
                result?;
                info!("Received Ctrl+C, shutting down");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await?;
        info!("Received Ctrl+C, shutting down");
    }

    Ok(())
}

// =============================================================================
// HostBuilder
// =============================================================================

/// Builder for a [`GridHost`] with custom configuration sources.
pub struct HostBuilder {
    config_loader: ConfigLoader,
    registries: Option<Registries>,
}

impl HostBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir().with_user_config_dir(),
            registries: None,
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g. "development", "production").
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges programmatic defaults under the file and env sources.
    pub fn merge(mut self, config: GridHostConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Uses private registries instead of the process-wide ones.
    pub fn registries(mut self, registries: Registries) -> Self {
        self.registries = Some(registries);
        self
    }

    /// Loads the configuration and builds the host.
    pub fn build(self) -> ConfigResult<GridHost> {
        let config = self.config_loader.load()?;
        Ok(match self.registries {
            Some(registries) => {
                logging::init_from_config(&config.logging);
                GridHost::with_registries(&config, registries)
            }
            None => GridHost::from_config(&config),
        })
    }
}

impl Default for HostBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use gridhost_core::{CellStyle, Color, HandlerResult};
    use gridhost_framework::{
        BUILTIN_EXTENSIONS, ExtensionContext, ExtensionFactory, ExtensionManifest,
    };
    use linkme::distributed_slice;
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct ProbeConfig {
        stride: u32,
    }

    struct HostProbe;

    #[async_trait]
    impl Extension for HostProbe {
        fn manifest(&self) -> ExtensionManifest {
            ExtensionManifest::new("host-probe", "Host probe")
        }

        async fn activate(&self, ctx: &mut ExtensionContext) -> HandlerResult<()> {
            let config: ProbeConfig = ctx.config()?;
            ctx.register_style_interceptor(format!("stride-{}", config.stride), 0, |_, _, _| {
                Ok(Some(CellStyle::new().background(Color::rgb(1, 2, 3))))
            });
            Ok(())
        }
    }

    #[distributed_slice(BUILTIN_EXTENSIONS)]
    static HOST_PROBE: ExtensionFactory = host_probe;

    fn host_probe() -> Arc<dyn Extension> {
        Arc::new(HostProbe)
    }

    struct Failing;

    #[async_trait]
    impl Extension for Failing {
        fn manifest(&self) -> ExtensionManifest {
            ExtensionManifest::new("failing", "Failing")
        }

        async fn activate(&self, ctx: &mut ExtensionContext) -> HandlerResult<()> {
            ctx.register_style_interceptor("half", 0, |_, _, _| Ok(None));
            Err("missing resource".into())
        }
    }

    fn config_with_stride(stride: u32) -> GridHostConfig {
        let mut config = GridHostConfig::default();
        config
            .extensions
            .settings
            .insert("host-probe".to_string(), serde_json::json!({ "stride": stride }));
        config
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_builtins_start_and_stop() {
        let registries = Registries::new();
        let host = GridHost::with_registries(&config_with_stride(4), registries.clone());
        assert_eq!(host.manager().ids(), vec!["host-probe".to_string()]);

        assert!(host.start().await.is_empty());
        assert_eq!(host.manager().state("host-probe"), Some(ExtensionState::Active));
        assert_eq!(registries.styles.ids(), vec!["stride-4".to_string()]);

        let stats = host.stats().await;
        assert_eq!(stats.active_extensions, 1);
        assert!(stats.running);

        assert_eq!(host.shutdown().await, 0);
        assert_eq!(registries.total_entries(), 0);
        assert_eq!(host.manager().state("host-probe"), Some(ExtensionState::Inactive));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_disabled_builtin_is_skipped() {
        let mut config = GridHostConfig::default();
        config.extensions.disabled = vec!["host-probe".to_string()];
        let host = GridHost::with_registries(&config, Registries::new());
        assert!(host.manager().is_empty());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_activate_on_start_off() {
        let mut config = GridHostConfig::default();
        config.extensions.activate_on_start = false;
        let host = GridHost::with_registries(&config, Registries::new());

        host.start().await;
        assert_eq!(host.manager().state("host-probe"), Some(ExtensionState::Inactive));

        host.activate("host-probe").await.unwrap();
        assert_eq!(host.registries().styles.len(), 1);
        assert_eq!(host.deactivate("host-probe").await.unwrap(), 0);
        assert!(host.registries().styles.is_empty());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_failed_activation_does_not_stop_start() {
        let registries = Registries::new();
        let host = GridHost::with_registries(&config_with_stride(1), registries.clone());
        host.register(Arc::new(Failing)).await.unwrap();

        let failures = host.start().await;
        assert_eq!(failures.len(), 1);
        assert!(matches!(
            &failures[0],
            ExtensionError::ActivationFailed { id, .. } if id == "failing"
        ));
        assert_eq!(host.manager().state("host-probe"), Some(ExtensionState::Active));
        assert_eq!(registries.owned_by("failing"), 0);

        host.shutdown().await;
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_register_while_running_activates() {
        let mut config = GridHostConfig::default();
        config.extensions.disabled = vec!["host-probe".to_string()];
        let host = GridHost::with_registries(&config, Registries::new());
        host.start().await;

        let err = host.register(Arc::new(Failing)).await.unwrap_err();
        assert!(matches!(
            err,
            crate::RuntimeError::Extension(ExtensionError::ActivationFailed { .. })
        ));
        assert_eq!(host.manager().state("failing"), Some(ExtensionState::Inactive));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_shutdown_clears_foreign_entries() {
        let registries = Registries::new();
        let host = GridHost::with_registries(&config_with_stride(1), registries.clone());
        host.start().await;

        let _kept = registries.styles.register("app-level", 0, |_, _, _| Ok(None));
        assert_eq!(registries.styles.len(), 2);

        host.shutdown().await;
        assert_eq!(registries.total_entries(), 0);
        assert!(!host.is_running().await);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_run_until() {
        let host = GridHost::with_registries(&config_with_stride(2), Registries::new());
        host.run_until(async {}).await.unwrap();
        assert!(!host.is_running().await);
        assert!(host.registries().styles.is_empty());
    }
}
