//! Configuration Store
//!
//! Loads the quest configuration directory into a [`QuestConfig`] snapshot
//! and swaps it atomically on reload. Supports hot-reloading via a file
//! watcher.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use super::defaults::DEFAULT_FILES;
use super::definition::{
    CurrencySettings, MaterialPools, QuestConfig, RawBountyFile, RawMaterialsFile,
    RawTimeBandsFile, RewardSettings, TaskSettings, default_time_bands,
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Holds the live configuration snapshot
pub struct ConfigStore {
    current: RwLock<Arc<QuestConfig>>,
    /// `None` for stores built around an in-memory configuration
    config_dir: Option<PathBuf>,
}

impl ConfigStore {
    /// Create a store for `<data_dir>/quest` holding the built-in defaults
    pub fn new(data_dir: &Path) -> Self {
        Self {
            current: RwLock::new(Arc::new(QuestConfig::with_defaults())),
            config_dir: Some(data_dir.join("quest")),
        }
    }

    /// Create a store around an in-memory configuration (no directory)
    pub fn from_config(config: QuestConfig) -> Self {
        Self {
            current: RwLock::new(Arc::new(config)),
            config_dir: None,
        }
    }

    pub fn config_dir(&self) -> Option<&Path> {
        self.config_dir.as_deref()
    }

    /// Current snapshot
    pub async fn current(&self) -> Arc<QuestConfig> {
        self.current.read().await.clone()
    }

    /// Replace the snapshot directly
    pub async fn replace(&self, config: QuestConfig) {
        *self.current.write().await = Arc::new(config);
    }

    /// Write default files, then load everything.
    ///
    /// On failure the previous snapshot stays in place. A store without a
    /// directory keeps its snapshot untouched.
    pub async fn load_all(&self) -> Result<(), ConfigError> {
        let Some(config_dir) = self.config_dir.as_deref() else {
            debug!("Quest configuration has no directory, keeping current snapshot");
            return Ok(());
        };
        info!("Loading quest configuration from {:?}", config_dir);

        ensure_defaults(config_dir);
        let config = load_from_directory(config_dir)?;

        info!(
            "Loaded quest configuration: {} material types, {} time bands",
            config.materials.len(),
            config.time_bands.len()
        );

        self.replace(config).await;
        Ok(())
    }

    /// Start file watcher for hot-reload.
    /// Returns a channel receiver that signals when reloads occur
    pub fn start_file_watcher(
        self: &Arc<Self>,
    ) -> Result<tokio::sync::mpsc::Receiver<HotReloadEvent>, String> {
        use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
        use std::time::Duration;

        let Some(config_dir) = self.config_dir.clone() else {
            return Err("Quest configuration has no directory to watch".to_string());
        };
        if !config_dir.exists() {
            return Err(format!("Config directory does not exist: {:?}", config_dir));
        }

        let (tx, rx) = tokio::sync::mpsc::channel(32);
        let store = Arc::clone(self);
        let rt = tokio::runtime::Handle::try_current()
            .map_err(|e| format!("No tokio runtime for file watcher: {}", e))?;

        let (notify_tx, notify_rx) = std::sync::mpsc::channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: Result<notify::Event, notify::Error>| {
                if let Ok(event) = res {
                    let _ = notify_tx.send(event);
                }
            },
            Config::default().with_poll_interval(Duration::from_secs(1)),
        )
        .map_err(|e| format!("Failed to create file watcher: {}", e))?;

        watcher
            .watch(&config_dir, RecursiveMode::Recursive)
            .map_err(|e| format!("Failed to watch config directory: {}", e))?;

        info!("Quest config hot-reload watcher started for {:?}", config_dir);

        std::thread::spawn(move || {
            // Keep the watcher alive for the lifetime of the thread
            let _watcher = watcher;

            while let Ok(event) = notify_rx.recv() {
                if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                    continue;
                }

                let Some(path) = event
                    .paths
                    .iter()
                    .find(|p| p.extension().is_some_and(|ext| ext == "toml"))
                    .cloned()
                else {
                    continue;
                };

                info!("Detected change in {:?}, triggering reload", path);

                let store = Arc::clone(&store);
                let reply = tx.clone();
                rt.spawn(async move {
                    let event = match store.load_all().await {
                        Ok(()) => {
                            info!("Hot-reload completed successfully");
                            HotReloadEvent::Reloaded(path.to_string_lossy().to_string())
                        }
                        Err(e) => {
                            error!("Hot-reload failed: {}", e);
                            HotReloadEvent::Error(e.to_string())
                        }
                    };
                    let _ = reply.send(event).await;
                });

                if tx.is_closed() {
                    break;
                }
            }
        });

        Ok(rx)
    }
}

/// Events from the hot-reload watcher
#[derive(Debug, Clone)]
pub enum HotReloadEvent {
    /// A file was reloaded successfully
    Reloaded(String),
    /// An error occurred during reload
    Error(String),
}

/// Write any missing default file. Never overwrites.
pub fn ensure_defaults(config_dir: &Path) {
    if let Err(e) = std::fs::create_dir_all(config_dir) {
        warn!("Failed to create config directory {:?}: {}", config_dir, e);
        return;
    }

    for (name, contents) in DEFAULT_FILES {
        let path = config_dir.join(name);
        if path.exists() {
            continue;
        }
        if let Err(e) = std::fs::write(&path, contents) {
            error!("Failed to write default config {:?}: {}", path, e);
        }
    }
}

/// Load every configuration file from a directory. Missing files use defaults.
pub fn load_from_directory(config_dir: &Path) -> Result<QuestConfig, ConfigError> {
    let rewards: RewardSettings = read_optional(&config_dir.join("rewards.toml"))?
        .unwrap_or_default();
    let time_bands = read_optional::<RawTimeBandsFile>(&config_dir.join("time_bands.toml"))?
        .map(|raw| raw.band)
        .unwrap_or_else(default_time_bands);
    let materials = read_optional::<RawMaterialsFile>(&config_dir.join("materials.toml"))?
        .map(|raw| raw.materials)
        .unwrap_or_default();
    let bounty = read_optional::<RawBountyFile>(&config_dir.join("bounty.toml"))?
        .map(|raw| raw.bounty)
        .unwrap_or_default();
    let tasks: TaskSettings = read_optional(&config_dir.join("tasks.toml"))?.unwrap_or_default();

    if time_bands.is_empty() {
        warn!("No time bands configured, every completion will be rated with the fallback");
    }
    validate_currency(&rewards.currency);

    Ok(QuestConfig {
        rewards,
        time_bands,
        materials: sanitize_materials(materials),
        bounty,
        tasks,
    })
}

fn read_optional<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, ConfigError> {
    if !path.exists() {
        warn!("Config file {:?} is missing, using defaults", path);
        return Ok(None);
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&content)
        .map(Some)
        .map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

/// Drop entries that could never produce a valid objective
fn sanitize_materials(mut pools: MaterialPools) -> MaterialPools {
    for (catalog_type, entries) in pools.iter_mut() {
        entries.retain(|name, spec| {
            spec.min = spec.min.max(1);
            if spec.max < spec.min {
                warn!(
                    "Material {}:{} has max {} below min {}, skipping",
                    catalog_type, name, spec.max, spec.min
                );
                return false;
            }
            true
        });
    }
    pools.retain(|_, entries| !entries.is_empty());
    pools
}

fn validate_currency(currency: &CurrencySettings) {
    for key in currency.stacks.keys() {
        if crate::quest::currency::stack_exponent(key).is_none() {
            warn!("Currency denomination '{}' is not of the form stack-N, ignoring", key);
        }
    }
}
