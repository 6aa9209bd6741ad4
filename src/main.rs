use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, warn};

use quest_engine::config::{ConfigStore, HotReloadEvent};
use quest_engine::db::ProgressionStore;
use quest_engine::quest::{
    BountyScheduler, Catalog, GeneratorRegistry, LoggingBroadcaster, LoggingIssuer,
    PassthroughCatalog, QuestService, RewardDistributor,
};

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_DATABASE_URL: &str = "sqlite:quest.db?mode=rwc";

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("quest_engine=info")),
        )
        .init();

    let data_dir = std::env::var("QUEST_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR));
    let database_url =
        std::env::var("QUEST_DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

    // Load quest configuration from TOML files
    let config = Arc::new(ConfigStore::new(&data_dir));
    if let Err(e) = config.load_all().await {
        error!("Failed to load quest configuration, using defaults: {}", e);
    }

    let store = match ProgressionStore::open(&database_url).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("Failed to open progression store at {}: {}", database_url, e);
            return;
        }
    };

    let catalog: Arc<dyn Catalog> = Arc::new(PassthroughCatalog);
    let broadcaster = Arc::new(LoggingBroadcaster);

    let service = Arc::new(QuestService::new(
        config.clone(),
        store.clone(),
        GeneratorRegistry::with_defaults(catalog.clone()),
        RewardDistributor::new(Arc::new(LoggingIssuer), broadcaster.clone()),
        BountyScheduler::new(),
        broadcaster,
        catalog,
    ));
    service.initialize().await;

    // Restart the bounty schedule whenever the configuration changes
    match config.start_file_watcher() {
        Ok(mut rx) => {
            let service = service.clone();
            tokio::spawn(async move {
                while let Some(event) = rx.recv().await {
                    match event {
                        HotReloadEvent::Reloaded(path) => {
                            info!("Quest hot-reload: {}", path);
                            // The watcher already swapped the snapshot
                            service.restart_bounty_scheduler().await;
                        }
                        HotReloadEvent::Error(e) => {
                            error!("Quest hot-reload error: {}", e);
                        }
                    }
                }
            });
            info!("Quest hot-reload enabled");
        }
        Err(e) => {
            warn!("Failed to start quest hot-reload: {}", e);
        }
    }

    info!("Quest engine running, press Ctrl+C to stop");
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }

    service.shutdown().await;
    store.close().await;
    info!("Quest engine stopped");
}
