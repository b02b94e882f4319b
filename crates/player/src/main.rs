use std::sync::Arc;
use std::time::Duration;

use library::{Library, SettingsStore};
use metadata::{CatalogClient, HttpCatalog, MetadataResolver};
use player::config::{config_path_from_env, load_or_create_config, resolve_path};
use player::console::{self, ConsoleObserver};
use player::{App, HeadlessBackend};
use reqwest::Client;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = config_path_from_env();
    let (config, created) = load_or_create_config(&config_path)?;
    if created {
        info!("Created default config at {:?}", config_path);
    } else {
        info!("Loaded config from {:?}", config_path);
    }

    let library = Library::open(resolve_path(&config_path, &config.library_path));
    let settings = SettingsStore::new(resolve_path(&config_path, &config.settings_path));

    let client = Client::builder().user_agent(config.user_agent.as_str()).build()?;
    let catalog: Arc<dyn CatalogClient> = Arc::new(HttpCatalog::new(
        client,
        &config.catalog_base_url,
        Duration::from_secs(config.catalog_timeout_secs),
    ));
    let resolver = MetadataResolver::new(catalog);

    let mut app = App::new(
        library,
        settings,
        config.audio_extensions.clone(),
        HeadlessBackend::new(config.initial_volume),
        resolver,
    )
    .with_observer(Box::new(ConsoleObserver));

    console::run(&mut app).await?;
    info!("Bye");
    Ok(())
}
