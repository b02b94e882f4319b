use std::env;
use std::path::PathBuf;

use library::{scan_folders, Library, SettingsStore, DEFAULT_AUDIO_EXTENSIONS};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut args = env::args().skip(1);
    let settings_path = args
        .next()
        .or_else(|| env::var("SETTINGS_PATH").ok())
        .unwrap_or_else(|| "settings.json".to_string());
    let library_path = args
        .next()
        .or_else(|| env::var("LIBRARY_PATH").ok())
        .unwrap_or_else(|| "library.json".to_string());

    let settings = SettingsStore::new(PathBuf::from(&settings_path)).load();
    if settings.music_folders.is_empty() {
        return Err(format!("no music folders registered in {}", settings_path).into());
    }

    let extensions: Vec<String> = DEFAULT_AUDIO_EXTENSIONS
        .iter()
        .map(|ext| ext.to_string())
        .collect();
    let found = scan_folders(&settings.music_folders, &extensions);
    let found_count = found.len();

    let mut library = Library::open(PathBuf::from(&library_path));
    let added = library.merge(found);
    library.persist()?;

    println!(
        "Found {} files, added {} tracks (total {})",
        found_count,
        added,
        library.len()
    );

    Ok(())
}
