use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use metadata::DEFAULT_CATALOG_URL;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CONFIG_VERSION: u32 = 1;

const DEFAULT_LIBRARY_PATH: &str = "library.json";
const DEFAULT_SETTINGS_PATH: &str = "settings.json";
const DEFAULT_TIMEOUT_SECS: u64 = 8;
const DEFAULT_USER_AGENT: &str = "songshelf/0.1";
const DEFAULT_VOLUME: f32 = 0.5;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub version: u32,
    pub library_path: String,
    pub settings_path: String,
    pub audio_extensions: Vec<String>,
    pub catalog_base_url: String,
    pub catalog_timeout_secs: u64,
    pub user_agent: String,
    pub initial_volume: f32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            library_path: DEFAULT_LIBRARY_PATH.to_string(),
            settings_path: DEFAULT_SETTINGS_PATH.to_string(),
            audio_extensions: vec!["mp3".to_string()],
            catalog_base_url: DEFAULT_CATALOG_URL.to_string(),
            catalog_timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            initial_volume: DEFAULT_VOLUME,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub fn config_path_from_env() -> PathBuf {
    match env::var("SONGSHELF_CONFIG") {
        Ok(value) if !value.trim().is_empty() => PathBuf::from(value),
        _ => default_config_path(),
    }
}

fn default_config_path() -> PathBuf {
    match env::current_exe() {
        Ok(exe) => exe
            .parent()
            .map(|dir| dir.join("config.yaml"))
            .unwrap_or_else(|| PathBuf::from("config.yaml")),
        Err(_) => PathBuf::from("config.yaml"),
    }
}

/// Reads the config at `path`, or writes and returns the defaults when the
/// file does not exist yet. The flag is true when the file was created.
pub fn load_or_create_config(path: &Path) -> Result<(AppConfig, bool), ConfigError> {
    if path.exists() {
        let contents = fs::read_to_string(path)?;
        let mut config: AppConfig = if contents.trim().is_empty() {
            AppConfig::default()
        } else {
            serde_yaml::from_str(&contents)?
        };
        normalize(&mut config);
        return Ok((config, false));
    }

    let config = AppConfig::default();
    save_config(path, &config)?;
    Ok((config, true))
}

pub fn save_config(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let contents = serde_yaml::to_string(config)?;
    fs::write(path, contents)?;
    Ok(())
}

/// Relative values are taken relative to the directory holding the config.
pub fn resolve_path(config_path: &Path, value: &str) -> PathBuf {
    let raw = PathBuf::from(value);
    if raw.is_absolute() {
        return raw;
    }
    let base = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    base.join(raw)
}

fn normalize(config: &mut AppConfig) {
    if config.version < CONFIG_VERSION {
        config.version = CONFIG_VERSION;
    }
    if config.library_path.trim().is_empty() {
        config.library_path = DEFAULT_LIBRARY_PATH.to_string();
    }
    if config.settings_path.trim().is_empty() {
        config.settings_path = DEFAULT_SETTINGS_PATH.to_string();
    }
    config
        .audio_extensions
        .retain(|ext| !ext.trim().trim_start_matches('.').is_empty());
    if config.audio_extensions.is_empty() {
        config.audio_extensions = vec!["mp3".to_string()];
    }
    if config.catalog_base_url.trim().is_empty() {
        config.catalog_base_url = DEFAULT_CATALOG_URL.to_string();
    }
    if config.catalog_timeout_secs == 0 {
        config.catalog_timeout_secs = DEFAULT_TIMEOUT_SECS;
    }
    if config.user_agent.trim().is_empty() {
        config.user_agent = DEFAULT_USER_AGENT.to_string();
    }
    if !config.initial_volume.is_finite() {
        config.initial_volume = DEFAULT_VOLUME;
    }
    config.initial_volume = config.initial_volume.clamp(0.0, 1.0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn creates_default_config_on_first_run() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("conf").join("config.yaml");

        let (config, created) = load_or_create_config(&path).unwrap();
        assert!(created);
        assert_eq!(config, AppConfig::default());
        assert!(path.exists());

        let (again, created) = load_or_create_config(&path).unwrap();
        assert!(!created);
        assert_eq!(again, config);
    }

    #[test]
    fn partial_config_keeps_defaults_and_normalizes_blanks() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "library_path: \"\"\ncatalog_timeout_secs: 0\naudio_extensions: [\" \", \".flac\"]\ninitial_volume: 3.0\n",
        )
        .unwrap();

        let (config, created) = load_or_create_config(&path).unwrap();
        assert!(!created);
        assert_eq!(config.library_path, DEFAULT_LIBRARY_PATH);
        assert_eq!(config.settings_path, DEFAULT_SETTINGS_PATH);
        assert_eq!(config.catalog_timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.audio_extensions, vec![".flac".to_string()]);
        assert_eq!(config.initial_volume, 1.0);
        assert_eq!(config.catalog_base_url, DEFAULT_CATALOG_URL);
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "library_path: [unclosed").unwrap();
        assert!(matches!(
            load_or_create_config(&path),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn resolve_path_is_relative_to_config_dir() {
        let config_path = Path::new("/etc/songshelf/config.yaml");
        assert_eq!(
            resolve_path(config_path, "library.json"),
            PathBuf::from("/etc/songshelf/library.json")
        );
        assert_eq!(
            resolve_path(config_path, "/var/lib/library.json"),
            PathBuf::from("/var/lib/library.json")
        );
        assert_eq!(
            resolve_path(Path::new("config.yaml"), "library.json"),
            PathBuf::from("./library.json")
        );
    }
}
