use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use common::{Settings, Track};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The persisted library document: a JSON array of tracks.
#[derive(Clone, Debug)]
pub struct LibraryStore {
    path: PathBuf,
}

impl LibraryStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing, empty or malformed documents all load as an empty library.
    pub fn load(&self) -> Vec<Track> {
        read_document(&self.path, "library")
    }

    /// Overwrites the document with `tracks` in their current order.
    pub fn save(&self, tracks: &[Track]) -> Result<(), StoreError> {
        write_document(&self.path, tracks)
    }
}

/// The persisted settings document.
#[derive(Clone, Debug)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Settings {
        read_document(&self.path, "settings")
    }

    pub fn save(&self, settings: &Settings) -> Result<(), StoreError> {
        write_document(&self.path, settings)
    }
}

fn read_document<T: DeserializeOwned + Default>(path: &Path, kind: &str) -> T {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(err) if err.kind() == ErrorKind::NotFound => return T::default(),
        Err(err) => {
            warn!("Failed to read {} file {:?}: {}", kind, path, err);
            return T::default();
        }
    };
    if data.iter().all(u8::is_ascii_whitespace) {
        return T::default();
    }
    match serde_json::from_slice(&data) {
        Ok(value) => value,
        Err(err) => {
            warn!("Ignoring malformed {} file {:?}: {}", kind, path, err);
            T::default()
        }
    }
}

fn write_document<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let contents = serde_json::to_vec_pretty(value)?;
    fs::write(path, contents)?;
    Ok(())
}
