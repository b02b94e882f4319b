use std::collections::HashSet;
use std::path::{Path, PathBuf};

use common::Track;
use tracing::{debug, info};

mod scan;
mod store;

pub use scan::{scan_folders, DEFAULT_AUDIO_EXTENSIONS};
pub use store::{LibraryStore, SettingsStore, StoreError};

/// The in-memory working set of tracks plus the document it persists to.
///
/// Order is insertion order. `file_path` is the identity key: `merge` and
/// `add_files` never append a path that is already present.
#[derive(Clone, Debug)]
pub struct Library {
    store: LibraryStore,
    tracks: Vec<Track>,
}

impl Library {
    pub fn open(path: PathBuf) -> Self {
        let store = LibraryStore::new(path);
        let tracks = store.load();
        info!("Loaded {} tracks from {:?}", tracks.len(), store.path());
        Self { store, tracks }
    }

    /// Drops the working set and reads it back from disk.
    pub fn reload(&mut self) {
        self.tracks = self.store.load();
        info!("Reloaded {} tracks from {:?}", self.tracks.len(), self.store.path());
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn store(&self) -> &LibraryStore {
        &self.store
    }

    pub fn position(&self, file_path: &str) -> Option<usize> {
        self.tracks
            .iter()
            .position(|track| track.file_path == file_path)
    }

    pub fn contains(&self, file_path: &str) -> bool {
        self.position(file_path).is_some()
    }

    pub fn get(&self, file_path: &str) -> Option<&Track> {
        self.tracks.iter().find(|track| track.file_path == file_path)
    }

    pub fn get_mut(&mut self, file_path: &str) -> Option<&mut Track> {
        self.tracks
            .iter_mut()
            .find(|track| track.file_path == file_path)
    }

    /// Appends every track whose path is not yet known, in the order given.
    /// Returns how many were appended.
    pub fn merge(&mut self, found: Vec<Track>) -> usize {
        let mut known: HashSet<String> = self
            .tracks
            .iter()
            .map(|track| track.file_path.clone())
            .collect();
        let mut added = 0;
        for track in found {
            if !known.insert(track.file_path.clone()) {
                debug!("Skipping duplicate {:?}", track.file_path);
                continue;
            }
            self.tracks.push(track);
            added += 1;
        }
        added
    }

    /// Adds files picked by the user as fresh, unresolved tracks.
    pub fn add_files<P: AsRef<Path>>(&mut self, paths: &[P]) -> usize {
        let found = paths
            .iter()
            .map(|path| Track::from_path(path.as_ref()))
            .collect();
        self.merge(found)
    }

    pub fn remove(&mut self, file_path: &str) -> Option<Track> {
        let index = self.position(file_path)?;
        Some(self.tracks.remove(index))
    }

    pub fn persist(&self) -> Result<(), StoreError> {
        self.store.save(&self.tracks)
    }
}
