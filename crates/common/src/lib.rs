use serde::{Deserialize, Serialize};
use std::path::Path;

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";
pub const PLACEHOLDER_ARTWORK: &str = "/images/music_note.png";

/// One song in the library.
///
/// `file_path` is the identity key: two records with the same path are the
/// same song. `resolved` flips to true once a catalog lookup succeeded or the
/// user saved an edit, and no automated path ever flips it back.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Track {
    #[serde(alias = "Title")]
    pub title: String,
    #[serde(alias = "FilePath")]
    pub file_path: String,
    #[serde(alias = "Artist")]
    pub artist: String,
    #[serde(alias = "Album")]
    pub album: String,
    #[serde(rename = "albumArtUrl", alias = "AlbumArtUrl")]
    pub artwork_ref: String,
    #[serde(alias = "Images")]
    pub images: Vec<String>,
    #[serde(rename = "isDataLoaded", alias = "IsDataLoaded")]
    pub resolved: bool,
}

impl Default for Track {
    fn default() -> Self {
        Self {
            title: String::new(),
            file_path: String::new(),
            artist: UNKNOWN_ARTIST.to_string(),
            album: UNKNOWN_ALBUM.to_string(),
            artwork_ref: PLACEHOLDER_ARTWORK.to_string(),
            images: Vec::new(),
            resolved: false,
        }
    }
}

impl Track {
    /// A fresh, unresolved record for an audio file on disk.
    pub fn from_path(path: &Path) -> Self {
        Self {
            title: file_stem(path),
            file_path: path.to_string_lossy().to_string(),
            ..Self::default()
        }
    }

    /// Image to show for this record: first slideshow image, then artwork,
    /// then the bundled placeholder.
    pub fn best_image(&self) -> &str {
        if let Some(first) = self.images.first() {
            return first;
        }
        if !self.artwork_ref.is_empty() {
            return &self.artwork_ref;
        }
        PLACEHOLDER_ARTWORK
    }
}

/// User settings persisted next to the library.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    #[serde(alias = "MusicFolders")]
    pub music_folders: Vec<String>,
}

impl Settings {
    /// Returns false when the folder is already registered (exact match).
    pub fn add_folder(&mut self, folder: &str) -> bool {
        if self.music_folders.iter().any(|existing| existing == folder) {
            return false;
        }
        self.music_folders.push(folder.to_string());
        true
    }

    pub fn remove_folder(&mut self, folder: &str) -> bool {
        let before = self.music_folders.len();
        self.music_folders.retain(|existing| existing != folder);
        self.music_folders.len() != before
    }
}

pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}
