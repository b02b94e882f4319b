use std::path::Path;

use common::Track;
use tracing::{debug, info};
use walkdir::WalkDir;

pub const DEFAULT_AUDIO_EXTENSIONS: &[&str] = &["mp3"];

/// Walks every existing folder recursively and returns one unresolved track
/// per audio file. Folders that are gone (moved, unmounted) are skipped.
///
/// The result may contain paths already in the library; `Library::merge`
/// drops those.
pub fn scan_folders<S: AsRef<str>>(folders: &[S], extensions: &[String]) -> Vec<Track> {
    let extensions = normalize_extensions(extensions);
    let mut tracks = Vec::new();

    for folder in folders {
        let root = Path::new(folder.as_ref());
        if !root.is_dir() {
            debug!("Skipping missing music folder {:?}", root);
            continue;
        }

        let before = tracks.len();
        for entry in WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
        {
            // Symlinked files count; symlinked directories are not descended.
            if !entry.path().is_file() {
                continue;
            }
            if is_audio_file(entry.path(), &extensions) {
                tracks.push(Track::from_path(entry.path()));
            }
        }
        info!(
            "Scanned {:?}: {} audio files",
            root,
            tracks.len() - before
        );
    }

    tracks
}

fn normalize_extensions(extensions: &[String]) -> Vec<String> {
    let normalized: Vec<String> = extensions
        .iter()
        .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect();
    if normalized.is_empty() {
        DEFAULT_AUDIO_EXTENSIONS
            .iter()
            .map(|ext| ext.to_string())
            .collect()
    } else {
        normalized
    }
}

fn is_audio_file(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .map(|ext| extensions.iter().any(|allowed| *allowed == ext))
        .unwrap_or(false)
}
