use common::Track;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditorError {
    #[error("no track selected")]
    NoSelection,
    #[error("an editor is already open")]
    AlreadyOpen,
    #[error("no editor is open")]
    NotOpen,
    #[error("track is no longer in the library: {0}")]
    TrackMissing(String),
}

/// Editable copy of a track's user-facing fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackDraft {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub images: Vec<String>,
}

/// Returned by `EditorSession::save`; tells the caller which record changed
/// so it can persist and refresh.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditCommit {
    pub file_path: String,
}

/// Modal edit of one track. Nothing touches the record until `save`;
/// dropping the session discards the draft.
#[derive(Clone, Debug)]
pub struct EditorSession {
    file_path: String,
    draft: TrackDraft,
}

impl EditorSession {
    pub fn open(track: &Track) -> Self {
        Self {
            file_path: track.file_path.clone(),
            draft: TrackDraft {
                title: track.title.clone(),
                artist: track.artist.clone(),
                album: track.album.clone(),
                images: track.images.clone(),
            },
        }
    }

    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    pub fn draft(&self) -> &TrackDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut TrackDraft {
        &mut self.draft
    }

    pub fn add_image(&mut self, path: &str) {
        self.draft.images.push(path.to_string());
    }

    /// Removes the first image equal to `path`.
    pub fn remove_image(&mut self, path: &str) -> bool {
        match self.draft.images.iter().position(|image| image == path) {
            Some(index) => {
                self.draft.images.remove(index);
                true
            }
            None => false,
        }
    }

    /// Copies the draft into `track` and marks it resolved so later catalog
    /// lookups leave the user's values alone.
    pub fn save(self, track: &mut Track) -> EditCommit {
        let TrackDraft {
            title,
            artist,
            album,
            images,
        } = self.draft;
        track.title = title;
        track.artist = artist;
        track.album = album;
        track.images = images;
        track.resolved = true;
        EditCommit {
            file_path: self.file_path,
        }
    }
}
