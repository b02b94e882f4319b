use std::fmt;
use std::time::Duration;

use common::{Track, PLACEHOLDER_ARTWORK, UNKNOWN_ALBUM, UNKNOWN_ARTIST};

/// Where the playback session is with respect to metadata lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    /// A catalog lookup is in flight.
    Loading,
    Ready,
}

/// User-facing status line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Status {
    Idle,
    Playing,
    Searching,
    LocalData,
    InfoLoaded,
    NoInfoFound,
    Paused,
    Stopped,
    SaveFailed(String),
    SettingsSaveFailed(String),
    PlaybackFailed(String),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Idle => write!(f, "Idle"),
            Status::Playing => write!(f, "Playing"),
            Status::Searching => write!(f, "Searching catalog..."),
            Status::LocalData => write!(f, "Playing (local data)"),
            Status::InfoLoaded => write!(f, "Info loaded & saved"),
            Status::NoInfoFound => write!(f, "No info found (offline)"),
            Status::Paused => write!(f, "Paused"),
            Status::Stopped => write!(f, "Stopped"),
            Status::SaveFailed(err) => write!(f, "Library save failed: {}", err),
            Status::SettingsSaveFailed(err) => write!(f, "Settings save failed: {}", err),
            Status::PlaybackFailed(err) => write!(f, "Playback failed: {}", err),
        }
    }
}

/// What the "now playing" panel shows for a track.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NowPlaying {
    pub title: String,
    pub file_path: String,
    pub artist: String,
    pub album: String,
    pub image: String,
}

impl NowPlaying {
    /// Unresolved tracks show the sentinels and the placeholder, whatever
    /// their fields currently hold.
    pub fn from_track(track: &Track) -> Self {
        let (artist, album, image) = if track.resolved {
            (
                track.artist.clone(),
                track.album.clone(),
                track.best_image().to_string(),
            )
        } else {
            (
                UNKNOWN_ARTIST.to_string(),
                UNKNOWN_ALBUM.to_string(),
                PLACEHOLDER_ARTWORK.to_string(),
            )
        };
        Self {
            title: track.title.clone(),
            file_path: track.file_path.clone(),
            artist,
            album,
            image,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progress {
    pub position: Duration,
    pub duration: Option<Duration>,
}

/// `mm:ss`, with minutes allowed past 59.
pub fn format_clock(value: Duration) -> String {
    let secs = value.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Receives display updates from the session. Every method defaults to a
/// no-op so front ends implement only what they render.
pub trait SessionObserver: Send {
    fn status_changed(&mut self, _status: &Status) {}
    fn now_playing_changed(&mut self, _now_playing: &NowPlaying) {}
    fn library_changed(&mut self, _tracks: &[Track]) {}
}

pub struct NoopObserver;

impl SessionObserver for NoopObserver {}
