use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metadata::{CatalogClient, CatalogError, CatalogMatch, MetadataResolver};
use parking_lot::Mutex;

use crate::backend::{PlaybackBackend, PlaybackError};
use crate::state::{NowPlaying, SessionObserver, Status};

/// Records every transport call as a short string.
pub(crate) struct FakeBackend {
    calls: Arc<Mutex<Vec<String>>>,
    volume: f32,
    position: Duration,
}

pub(crate) fn fake_backend() -> (FakeBackend, Arc<Mutex<Vec<String>>>) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let backend = FakeBackend {
        calls: Arc::clone(&calls),
        volume: 0.5,
        position: Duration::ZERO,
    };
    (backend, calls)
}

impl PlaybackBackend for FakeBackend {
    fn open(&mut self, path: &str) -> Result<(), PlaybackError> {
        if path.contains("missing") {
            return Err(PlaybackError::NotFound(path.to_string()));
        }
        self.calls.lock().push(format!("open {}", path));
        Ok(())
    }

    fn play(&mut self) {
        self.calls.lock().push("play".to_string());
    }

    fn pause(&mut self) {
        self.calls.lock().push("pause".to_string());
    }

    fn stop(&mut self) {
        self.position = Duration::ZERO;
        self.calls.lock().push("stop".to_string());
    }

    fn seek(&mut self, position: Duration) {
        self.position = position;
        self.calls.lock().push(format!("seek {}", position.as_secs()));
    }

    fn set_volume(&mut self, level: f32) {
        self.volume = level;
        self.calls.lock().push(format!("volume {:.2}", level));
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn position(&self) -> Duration {
        self.position
    }

    fn duration(&self) -> Option<Duration> {
        Some(Duration::from_secs(180))
    }
}

#[derive(Clone)]
pub(crate) enum Reply {
    Hit(CatalogMatch),
    Fail,
    Hang,
}

/// Answers by search term; unknown terms get no match.
#[derive(Default)]
pub(crate) struct ScriptedCatalog {
    replies: HashMap<String, Reply>,
    terms: Mutex<Vec<String>>,
}

impl ScriptedCatalog {
    pub(crate) fn with(mut self, term: &str, reply: Reply) -> Self {
        self.replies.insert(term.to_string(), reply);
        self
    }

    pub(crate) fn terms(&self) -> Vec<String> {
        self.terms.lock().clone()
    }
}

#[async_trait]
impl CatalogClient for ScriptedCatalog {
    async fn search(&self, term: &str) -> Result<Option<CatalogMatch>, CatalogError> {
        self.terms.lock().push(term.to_string());
        match self.replies.get(term).cloned() {
            Some(Reply::Hit(found)) => Ok(Some(found)),
            Some(Reply::Fail) => Err(CatalogError::Status(500)),
            Some(Reply::Hang) => std::future::pending().await,
            None => Ok(None),
        }
    }
}

pub(crate) fn resolver_for(catalog: &Arc<ScriptedCatalog>) -> MetadataResolver {
    MetadataResolver::new(Arc::clone(catalog) as Arc<dyn CatalogClient>)
}

pub(crate) fn hit(artist: Option<&str>, album: Option<&str>, artwork: Option<&str>) -> Reply {
    Reply::Hit(CatalogMatch {
        track_name: Some("X".to_string()),
        artist_name: artist.map(str::to_string),
        album_name: album.map(str::to_string),
        artwork_url: artwork.map(str::to_string),
    })
}

#[derive(Clone, Default)]
pub(crate) struct RecordingObserver {
    pub(crate) statuses: Arc<Mutex<Vec<Status>>>,
    pub(crate) views: Arc<Mutex<Vec<NowPlaying>>>,
    pub(crate) library_updates: Arc<Mutex<usize>>,
}

impl SessionObserver for RecordingObserver {
    fn status_changed(&mut self, status: &Status) {
        self.statuses.lock().push(status.clone());
    }

    fn now_playing_changed(&mut self, now_playing: &NowPlaying) {
        self.views.lock().push(now_playing.clone());
    }

    fn library_changed(&mut self, _tracks: &[common::Track]) {
        *self.library_updates.lock() += 1;
    }
}
