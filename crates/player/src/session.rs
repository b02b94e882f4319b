use std::time::Duration;

use common::Track;
use library::Library;
use metadata::{apply_catalog_match, CatalogMatch, MetadataResolver};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::PlaybackBackend;
use crate::state::{NoopObserver, NowPlaying, Progress, SessionObserver, SessionState, Status};

/// Result of a catalog lookup, sent back to whoever owns the session.
#[derive(Debug)]
pub struct LookupCompletion {
    ticket: u64,
    file_path: String,
    result: Option<CatalogMatch>,
}

impl LookupCompletion {
    pub fn file_path(&self) -> &str {
        &self.file_path
    }
}

/// What `PlaybackSession::complete` did with a completion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// Cancelled or superseded; nothing was touched.
    Stale,
    Merged { persisted: bool },
    NoMatch,
    /// The track was removed or already resolved by the user meanwhile.
    Skipped,
}

struct PendingLookup {
    ticket: u64,
    file_path: String,
    cancel: CancellationToken,
}

/// Drives the playback widget and the per-track catalog lookup.
///
/// At most one lookup is in flight. Starting another, or selecting a
/// different track, cancels it; a cancelled lookup's completion is dropped
/// by `complete` without touching the library or the display.
pub struct PlaybackSession<B> {
    backend: B,
    resolver: MetadataResolver,
    completions: UnboundedSender<LookupCompletion>,
    observer: Box<dyn SessionObserver>,
    state: SessionState,
    status: Status,
    now_playing: Option<NowPlaying>,
    loaded: Option<String>,
    pending: Option<PendingLookup>,
    next_ticket: u64,
}

impl<B: PlaybackBackend> PlaybackSession<B> {
    pub fn new(
        backend: B,
        resolver: MetadataResolver,
        completions: UnboundedSender<LookupCompletion>,
    ) -> Self {
        Self {
            backend,
            resolver,
            completions,
            observer: Box::new(NoopObserver),
            state: SessionState::Idle,
            status: Status::Idle,
            now_playing: None,
            loaded: None,
            pending: None,
            next_ticket: 0,
        }
    }

    pub fn set_observer(&mut self, observer: Box<dyn SessionObserver>) {
        self.observer = observer;
    }

    pub fn observer_mut(&mut self) -> &mut dyn SessionObserver {
        self.observer.as_mut()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn now_playing(&self) -> Option<&NowPlaying> {
        self.now_playing.as_ref()
    }

    /// Path currently opened in the widget.
    pub fn loaded_path(&self) -> Option<&str> {
        self.loaded.as_deref()
    }

    pub fn pending_lookup(&self) -> Option<&str> {
        self.pending.as_ref().map(|pending| pending.file_path.as_str())
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Shows `track` without touching the widget.
    pub fn select_track(&mut self, track: &Track) {
        self.cancel_pending();
        self.show(track);
    }

    /// Opens and plays `track`, and looks it up in the catalog unless it is
    /// already resolved. A widget that cannot open the file reports
    /// `PlaybackFailed`; the lookup still runs so the record gets enriched.
    pub fn play(&mut self, track: &Track) {
        let opened = match self.backend.open(&track.file_path) {
            Ok(()) => {
                self.backend.play();
                self.loaded = Some(track.file_path.clone());
                self.set_status(Status::Playing);
                true
            }
            Err(err) => {
                warn!("Failed to open {:?}: {}", track.file_path, err);
                self.set_status(Status::PlaybackFailed(err.to_string()));
                false
            }
        };
        self.show(track);

        if track.resolved {
            self.cancel_pending();
            self.state = SessionState::Ready;
            if opened {
                self.set_status(Status::LocalData);
            }
        } else {
            self.start_lookup(track);
            if opened {
                self.set_status(Status::Searching);
            }
        }
    }

    /// Continues `track` if it is the one already open, otherwise `play`.
    pub fn resume(&mut self, track: &Track) {
        if self.loaded.as_deref() == Some(track.file_path.as_str()) {
            self.backend.play();
            self.set_status(Status::Playing);
        } else {
            self.play(track);
        }
    }

    pub fn pause(&mut self) {
        if self.loaded.is_none() {
            return;
        }
        self.backend.pause();
        self.set_status(Status::Paused);
    }

    pub fn stop(&mut self) {
        if self.loaded.is_none() {
            return;
        }
        self.backend.stop();
        self.set_status(Status::Stopped);
    }

    pub fn seek(&mut self, position: Duration) {
        if self.loaded.is_none() {
            return;
        }
        self.backend.seek(position);
    }

    pub fn set_volume(&mut self, level: f32) {
        if !level.is_finite() {
            return;
        }
        self.backend.set_volume(level.clamp(0.0, 1.0));
    }

    pub fn volume(&self) -> f32 {
        self.backend.volume()
    }

    pub fn progress(&self) -> Option<Progress> {
        self.loaded.as_ref()?;
        Some(Progress {
            position: self.backend.position(),
            duration: self.backend.duration(),
        })
    }

    /// Cancels the in-flight lookup if it belongs to `file_path`.
    pub fn cancel_lookup_for(&mut self, file_path: &str) {
        if self.pending_lookup() == Some(file_path) {
            self.cancel_pending();
        }
    }

    /// Drops every reference to a record that left the library: its lookup,
    /// the widget if it has the file open, and the now-playing view.
    pub fn forget(&mut self, file_path: &str) {
        self.cancel_lookup_for(file_path);
        if self.loaded.as_deref() == Some(file_path) {
            self.backend.stop();
            self.loaded = None;
            self.set_status(Status::Stopped);
        }
        let showing = self
            .now_playing
            .as_ref()
            .map(|view| view.file_path == file_path)
            .unwrap_or(false);
        if showing {
            self.now_playing = None;
        }
    }

    /// Re-renders the now-playing view if it is showing `track`.
    pub fn refresh_track(&mut self, track: &Track) {
        let showing = self
            .now_playing
            .as_ref()
            .map(|view| view.file_path == track.file_path)
            .unwrap_or(false);
        if showing {
            self.show(track);
        }
    }

    pub fn report(&mut self, status: Status) {
        self.set_status(status);
    }

    /// Applies a finished lookup. Must run on the context that owns
    /// `library`; stale completions are ignored.
    pub fn complete(
        &mut self,
        completion: LookupCompletion,
        library: &mut Library,
    ) -> CompletionOutcome {
        let current = matches!(
            &self.pending,
            Some(pending) if pending.ticket == completion.ticket && !pending.cancel.is_cancelled()
        );
        if !current {
            debug!(file_path = %completion.file_path, "Dropping stale lookup result");
            return CompletionOutcome::Stale;
        }
        self.pending = None;
        self.state = SessionState::Ready;

        let track = match library.get_mut(&completion.file_path) {
            Some(track) => track,
            None => {
                debug!(file_path = %completion.file_path, "Looked-up track is gone");
                self.set_status(Status::Playing);
                return CompletionOutcome::Skipped;
            }
        };
        if track.resolved {
            self.set_status(Status::LocalData);
            return CompletionOutcome::Skipped;
        }

        let found = match completion.result {
            Some(found) => found,
            None => {
                self.set_status(Status::NoInfoFound);
                return CompletionOutcome::NoMatch;
            }
        };

        apply_catalog_match(track, &found);
        let track = track.clone();
        info!("Resolved {:?}: {} / {}", track.file_path, track.artist, track.album);
        self.refresh_track(&track);

        match library.persist() {
            Ok(()) => {
                self.set_status(Status::InfoLoaded);
                CompletionOutcome::Merged { persisted: true }
            }
            Err(err) => {
                warn!("Failed to save library: {}", err);
                self.set_status(Status::SaveFailed(err.to_string()));
                CompletionOutcome::Merged { persisted: false }
            }
        }
    }

    fn start_lookup(&mut self, track: &Track) {
        self.cancel_pending();
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        let cancel = CancellationToken::new();
        let file_path = track.file_path.clone();
        self.pending = Some(PendingLookup {
            ticket,
            file_path: file_path.clone(),
            cancel: cancel.clone(),
        });
        self.state = SessionState::Loading;

        let resolver = self.resolver.clone();
        let completions = self.completions.clone();
        tokio::spawn(async move {
            let result = resolver.resolve(&file_path, &cancel).await;
            if cancel.is_cancelled() {
                return;
            }
            let _ = completions.send(LookupCompletion {
                ticket,
                file_path,
                result,
            });
        });
    }

    fn cancel_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            debug!(file_path = %pending.file_path, "Cancelling catalog lookup");
            pending.cancel.cancel();
            if self.state == SessionState::Loading {
                self.state = SessionState::Ready;
            }
        }
    }

    fn show(&mut self, track: &Track) {
        let view = NowPlaying::from_track(track);
        self.observer.now_playing_changed(&view);
        self.now_playing = Some(view);
    }

    fn set_status(&mut self, status: Status) {
        if self.status != status {
            self.observer.status_changed(&status);
        }
        self.status = status;
    }
}
