use std::path::Path;
use std::time::Duration;

use common::{Settings, Track};
use library::{scan_folders, Library, SettingsStore};
use metadata::MetadataResolver;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tracing::{info, warn};

use crate::backend::PlaybackBackend;
use crate::editor::{EditCommit, EditorError, EditorSession};
use crate::session::{CompletionOutcome, LookupCompletion, PlaybackSession};
use crate::state::{SessionObserver, Status};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanReport {
    pub found: usize,
    pub added: usize,
}

/// The UI-owning context: the only place the library, the settings and the
/// playback session are mutated. Lookup completions land here through
/// `next_completion` and are applied by `handle_completion`.
pub struct App<B> {
    library: Library,
    settings_store: SettingsStore,
    settings: Settings,
    audio_extensions: Vec<String>,
    session: PlaybackSession<B>,
    completions: UnboundedReceiver<LookupCompletion>,
    selected: Option<String>,
    editor: Option<EditorSession>,
}

impl<B: PlaybackBackend> App<B> {
    pub fn new(
        library: Library,
        settings_store: SettingsStore,
        audio_extensions: Vec<String>,
        backend: B,
        resolver: MetadataResolver,
    ) -> Self {
        let settings = settings_store.load();
        let (tx, rx) = unbounded_channel();
        Self {
            library,
            settings_store,
            settings,
            audio_extensions,
            session: PlaybackSession::new(backend, resolver, tx),
            completions: rx,
            selected: None,
            editor: None,
        }
    }

    pub fn with_observer(mut self, observer: Box<dyn SessionObserver>) -> Self {
        self.session.set_observer(observer);
        self
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn session(&self) -> &PlaybackSession<B> {
        &self.session
    }

    pub fn selected(&self) -> Option<&Track> {
        self.library.get(self.selected.as_deref()?)
    }

    pub fn editor(&self) -> Option<&EditorSession> {
        self.editor.as_ref()
    }

    /// Selects the track at `index` in library order and shows it.
    pub fn select(&mut self, index: usize) -> Option<&Track> {
        let track = self.library.tracks().get(index)?.clone();
        self.session.select_track(&track);
        self.selected = Some(track.file_path);
        self.selected()
    }

    pub fn play_selected(&mut self) -> bool {
        match self.selected().cloned() {
            Some(track) => {
                self.session.play(&track);
                true
            }
            None => false,
        }
    }

    pub fn resume_selected(&mut self) -> bool {
        match self.selected().cloned() {
            Some(track) => {
                self.session.resume(&track);
                true
            }
            None => false,
        }
    }

    pub fn pause(&mut self) {
        self.session.pause();
    }

    pub fn stop(&mut self) {
        self.session.stop();
    }

    pub fn seek(&mut self, position: Duration) {
        self.session.seek(position);
    }

    pub fn set_volume(&mut self, level: f32) {
        self.session.set_volume(level);
    }

    /// Adds files picked by the user and saves the library.
    pub fn add_files<P: AsRef<Path>>(&mut self, paths: &[P]) -> usize {
        let added = self.library.add_files(paths);
        if added > 0 {
            self.library_changed();
        }
        added
    }

    pub fn remove_selected(&mut self) -> Option<Track> {
        let file_path = self.selected.take()?;
        let removed = self.library.remove(&file_path)?;
        self.session.forget(&file_path);
        if self
            .editor
            .as_ref()
            .map(|editor| editor.file_path() == file_path)
            .unwrap_or(false)
        {
            self.editor = None;
        }
        info!("Removed {:?}", file_path);
        self.library_changed();
        Some(removed)
    }

    pub fn reload(&mut self) {
        self.library.reload();
        if let Some(path) = self.selected.as_deref() {
            if !self.library.contains(path) {
                self.selected = None;
            }
        }
        let tracks = self.library.tracks().to_vec();
        self.session.observer_mut().library_changed(&tracks);
    }

    pub fn open_editor(&mut self) -> Result<&mut EditorSession, EditorError> {
        if self.editor.is_some() {
            return Err(EditorError::AlreadyOpen);
        }
        let track = self.selected().ok_or(EditorError::NoSelection)?;
        let editor = EditorSession::open(track);
        Ok(self.editor.insert(editor))
    }

    pub fn editor_mut(&mut self) -> Result<&mut EditorSession, EditorError> {
        self.editor.as_mut().ok_or(EditorError::NotOpen)
    }

    /// Commits the open editor into its record, saves and refreshes the view.
    pub fn save_editor(&mut self) -> Result<EditCommit, EditorError> {
        let editor = self.editor.take().ok_or(EditorError::NotOpen)?;
        let file_path = editor.file_path().to_string();
        let track = self
            .library
            .get_mut(&file_path)
            .ok_or_else(|| EditorError::TrackMissing(file_path.clone()))?;
        let commit = editor.save(track);
        let track = track.clone();
        self.session.refresh_track(&track);
        self.library_changed();
        Ok(commit)
    }

    pub fn cancel_editor(&mut self) -> bool {
        self.editor.take().is_some()
    }

    /// Registers a folder and saves the settings. False if already present.
    pub fn add_folder(&mut self, folder: &str) -> bool {
        if !self.settings.add_folder(folder) {
            return false;
        }
        self.persist_settings();
        true
    }

    pub fn remove_folder(&mut self, folder: &str) -> bool {
        if !self.settings.remove_folder(folder) {
            return false;
        }
        self.persist_settings();
        true
    }

    /// Scans every registered folder and merges new files into the library.
    pub fn scan(&mut self) -> ScanReport {
        let found = scan_folders(&self.settings.music_folders, &self.audio_extensions);
        let report = ScanReport {
            found: found.len(),
            added: self.library.merge(found),
        };
        info!("Scan found {} files, added {}", report.found, report.added);
        if report.added > 0 {
            self.library_changed();
        }
        report
    }

    pub async fn next_completion(&mut self) -> Option<LookupCompletion> {
        self.completions.recv().await
    }

    pub fn try_next_completion(&mut self) -> Option<LookupCompletion> {
        self.completions.try_recv().ok()
    }

    pub fn handle_completion(&mut self, completion: LookupCompletion) -> CompletionOutcome {
        let outcome = self.session.complete(completion, &mut self.library);
        if matches!(outcome, CompletionOutcome::Merged { .. }) {
            let tracks = self.library.tracks().to_vec();
            self.session.observer_mut().library_changed(&tracks);
        }
        outcome
    }

    fn library_changed(&mut self) {
        if let Err(err) = self.library.persist() {
            warn!("Failed to save library: {}", err);
            self.session.report(Status::SaveFailed(err.to_string()));
        }
        let tracks = self.library.tracks().to_vec();
        self.session.observer_mut().library_changed(&tracks);
    }

    fn persist_settings(&mut self) {
        if let Err(err) = self.settings_store.save(&self.settings) {
            warn!("Failed to save settings: {}", err);
            self.session.report(Status::SettingsSaveFailed(err.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fake_backend, hit, resolver_for, FakeBackend, RecordingObserver, Reply, ScriptedCatalog};
    use library::LibraryStore;
    use std::fs;
    use std::sync::Arc;
    use tempfile::{tempdir, TempDir};

    fn app_with(catalog: ScriptedCatalog) -> (TempDir, App<FakeBackend>, RecordingObserver) {
        let dir = tempdir().unwrap();
        let library = Library::open(dir.path().join("library.json"));
        let settings = SettingsStore::new(dir.path().join("settings.json"));
        let (backend, _calls) = fake_backend();
        let observer = RecordingObserver::default();
        let app = App::new(
            library,
            settings,
            vec!["mp3".to_string()],
            backend,
            resolver_for(&Arc::new(catalog)),
        )
        .with_observer(Box::new(observer.clone()));
        (dir, app, observer)
    }

    async fn next(app: &mut App<FakeBackend>) -> LookupCompletion {
        tokio::time::timeout(Duration::from_secs(5), app.next_completion())
            .await
            .expect("lookup did not finish")
            .expect("channel closed")
    }

    #[tokio::test]
    async fn play_selected_resolves_and_saves() {
        let catalog = ScriptedCatalog::default().with("a", hit(Some("Y"), None, Some("u")));
        let (dir, mut app, observer) = app_with(catalog);
        app.add_files(&["/music/a.mp3"]);

        assert!(app.select(0).is_some());
        assert!(app.play_selected());
        let completion = next(&mut app).await;
        assert_eq!(
            app.handle_completion(completion),
            CompletionOutcome::Merged { persisted: true }
        );

        let saved = LibraryStore::new(dir.path().join("library.json")).load();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].artist, "Y");
        assert!(saved[0].resolved);
        assert_eq!(app.session().status(), &Status::InfoLoaded);
        assert!(*observer.library_updates.lock() >= 2);
    }

    #[tokio::test]
    async fn nothing_selected_means_nothing_plays() {
        let (_dir, mut app, _observer) = app_with(ScriptedCatalog::default());
        assert!(app.select(3).is_none());
        assert!(!app.play_selected());
        assert!(!app.resume_selected());
        assert_eq!(app.open_editor().unwrap_err(), EditorError::NoSelection);
    }

    #[tokio::test]
    async fn editor_save_persists_and_refreshes_the_view() {
        let (dir, mut app, _observer) = app_with(ScriptedCatalog::default());
        app.add_files(&["/music/a.mp3"]);
        app.select(0);

        {
            let editor = app.open_editor().unwrap();
            editor.draft_mut().title = "New".to_string();
            editor.draft_mut().artist = "Me".to_string();
        }
        assert_eq!(app.open_editor().unwrap_err(), EditorError::AlreadyOpen);

        let commit = app.save_editor().unwrap();
        assert_eq!(commit.file_path, "/music/a.mp3");
        assert!(app.editor().is_none());

        let view = app.session().now_playing().unwrap();
        assert_eq!(view.title, "New");
        assert_eq!(view.artist, "Me");

        let saved = LibraryStore::new(dir.path().join("library.json")).load();
        assert_eq!(saved[0].title, "New");
        assert!(saved[0].resolved);
        assert_eq!(app.save_editor().unwrap_err(), EditorError::NotOpen);
    }

    #[tokio::test]
    async fn cancelled_editor_changes_nothing() {
        let (_dir, mut app, _observer) = app_with(ScriptedCatalog::default());
        app.add_files(&["/music/a.mp3"]);
        app.select(0);
        let before = app.selected().unwrap().clone();

        app.open_editor().unwrap().draft_mut().album = "Other".to_string();
        assert!(app.cancel_editor());
        assert_eq!(app.selected().unwrap(), &before);
    }

    #[tokio::test]
    async fn removing_the_track_under_lookup_discards_the_result() {
        let catalog = ScriptedCatalog::default().with("a", Reply::Hang);
        let (_dir, mut app, _observer) = app_with(catalog);
        app.add_files(&["/music/a.mp3", "/music/b.mp3"]);
        app.select(0);
        app.play_selected();
        assert_eq!(app.session().pending_lookup(), Some("/music/a.mp3"));

        let removed = app.remove_selected().unwrap();
        assert_eq!(removed.file_path, "/music/a.mp3");
        assert_eq!(app.session().pending_lookup(), None);
        assert_eq!(app.library().len(), 1);
        assert!(app.selected().is_none());
    }

    #[tokio::test]
    async fn folders_are_saved_and_scanned() {
        let (dir, mut app, _observer) = app_with(ScriptedCatalog::default());
        let folder = dir.path().join("F");
        fs::create_dir_all(folder.join("sub")).unwrap();
        fs::write(folder.join("a.mp3"), b"x").unwrap();
        fs::write(folder.join("sub").join("b.MP3"), b"x").unwrap();
        fs::write(folder.join("notes.txt"), b"x").unwrap();
        let folder_str = folder.to_string_lossy().to_string();

        assert!(app.add_folder(&folder_str));
        assert!(!app.add_folder(&folder_str));
        let saved = SettingsStore::new(dir.path().join("settings.json")).load();
        assert_eq!(saved.music_folders, vec![folder_str.clone()]);

        assert_eq!(app.scan(), ScanReport { found: 2, added: 2 });
        assert_eq!(app.scan(), ScanReport { found: 2, added: 0 });
        assert_eq!(app.library().len(), 2);

        assert!(app.remove_folder(&folder_str));
        assert!(!app.remove_folder(&folder_str));
        assert_eq!(app.scan(), ScanReport { found: 0, added: 0 });
    }

    #[tokio::test]
    async fn save_failure_is_reported_not_fatal() {
        let dir = tempdir().unwrap();
        let library = Library::open(dir.path().to_path_buf());
        let settings = SettingsStore::new(dir.path().join("settings.json"));
        let (backend, _calls) = fake_backend();
        let mut app = App::new(
            library,
            settings,
            vec!["mp3".to_string()],
            backend,
            resolver_for(&Arc::new(ScriptedCatalog::default())),
        );

        assert_eq!(app.add_files(&["/music/a.mp3"]), 1);
        assert_eq!(app.library().len(), 1);
        assert!(matches!(app.session().status(), Status::SaveFailed(_)));
    }

    #[tokio::test]
    async fn removing_the_playing_track_clears_the_widget_and_view() {
        let (_dir, mut app, _observer) = app_with(ScriptedCatalog::default());
        app.add_files(&["/music/a.mp3", "/music/b.mp3"]);
        app.select(0);
        app.play_selected();
        assert_eq!(app.session().loaded_path(), Some("/music/a.mp3"));

        app.remove_selected().unwrap();
        assert_eq!(app.session().loaded_path(), None);
        assert!(app.session().now_playing().is_none());
        assert_eq!(app.session().progress(), None);
        assert_eq!(app.session().status(), &Status::Stopped);
    }

    #[tokio::test]
    async fn removing_another_track_keeps_playback() {
        let (_dir, mut app, _observer) = app_with(ScriptedCatalog::default());
        app.add_files(&["/music/a.mp3", "/music/b.mp3"]);
        app.select(0);
        app.play_selected();
        app.select(1);

        app.remove_selected().unwrap();
        assert_eq!(app.session().loaded_path(), Some("/music/a.mp3"));
        assert!(app.session().now_playing().is_none());
    }

    #[tokio::test]
    async fn settings_save_failure_is_reported() {
        let dir = tempdir().unwrap();
        let library = Library::open(dir.path().join("library.json"));
        let settings = SettingsStore::new(dir.path().to_path_buf());
        let (backend, _calls) = fake_backend();
        let mut app = App::new(
            library,
            settings,
            vec!["mp3".to_string()],
            backend,
            resolver_for(&Arc::new(ScriptedCatalog::default())),
        );

        assert!(app.add_folder("/music"));
        assert_eq!(app.settings().music_folders, vec!["/music".to_string()]);
        assert!(matches!(
            app.session().status(),
            Status::SettingsSaveFailed(_)
        ));
    }

    #[tokio::test]
    async fn reload_drops_selection_of_vanished_tracks() {
        let (dir, mut app, _observer) = app_with(ScriptedCatalog::default());
        app.add_files(&["/music/a.mp3"]);
        app.select(0);
        fs::write(dir.path().join("library.json"), b"[]").unwrap();

        app.reload();
        assert!(app.library().is_empty());
        assert!(app.selected().is_none());
    }
}
