pub mod app;
pub mod backend;
pub mod config;
pub mod console;
pub mod editor;
pub mod session;
pub mod state;

#[cfg(test)]
mod testing;

pub use app::{App, ScanReport};
pub use backend::{HeadlessBackend, PlaybackBackend, PlaybackError};
pub use editor::{EditCommit, EditorError, EditorSession, TrackDraft};
pub use session::{CompletionOutcome, LookupCompletion, PlaybackSession};
pub use state::{format_clock, NowPlaying, Progress, SessionObserver, SessionState, Status};
