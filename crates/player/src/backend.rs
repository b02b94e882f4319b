use std::path::Path;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("media not found: {0}")]
    NotFound(String),
    #[error("playback backend error: {0}")]
    Backend(String),
}

/// The media widget that actually renders audio. The session only ever drives
/// it through these calls.
pub trait PlaybackBackend: Send {
    fn open(&mut self, path: &str) -> Result<(), PlaybackError>;
    fn play(&mut self);
    fn pause(&mut self);
    fn stop(&mut self);
    fn seek(&mut self, position: Duration);
    fn set_volume(&mut self, level: f32);
    fn volume(&self) -> f32;
    fn position(&self) -> Duration;
    /// `None` until the media reports a length.
    fn duration(&self) -> Option<Duration>;
}

/// Backend with no audio output: keeps transport state and a wall-clock
/// position so the front end behaves like a real player.
#[derive(Debug)]
pub struct HeadlessBackend {
    source: Option<String>,
    playing_since: Option<Instant>,
    elapsed: Duration,
    volume: f32,
}

impl HeadlessBackend {
    pub fn new(volume: f32) -> Self {
        Self {
            source: None,
            playing_since: None,
            elapsed: Duration::ZERO,
            volume: volume.clamp(0.0, 1.0),
        }
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn is_playing(&self) -> bool {
        self.playing_since.is_some()
    }

    fn settle(&mut self) {
        if let Some(since) = self.playing_since.take() {
            self.elapsed += since.elapsed();
        }
    }
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl PlaybackBackend for HeadlessBackend {
    fn open(&mut self, path: &str) -> Result<(), PlaybackError> {
        if !Path::new(path).is_file() {
            return Err(PlaybackError::NotFound(path.to_string()));
        }
        info!("Opened {:?}", path);
        self.source = Some(path.to_string());
        self.playing_since = None;
        self.elapsed = Duration::ZERO;
        Ok(())
    }

    fn play(&mut self) {
        if self.source.is_some() && self.playing_since.is_none() {
            self.playing_since = Some(Instant::now());
            debug!("play");
        }
    }

    fn pause(&mut self) {
        self.settle();
        debug!("pause");
    }

    fn stop(&mut self) {
        self.playing_since = None;
        self.elapsed = Duration::ZERO;
        debug!("stop");
    }

    fn seek(&mut self, position: Duration) {
        let playing = self.playing_since.is_some();
        self.elapsed = position;
        self.playing_since = if playing { Some(Instant::now()) } else { None };
        debug!(position_ms = position.as_millis() as u64, "seek");
    }

    fn set_volume(&mut self, level: f32) {
        self.volume = level.clamp(0.0, 1.0);
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn position(&self) -> Duration {
        match self.playing_since {
            Some(since) => self.elapsed + since.elapsed(),
            None => self.elapsed,
        }
    }

    fn duration(&self) -> Option<Duration> {
        None
    }
}
