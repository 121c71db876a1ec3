//! Interfaces to the collaborators that consume the schedule.

use std::path::PathBuf;
use thiserror::Error;

/// A note handed to the renderer, timed on the renderer's own clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledNote {
    pub pitch: u8,
    pub velocity: u8,
    /// Sounding length in renderer seconds (already divided by speed).
    pub duration: f64,
    /// Renderer-clock time at which the note should start.
    pub deadline: f64,
}

/// Errors raised while bringing a renderer up.
#[derive(Debug, Error)]
pub enum RendererError {
    /// No SoundFont was configured.
    #[error("no SoundFont configured (use --soundfont PATH)")]
    NoSoundFont,

    /// The SoundFont file could not be opened.
    #[error("failed to open SoundFont {}: {source}", path.display())]
    SoundFontOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The SoundFont could not be parsed.
    #[error("failed to load SoundFont {}: {reason}", path.display())]
    SoundFontInvalid { path: PathBuf, reason: String },

    /// The synthesizer rejected its settings.
    #[error("failed to create synthesizer: {0}")]
    Synthesizer(String),

    /// No audio output device could be opened.
    #[error("failed to open audio output: {0}")]
    Output(String),
}

/// Something that can sound scheduled notes.
///
/// Dispatch is fire-and-forget: the renderer owns timing once it has the
/// deadline. Each dispatch returns a handle that can silence that voice.
pub trait NoteRenderer {
    type Handle: Copy + std::fmt::Debug;

    /// Loads whatever the renderer needs before the first note.
    /// Called once, before the first successful start.
    fn prepare(&mut self) -> Result<(), RendererError>;

    /// Current time on the renderer's clock, in seconds.
    fn current_time(&self) -> f64;

    fn dispatch(&mut self, note: ScheduledNote) -> Self::Handle;

    /// Silences a dispatched voice. Stopping an already finished or stopped
    /// voice does nothing.
    fn stop(&mut self, handle: Self::Handle);
}

/// Receives the song position on every visual tick.
///
/// The timeline itself is read through the session's `timeline()`.
pub trait VisualSink {
    fn song_time(&mut self, seconds: f64);
}

impl VisualSink for () {
    fn song_time(&mut self, _seconds: f64) {}
}
