//! pianofall - A terminal MIDI player with a falling-note piano roll.
//!
//! This library provides the MIDI parser and timeline, the lookahead playback
//! session, the SoundFont renderer and the terminal views.

pub mod app;
pub mod audio;
pub mod config;
pub mod midi;
pub mod playback;
pub mod ui;

// Re-export commonly used types
pub use app::App;
pub use audio::SynthRenderer;
pub use config::PlayerConfig;
pub use midi::{MidiError, Note, Timeline};
pub use playback::{NoteRenderer, PlaybackError, PlaybackSession, PlaybackState};
