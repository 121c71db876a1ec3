//! Timed note representation.
//!
//! A note is a single note-on/note-off pair resolved to seconds through the
//! file's tempo map. Notes are immutable once the timeline is built.

use super::{LOWEST_PIANO_KEY, PIANO_KEY_COUNT};
use serde::Serialize;

/// A note on the playback timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Note {
    /// MIDI note number, within the 88-key range (21-108).
    pub pitch: u8,

    /// Note velocity (1-127), taken from the note-on.
    pub velocity: u8,

    /// Start time in seconds from the beginning of the song.
    pub start: f64,

    /// End time in seconds. Never earlier than `start`.
    pub end: f64,
}

impl Note {
    /// Length of the note in song seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Checks if this note is sounding at a given song time.
    ///
    /// Zero-length notes count as sounding at their start instant.
    pub fn is_active_at(&self, seconds: f64) -> bool {
        seconds >= self.start && (seconds < self.end || seconds == self.start)
    }

    /// Checks if this note overlaps the song-time range `[from, to)`.
    pub fn overlaps(&self, from: f64, to: f64) -> bool {
        self.start < to && self.end >= from
    }

    /// Position of the pitch across the keyboard: 0.0 for A0, 1.0 for C8.
    pub fn keyboard_position(&self) -> f64 {
        keyboard_position(self.pitch)
    }
}

/// Position of a pitch across the 88-key keyboard, 0.0 (A0) to 1.0 (C8).
pub fn keyboard_position(pitch: u8) -> f64 {
    (pitch as f64 - LOWEST_PIANO_KEY as f64) / (PIANO_KEY_COUNT - 1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(start: f64, end: f64) -> Note {
        Note {
            pitch: 60,
            velocity: 100,
            start,
            end,
        }
    }

    #[test]
    fn test_note_active() {
        let n = note(1.0, 2.0);
        assert!(!n.is_active_at(0.99));
        assert!(n.is_active_at(1.0));
        assert!(n.is_active_at(1.5));
        assert!(!n.is_active_at(2.0));
    }

    #[test]
    fn test_zero_length_note_active_at_start() {
        let n = note(3.0, 3.0);
        assert!(n.is_active_at(3.0));
        assert!(!n.is_active_at(3.1));
        assert_eq!(n.duration(), 0.0);
    }

    #[test]
    fn test_note_overlap() {
        let n = note(1.0, 3.0);
        assert!(n.overlaps(0.0, 1.5));
        assert!(n.overlaps(2.0, 4.0));
        assert!(!n.overlaps(0.0, 1.0));
        assert!(!n.overlaps(3.5, 4.0));
    }

    #[test]
    fn test_keyboard_position() {
        assert_eq!(keyboard_position(21), 0.0);
        assert_eq!(keyboard_position(108), 1.0);
    }
}
