//! Standard MIDI File loading.
//!
//! This module turns raw SMF bytes into a [`Timeline`] of notes timed in
//! seconds: chunk and event decoding, note-on/note-off pairing, and tempo
//! map conversion from ticks to seconds.

mod cursor;
mod error;
mod note;
mod parser;
mod tempo;
mod timeline;

pub use cursor::ByteCursor;
pub use error::MidiError;
pub use note::{keyboard_position, Note};
pub use parser::{ParsedTrack, RawNote, SmfHeader, TrackParser};
pub use tempo::{TempoChange, TempoMap, DEFAULT_MICROS_PER_QUARTER};
pub use timeline::Timeline;

/// Lowest key of a standard 88-key piano (A0).
pub const LOWEST_PIANO_KEY: u8 = 21;

/// Highest key of a standard 88-key piano (C8).
pub const HIGHEST_PIANO_KEY: u8 = 108;

/// Number of keys on a standard piano.
pub const PIANO_KEY_COUNT: usize = (HIGHEST_PIANO_KEY - LOWEST_PIANO_KEY + 1) as usize;

/// Standard MIDI note names for display purposes.
/// Maps MIDI note number (0-127) to note name within an octave.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Converts a MIDI note number to a human-readable note name with octave.
///
/// # Examples
///
/// ```
/// use pianofall::midi::note_to_name;
///
/// assert_eq!(note_to_name(60), "C4");
/// assert_eq!(note_to_name(21), "A0");
/// ```
pub fn note_to_name(note: u8) -> String {
    let octave = (note / 12) as i8 - 1; // MIDI octave convention
    let note_index = (note % 12) as usize;
    format!("{}{}", NOTE_NAMES[note_index], octave)
}

/// Returns true for the black keys (sharps) of the keyboard.
pub fn is_black_key(note: u8) -> bool {
    matches!(note % 12, 1 | 3 | 6 | 8 | 10)
}

/// Byte builders for hand-written SMF test data.
#[cfg(test)]
pub(crate) mod fixtures {
    /// Encodes a variable-length quantity, most significant group first.
    pub fn encode_var_len(mut value: u32) -> Vec<u8> {
        let mut groups = vec![(value & 0x7F) as u8];
        value >>= 7;
        while value > 0 {
            groups.push((value & 0x7F) as u8 | 0x80);
            value >>= 7;
        }
        groups.reverse();
        groups
    }

    pub fn header_chunk(format: u16, track_count: u16, division: u16) -> Vec<u8> {
        let mut bytes = b"MThd".to_vec();
        bytes.extend_from_slice(&6u32.to_be_bytes());
        bytes.extend_from_slice(&format.to_be_bytes());
        bytes.extend_from_slice(&track_count.to_be_bytes());
        bytes.extend_from_slice(&division.to_be_bytes());
        bytes
    }

    pub fn track_chunk(body: &[u8]) -> Vec<u8> {
        let mut bytes = b"MTrk".to_vec();
        bytes.extend_from_slice(&(body.len() as u32).to_be_bytes());
        bytes.extend_from_slice(body);
        bytes
    }

    /// A complete file from track bodies.
    pub fn smf(format: u16, division: u16, tracks: &[Vec<u8>]) -> Vec<u8> {
        let mut bytes = header_chunk(format, tracks.len() as u16, division);
        for body in tracks {
            bytes.extend(track_chunk(body));
        }
        bytes
    }

    /// A track body holding a single Set-Tempo event.
    pub fn tempo_event(delta: u32, micros_per_quarter: u32) -> Vec<u8> {
        let mut bytes = encode_var_len(delta);
        bytes.extend_from_slice(&[0xFF, 0x51, 0x03]);
        bytes.extend_from_slice(&micros_per_quarter.to_be_bytes()[1..]);
        bytes
    }

    /// A single-track file with one note per `(pitch, start_tick, end_tick)`.
    pub fn notes_file(division: u16, notes: &[(u8, u32, u32)]) -> Vec<u8> {
        let mut events: Vec<(u32, bool, u8)> = Vec::new();
        for &(pitch, start, end) in notes {
            events.push((start, true, pitch));
            events.push((end, false, pitch));
        }
        // Offs before ons at the same tick so back-to-back notes pair correctly
        events.sort_by_key(|&(tick, is_on, _)| (tick, is_on));

        let mut body = Vec::new();
        let mut last = 0;
        for (tick, is_on, pitch) in events {
            body.extend(encode_var_len(tick - last));
            body.extend_from_slice(&[if is_on { 0x90 } else { 0x80 }, pitch, 100]);
            last = tick;
        }
        smf(0, division, &[body])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_to_name() {
        assert_eq!(note_to_name(60), "C4");
        assert_eq!(note_to_name(69), "A4");
        assert_eq!(note_to_name(21), "A0");
        assert_eq!(note_to_name(108), "C8");
    }

    #[test]
    fn test_black_keys() {
        assert!(is_black_key(61));
        assert!(!is_black_key(60));
        assert!(is_black_key(22));
        assert!(!is_black_key(21));
    }

    #[test]
    fn test_piano_range() {
        assert_eq!(PIANO_KEY_COUNT, 88);
    }

    #[test]
    fn test_fixture_var_len() {
        assert_eq!(fixtures::encode_var_len(0), vec![0x00]);
        assert_eq!(fixtures::encode_var_len(480), vec![0x83, 0x60]);
        assert_eq!(fixtures::encode_var_len(0x0FFF_FFFF), vec![0xFF, 0xFF, 0xFF, 0x7F]);
    }
}
