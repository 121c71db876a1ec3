//! Errors produced while loading a Standard MIDI File.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a MIDI load.
///
/// Every variant is fatal to the current parse: no partial timeline is
/// produced once one of these is returned.
#[derive(Debug, Error)]
pub enum MidiError {
    /// The file does not start with an `MThd` chunk.
    #[error("not a Standard MIDI File (expected MThd, found {found:?})")]
    BadHeader { found: String },

    /// A track chunk does not start with `MTrk`.
    #[error("track {index}: expected MTrk chunk, found {found:?}")]
    BadTrackHeader { index: usize, found: String },

    /// A data byte appeared before any status byte in the track.
    #[error("track {track}: data byte {byte:#04x} at offset {offset} without a running status")]
    RunningStatusMissing { track: usize, offset: usize, byte: u8 },

    /// A read ran past the end of the available bytes.
    #[error("unexpected end of data at offset {offset}: needed {needed} bytes, {remaining} left")]
    TruncatedStream {
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    /// The header uses SMPTE timecode (or zero) instead of ticks per quarter note.
    #[error("unsupported time division {0:#06x}")]
    UnsupportedDivision(u16),

    /// The file could not be read from disk.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
