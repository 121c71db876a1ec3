//! Standard MIDI File chunk and event decoding.
//!
//! Decodes the `MThd` header and each `MTrk` chunk into raw note pairs and
//! tempo changes. Only Note-On/Note-Off and Set-Tempo carry meaning here;
//! every other event is skipped by its encoded width.

use super::cursor::ByteCursor;
use super::error::MidiError;
use super::tempo::TempoChange;
use std::collections::{HashMap, VecDeque};

/// Meta event status byte.
const META: u8 = 0xFF;
/// Set-Tempo meta event type.
const META_SET_TEMPO: u8 = 0x51;
/// System-exclusive status bytes.
const SYSEX: u8 = 0xF0;
const SYSEX_ESCAPE: u8 = 0xF7;

const NOTE_OFF: u8 = 0x80;
const NOTE_ON: u8 = 0x90;
const PROGRAM_CHANGE: u8 = 0xC0;
const CHANNEL_PRESSURE: u8 = 0xD0;

/// Fields of the `MThd` chunk that playback cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmfHeader {
    /// SMF format (0, 1 or 2). Informational only; all tracks are merged.
    pub format: u16,
    /// Number of track chunks declared by the header.
    pub track_count: u16,
    /// Ticks per quarter note.
    pub ticks_per_quarter: u16,
}

impl SmfHeader {
    /// Reads the header chunk, skipping any bytes beyond the six we use.
    pub fn read(cursor: &mut ByteCursor<'_>) -> Result<Self, MidiError> {
        let tag = cursor.read_fixed_string(4)?;
        if tag != "MThd" {
            return Err(MidiError::BadHeader { found: tag });
        }

        let length = cursor.read_u32()? as usize;
        if length < 6 {
            return Err(MidiError::BadHeader { found: tag });
        }

        let format = cursor.read_u16()?;
        let track_count = cursor.read_u16()?;
        let division = cursor.read_u16()?;
        cursor.skip(length - 6)?;

        // High bit set means SMPTE frames/ticks-per-frame timing
        if division & 0x8000 != 0 || division == 0 {
            return Err(MidiError::UnsupportedDivision(division));
        }

        Ok(Self {
            format,
            track_count,
            ticks_per_quarter: division,
        })
    }
}

/// A note-on/note-off pair in tick time, before tempo conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawNote {
    pub pitch: u8,
    pub start_tick: u64,
    pub end_tick: u64,
    pub velocity: u8,
}

/// A note-on still waiting for its note-off.
#[derive(Debug, Clone, Copy)]
struct PendingNoteOn {
    tick: u64,
    velocity: u8,
}

/// Everything extracted from a single track chunk.
#[derive(Debug, Default, Clone)]
pub struct ParsedTrack {
    pub notes: Vec<RawNote>,
    pub tempo_changes: Vec<TempoChange>,
    /// Note-ons that never received a note-off (dropped).
    pub unmatched_note_ons: usize,
    /// Note-offs with no queued note-on for their pitch (discarded).
    pub orphan_note_offs: usize,
}

/// Decoder state for one `MTrk` chunk.
///
/// Running status and the pending note-on queues live here, so they never
/// leak from one track into the next.
pub struct TrackParser<'a> {
    /// Reads may run to the end of the file; only `end` bounds the loop.
    cursor: ByteCursor<'a>,
    /// Absolute offset where the track's declared length ends.
    end: usize,
    index: usize,
    tick: u64,
    running_status: Option<u8>,
    /// Unmatched note-ons per pitch, oldest first.
    pending: HashMap<u8, VecDeque<PendingNoteOn>>,
    out: ParsedTrack,
}

impl<'a> TrackParser<'a> {
    /// Reads the `MTrk` tag and length, and prepares to decode the events
    /// inside that length. The outer cursor is moved to the declared end of
    /// the chunk (or the end of the file, if the length overshoots it).
    ///
    /// # Arguments
    ///
    /// * `cursor` - Cursor positioned at the start of the chunk
    /// * `index` - Track number, used in error messages
    pub fn from_chunk(cursor: &mut ByteCursor<'a>, index: usize) -> Result<Self, MidiError> {
        let tag = cursor.read_fixed_string(4)?;
        if tag != "MTrk" {
            return Err(MidiError::BadTrackHeader { index, found: tag });
        }
        let length = cursor.read_u32()? as usize;
        let body = cursor.clone();
        let end = body.position() + length;
        cursor.advance(length);
        Ok(Self::with_end(body, end, index))
    }

    /// Creates a parser for a track running to the end of `body`.
    pub fn new(body: ByteCursor<'a>, index: usize) -> Self {
        let end = body.position() + body.remaining();
        Self::with_end(body, end, index)
    }

    fn with_end(cursor: ByteCursor<'a>, end: usize, index: usize) -> Self {
        Self {
            cursor,
            end,
            index,
            tick: 0,
            running_status: None,
            pending: HashMap::new(),
            out: ParsedTrack::default(),
        }
    }

    /// Decodes every event in the track.
    pub fn parse(mut self) -> Result<ParsedTrack, MidiError> {
        while self.cursor.position() < self.end {
            self.read_event()?;
        }
        if self.cursor.position() > self.end {
            tracing::debug!(
                track = self.index,
                overrun = self.cursor.position() - self.end,
                "Last event ran past the declared track length"
            );
        }

        self.out.unmatched_note_ons = self.pending.values().map(VecDeque::len).sum();
        if self.out.unmatched_note_ons > 0 || self.out.orphan_note_offs > 0 {
            tracing::debug!(
                track = self.index,
                unmatched_note_ons = self.out.unmatched_note_ons,
                orphan_note_offs = self.out.orphan_note_offs,
                "Discarded unpaired note events"
            );
        }
        Ok(self.out)
    }

    fn read_event(&mut self) -> Result<(), MidiError> {
        self.tick += self.cursor.read_var_len()? as u64;

        let offset = self.cursor.position();
        let mut status = self.cursor.read_u8()?;
        if status < 0x80 {
            // Running status: this byte is the first data byte of an event
            // that reuses the previous status.
            status = self.running_status.ok_or(MidiError::RunningStatusMissing {
                track: self.index,
                offset,
                byte: status,
            })?;
            self.cursor.rewind_one();
        } else {
            self.running_status = Some(status);
        }

        match status {
            META => self.read_meta(),
            SYSEX | SYSEX_ESCAPE => {
                let length = self.cursor.read_var_len()? as usize;
                self.cursor.skip(length)
            }
            _ => self.read_channel_event(status),
        }
    }

    fn read_meta(&mut self) -> Result<(), MidiError> {
        let kind = self.cursor.read_u8()?;
        let length = self.cursor.read_var_len()? as usize;

        if kind == META_SET_TEMPO && length == 3 {
            let micros_per_quarter = self.cursor.read_u24()?;
            if micros_per_quarter == 0 {
                tracing::warn!(track = self.index, tick = self.tick, "Ignoring zero tempo");
            } else {
                self.out.tempo_changes.push(TempoChange {
                    tick: self.tick,
                    micros_per_quarter,
                });
            }
            Ok(())
        } else {
            self.cursor.skip(length)
        }
    }

    fn read_channel_event(&mut self, status: u8) -> Result<(), MidiError> {
        let kind = status & 0xF0;
        let data1 = self.cursor.read_u8()?;
        let data2 = if kind == PROGRAM_CHANGE || kind == CHANNEL_PRESSURE {
            0
        } else {
            self.cursor.read_u8()?
        };

        match kind {
            NOTE_ON if data2 > 0 => {
                self.pending
                    .entry(data1)
                    .or_default()
                    .push_back(PendingNoteOn {
                        tick: self.tick,
                        velocity: data2,
                    });
            }
            NOTE_ON | NOTE_OFF => self.close_note(data1),
            _ => {}
        }
        Ok(())
    }

    /// Pairs a note-off with the oldest unmatched note-on of the same pitch.
    fn close_note(&mut self, pitch: u8) {
        match self.pending.get_mut(&pitch).and_then(VecDeque::pop_front) {
            Some(on) => self.out.notes.push(RawNote {
                pitch,
                start_tick: on.tick,
                end_tick: self.tick,
                velocity: on.velocity,
            }),
            None => self.out.orphan_note_offs += 1,
        }
    }
}
