//! Song timeline assembled from every track of a MIDI file.

use super::cursor::ByteCursor;
use super::error::MidiError;
use super::note::Note;
use super::parser::{ParsedTrack, SmfHeader, TrackParser};
use super::tempo::TempoMap;
use super::{HIGHEST_PIANO_KEY, LOWEST_PIANO_KEY};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// The parsed song: notes in start order plus the total duration.
///
/// Built once per file load and never mutated afterwards. An empty timeline
/// is valid; playback of it is a no-op.
#[derive(Debug, Clone, Serialize)]
pub struct Timeline {
    /// Notes sorted by start time. Ties keep file encounter order.
    notes: Vec<Note>,

    /// Latest note end, or 0 for an empty timeline.
    total_duration: f64,

    #[serde(skip)]
    header: Option<SmfHeader>,

    #[serde(skip)]
    tempo_map: Option<TempoMap>,
}

impl Default for Timeline {
    fn default() -> Self {
        Self::empty()
    }
}

impl Timeline {
    /// A timeline with no notes.
    pub fn empty() -> Self {
        Self {
            notes: Vec::new(),
            total_duration: 0.0,
            header: None,
            tempo_map: None,
        }
    }

    /// Builds a timeline directly from notes, sorting them by start time.
    pub fn from_notes(mut notes: Vec<Note>) -> Self {
        notes.sort_by(|a, b| a.start.total_cmp(&b.start));
        let total_duration = notes.iter().map(|n| n.end).fold(0.0, f64::max);
        Self {
            notes,
            total_duration,
            header: None,
            tempo_map: None,
        }
    }

    /// Reads and parses a Standard MIDI File from disk.
    ///
    /// # Errors
    ///
    /// Returns [`MidiError::Io`] if the file cannot be read, or any parse
    /// error from [`Timeline::from_bytes`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, MidiError> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|source| MidiError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let timeline = Self::from_bytes(&data)?;
        tracing::info!(
            "Loaded {:?}: {} notes, {:.1}s",
            path,
            timeline.len(),
            timeline.total_duration()
        );
        Ok(timeline)
    }

    /// Parses a complete Standard MIDI File.
    ///
    /// All tracks are merged regardless of SMF format. Notes outside the
    /// 88-key range (21-108) are dropped.
    pub fn from_bytes(data: &[u8]) -> Result<Self, MidiError> {
        let mut cursor = ByteCursor::new(data);
        let header = SmfHeader::read(&mut cursor)?;

        let mut tracks: Vec<ParsedTrack> = Vec::with_capacity(header.track_count as usize);
        for index in 0..header.track_count as usize {
            let track = TrackParser::from_chunk(&mut cursor, index)?.parse()?;
            tracks.push(track);
        }

        let tempo_map = TempoMap::new(
            header.ticks_per_quarter,
            tracks
                .iter()
                .flat_map(|t| t.tempo_changes.iter().copied()),
        );

        let raw_count: usize = tracks.iter().map(|t| t.notes.len()).sum();
        let notes: Vec<Note> = tracks
            .iter()
            .flat_map(|t| t.notes.iter())
            .filter(|raw| (LOWEST_PIANO_KEY..=HIGHEST_PIANO_KEY).contains(&raw.pitch))
            .map(|raw| Note {
                pitch: raw.pitch,
                velocity: raw.velocity,
                start: tempo_map.ticks_to_seconds(raw.start_tick),
                end: tempo_map.ticks_to_seconds(raw.end_tick),
            })
            .collect();

        tracing::debug!(
            format = header.format,
            tracks = header.track_count,
            division = header.ticks_per_quarter,
            tempo_changes = tempo_map.len(),
            paired = raw_count,
            kept = notes.len(),
            "Parsed MIDI file"
        );

        let mut timeline = Self::from_notes(notes);
        timeline.header = Some(header);
        timeline.tempo_map = Some(tempo_map);
        Ok(timeline)
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Total duration in seconds (latest note end).
    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    /// Header of the source file, if the timeline was parsed from one.
    pub fn header(&self) -> Option<&SmfHeader> {
        self.header.as_ref()
    }

    /// Tempo map of the source file, if the timeline was parsed from one.
    pub fn tempo_map(&self) -> Option<&TempoMap> {
        self.tempo_map.as_ref()
    }

    /// Index of the first note starting at or after `seconds`.
    ///
    /// Returns `len()` when every note starts earlier.
    pub fn first_index_at_or_after(&self, seconds: f64) -> usize {
        self.notes.partition_point(|n| n.start < seconds)
    }

    /// Notes overlapping the song-time window `[from, to)`.
    pub fn visible_notes(&self, from: f64, to: f64) -> impl Iterator<Item = &Note> {
        // Nothing starting at or after `to` can be visible
        let end = self.first_index_at_or_after(to);
        self.notes[..end].iter().filter(move |n| n.overlaps(from, to))
    }

    /// Pitches sounding at `seconds`, with the number of notes holding each.
    pub fn active_pitches(&self, seconds: f64) -> [u8; 128] {
        let mut counts = [0u8; 128];
        let end = self.notes.partition_point(|n| n.start <= seconds);
        for note in self.notes[..end].iter().filter(|n| n.is_active_at(seconds)) {
            let count = &mut counts[note.pitch as usize];
            *count = count.saturating_add(1);
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::fixtures::{smf, tempo_event};

    #[test]
    fn test_empty_file() {
        let bytes = smf(1, 480, &[vec![0x00, 0xFF, 0x2F, 0x00]]);
        let timeline = Timeline::from_bytes(&bytes).unwrap();
        assert!(timeline.is_empty());
        assert_eq!(timeline.total_duration(), 0.0);
        assert_eq!(timeline.header().unwrap().track_count, 1);
    }

    #[test]
    fn test_zero_tracks() {
        let bytes = smf(1, 480, &[]);
        let timeline = Timeline::from_bytes(&bytes).unwrap();
        assert!(timeline.is_empty());
    }

    #[test]
    fn test_tracks_merged_and_sorted() {
        let conductor = tempo_event(0, 1_000_000);
        let melody = vec![
            0x83, 0x60, 0x90, 64, 100, // on E4 at 480
            0x83, 0x60, 0x80, 64, 0, // off at 960
        ];
        let bass = vec![
            0x00, 0x90, 36, 80, // on C2 at 0
            0x87, 0x40, 0x80, 36, 0, // off at 960
        ];
        let bytes = smf(1, 480, &[conductor, melody, bass]);
        let timeline = Timeline::from_bytes(&bytes).unwrap();

        let notes = timeline.notes();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].pitch, 36);
        assert_eq!((notes[0].start, notes[0].end), (0.0, 2.0));
        assert_eq!(notes[1].pitch, 64);
        assert_eq!((notes[1].start, notes[1].end), (1.0, 2.0));
        assert_eq!(timeline.total_duration(), 2.0);
    }

    #[test]
    fn test_out_of_range_pitches_dropped() {
        let track = vec![
            0x00, 0x90, 20, 100, 0x00, 0x90, 21, 100, 0x00, 0x90, 108, 100, 0x00, 0x90, 109,
            100, 0x60, 0x80, 20, 0, 0x00, 0x80, 21, 0, 0x00, 0x80, 108, 0, 0x00, 0x80, 109, 0,
        ];
        let bytes = smf(0, 96, &[track]);
        let timeline = Timeline::from_bytes(&bytes).unwrap();
        let pitches: Vec<u8> = timeline.notes().iter().map(|n| n.pitch).collect();
        assert_eq!(pitches, vec![21, 108]);
    }

    #[test]
    fn test_ties_keep_encounter_order() {
        let track = vec![
            0x00, 0x90, 72, 1, 0x00, 0x90, 60, 2, 0x00, 0x90, 67, 3, 0x60, 0x80, 60, 0, 0x00,
            0x80, 67, 0, 0x00, 0x80, 72, 0,
        ];
        let bytes = smf(0, 96, &[track]);
        let timeline = Timeline::from_bytes(&bytes).unwrap();
        // All start at 0; encounter order is the order the offs closed them
        let pitches: Vec<u8> = timeline.notes().iter().map(|n| n.pitch).collect();
        assert_eq!(pitches, vec![60, 67, 72]);
    }

    #[test]
    fn test_tempo_change_in_later_track_applies_globally() {
        let melody = vec![0x00, 0x90, 60, 90, 0x81, 0x40, 0x80, 60, 0];
        let tempo = tempo_event(0, 250_000);
        let bytes = smf(1, 192, &[melody, tempo]);
        let timeline = Timeline::from_bytes(&bytes).unwrap();
        assert_eq!(timeline.notes()[0].end, 0.25);
    }

    #[test]
    fn test_missing_track_is_truncated() {
        let bytes = smf(1, 480, &[vec![0x00, 0xFF, 0x2F, 0x00]]);
        let mut patched = bytes.clone();
        // Claim two tracks while only one is present
        patched[11] = 2;
        assert!(matches!(
            Timeline::from_bytes(&patched),
            Err(MidiError::TruncatedStream { .. })
        ));
    }

    #[test]
    fn test_bad_header() {
        assert!(matches!(
            Timeline::from_bytes(b"MTrk\x00\x00\x00\x00"),
            Err(MidiError::BadHeader { .. })
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Timeline::load("/nonexistent/dir/song.mid").unwrap_err();
        assert!(matches!(err, MidiError::Io { .. }));
        assert!(err.to_string().contains("song.mid"));
    }

    #[test]
    fn test_first_index_and_active_pitches() {
        let timeline = Timeline::from_notes(vec![
            Note {
                pitch: 60,
                velocity: 90,
                start: 0.0,
                end: 1.0,
            },
            Note {
                pitch: 64,
                velocity: 90,
                start: 0.5,
                end: 1.5,
            },
            Note {
                pitch: 60,
                velocity: 90,
                start: 0.75,
                end: 2.0,
            },
        ]);
        assert_eq!(timeline.first_index_at_or_after(0.0), 0);
        assert_eq!(timeline.first_index_at_or_after(0.5), 1);
        assert_eq!(timeline.first_index_at_or_after(0.6), 2);
        assert_eq!(timeline.first_index_at_or_after(5.0), 3);

        let active = timeline.active_pitches(0.8);
        assert_eq!(active[60], 2);
        assert_eq!(active[64], 1);
        assert_eq!(timeline.active_pitches(1.6)[64], 0);

        let visible: Vec<f64> = timeline.visible_notes(1.2, 1.4).map(|n| n.start).collect();
        assert_eq!(visible, vec![0.5, 0.75]);
    }

    #[test]
    fn test_matches_independent_encoder() {
        use midly::num::{u15, u24, u28, u4, u7};
        use midly::{
            Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind,
        };

        let on = |delta: u32, key: u8, vel: u8| TrackEvent {
            delta: u28::new(delta),
            kind: TrackEventKind::Midi {
                channel: u4::new(0),
                message: MidiMessage::NoteOn {
                    key: u7::new(key),
                    vel: u7::new(vel),
                },
            },
        };
        let tempo = TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(600_000))),
        };
        let end = TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        };

        let smf = Smf {
            header: Header::new(Format::Parallel, Timing::Metrical(u15::new(960))),
            tracks: vec![
                vec![tempo, end],
                vec![
                    on(0, 60, 100),
                    on(0, 64, 90),
                    on(960, 60, 0),
                    on(480, 64, 0),
                    on(0, 67, 70),
                    on(1920, 67, 0),
                    end,
                ],
            ],
        };
        let mut bytes = Vec::new();
        smf.write_std(&mut bytes).unwrap();

        let timeline = Timeline::from_bytes(&bytes).unwrap();
        let summary: Vec<(u8, f64, f64, u8)> = timeline
            .notes()
            .iter()
            .map(|n| (n.pitch, n.start, n.end, n.velocity))
            .collect();
        assert_eq!(
            summary,
            vec![
                (60, 0.0, 0.6, 100),
                (64, 0.0, 0.9, 90),
                (67, 0.9, 2.1, 70)
            ]
        );
        assert_eq!(timeline.total_duration(), 2.1);
    }

    #[test]
    fn test_track_overrunning_its_length_keeps_notes() {
        let first = vec![
            0x00, 0x90, 60, 100, 0x83, 0x60, 0x80, 60, 0, // C4, 0-480
            0x00, 0xFF, 0x01, 0x05, b'a', b'b', b'c', b'd', // one byte short
        ];
        let second = vec![0x00, 0x90, 64, 90, 0x83, 0x60, 0x80, 64, 0];
        let bytes = smf(1, 480, &[first, second]);
        let timeline = Timeline::from_bytes(&bytes).unwrap();

        let pitches: Vec<u8> = timeline.notes().iter().map(|n| n.pitch).collect();
        assert_eq!(pitches, vec![60, 64]);
        assert_eq!(timeline.total_duration(), 0.5);
    }
}
