//! Per-pitch voicing for the piano sound.
//!
//! Low notes are louder and ring longer, velocity follows a steep curve, and
//! the stereo image spreads from bass on the left to treble on the right.

use crate::midi::keyboard_position;

/// Shortest note sent to the synthesizer, in seconds.
pub const MIN_RENDER_SECONDS: f64 = 0.06;

/// Number of stereo positions notes are spread across.
pub const PAN_SLOTS: u8 = 5;

/// MIDI channels per stereo position. Overlapping notes of the same pitch
/// take different channels, so releasing one never silences another.
/// Channel 9 (GM drums) is never used.
const SLOT_CHANNELS: [[u8; 3]; PAN_SLOTS as usize] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [10, 11, 12],
    [13, 14, 15],
];

/// Widest pan applied to the extreme keys (-1.0 is hard left).
const PAN_WIDTH: f64 = 0.9;

/// Largest value `gain` can reach: full velocity on the lowest key.
const MAX_GAIN: f64 = 1.2;

/// How a single note should be sounded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Voicing {
    /// Relative loudness: velocity curve times register compensation.
    pub gain: f64,
    /// MIDI velocity for the synthesizer, derived from `gain`.
    pub velocity: u8,
    /// Sounding length in seconds, including the bass release boost.
    pub duration: f64,
    /// Stereo position, -0.45 (low keys) to 0.45 (high keys).
    pub pan: f64,
}

impl Voicing {
    /// Computes the voicing of a note.
    ///
    /// # Arguments
    ///
    /// * `pitch` - MIDI note number (21-108)
    /// * `velocity` - Note velocity (1-127)
    /// * `duration` - Scheduled length in seconds
    pub fn for_note(pitch: u8, velocity: u8, duration: f64) -> Self {
        let pos = keyboard_position(pitch).clamp(0.0, 1.0);

        let curve = (velocity as f64 / 127.0).powf(1.9).clamp(0.04, 1.0);
        let register = 0.75 + (1.0 - pos) * 0.45;
        let gain = curve * register;

        let release = 0.9 + (1.0 - pos) * 0.8;

        Self {
            gain,
            velocity: gain_to_velocity(gain),
            duration: (duration * release).max(MIN_RENDER_SECONDS),
            pan: (pos - 0.5) * PAN_WIDTH,
        }
    }

    /// Stereo position whose fixed pan is closest to this note's pan.
    pub fn pan_slot(&self) -> u8 {
        let half = PAN_WIDTH / 2.0;
        let slot = (self.pan + half) / PAN_WIDTH * (PAN_SLOTS - 1) as f64;
        slot.round().clamp(0.0, (PAN_SLOTS - 1) as f64) as u8
    }
}

/// SoundFont velocity attenuation is roughly square-law, so the square root
/// of the normalized gain gives a velocity with about that loudness.
fn gain_to_velocity(gain: f64) -> u8 {
    let normalized = (gain / MAX_GAIN).clamp(0.0, 1.0);
    (normalized.sqrt() * 127.0).round().clamp(1.0, 127.0) as u8
}

/// Channels belonging to a stereo position, in order of preference.
pub fn slot_channels(slot: u8) -> &'static [u8] {
    &SLOT_CHANNELS[slot.min(PAN_SLOTS - 1) as usize]
}

/// MIDI pan controller value (0 = left, 64 = center, 127 = right) for the
/// channels of a stereo position.
pub fn slot_pan_value(slot: u8) -> u8 {
    let half = PAN_WIDTH / 2.0;
    let pan = -half + slot.min(PAN_SLOTS - 1) as f64 * PAN_WIDTH / (PAN_SLOTS - 1) as f64;
    (64.0 + pan * 63.0).round().clamp(0.0, 127.0) as u8
}
