//! Terminal user interface components.
//!
//! The screen is a transport bar, the falling-note piano roll, the 88-key
//! keyboard and a line of key hints. Drawing reads the session's timeline
//! and the song time captured by [`RollView`] on the last visual tick.

mod help;
mod keyboard;
mod piano_roll;
mod transport;

use crate::app::App;
use crate::midi::{LOWEST_PIANO_KEY, PIANO_KEY_COUNT};
use crate::playback::VisualSink;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Color;
use ratatui::Frame;

pub use help::render_help_line;
pub use keyboard::render_keyboard;
pub use piano_roll::render_piano_roll;
pub use transport::render_transport;

/// Song position as last reported by the playback session.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RollView {
    song_time: f64,
}

impl RollView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn song_time(&self) -> f64 {
        self.song_time
    }

    /// Moves the view without waiting for a visual tick (used while paused).
    pub fn set_song_time(&mut self, seconds: f64) {
        self.song_time = seconds;
    }
}

impl VisualSink for RollView {
    fn song_time(&mut self, seconds: f64) {
        self.song_time = seconds;
    }
}

/// Columns `[start, end)` occupied by a key when 88 keys share `width`
/// columns. Returns None for pitches off the keyboard and for keys squeezed
/// to zero width.
pub fn key_columns(pitch: u8, width: u16) -> Option<(u16, u16)> {
    let index = pitch.checked_sub(LOWEST_PIANO_KEY)? as u32;
    if index >= PIANO_KEY_COUNT as u32 {
        return None;
    }
    let width = width as u32;
    let keys = PIANO_KEY_COUNT as u32;
    let start = index * width / keys;
    let end = (index + 1) * width / keys;
    (end > start).then_some((start as u16, end as u16))
}

/// Bar colour for a pitch: the hue walks the circle 3.2 degrees per semitone.
///
/// # Arguments
///
/// * `pitch` - MIDI note number
/// * `lightness` - HSL lightness (0.0-1.0); active notes are drawn lighter
pub fn pitch_color(pitch: u8, lightness: f64) -> Color {
    let hue = (pitch as f64 * 3.2) % 360.0;
    let (r, g, b) = hsl_to_rgb(hue, 0.7, lightness);
    Color::Rgb(r, g, b)
}

fn hsl_to_rgb(hue: f64, saturation: f64, lightness: f64) -> (u8, u8, u8) {
    let chroma = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let sector = hue / 60.0;
    let x = chroma * (1.0 - (sector % 2.0 - 1.0).abs());
    let (r, g, b) = match sector as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };
    let m = lightness - chroma / 2.0;
    let to_byte = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    (to_byte(r), to_byte(g), to_byte(b))
}

/// Formats song seconds as `m:ss.s`.
pub fn format_time(seconds: f64) -> String {
    let tenths = (seconds.max(0.0) * 10.0).floor() as u64;
    format!("{}:{:02}.{}", tenths / 600, (tenths / 10) % 60, tenths % 10)
}

/// Renders the complete UI.
///
/// The layout is divided into:
/// - Top: transport bar with file, state, position, speed and volume
/// - Middle: falling-note piano roll
/// - Bottom: keyboard with sounding keys lit, then the key hints
pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Transport
            Constraint::Min(6),    // Piano roll
            Constraint::Length(5), // Keyboard
            Constraint::Length(1), // Key hints
        ])
        .split(frame.area());

    render_transport(frame, chunks[0], app);
    render_piano_roll(frame, chunks[1], app);
    render_keyboard(frame, chunks[2], app);
    render_help_line(frame, chunks[3]);
}
