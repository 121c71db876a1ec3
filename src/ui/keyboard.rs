//! 88-key keyboard display.
//!
//! Draws every key from A0 to C8 across the full width. Keys held by a
//! sounding note take the note's bar colour, so falling bars visibly land.

use super::{key_columns, pitch_color};
use crate::app::App;
use crate::midi::{is_black_key, HIGHEST_PIANO_KEY, LOWEST_PIANO_KEY};
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

/// Style of one key cell.
///
/// The top rows show black keys as black; the bottom row is the white-key
/// front edge, so black keys there blend into their white neighbours.
fn key_style(pitch: u8, active: bool, front_edge: bool) -> Style {
    if active {
        return Style::default().bg(pitch_color(pitch, 0.7));
    }
    if is_black_key(pitch) && !front_edge {
        Style::default().bg(Color::Black)
    } else {
        Style::default().bg(Color::White)
    }
}

/// Renders the keyboard with sounding keys highlighted.
///
/// # Arguments
///
/// * `frame` - The frame to render to
/// * `area` - The area to render in
/// * `app` - Application state
pub fn render_keyboard(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .title(" Keyboard ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let active = app
        .session()
        .timeline()
        .active_pitches(app.view().song_time());

    for row in 0..inner.height {
        let front_edge = row + 1 == inner.height && inner.height > 1;
        let mut spans: Vec<Span> = Vec::with_capacity(inner.width as usize);
        for pitch in LOWEST_PIANO_KEY..=HIGHEST_PIANO_KEY {
            let Some((start, end)) = key_columns(pitch, inner.width) else {
                continue;
            };
            let width = (end - start) as usize;
            let style = key_style(pitch, active[pitch as usize] > 0, front_edge);
            // Mark each C on the front edge so octaves are easy to find
            let span = if front_edge && pitch % 12 == 0 {
                Span::styled(format!("c{}", " ".repeat(width - 1)), style.fg(Color::DarkGray))
            } else {
                Span::styled(" ".repeat(width), style)
            };
            spans.push(span);
        }
        frame.render_widget(
            Paragraph::new(Line::from(spans)),
            Rect::new(inner.x, inner.y + row, inner.width, 1),
        );
    }
}
