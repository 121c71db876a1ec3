//! Falling-note piano roll.
//!
//! Time runs downward: the bottom row is the current song time and the top
//! row is `roll_window_seconds` ahead. Each note is a bar in its key's
//! columns, so bars fall onto the keyboard drawn underneath.

use super::{key_columns, pitch_color};
use crate::app::App;
use crate::midi::{is_black_key, Timeline, HIGHEST_PIANO_KEY, LOWEST_PIANO_KEY};
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

/// Lightness of bars that have not reached the keyboard yet.
const FALLING_LIGHTNESS: f64 = 0.45;
/// Lightness of bars that are sounding now.
const SOUNDING_LIGHTNESS: f64 = 0.7;

/// Computes the colour of every roll cell, row 0 at the top.
///
/// # Arguments
///
/// * `timeline` - The song
/// * `now` - Song time at the bottom edge
/// * `window` - Song seconds covered by the whole height
/// * `width` - Columns available
/// * `height` - Rows available
///
/// # Returns
///
/// `height` rows of `width` cells; `None` where no note is drawn.
fn bar_cells(
    timeline: &Timeline,
    now: f64,
    window: f64,
    width: u16,
    height: u16,
) -> Vec<Vec<Option<Color>>> {
    let mut cells = vec![vec![None; width as usize]; height as usize];
    if width == 0 || height == 0 || window <= 0.0 {
        return cells;
    }
    let row_len = window / height as f64;

    for note in timeline.visible_notes(now, now + window) {
        let Some((start_col, end_col)) = key_columns(note.pitch, width) else {
            continue;
        };
        let lightness = if note.is_active_at(now) {
            SOUNDING_LIGHTNESS
        } else {
            FALLING_LIGHTNESS
        };
        let color = pitch_color(note.pitch, lightness);

        for (row, line) in cells.iter_mut().enumerate() {
            let offset = (height as usize - 1 - row) as f64;
            let from = now + offset * row_len;
            let to = from + row_len;
            if note.overlaps(from, to) {
                for cell in &mut line[start_col as usize..end_col as usize] {
                    *cell = Some(color);
                }
            }
        }
    }
    cells
}

/// Background colour of each column: black-key lanes are darker.
fn lane_backgrounds(width: u16) -> Vec<Color> {
    let mut lanes = vec![Color::Rgb(20, 20, 20); width as usize];
    for pitch in LOWEST_PIANO_KEY..=HIGHEST_PIANO_KEY {
        if let Some((start, end)) = key_columns(pitch, width) {
            let bg = if is_black_key(pitch) {
                Color::Rgb(12, 12, 12)
            } else {
                Color::Rgb(28, 28, 28)
            };
            lanes[start as usize..end as usize].fill(bg);
        }
    }
    lanes
}

/// Renders the piano roll.
///
/// # Arguments
///
/// * `frame` - The frame to render to
/// * `area` - The area to render in
/// * `app` - Application state
pub fn render_piano_roll(frame: &mut Frame, area: Rect, app: &App) {
    let window = app.config().roll_window_seconds;
    let block = Block::default()
        .title(format!(" Piano Roll ({:.1}s ahead) ", window))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let cells = bar_cells(
        app.session().timeline(),
        app.view().song_time(),
        window,
        inner.width,
        inner.height,
    );
    let lanes = lane_backgrounds(inner.width);

    for (row, line) in cells.into_iter().enumerate() {
        let spans: Vec<Span> = line
            .into_iter()
            .zip(lanes.iter())
            .map(|(cell, &lane)| match cell {
                Some(color) => Span::styled(" ", Style::default().bg(color)),
                None => Span::styled(" ", Style::default().bg(lane)),
            })
            .collect();
        frame.render_widget(
            Paragraph::new(Line::from(spans)),
            Rect::new(inner.x, inner.y + row as u16, inner.width, 1),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::Note;

    fn timeline(notes: &[(u8, f64, f64)]) -> Timeline {
        Timeline::from_notes(
            notes
                .iter()
                .map(|&(pitch, start, end)| Note {
                    pitch,
                    velocity: 100,
                    start,
                    end,
                })
                .collect(),
        )
    }

    fn filled_rows(cells: &[Vec<Option<Color>>], col: usize) -> Vec<usize> {
        cells
            .iter()
            .enumerate()
            .filter(|(_, line)| line[col].is_some())
            .map(|(row, _)| row)
            .collect()
    }

    #[test]
    fn test_sounding_note_touches_bottom_row() {
        // 88 columns, 4 rows of one second each
        let t = timeline(&[(21, 0.0, 1.4)]);
        let cells = bar_cells(&t, 0.5, 4.0, 88, 4);
        assert_eq!(filled_rows(&cells, 0), vec![3]);
        assert_eq!(
            cells[3][0],
            Some(pitch_color(21, SOUNDING_LIGHTNESS))
        );
    }

    #[test]
    fn test_future_note_falls_from_above() {
        let t = timeline(&[(108, 2.5, 3.5)]);
        let cells = bar_cells(&t, 0.0, 4.0, 88, 4);
        // Rows cover [3,4) [2,3) [1,2) [0,1) from the top
        assert_eq!(filled_rows(&cells, 87), vec![0, 1]);
        assert_eq!(cells[0][87], Some(pitch_color(108, FALLING_LIGHTNESS)));
        assert!(cells.iter().all(|line| line[..87].iter().all(Option::is_none)));
    }

    #[test]
    fn test_notes_outside_window_are_not_drawn() {
        let t = timeline(&[(60, 10.0, 11.0), (60, 0.0, 0.5)]);
        let cells = bar_cells(&t, 2.0, 4.0, 88, 8);
        assert!(cells.iter().flatten().all(Option::is_none));
    }

    #[test]
    fn test_empty_area() {
        let t = timeline(&[(60, 0.0, 1.0)]);
        assert!(bar_cells(&t, 0.0, 4.0, 0, 0).is_empty());
    }
}
